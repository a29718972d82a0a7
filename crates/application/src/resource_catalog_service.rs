use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use keydesk_core::{AppError, AppResult};
use keydesk_domain::{ResourceCatalogEntry, ResourceType};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::ResourceCatalogRepository;
use crate::load_slot::{LoadSlot, LoadState, LoadTicket};

type ResourceItems = Vec<ResourceCatalogEntry>;

/// Why a resource list could not be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceCatalogErrorKind {
    /// The current administrator lacks the view permission for the type.
    MissingViewPermission,
    /// Any other transport or backend failure.
    LoadFailed,
}

/// Inspectable failure state of one resource list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCatalogError {
    /// Failure category.
    pub kind: ResourceCatalogErrorKind,
    /// Operator-facing message.
    pub message: String,
}

impl ResourceCatalogError {
    fn from_app_error(resource_type: ResourceType, error: &AppError) -> Self {
        match error {
            AppError::Forbidden(_) => Self {
                kind: ResourceCatalogErrorKind::MissingViewPermission,
                message: format!(
                    "{} cannot be listed without the '{}' permission; grant it before restricting access to specific items",
                    resource_type.label(),
                    resource_type.view_permission()
                ),
            },
            other => Self {
                kind: ResourceCatalogErrorKind::LoadFailed,
                message: format!(
                    "failed to load {} list: {other}",
                    resource_type.as_str()
                ),
            },
        }
    }
}

/// Point-in-time view of one resource list cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCatalogSnapshot {
    /// Resource type of the list.
    pub resource_type: ResourceType,
    /// Cached items, empty unless loaded.
    pub items: Arc<ResourceItems>,
    /// Whether `items` holds a successful fetch.
    pub loaded: bool,
    /// Whether a fetch is running.
    pub loading: bool,
    /// Failure of the last fetch, if it failed.
    pub error: Option<ResourceCatalogError>,
}

impl ResourceCatalogSnapshot {
    fn empty(resource_type: ResourceType, loading: bool) -> Self {
        Self {
            resource_type,
            items: Arc::new(Vec::new()),
            loaded: false,
            loading,
            error: None,
        }
    }

    fn loaded(resource_type: ResourceType, items: Arc<ResourceItems>) -> Self {
        Self {
            resource_type,
            items,
            loaded: true,
            loading: false,
            error: None,
        }
    }

    fn failed(resource_type: ResourceType, error: &AppError) -> Self {
        Self {
            error: Some(ResourceCatalogError::from_app_error(resource_type, error)),
            ..Self::empty(resource_type, false)
        }
    }

    fn from_slot(resource_type: ResourceType, slot: &LoadSlot<ResourceItems>) -> Self {
        match slot.state() {
            LoadState::Empty => Self::empty(resource_type, false),
            LoadState::Loading { .. } => Self::empty(resource_type, true),
            LoadState::Loaded(items) => Self::loaded(resource_type, Arc::clone(items)),
            LoadState::Failed(error) => Self::failed(resource_type, error),
        }
    }
}

/// Per-type cache of selectable resource instances.
///
/// Concurrent requests for one type share a single fetch. Forced reloads
/// and invalidation bump the type's generation so older fetches can never
/// overwrite newer data.
#[derive(Clone)]
pub struct ResourceCatalogService {
    repository: Arc<dyn ResourceCatalogRepository>,
    slots: Arc<Mutex<HashMap<ResourceType, LoadSlot<ResourceItems>>>>,
}

impl ResourceCatalogService {
    /// Creates a service with empty caches.
    #[must_use]
    pub fn new(repository: Arc<dyn ResourceCatalogRepository>) -> Self {
        Self {
            repository,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the list for one type, fetching it when missing or forced.
    ///
    /// Failures are reported through [`ResourceCatalogSnapshot::error`].
    pub async fn get(
        &self,
        resource_type: ResourceType,
        force_reload: bool,
    ) -> ResourceCatalogSnapshot {
        let mut ticket = {
            let mut slots = self.slots.lock().await;
            slots
                .entry(resource_type)
                .or_default()
                .acquire(force_reload, || self.start_fetch(resource_type))
        };

        loop {
            let (generation, pending) = match ticket {
                LoadTicket::Ready(items) => {
                    return ResourceCatalogSnapshot::loaded(resource_type, items);
                }
                LoadTicket::Pending {
                    generation,
                    pending,
                    started,
                } => {
                    if started {
                        debug!(
                            resource_type = %resource_type,
                            generation,
                            "loading resource list"
                        );
                    }
                    (generation, pending)
                }
            };

            let outcome = pending.await;
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(resource_type).or_default();

            if slot.complete(generation, &outcome) {
                match &outcome {
                    Ok(items) => info!(
                        resource_type = %resource_type,
                        items = items.len(),
                        "resource list loaded"
                    ),
                    Err(error) => warn!(
                        resource_type = %resource_type,
                        error = %error,
                        "failed to load resource list"
                    ),
                }
                return ResourceCatalogSnapshot::from_slot(resource_type, slot);
            }

            // A newer request superseded this one; follow whatever it left behind.
            debug!(
                resource_type = %resource_type,
                generation,
                "discarding stale resource list"
            );
            ticket = match slot.current_ticket() {
                Some(newer) => newer,
                None if matches!(slot.state(), LoadState::Empty) => {
                    slot.acquire(false, || self.start_fetch(resource_type))
                }
                None => return ResourceCatalogSnapshot::from_slot(resource_type, slot),
            };
        }
    }

    /// Returns the cache entry for one type without fetching.
    pub async fn snapshot(&self, resource_type: ResourceType) -> ResourceCatalogSnapshot {
        let slots = self.slots.lock().await;
        match slots.get(&resource_type) {
            Some(slot) => ResourceCatalogSnapshot::from_slot(resource_type, slot),
            None => ResourceCatalogSnapshot::empty(resource_type, false),
        }
    }

    /// Drops the cache for one type; the next [`Self::get`] refetches.
    pub async fn invalidate(&self, resource_type: ResourceType) {
        let mut slots = self.slots.lock().await;
        slots.entry(resource_type).or_default().invalidate();
        debug!(resource_type = %resource_type, "resource list invalidated");
    }

    fn start_fetch(
        &self,
        resource_type: ResourceType,
    ) -> BoxFuture<'static, AppResult<Arc<ResourceItems>>> {
        let repository = Arc::clone(&self.repository);
        async move {
            repository
                .list_resource_items(resource_type)
                .await
                .map(Arc::new)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use keydesk_core::{AppError, AppResult};
    use keydesk_domain::{ResourceCatalogEntry, ResourceType};

    use crate::ResourceCatalogRepository;

    use super::{ResourceCatalogErrorKind, ResourceCatalogService};

    #[derive(Default)]
    struct FakeResourceCatalogRepository {
        calls: AtomicUsize,
        first_call_delay: usize,
        responses: Mutex<HashMap<ResourceType, Vec<AppResult<Vec<ResourceCatalogEntry>>>>>,
    }

    impl FakeResourceCatalogRepository {
        fn with_responses(
            resource_type: ResourceType,
            responses: Vec<AppResult<Vec<ResourceCatalogEntry>>>,
        ) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                first_call_delay: 0,
                responses: Mutex::new(HashMap::from([(resource_type, responses)])),
            }
        }

        fn with_slow_first_call(mut self, yields: usize) -> Self {
            self.first_call_delay = yields;
            self
        }
    }

    #[async_trait]
    impl ResourceCatalogRepository for FakeResourceCatalogRepository {
        async fn list_resource_items(
            &self,
            resource_type: ResourceType,
        ) -> AppResult<Vec<ResourceCatalogEntry>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let response = {
                let mut responses = self.responses.lock().await;
                let queue = responses.entry(resource_type).or_default();
                if queue.is_empty() {
                    Ok(Vec::new())
                } else {
                    queue.remove(0)
                }
            };
            tokio::task::yield_now().await;
            if call == 0 {
                for _ in 0..self.first_call_delay {
                    tokio::task::yield_now().await;
                }
            }
            response
        }
    }

    fn license(id: &str, name: &str) -> ResourceCatalogEntry {
        ResourceCatalogEntry::new(id, name, "")
    }

    #[tokio::test]
    async fn concurrent_gets_share_one_fetch() {
        let repository = Arc::new(FakeResourceCatalogRepository::with_responses(
            ResourceType::Licenses,
            vec![Ok(vec![license("L1", "ACME-KEY")])],
        ));
        let service = ResourceCatalogService::new(repository.clone());

        let (first, second) = tokio::join!(
            service.get(ResourceType::Licenses, false),
            service.get(ResourceType::Licenses, false)
        );

        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
        assert!(first.loaded && second.loaded);
        assert!(Arc::ptr_eq(&first.items, &second.items));
        assert_eq!(first.items[0].name, "ACME-KEY");
    }

    #[tokio::test]
    async fn cached_list_is_reused_until_forced() {
        let repository = Arc::new(FakeResourceCatalogRepository::with_responses(
            ResourceType::Products,
            vec![Ok(vec![license("P1", "Studio")]), Ok(vec![license("P2", "Suite")])],
        ));
        let service = ResourceCatalogService::new(repository.clone());

        let _ = service.get(ResourceType::Products, false).await;
        let cached = service.get(ResourceType::Products, false).await;
        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.items[0].id, "P1");

        let reloaded = service.get(ResourceType::Products, true).await;
        assert_eq!(repository.calls.load(Ordering::SeqCst), 2);
        assert_eq!(reloaded.items[0].id, "P2");
    }

    #[tokio::test]
    async fn forbidden_is_reported_as_missing_view_permission() {
        let repository = Arc::new(FakeResourceCatalogRepository::with_responses(
            ResourceType::Policies,
            vec![Err(AppError::Forbidden("insufficient permission".to_owned()))],
        ));
        let service = ResourceCatalogService::new(repository);

        let snapshot = service.get(ResourceType::Policies, false).await;

        assert!(!snapshot.loaded);
        let Some(error) = snapshot.error else {
            panic!("expected an error state");
        };
        assert_eq!(error.kind, ResourceCatalogErrorKind::MissingViewPermission);
        assert!(error.message.contains("policies.view"));
    }

    #[tokio::test]
    async fn generic_failure_is_recorded_and_retried() {
        let repository = Arc::new(FakeResourceCatalogRepository::with_responses(
            ResourceType::Licenses,
            vec![
                Err(AppError::Internal("connection reset".to_owned())),
                Ok(vec![license("L1", "ACME-KEY")]),
            ],
        ));
        let service = ResourceCatalogService::new(repository.clone());

        let failed = service.get(ResourceType::Licenses, false).await;
        assert_eq!(
            failed.error.map(|error| error.kind),
            Some(ResourceCatalogErrorKind::LoadFailed)
        );
        assert_eq!(
            service.snapshot(ResourceType::Licenses).await.error.map(|error| error.kind),
            Some(ResourceCatalogErrorKind::LoadFailed)
        );

        let retried = service.get(ResourceType::Licenses, false).await;
        assert!(retried.loaded);
        assert!(retried.error.is_none());
        assert_eq!(repository.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_only_drops_one_type() {
        let repository = Arc::new(FakeResourceCatalogRepository::default());
        let service = ResourceCatalogService::new(repository.clone());

        let _ = service.get(ResourceType::Licenses, false).await;
        let _ = service.get(ResourceType::Products, false).await;
        service.invalidate(ResourceType::Licenses).await;

        assert!(!service.snapshot(ResourceType::Licenses).await.loaded);
        assert!(service.snapshot(ResourceType::Products).await.loaded);

        let _ = service.get(ResourceType::Licenses, false).await;
        assert_eq!(repository.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn forced_reload_wins_over_stale_fetch() {
        let repository = Arc::new(FakeResourceCatalogRepository::with_responses(
            ResourceType::Licenses,
            vec![Ok(vec![license("OLD", "stale")]), Ok(vec![license("NEW", "fresh")])],
        ));
        let service = ResourceCatalogService::new(repository.clone());

        let (stale, fresh) = tokio::join!(
            service.get(ResourceType::Licenses, false),
            service.get(ResourceType::Licenses, true)
        );

        assert_eq!(repository.calls.load(Ordering::SeqCst), 2);
        assert_eq!(fresh.items[0].id, "NEW");
        assert_eq!(stale.items[0].id, "NEW");
        assert_eq!(service.snapshot(ResourceType::Licenses).await.items[0].id, "NEW");
    }

    #[tokio::test]
    async fn stale_fetch_reports_failure_of_newer_reload() {
        let repository = Arc::new(
            FakeResourceCatalogRepository::with_responses(
                ResourceType::Licenses,
                vec![
                    Ok(vec![license("OLD", "stale")]),
                    Err(AppError::Forbidden("insufficient permission".to_owned())),
                ],
            )
            .with_slow_first_call(5),
        );
        let service = ResourceCatalogService::new(repository.clone());

        let (stale, fresh) = tokio::join!(
            service.get(ResourceType::Licenses, false),
            service.get(ResourceType::Licenses, true)
        );

        assert_eq!(repository.calls.load(Ordering::SeqCst), 2);
        for snapshot in [&stale, &fresh] {
            assert!(!snapshot.loaded);
            assert!(snapshot.items.is_empty());
            assert_eq!(
                snapshot.error.as_ref().map(|error| error.kind),
                Some(ResourceCatalogErrorKind::MissingViewPermission)
            );
        }
        assert_eq!(
            service.snapshot(ResourceType::Licenses).await.error.map(|error| error.kind),
            Some(ResourceCatalogErrorKind::MissingViewPermission)
        );
    }

    #[tokio::test]
    async fn stale_fetch_refetches_after_invalidation() {
        let repository = Arc::new(
            FakeResourceCatalogRepository::with_responses(
                ResourceType::Licenses,
                vec![Ok(vec![license("OLD", "stale")]), Ok(vec![license("NEW", "fresh")])],
            )
            .with_slow_first_call(5),
        );
        let service = ResourceCatalogService::new(repository.clone());

        let (snapshot, ()) = tokio::join!(
            service.get(ResourceType::Licenses, false),
            service.invalidate(ResourceType::Licenses)
        );

        assert_eq!(repository.calls.load(Ordering::SeqCst), 2);
        assert!(snapshot.loaded);
        assert_eq!(snapshot.items[0].id, "NEW");
        assert_eq!(service.snapshot(ResourceType::Licenses).await.items[0].id, "NEW");
    }
}
