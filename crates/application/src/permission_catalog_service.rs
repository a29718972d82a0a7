use std::sync::Arc;

use futures::FutureExt;
use keydesk_core::{AppError, AppResult};
use keydesk_domain::PermissionCatalog;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::PermissionCatalogRepository;
use crate::load_slot::{LoadSlot, LoadState, LoadTicket};

/// Process-wide cache of the functional permission catalog.
///
/// The catalog is fetched at most once at a time; callers arriving while a
/// fetch runs wait for that same fetch. A failed fetch leaves the catalog
/// unloaded so the next call retries.
#[derive(Clone)]
pub struct PermissionCatalogService {
    repository: Arc<dyn PermissionCatalogRepository>,
    slot: Arc<Mutex<LoadSlot<PermissionCatalog>>>,
}

impl PermissionCatalogService {
    /// Creates a service with an empty cache.
    #[must_use]
    pub fn new(repository: Arc<dyn PermissionCatalogRepository>) -> Self {
        Self {
            repository,
            slot: Arc::new(Mutex::new(LoadSlot::default())),
        }
    }

    /// Returns the catalog, loading it on first use.
    pub async fn ensure_loaded(&self) -> AppResult<Arc<PermissionCatalog>> {
        let ticket = {
            let mut slot = self.slot.lock().await;
            slot.acquire(false, || {
                let repository = Arc::clone(&self.repository);
                async move { repository.fetch_permission_catalog().await.map(Arc::new) }.boxed()
            })
        };

        let (generation, pending) = match ticket {
            LoadTicket::Ready(catalog) => return Ok(catalog),
            LoadTicket::Pending {
                generation,
                pending,
                started,
            } => {
                if started {
                    debug!("loading permission catalog");
                }
                (generation, pending)
            }
        };

        let outcome = pending.await;
        let committed = self.slot.lock().await.complete(generation, &outcome);
        if committed {
            match &outcome {
                Ok(catalog) => info!(permissions = catalog.len(), "permission catalog loaded"),
                Err(error) => warn!(error = %error, "failed to load permission catalog"),
            }
        }

        outcome
    }

    /// Returns the catalog if it is already loaded.
    pub async fn catalog(&self) -> Option<Arc<PermissionCatalog>> {
        match self.slot.lock().await.state() {
            LoadState::Loaded(catalog) => Some(Arc::clone(catalog)),
            LoadState::Empty | LoadState::Loading { .. } | LoadState::Failed(_) => None,
        }
    }

    /// Returns the error of the last failed load while the catalog is unloaded.
    pub async fn last_error(&self) -> Option<AppError> {
        match self.slot.lock().await.state() {
            LoadState::Failed(error) => Some(error.clone()),
            LoadState::Empty | LoadState::Loading { .. } | LoadState::Loaded(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use keydesk_core::{AppError, AppResult};
    use keydesk_domain::{PermissionCatalog, PermissionDefinition, PermissionKey};

    use crate::PermissionCatalogRepository;

    use super::PermissionCatalogService;

    #[derive(Default)]
    struct FakePermissionCatalogRepository {
        calls: AtomicUsize,
        failures_left: Mutex<usize>,
    }

    impl FakePermissionCatalogRepository {
        fn failing(times: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures_left: Mutex::new(times),
            }
        }
    }

    #[async_trait]
    impl PermissionCatalogRepository for FakePermissionCatalogRepository {
        async fn fetch_permission_catalog(&self) -> AppResult<PermissionCatalog> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;

            let mut failures_left = self.failures_left.lock().await;
            if *failures_left > 0 {
                *failures_left -= 1;
                return Err(AppError::Internal("catalog endpoint unavailable".to_owned()));
            }

            let key = PermissionKey::new("licenses.view").unwrap_or_else(|_| unreachable!());
            Ok(PermissionCatalog::new(vec![PermissionDefinition::new(
                key,
                "View licenses",
                None,
                "Licenses",
            )]))
        }
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_fetch() {
        let repository = Arc::new(FakePermissionCatalogRepository::default());
        let service = PermissionCatalogService::new(repository.clone());

        let (first, second) = tokio::join!(service.ensure_loaded(), service.ensure_loaded());

        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
        let (Ok(first), Ok(second)) = (first, second) else {
            panic!("both callers should receive the catalog");
        };
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn loaded_catalog_is_served_from_cache() {
        let repository = Arc::new(FakePermissionCatalogRepository::default());
        let service = PermissionCatalogService::new(repository.clone());

        assert!(service.ensure_loaded().await.is_ok());
        assert!(service.ensure_loaded().await.is_ok());

        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
        assert!(service.catalog().await.is_some());
    }

    #[tokio::test]
    async fn concurrent_callers_observe_the_same_failure() {
        let repository = Arc::new(FakePermissionCatalogRepository::failing(1));
        let service = PermissionCatalogService::new(repository.clone());

        let (first, second) = tokio::join!(service.ensure_loaded(), service.ensure_loaded());

        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(first, Err(AppError::Internal(_))));
        assert_eq!(first.err(), second.err());
    }

    #[tokio::test]
    async fn failed_load_can_be_retried() {
        let repository = Arc::new(FakePermissionCatalogRepository::failing(1));
        let service = PermissionCatalogService::new(repository.clone());

        assert!(service.ensure_loaded().await.is_err());
        assert!(service.catalog().await.is_none());
        assert!(service.last_error().await.is_some());

        let retried = service.ensure_loaded().await;
        assert!(retried.is_ok());
        assert_eq!(repository.calls.load(Ordering::SeqCst), 2);
        assert!(service.last_error().await.is_none());
    }
}
