use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use keydesk_core::{AdminId, AppError, AppResult};
use keydesk_domain::{
    AdminResourcePermissions, PermissionCatalog, PermissionDefinition, PermissionKey,
    ResourceAccessMode, ResourceAccessPolicy, ResourceCatalogEntry, ResourceType,
};
use tracing::{debug, info, warn};

use crate::presentation::filtered_catalog_items;
use crate::{
    AdminPermissionRepository, AdminPermissionsEcho, AdminProfile, AdminResourceStateStore,
    PermissionCatalogService, ResourceCatalogService, ResourceCatalogSnapshot,
    UpdateAdminPermissionsInput,
};

mod editing;
mod saving;

/// Edit session over administrators' functional and resource permissions.
///
/// At most one administrator is open at a time. Unsaved edits of other
/// administrators stay in memory until saved, reloaded or discarded.
pub struct AdminPermissionEditor {
    permission_catalog: PermissionCatalogService,
    resource_catalog: ResourceCatalogService,
    admin_repository: Arc<dyn AdminPermissionRepository>,
    store: AdminResourceStateStore,
    checklists: HashMap<AdminId, BTreeSet<PermissionKey>>,
    profiles: HashMap<AdminId, AdminProfile>,
    active_admin: Option<AdminId>,
}

/// Items offered for a custom allow-list, with the current selection.
#[derive(Debug, Clone)]
pub struct CustomSelectionView {
    /// Load state of the resource catalog.
    pub snapshot: ResourceCatalogSnapshot,
    /// Catalog items matching the search term.
    pub visible_items: Vec<ResourceCatalogEntry>,
    /// Ids currently on the allow-list.
    pub selected_ids: BTreeSet<String>,
}

impl AdminPermissionEditor {
    /// Creates an editor with no open session.
    #[must_use]
    pub fn new(
        permission_catalog: PermissionCatalogService,
        resource_catalog: ResourceCatalogService,
        admin_repository: Arc<dyn AdminPermissionRepository>,
    ) -> Self {
        Self {
            permission_catalog,
            resource_catalog,
            admin_repository,
            store: AdminResourceStateStore::new(),
            checklists: HashMap::new(),
            profiles: HashMap::new(),
            active_admin: None,
        }
    }

    /// Returns the shared permission catalog service.
    #[must_use]
    pub fn permission_catalog(&self) -> &PermissionCatalogService {
        &self.permission_catalog
    }

    /// Returns the shared resource catalog service.
    #[must_use]
    pub fn resource_catalog(&self) -> &ResourceCatalogService {
        &self.resource_catalog
    }

    /// Returns the administrator whose session is open.
    #[must_use]
    pub fn active_admin(&self) -> Option<&AdminId> {
        self.active_admin.as_ref()
    }

    /// Returns the last known profile of an administrator.
    #[must_use]
    pub fn profile(&self, admin_id: &AdminId) -> Option<&AdminProfile> {
        self.profiles.get(admin_id)
    }

    /// Fetches the administrator directory and remembers every profile.
    pub async fn refresh_admins(&mut self) -> AppResult<Vec<AdminProfile>> {
        let admins = self.admin_repository.list_admins().await?;
        self.profiles = admins
            .iter()
            .map(|profile| (profile.identity.admin_id().clone(), profile.clone()))
            .collect();

        debug!(admins = admins.len(), "admin directory refreshed");
        Ok(admins)
    }

    /// Opens an administrator for editing, seeded from backend data.
    ///
    /// Resource state and the checklist are replaced with `cached_profile`,
    /// or the remembered profile when none is given, before the catalog is
    /// loaded. A catalog failure is returned but leaves the session open.
    pub async fn load_for_admin(
        &mut self,
        admin_id: &AdminId,
        cached_profile: Option<&AdminProfile>,
    ) -> AppResult<Arc<PermissionCatalog>> {
        if let Some(profile) = cached_profile {
            self.profiles.insert(admin_id.clone(), profile.clone());
        }
        let profile = self.profiles.get(admin_id);

        match profile.and_then(|profile| profile.resource_permissions.as_ref()) {
            Some(server_policies) => {
                self.store.hydrate(admin_id, server_policies);
            }
            None => {
                self.store.discard(admin_id);
                self.store.ensure_state(admin_id);
            }
        }

        let checked = profile
            .map(|profile| profile.permissions.iter().cloned().collect())
            .unwrap_or_default();
        self.checklists.insert(admin_id.clone(), checked);
        self.active_admin = Some(admin_id.clone());

        debug!(admin_id = %admin_id, "opened permission editor");
        self.ensure_catalog().await
    }

    /// Reopens an administrator, keeping unsaved edits when there are any.
    pub async fn resume_or_load(
        &mut self,
        admin_id: &AdminId,
    ) -> AppResult<Arc<PermissionCatalog>> {
        let has_session =
            self.store.state(admin_id).is_some() && self.checklists.contains_key(admin_id);
        if !has_session {
            return self.load_for_admin(admin_id, None).await;
        }

        self.active_admin = Some(admin_id.clone());
        debug!(admin_id = %admin_id, "resumed permission editor");
        self.ensure_catalog().await
    }

    /// Closes the open session. Unsaved edits are kept.
    pub fn close(&mut self) {
        if let Some(admin_id) = self.active_admin.take() {
            debug!(admin_id = %admin_id, "closed permission editor");
        }
    }

    /// Drops unsaved edits of an administrator.
    pub fn discard(&mut self, admin_id: &AdminId) {
        self.store.discard(admin_id);
        self.checklists.remove(admin_id);
        if self.active_admin.as_ref() == Some(admin_id) {
            self.active_admin = None;
        }
    }

    async fn ensure_catalog(&self) -> AppResult<Arc<PermissionCatalog>> {
        self.permission_catalog
            .ensure_loaded()
            .await
            .inspect_err(|error| {
                warn!(error = %error, "permission catalog unavailable for editing");
            })
    }

    fn require_active(&self) -> AppResult<AdminId> {
        self.active_admin.clone().ok_or_else(|| {
            AppError::Validation("no administrator is open for editing".to_owned())
        })
    }
}
