use std::collections::HashMap;

use keydesk_core::AdminId;
use keydesk_domain::{
    AdminResourcePermissions, ResourceAccessMode, ResourceAccessPolicy,
    ResourcePermissionsPayload, ResourceType,
};

#[derive(Debug, Clone, Default)]
struct AdminResourceState {
    permissions: AdminResourcePermissions,
    loaded_from_server: bool,
}

/// Unsaved resource access policies of every administrator opened for editing.
///
/// State lives in memory only; nothing here is written back to the backend
/// until the editor saves.
#[derive(Debug, Default)]
pub struct AdminResourceStateStore {
    states: HashMap<AdminId, AdminResourceState>,
}

impl AdminResourceStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state of an administrator, creating the all-access default.
    pub fn ensure_state(&mut self, admin_id: &AdminId) -> &AdminResourcePermissions {
        &self.states.entry(admin_id.clone()).or_default().permissions
    }

    /// Replaces the state of an administrator with backend data.
    ///
    /// Each known type is read independently and normalized; types missing
    /// from `server_policies` reset to the default.
    pub fn hydrate(
        &mut self,
        admin_id: &AdminId,
        server_policies: &ResourcePermissionsPayload,
    ) -> &AdminResourcePermissions {
        let state = self.states.entry(admin_id.clone()).or_default();
        state.permissions = AdminResourcePermissions::from_payload(server_policies);
        state.loaded_from_server = true;
        &state.permissions
    }

    /// Returns whether the state came from backend data.
    #[must_use]
    pub fn is_loaded_from_server(&self, admin_id: &AdminId) -> bool {
        self.states
            .get(admin_id)
            .is_some_and(|state| state.loaded_from_server)
    }

    /// Returns the state of an administrator, if one exists.
    #[must_use]
    pub fn state(&self, admin_id: &AdminId) -> Option<&AdminResourcePermissions> {
        self.states.get(admin_id).map(|state| &state.permissions)
    }

    /// Returns the policy for one type, or the default for unknown administrators.
    #[must_use]
    pub fn policy(&self, admin_id: &AdminId, resource_type: ResourceType) -> ResourceAccessPolicy {
        self.state(admin_id)
            .map(|permissions| permissions.policy(resource_type).clone())
            .unwrap_or_default()
    }

    /// Sets the mode of one type. Leaving custom clears the selection.
    pub fn set_mode(
        &mut self,
        admin_id: &AdminId,
        resource_type: ResourceType,
        mode: ResourceAccessMode,
    ) {
        self.states
            .entry(admin_id.clone())
            .or_default()
            .permissions
            .set_mode(resource_type, mode);
    }

    /// Adds or removes one allow-list id.
    ///
    /// Does nothing and returns `false` unless the type is in custom mode.
    pub fn toggle_selection(
        &mut self,
        admin_id: &AdminId,
        resource_type: ResourceType,
        item_id: &str,
    ) -> bool {
        self.states
            .entry(admin_id.clone())
            .or_default()
            .permissions
            .toggle_selection(resource_type, item_id)
    }

    /// Produces the save payload for every resource type.
    #[must_use]
    pub fn serialize(&self, admin_id: &AdminId) -> ResourcePermissionsPayload {
        self.state(admin_id)
            .map(AdminResourcePermissions::to_payload)
            .unwrap_or_else(|| AdminResourcePermissions::default().to_payload())
    }

    /// Forgets the state of an administrator. Returns whether one existed.
    pub fn discard(&mut self, admin_id: &AdminId) -> bool {
        self.states.remove(admin_id).is_some()
    }
}
