use async_trait::async_trait;

use keydesk_core::{AdminId, AdminIdentity, AppResult};
use keydesk_domain::{
    PermissionCatalog, PermissionKey, ResourceCatalogEntry, ResourcePermissionsPayload,
    ResourceType,
};

/// Administrator row returned by the admin directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminProfile {
    /// Account identity and role.
    pub identity: AdminIdentity,
    /// Granted functional permissions.
    pub permissions: Vec<PermissionKey>,
    /// Resource access policies, when the backend included them.
    pub resource_permissions: Option<ResourcePermissionsPayload>,
}

/// Save request for one administrator's permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateAdminPermissionsInput {
    /// Functional permissions to grant.
    pub permissions: Vec<PermissionKey>,
    /// Resource access policies for every resource type.
    pub resource_permissions: ResourcePermissionsPayload,
}

/// Canonical permissions echoed by the backend after a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPermissionsEcho {
    /// Functional permissions as stored.
    pub permissions: Vec<PermissionKey>,
    /// Resource access policies as stored.
    pub resource_permissions: ResourcePermissionsPayload,
}

/// Port for loading the global functional permission catalog.
#[async_trait]
pub trait PermissionCatalogRepository: Send + Sync {
    /// Fetches every assignable permission.
    async fn fetch_permission_catalog(&self) -> AppResult<PermissionCatalog>;
}

/// Port for listing selectable instances of a resource type.
///
/// Implementations return [`keydesk_core::AppError::Forbidden`] when the
/// current administrator lacks the view permission for the type.
#[async_trait]
pub trait ResourceCatalogRepository: Send + Sync {
    /// Lists every instance of one resource type.
    async fn list_resource_items(
        &self,
        resource_type: ResourceType,
    ) -> AppResult<Vec<ResourceCatalogEntry>>;
}

/// Port for the administrator directory and permission updates.
#[async_trait]
pub trait AdminPermissionRepository: Send + Sync {
    /// Lists administrators with their current permissions.
    async fn list_admins(&self) -> AppResult<Vec<AdminProfile>>;

    /// Replaces the permissions of one administrator.
    async fn update_admin_permissions(
        &self,
        admin_id: &AdminId,
        input: UpdateAdminPermissionsInput,
    ) -> AppResult<AdminPermissionsEcho>;
}
