//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod permission;
mod policy;
mod resource;

pub use permission::{
    PermissionCatalog, PermissionCategoryGroup, PermissionDefinition, PermissionKey,
    permission_keys,
};
pub use policy::{
    AdminResourcePermissions, ResourceAccessPolicy, ResourcePermissionsPayload,
    ResourcePolicyPayload, normalize_resource_permissions,
};
pub use resource::{ResourceAccessMode, ResourceCatalogEntry, ResourceType};
