//! Application services and ports.

#![forbid(unsafe_code)]

mod admin_api_ports;
mod admin_permission_editor;
mod admin_resource_state_store;
mod load_slot;
mod permission_catalog_service;
/// Pure mappers from permission state to display text.
pub mod presentation;
mod resource_catalog_service;

pub use admin_api_ports::{
    AdminPermissionRepository, AdminPermissionsEcho, AdminProfile, PermissionCatalogRepository,
    ResourceCatalogRepository, UpdateAdminPermissionsInput,
};
pub use admin_permission_editor::{AdminPermissionEditor, CustomSelectionView};
pub use admin_resource_state_store::AdminResourceStateStore;
pub use permission_catalog_service::PermissionCatalogService;
pub use resource_catalog_service::{
    ResourceCatalogError, ResourceCatalogErrorKind, ResourceCatalogService,
    ResourceCatalogSnapshot,
};
