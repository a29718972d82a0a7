use std::str::FromStr;

use keydesk_application::{AdminPermissionsEcho, AdminProfile};
use keydesk_core::{AdminId, AdminIdentity, AdminRole, AppError, AppResult};
use keydesk_domain::{
    PermissionCatalog, PermissionDefinition, PermissionKey, ResourceCatalogEntry,
    ResourcePermissionsPayload, ResourceType,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope wrapped around every admin API payload.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) message: String,
    pub(crate) data: Option<T>,
    pub(crate) meta: Option<PaginationMeta>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct PaginationMeta {
    #[serde(default)]
    pub(crate) page: u32,
    #[serde(default)]
    pub(crate) total_pages: u32,
}

/// Parses a response body and rejects envelopes not marked as successful.
pub(crate) fn decode_envelope<T>(context: &str, body: &str) -> AppResult<ApiEnvelope<T>>
where
    T: DeserializeOwned,
{
    let envelope = serde_json::from_str::<ApiEnvelope<T>>(body).map_err(|error| {
        AppError::Internal(format!("{context} returned an unreadable response: {error}"))
    })?;

    if envelope.status != "success" {
        return Err(AppError::Internal(format!(
            "{context} failed with status '{}': {}",
            envelope.status, envelope.message
        )));
    }

    Ok(envelope)
}

/// Extracts the server message from an error body, if it is an envelope.
pub(crate) fn envelope_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiEnvelope<Value>>(body)
        .ok()
        .map(|envelope| envelope.message)
        .filter(|message| !message.trim().is_empty())
}

#[derive(Debug, Deserialize)]
pub(crate) struct PermissionDefinitionDto {
    key: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: String,
}

pub(crate) fn permission_catalog_from_dtos(
    dtos: Vec<PermissionDefinitionDto>,
) -> AppResult<PermissionCatalog> {
    let entries = dtos
        .into_iter()
        .map(|dto| {
            Ok(PermissionDefinition::new(
                PermissionKey::new(dto.key)?,
                dto.label,
                dto.description,
                dto.category,
            ))
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(PermissionCatalog::new(entries))
}

#[derive(Debug, Deserialize)]
struct LicenseDto {
    id: String,
    #[serde(default)]
    license_key: String,
    #[serde(default)]
    customer_name: String,
    #[serde(default)]
    product_name: String,
}

#[derive(Debug, Deserialize)]
struct PolicyDto {
    id: String,
    #[serde(default)]
    policy_name: String,
    #[serde(default)]
    created_by: String,
}

#[derive(Debug, Deserialize)]
struct ProductDto {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
}

/// Maps one raw list row into a selectable catalog entry.
pub(crate) fn resource_entry_from_value(
    resource_type: ResourceType,
    value: Value,
) -> AppResult<ResourceCatalogEntry> {
    let invalid = |error: serde_json::Error| {
        AppError::Internal(format!("unexpected {resource_type} row: {error}"))
    };

    let entry = match resource_type {
        ResourceType::Licenses => {
            let license = serde_json::from_value::<LicenseDto>(value).map_err(invalid)?;
            let description = [license.customer_name.trim(), license.product_name.trim()]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" · ");
            ResourceCatalogEntry::new(license.id, license.license_key, description)
        }
        ResourceType::Policies => {
            let policy = serde_json::from_value::<PolicyDto>(value).map_err(invalid)?;
            ResourceCatalogEntry::new(policy.id, policy.policy_name, policy.created_by)
        }
        ResourceType::Products => {
            let product = serde_json::from_value::<ProductDto>(value).map_err(invalid)?;
            ResourceCatalogEntry::new(
                product.id,
                product.name,
                product.description.unwrap_or_default(),
            )
        }
    };

    Ok(entry)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdminDto {
    id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: String,
    #[serde(default)]
    permissions: Option<Vec<String>>,
    #[serde(default)]
    resource_permissions: Option<ResourcePermissionsPayload>,
}

impl AdminDto {
    pub(crate) fn into_profile(self) -> AppResult<AdminProfile> {
        let admin_id = AdminId::new(self.id)?;
        let role = AdminRole::from_str(&self.role)?;

        Ok(AdminProfile {
            identity: AdminIdentity::new(admin_id, self.username, self.email, role),
            permissions: permission_keys(self.permissions.unwrap_or_default()),
            resource_permissions: self.resource_permissions,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdatePermissionsBody<'a> {
    pub(crate) permissions: Vec<&'a str>,
    pub(crate) resource_permissions: &'a ResourcePermissionsPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PermissionsEchoDto {
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default)]
    resource_permissions: ResourcePermissionsPayload,
}

impl From<PermissionsEchoDto> for AdminPermissionsEcho {
    fn from(dto: PermissionsEchoDto) -> Self {
        Self {
            permissions: permission_keys(dto.permissions),
            resource_permissions: dto.resource_permissions,
        }
    }
}

fn permission_keys(values: Vec<String>) -> Vec<PermissionKey> {
    values
        .into_iter()
        .filter_map(|value| PermissionKey::new(value).ok())
        .collect()
}
