use async_trait::async_trait;
use keydesk_application::{
    AdminPermissionRepository, AdminPermissionsEcho, AdminProfile, PermissionCatalogRepository,
    ResourceCatalogRepository, UpdateAdminPermissionsInput,
};
use keydesk_core::{AdminId, AppError, AppResult};
use keydesk_domain::{PermissionCatalog, ResourceCatalogEntry, ResourceType};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::admin_api_dto::{
    AdminDto, ApiEnvelope, PermissionDefinitionDto, PermissionsEchoDto, UpdatePermissionsBody,
    decode_envelope, envelope_message, permission_catalog_from_dtos, resource_entry_from_value,
};

/// Rows requested per page when walking paginated lists.
const LIST_PAGE_SIZE: u32 = 100;

/// Admin API client backed by `reqwest`.
#[derive(Clone)]
pub struct HttpAdminApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    api_token: String,
}

impl HttpAdminApiClient {
    /// Creates a client for an admin API base such as `http://host/api/admin`.
    #[must_use]
    pub fn new(http_client: reqwest::Client, base_url: Url, api_token: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url,
            api_token: api_token.into(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Internal(format!(
                    "admin API base url '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn send<T>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> AppResult<ApiEnvelope<T>>
    where
        T: DeserializeOwned,
    {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("{context} request failed: {error}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            AppError::Internal(format!("{context} response could not be read: {error}"))
        })?;

        if !status.is_success() {
            return Err(status_error(status, context, &body));
        }

        decode_envelope(context, &body)
    }

    async fn get<T>(&self, url: Url, context: &str) -> AppResult<ApiEnvelope<T>>
    where
        T: DeserializeOwned,
    {
        debug!(url = %url, "admin API request");
        self.send(self.http_client.get(url), context).await
    }

    async fn list_all_rows(&self, resource_type: ResourceType) -> AppResult<Vec<Value>> {
        let context = format!("{resource_type} list");
        let base = self.endpoint(&[resource_type.list_path().trim_start_matches('/')])?;
        let mut rows = Vec::new();
        let mut page = 1_u32;

        loop {
            let envelope = self
                .get::<Vec<Value>>(page_url(&base, page), &context)
                .await?;
            let page_rows = envelope.data.unwrap_or_default();
            let fetched = page_rows.len();
            rows.extend(page_rows);

            let has_more = envelope
                .meta
                .is_some_and(|meta| meta.page.max(page) < meta.total_pages);
            if !has_more || fetched == 0 {
                break;
            }
            page = page.saturating_add(1);
        }

        Ok(rows)
    }
}

fn page_url(base: &Url, page: u32) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("page", &page.to_string())
        .append_pair("page_size", &LIST_PAGE_SIZE.to_string());
    url
}

/// Maps a non-success HTTP status into the application error taxonomy.
fn status_error(status: StatusCode, context: &str, body: &str) -> AppError {
    let detail = envelope_message(body).unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::FORBIDDEN => AppError::Forbidden(format!("{context} forbidden: {detail}")),
        StatusCode::UNAUTHORIZED => {
            AppError::Unauthorized(format!("{context} unauthorized: {detail}"))
        }
        _ => AppError::Internal(format!("{context} failed with HTTP {status}: {detail}")),
    }
}

#[async_trait]
impl PermissionCatalogRepository for HttpAdminApiClient {
    async fn fetch_permission_catalog(&self) -> AppResult<PermissionCatalog> {
        let envelope = self
            .get::<Vec<PermissionDefinitionDto>>(
                self.endpoint(&["permissions", "catalog"])?,
                "permission catalog",
            )
            .await?;

        permission_catalog_from_dtos(envelope.data.unwrap_or_default())
    }
}

#[async_trait]
impl ResourceCatalogRepository for HttpAdminApiClient {
    async fn list_resource_items(
        &self,
        resource_type: ResourceType,
    ) -> AppResult<Vec<ResourceCatalogEntry>> {
        self.list_all_rows(resource_type)
            .await?
            .into_iter()
            .map(|row| resource_entry_from_value(resource_type, row))
            .collect()
    }
}

#[async_trait]
impl AdminPermissionRepository for HttpAdminApiClient {
    async fn list_admins(&self) -> AppResult<Vec<AdminProfile>> {
        let envelope = self
            .get::<Vec<AdminDto>>(self.endpoint(&["admins"])?, "admin list")
            .await?;

        envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(AdminDto::into_profile)
            .collect()
    }

    async fn update_admin_permissions(
        &self,
        admin_id: &AdminId,
        input: UpdateAdminPermissionsInput,
    ) -> AppResult<AdminPermissionsEcho> {
        let url = self.endpoint(&["admins", admin_id.as_str(), "permissions"])?;
        let body = UpdatePermissionsBody {
            permissions: input.permissions.iter().map(|key| key.as_str()).collect(),
            resource_permissions: &input.resource_permissions,
        };

        debug!(admin_id = %admin_id, url = %url, "updating admin permissions");
        let envelope = self
            .send::<PermissionsEchoDto>(
                self.http_client.put(url).json(&body),
                "admin permission update",
            )
            .await?;

        envelope.data.map(AdminPermissionsEcho::from).ok_or_else(|| {
            AppError::Internal("admin permission update returned no data".to_owned())
        })
    }
}
