//! Keydesk console for reviewing administrator permissions.
//!
//! Usage:
//! - `keydesk-console` lists every administrator with a permission summary.
//! - `keydesk-console show <admin-id>` prints one administrator's checklist
//!   and resource access policies.
//! - `keydesk-console search <licenses|policies|products> [term]` searches a
//!   resource catalog.

#![forbid(unsafe_code)]

mod console_config;

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use keydesk_application::presentation::{
    filtered_catalog_items, permission_summary, resource_type_summaries,
};
use keydesk_application::{
    AdminPermissionEditor, PermissionCatalogService, ResourceCatalogErrorKind,
    ResourceCatalogService,
};
use keydesk_core::{AdminId, AppError, AppResult};
use keydesk_domain::{AdminResourcePermissions, ResourceAccessMode, ResourceType};
use keydesk_infrastructure::HttpAdminApiClient;
use tracing::{info, warn};

use crate::console_config::{ConsoleConfig, init_tracing};

enum Command {
    List,
    Show(AdminId),
    Search { resource_type: ResourceType, term: String },
}

impl Command {
    fn from_args(args: &[String]) -> AppResult<Self> {
        match args {
            [] => Ok(Self::List),
            [command, admin_id] if command == "show" => Ok(Self::Show(AdminId::new(admin_id)?)),
            [command, resource_type, term @ ..] if command == "search" => Ok(Self::Search {
                resource_type: ResourceType::from_str(resource_type)?,
                term: term.join(" "),
            }),
            _ => Err(AppError::Validation(
                "usage: keydesk-console [show <admin-id> | search <resource-type> [term]]"
                    .to_owned(),
            )),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let command = Command::from_args(&args)?;
    let config = ConsoleConfig::load()?;

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let api_client = Arc::new(HttpAdminApiClient::new(
        http_client,
        config.api_base_url.clone(),
        config.api_token.clone(),
    ));

    info!(api_base_url = %config.api_base_url, "keydesk console starting");

    let mut editor = AdminPermissionEditor::new(
        PermissionCatalogService::new(api_client.clone()),
        ResourceCatalogService::new(api_client.clone()),
        api_client,
    );

    match command {
        Command::List => list_admins(&mut editor, &config).await,
        Command::Show(admin_id) => show_admin(&mut editor, &admin_id).await,
        Command::Search {
            resource_type,
            term,
        } => search_resources(&editor, resource_type, &term).await,
    }
}

async fn list_admins(editor: &mut AdminPermissionEditor, config: &ConsoleConfig) -> AppResult<()> {
    let admins = editor.refresh_admins().await?;
    let catalog = editor.permission_catalog().ensure_loaded().await.ok();

    for admin in &admins {
        let identity = &admin.identity;
        let summary = permission_summary(
            &admin.permissions,
            identity.role().is_super_admin(),
            catalog.as_deref(),
            config.summary_visible_permissions,
        );
        println!(
            "{} <{}> [{}] {}",
            identity.username(),
            identity.admin_id(),
            identity.role().as_str(),
            summary
        );

        if identity.role().is_super_admin() {
            continue;
        }
        if let Some(server_policies) = &admin.resource_permissions {
            let permissions = AdminResourcePermissions::from_payload(server_policies);
            for line in resource_type_summaries(&permissions) {
                println!("    {line}");
            }
        }
    }

    info!(admins = admins.len(), "listed administrators");
    Ok(())
}

async fn show_admin(editor: &mut AdminPermissionEditor, admin_id: &AdminId) -> AppResult<()> {
    editor.refresh_admins().await?;
    let Some(profile) = editor.profile(admin_id).cloned() else {
        return Err(AppError::NotFound(format!("admin '{admin_id}' does not exist")));
    };

    let catalog = match editor.load_for_admin(admin_id, Some(&profile)).await {
        Ok(catalog) => Some(catalog),
        Err(error) => {
            warn!(error = %error, "showing raw permission keys");
            None
        }
    };

    println!(
        "{} <{}> [{}]",
        profile.identity.username(),
        admin_id,
        profile.identity.role().as_str()
    );

    match &catalog {
        Some(catalog) => {
            for group in catalog.group_by_category() {
                println!("{}", group.category);
                for definition in group.permissions {
                    let mark = if editor.is_permission_checked(definition.key().as_str()) {
                        "x"
                    } else {
                        " "
                    };
                    println!("  [{mark}] {} ({})", definition.label(), definition.key());
                    if let Some(description) = definition.description() {
                        println!("        {description}");
                    }
                }
            }
        }
        None => {
            for key in editor.collect_functional_permissions(admin_id).await {
                println!("  [x] {key}");
            }
        }
    }

    if let Some(permissions) = editor.resource_permissions(admin_id) {
        for line in resource_type_summaries(permissions) {
            println!("{line}");
        }
    }

    for resource_type in ResourceType::all() {
        let is_custom = editor
            .resource_policy(*resource_type)
            .is_some_and(|policy| policy.mode() == ResourceAccessMode::Custom);
        if !is_custom {
            continue;
        }
        let Some(view) = editor.custom_selection(*resource_type, "").await else {
            continue;
        };
        println!(
            "{} allow-list ({})",
            resource_type.label(),
            resource_type.search_placeholder()
        );
        if let Some(error) = &view.snapshot.error {
            println!("  {}", error.message);
            continue;
        }
        for item in &view.visible_items {
            let mark = if view.selected_ids.contains(&item.id) {
                "x"
            } else {
                " "
            };
            println!("  [{mark}] {} {}", item.name, item.description);
        }
    }

    editor.close();
    Ok(())
}

async fn search_resources(
    editor: &AdminPermissionEditor,
    resource_type: ResourceType,
    term: &str,
) -> AppResult<()> {
    let snapshot = editor.resource_catalog().get(resource_type, false).await;
    if let Some(error) = snapshot.error {
        return Err(match error.kind {
            ResourceCatalogErrorKind::MissingViewPermission => AppError::Forbidden(error.message),
            ResourceCatalogErrorKind::LoadFailed => AppError::Internal(error.message),
        });
    }

    let matches = filtered_catalog_items(&snapshot.items, term);
    println!(
        "{}: {} of {} items",
        resource_type.label(),
        matches.len(),
        snapshot.items.len()
    );
    for item in matches {
        println!("  {} {} {}", item.id, item.name, item.description);
    }

    Ok(())
}
