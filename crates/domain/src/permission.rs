use std::fmt::{Display, Formatter};

use keydesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Functional permission keys known to the license backend.
pub mod permission_keys {
    /// Dashboard statistics and recent activity.
    pub const DASHBOARD_VIEW: &str = "dashboard.view";
    /// License list and detail views.
    pub const LICENSES_VIEW: &str = "licenses.view";
    /// License create, update and delete.
    pub const LICENSES_MANAGE: &str = "licenses.manage";
    /// Device list and activity logs.
    pub const DEVICES_VIEW: &str = "devices.view";
    /// Device activation changes and cleanup.
    pub const DEVICES_MANAGE: &str = "devices.manage";
    /// Product list and detail views.
    pub const PRODUCTS_VIEW: &str = "products.view";
    /// Product create and update.
    pub const PRODUCTS_MANAGE: &str = "products.manage";
    /// Policy list and detail views.
    pub const POLICIES_VIEW: &str = "policies.view";
    /// Policy create, update and delete.
    pub const POLICIES_MANAGE: &str = "policies.manage";
    /// Product file listing and download.
    pub const FILES_VIEW: &str = "files.view";
    /// Product file upload and removal.
    pub const FILES_MANAGE: &str = "files.manage";
    /// Client log search.
    pub const CLIENT_LOGS_VIEW: &str = "client_logs.view";
    /// Client log bulk removal.
    pub const CLIENT_LOGS_MANAGE: &str = "client_logs.manage";
}

/// Opaque functional capability identifier such as `licenses.view`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionKey(String);

impl PermissionKey {
    /// Creates a permission key, trimming surrounding whitespace.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "permission key must not be empty".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the stable key value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionKey> for String {
    fn from(value: PermissionKey) -> Self {
        value.0
    }
}

impl Display for PermissionKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// One assignable permission as described by the backend catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDefinition {
    key: PermissionKey,
    label: String,
    description: Option<String>,
    category: String,
}

impl PermissionDefinition {
    /// Creates a catalog entry. A blank label falls back to the key.
    #[must_use]
    pub fn new(
        key: PermissionKey,
        label: impl Into<String>,
        description: Option<String>,
        category: impl Into<String>,
    ) -> Self {
        let label = label.into().trim().to_owned();
        let label = if label.is_empty() {
            key.as_str().to_owned()
        } else {
            label
        };
        let description = description.and_then(|value| {
            let trimmed = value.trim().to_owned();
            (!trimmed.is_empty()).then_some(trimmed)
        });

        Self {
            key,
            label,
            description,
            category: category.into().trim().to_owned(),
        }
    }

    /// Returns the permission key.
    #[must_use]
    pub fn key(&self) -> &PermissionKey {
        &self.key
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the grouping category.
    #[must_use]
    pub fn category(&self) -> &str {
        self.category.as_str()
    }
}

/// Permissions sharing one category, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCategoryGroup<'a> {
    /// Category name.
    pub category: &'a str,
    /// Permissions of the category.
    pub permissions: Vec<&'a PermissionDefinition>,
}

/// Ordered, immutable list of all assignable functional permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCatalog {
    entries: Vec<PermissionDefinition>,
}

impl PermissionCatalog {
    /// Creates a catalog. Later duplicates of a key are dropped.
    #[must_use]
    pub fn new(entries: Vec<PermissionDefinition>) -> Self {
        let mut unique: Vec<PermissionDefinition> = Vec::with_capacity(entries.len());
        for entry in entries {
            if !unique.iter().any(|existing| existing.key == entry.key) {
                unique.push(entry);
            }
        }

        Self { entries: unique }
    }

    /// Returns catalog entries in order.
    #[must_use]
    pub fn entries(&self) -> &[PermissionDefinition] {
        self.entries.as_slice()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the entry for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PermissionDefinition> {
        self.entries.iter().find(|entry| entry.key.as_str() == key)
    }

    /// Returns whether a key is assignable.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the display label for a key, if cataloged.
    #[must_use]
    pub fn label_for(&self, key: &str) -> Option<&str> {
        self.get(key).map(PermissionDefinition::label)
    }

    /// Partitions entries by category.
    ///
    /// Categories appear in the order of their first entry; entries keep
    /// catalog order within a group.
    #[must_use]
    pub fn group_by_category(&self) -> Vec<PermissionCategoryGroup<'_>> {
        let mut groups: Vec<PermissionCategoryGroup<'_>> = Vec::new();
        for entry in &self.entries {
            match groups
                .iter_mut()
                .find(|group| group.category == entry.category())
            {
                Some(group) => group.permissions.push(entry),
                None => groups.push(PermissionCategoryGroup {
                    category: entry.category(),
                    permissions: vec![entry],
                }),
            }
        }

        groups
    }
}
