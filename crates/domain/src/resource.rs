use std::fmt::{Display, Formatter};
use std::str::FromStr;

use keydesk_core::AppError;
use serde::{Deserialize, Serialize};

use crate::permission::permission_keys;

/// Protected resource types that carry per-administrator access policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Issued license keys.
    Licenses,
    /// Client policies.
    Policies,
    /// Products.
    Products,
}

impl ResourceType {
    /// Returns all known resource types in display order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ResourceType] = &[
            ResourceType::Licenses,
            ResourceType::Policies,
            ResourceType::Products,
        ];

        ALL
    }

    /// Returns the stable storage and transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Licenses => "licenses",
            Self::Policies => "policies",
            Self::Products => "products",
        }
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Licenses => "Licenses",
            Self::Policies => "Policies",
            Self::Products => "Products",
        }
    }

    /// Returns the placeholder of the allow-list search box.
    #[must_use]
    pub fn search_placeholder(&self) -> &'static str {
        match self {
            Self::Licenses => "Search by license key or customer",
            Self::Policies => "Search by policy name",
            Self::Products => "Search by product name",
        }
    }

    /// Returns the short label used in permission summary badges.
    #[must_use]
    pub fn summary_label(&self) -> &'static str {
        match self {
            Self::Licenses => "License access",
            Self::Policies => "Policy access",
            Self::Products => "Product access",
        }
    }

    /// Returns the list endpoint path relative to the admin API base.
    #[must_use]
    pub fn list_path(&self) -> &'static str {
        match self {
            Self::Licenses => "/licenses",
            Self::Policies => "/policies",
            Self::Products => "/products",
        }
    }

    /// Returns the functional permission required to list instances.
    #[must_use]
    pub fn view_permission(&self) -> &'static str {
        match self {
            Self::Licenses => permission_keys::LICENSES_VIEW,
            Self::Policies => permission_keys::POLICIES_VIEW,
            Self::Products => permission_keys::PRODUCTS_VIEW,
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "licenses" => Ok(Self::Licenses),
            "policies" => Ok(Self::Policies),
            "products" => Ok(Self::Products),
            _ => Err(AppError::Validation(format!(
                "unknown resource type '{value}'"
            ))),
        }
    }
}

/// Which instances of a resource type an administrator may see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceAccessMode {
    /// Unrestricted within the granted functional permissions.
    #[default]
    All,
    /// Resource type hidden entirely.
    None,
    /// Only instances created by the administrator.
    Own,
    /// Only instances on an explicit allow-list.
    Custom,
}

impl ResourceAccessMode {
    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::None => "none",
            Self::Own => "own",
            Self::Custom => "custom",
        }
    }

    /// Coerces a transport value into a mode.
    ///
    /// Matching ignores case, surrounding whitespace and `-`/`_` separators.
    /// Unrecognized values become [`ResourceAccessMode::All`].
    #[must_use]
    pub fn normalize(value: &str) -> Self {
        let folded: String = value
            .chars()
            .filter(|character| {
                !(character.is_whitespace() || *character == '-' || *character == '_')
            })
            .flat_map(char::to_lowercase)
            .collect();

        match folded.as_str() {
            "none" => Self::None,
            "own" => Self::Own,
            "custom" => Self::Custom,
            _ => Self::All,
        }
    }
}

impl Display for ResourceAccessMode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One selectable instance of a resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCatalogEntry {
    /// Backend identifier.
    pub id: String,
    /// Primary display name.
    pub name: String,
    /// Secondary display text, empty when unavailable.
    pub description: String,
}

impl ResourceCatalogEntry {
    /// Creates an entry, falling back to the id when the name is blank.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let id = id.into().trim().to_owned();
        let name = name.into().trim().to_owned();
        let name = if name.is_empty() { id.clone() } else { name };

        Self {
            id,
            name,
            description: description.into().trim().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{ResourceAccessMode, ResourceCatalogEntry, ResourceType};

    #[test]
    fn resource_type_roundtrip_storage_value() {
        for resource_type in ResourceType::all() {
            assert_eq!(
                ResourceType::from_str(resource_type.as_str()).ok(),
                Some(*resource_type)
            );
        }
    }

    #[test]
    fn resource_type_parse_is_case_insensitive() {
        assert_eq!(
            ResourceType::from_str(" Policies ").ok(),
            Some(ResourceType::Policies)
        );
        assert!(ResourceType::from_str("devices").is_err());
    }

    #[test]
    fn mode_normalization_ignores_case_and_separators() {
        assert_eq!(ResourceAccessMode::normalize("CUSTOM"), ResourceAccessMode::Custom);
        assert_eq!(ResourceAccessMode::normalize(" Own "), ResourceAccessMode::Own);
        assert_eq!(ResourceAccessMode::normalize("no-ne"), ResourceAccessMode::None);
        assert_eq!(ResourceAccessMode::normalize("cus_tom"), ResourceAccessMode::Custom);
    }

    #[test]
    fn unknown_modes_coerce_to_all() {
        assert_eq!(ResourceAccessMode::normalize("Owner-Scope"), ResourceAccessMode::All);
        assert_eq!(ResourceAccessMode::normalize(""), ResourceAccessMode::All);
    }

    #[test]
    fn catalog_entry_name_falls_back_to_id() {
        let entry = ResourceCatalogEntry::new(" L1 ", "", "ACME");
        assert_eq!(entry.id, "L1");
        assert_eq!(entry.name, "L1");
    }
}
