use std::fmt;

use keydesk_domain::{
    AdminResourcePermissions, PermissionCatalog, PermissionKey, ResourceAccessMode,
    ResourceAccessPolicy, ResourceCatalogEntry, ResourceType,
};

/// Number of permission labels shown before collapsing into an overflow badge.
pub const DEFAULT_VISIBLE_PERMISSIONS: usize = 3;

/// Returns the display label of an access mode.
#[must_use]
pub fn mode_label(mode: ResourceAccessMode) -> &'static str {
    match mode {
        ResourceAccessMode::All => "All items",
        ResourceAccessMode::None => "No access",
        ResourceAccessMode::Own => "Own items only",
        ResourceAccessMode::Custom => "Selected items",
    }
}

/// Short description of one resource policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSummary {
    /// Label of the policy mode.
    pub mode_label: &'static str,
    /// Mode-specific detail, empty when there is nothing to add.
    pub detail: String,
}

/// Summarizes one resource policy.
#[must_use]
pub fn resource_summary(policy: &ResourceAccessPolicy) -> ResourceSummary {
    let detail = match policy.mode() {
        ResourceAccessMode::All => String::new(),
        ResourceAccessMode::None => "Blocked".to_owned(),
        ResourceAccessMode::Own => "Created by this administrator".to_owned(),
        ResourceAccessMode::Custom => format!("{} selected", policy.selected_ids().len()),
    };

    ResourceSummary {
        mode_label: mode_label(policy.mode()),
        detail,
    }
}

/// Resource summary tagged with its resource type, for badge rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeSummary {
    /// Resource type summarized.
    pub resource_type: ResourceType,
    /// Summary of the type's policy.
    pub summary: ResourceSummary,
}

impl fmt::Display for ResourceTypeSummary {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}: {}",
            self.resource_type.summary_label(),
            self.summary.mode_label
        )?;
        if !self.summary.detail.is_empty() {
            write!(formatter, " ({})", self.summary.detail)?;
        }
        Ok(())
    }
}

/// Summarizes every resource type of one administrator, in type order.
#[must_use]
pub fn resource_type_summaries(permissions: &AdminResourcePermissions) -> Vec<ResourceTypeSummary> {
    permissions
        .iter()
        .map(|(resource_type, policy)| ResourceTypeSummary {
            resource_type,
            summary: resource_summary(policy),
        })
        .collect()
}

/// Compact description of an administrator's functional permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSummary {
    /// Super-administrators hold every permission implicitly.
    AllPermissions,
    /// No functional permission is granted.
    NoPermissions,
    /// First labels to show, plus how many were left out.
    Labels {
        /// Visible labels in input order.
        labels: Vec<String>,
        /// Count of hidden permissions.
        overflow: usize,
    },
}

impl PermissionSummary {
    /// Returns the `+N` badge for hidden permissions, if any are hidden.
    #[must_use]
    pub fn overflow_badge(&self) -> Option<String> {
        match self {
            Self::Labels { overflow, .. } if *overflow > 0 => Some(format!("+{overflow}")),
            Self::AllPermissions | Self::NoPermissions | Self::Labels { .. } => None,
        }
    }
}

impl fmt::Display for PermissionSummary {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllPermissions => formatter.write_str("All permissions"),
            Self::NoPermissions => formatter.write_str("No permissions"),
            Self::Labels { labels, .. } => {
                formatter.write_str(&labels.join(", "))?;
                if let Some(badge) = self.overflow_badge() {
                    write!(formatter, " {badge}")?;
                }
                Ok(())
            }
        }
    }
}

/// Summarizes functional permissions, using catalog labels where known.
#[must_use]
pub fn permission_summary(
    keys: &[PermissionKey],
    is_super_admin: bool,
    catalog: Option<&PermissionCatalog>,
    visible_limit: usize,
) -> PermissionSummary {
    if is_super_admin {
        return PermissionSummary::AllPermissions;
    }
    if keys.is_empty() {
        return PermissionSummary::NoPermissions;
    }

    let labels = keys
        .iter()
        .take(visible_limit)
        .map(|key| {
            catalog
                .and_then(|catalog| catalog.label_for(key.as_str()))
                .unwrap_or(key.as_str())
                .to_owned()
        })
        .collect::<Vec<_>>();

    PermissionSummary::Labels {
        overflow: keys.len() - labels.len(),
        labels,
    }
}

/// Filters catalog items by a case-insensitive substring of name or description.
///
/// A blank term keeps every item.
#[must_use]
pub fn filtered_catalog_items<'a>(
    items: &'a [ResourceCatalogEntry],
    term: &str,
) -> Vec<&'a ResourceCatalogEntry> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }

    items
        .iter()
        .filter(|item| {
            item.name.to_lowercase().contains(&needle)
                || item.description.to_lowercase().contains(&needle)
        })
        .collect()
}
