use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::resource::{ResourceAccessMode, ResourceType};

/// Transport shape of one resource access policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePolicyPayload {
    /// Access mode as sent or stored by the backend.
    #[serde(default)]
    pub mode: String,
    /// Allow-listed instance ids.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub selected_ids: Vec<String>,
}

impl ResourcePolicyPayload {
    /// Creates a payload from a mode and ids.
    #[must_use]
    pub fn new<I, S>(mode: impl Into<String>, selected_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: mode.into(),
            selected_ids: selected_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Transport shape of all resource access policies of one administrator.
pub type ResourcePermissionsPayload = BTreeMap<String, ResourcePolicyPayload>;

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Access policy of one administrator for one resource type.
///
/// The selection is always empty unless the mode is [`ResourceAccessMode::Custom`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceAccessPolicy {
    mode: ResourceAccessMode,
    selected_ids: BTreeSet<String>,
}

impl ResourceAccessPolicy {
    /// Creates a policy. Ids are trimmed, blank ids dropped, and the whole
    /// selection is ignored for modes other than custom.
    #[must_use]
    pub fn new<I, S>(mode: ResourceAccessMode, selected_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected_ids = if mode == ResourceAccessMode::Custom {
            selected_ids
                .into_iter()
                .filter_map(|id| {
                    let trimmed = id.as_ref().trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_owned())
                })
                .collect()
        } else {
            BTreeSet::new()
        };

        Self { mode, selected_ids }
    }

    /// Builds a policy from its transport shape, normalizing the mode.
    #[must_use]
    pub fn from_payload(payload: &ResourcePolicyPayload) -> Self {
        Self::new(
            ResourceAccessMode::normalize(payload.mode.as_str()),
            &payload.selected_ids,
        )
    }

    /// Returns the transport shape with ids in ascending order.
    #[must_use]
    pub fn to_payload(&self) -> ResourcePolicyPayload {
        ResourcePolicyPayload::new(self.mode.as_str(), self.selected_ids.iter().cloned())
    }

    /// Returns the access mode.
    #[must_use]
    pub fn mode(&self) -> ResourceAccessMode {
        self.mode
    }

    /// Returns the allow-list.
    #[must_use]
    pub fn selected_ids(&self) -> &BTreeSet<String> {
        &self.selected_ids
    }

    /// Returns whether an id is allow-listed.
    #[must_use]
    pub fn is_selected(&self, item_id: &str) -> bool {
        self.selected_ids.contains(item_id.trim())
    }

    /// Changes the mode. Any mode other than custom clears the selection, so
    /// re-entering custom always starts from an empty allow-list.
    pub fn set_mode(&mut self, mode: ResourceAccessMode) {
        self.mode = mode;
        if mode != ResourceAccessMode::Custom {
            self.selected_ids.clear();
        }
    }

    /// Adds or removes an id from the allow-list.
    ///
    /// Returns `false` without touching the policy when the mode is not
    /// custom or the id is blank.
    pub fn toggle_selection(&mut self, item_id: &str) -> bool {
        let item_id = item_id.trim();
        if self.mode != ResourceAccessMode::Custom || item_id.is_empty() {
            return false;
        }

        if !self.selected_ids.remove(item_id) {
            self.selected_ids.insert(item_id.to_owned());
        }

        true
    }

    /// Previews whether an administrator holding this policy may access one
    /// instance.
    #[must_use]
    pub fn allows(&self, resource_id: &str, owner_id: &str, admin_id: &str) -> bool {
        match self.mode {
            ResourceAccessMode::All => true,
            ResourceAccessMode::None => false,
            ResourceAccessMode::Own => {
                let admin_id = admin_id.trim();
                !admin_id.is_empty() && owner_id.trim().eq_ignore_ascii_case(admin_id)
            }
            ResourceAccessMode::Custom => {
                let resource_id = resource_id.trim();
                self.selected_ids
                    .iter()
                    .any(|selected| selected.eq_ignore_ascii_case(resource_id))
            }
        }
    }
}

/// Resource access policies of one administrator, one per resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminResourcePermissions {
    policies: BTreeMap<ResourceType, ResourceAccessPolicy>,
}

impl Default for AdminResourcePermissions {
    fn default() -> Self {
        Self {
            policies: ResourceType::all()
                .iter()
                .map(|resource_type| (*resource_type, ResourceAccessPolicy::default()))
                .collect(),
        }
    }
}

impl AdminResourcePermissions {
    /// Builds policies from backend data.
    ///
    /// Every known type is read independently: missing types reset to the
    /// default and unknown type keys are ignored.
    #[must_use]
    pub fn from_payload(payload: &ResourcePermissionsPayload) -> Self {
        let policies = ResourceType::all()
            .iter()
            .map(|resource_type| {
                let policy = payload
                    .get(resource_type.as_str())
                    .or_else(|| {
                        payload.iter().find_map(|(key, value)| {
                            (ResourceType::from_str(key).ok() == Some(*resource_type))
                                .then_some(value)
                        })
                    })
                    .map(ResourceAccessPolicy::from_payload)
                    .unwrap_or_default();
                (*resource_type, policy)
            })
            .collect();

        Self { policies }
    }

    /// Returns the transport shape for every resource type.
    #[must_use]
    pub fn to_payload(&self) -> ResourcePermissionsPayload {
        self.policies
            .iter()
            .map(|(resource_type, policy)| (resource_type.as_str().to_owned(), policy.to_payload()))
            .collect()
    }

    /// Returns the policy for one type.
    #[must_use]
    pub fn policy(&self, resource_type: ResourceType) -> &ResourceAccessPolicy {
        self.policies
            .get(&resource_type)
            .unwrap_or_else(|| default_policy())
    }

    /// Iterates policies in resource type order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceType, &ResourceAccessPolicy)> {
        self.policies
            .iter()
            .map(|(resource_type, policy)| (*resource_type, policy))
    }

    /// Changes the mode for one type; see [`ResourceAccessPolicy::set_mode`].
    pub fn set_mode(&mut self, resource_type: ResourceType, mode: ResourceAccessMode) {
        self.policies.entry(resource_type).or_default().set_mode(mode);
    }

    /// Toggles one allow-list id; see [`ResourceAccessPolicy::toggle_selection`].
    pub fn toggle_selection(&mut self, resource_type: ResourceType, item_id: &str) -> bool {
        self.policies
            .entry(resource_type)
            .or_default()
            .toggle_selection(item_id)
    }
}

fn default_policy() -> &'static ResourceAccessPolicy {
    static DEFAULT: ResourceAccessPolicy = ResourceAccessPolicy {
        mode: ResourceAccessMode::All,
        selected_ids: BTreeSet::new(),
    };

    &DEFAULT
}

/// Coerces backend policy data into its canonical form: every known type
/// present, valid lowercase modes, trimmed unique sorted ids only for custom.
#[must_use]
pub fn normalize_resource_permissions(
    payload: &ResourcePermissionsPayload,
) -> ResourcePermissionsPayload {
    AdminResourcePermissions::from_payload(payload).to_payload()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{
        AdminResourcePermissions, ResourceAccessPolicy, ResourcePermissionsPayload,
        ResourcePolicyPayload, normalize_resource_permissions,
    };
    use crate::resource::{ResourceAccessMode, ResourceType};

    #[test]
    fn leaving_custom_clears_selection() {
        let mut policy = ResourceAccessPolicy::new(ResourceAccessMode::Custom, ["L1", "L2"]);
        policy.set_mode(ResourceAccessMode::Own);

        assert_eq!(policy.mode(), ResourceAccessMode::Own);
        assert!(policy.selected_ids().is_empty());

        policy.set_mode(ResourceAccessMode::Custom);
        assert!(policy.selected_ids().is_empty());
    }

    #[test]
    fn toggle_outside_custom_leaves_policy_unchanged() {
        let mut policy = ResourceAccessPolicy::new(ResourceAccessMode::None, ["ignored"]);
        let before = policy.clone();

        assert!(!policy.toggle_selection("L1"));
        assert_eq!(policy, before);
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut policy =
            ResourceAccessPolicy::new(ResourceAccessMode::Custom, Vec::<String>::new());

        assert!(policy.toggle_selection(" L1 "));
        assert!(policy.is_selected("L1"));
        assert!(policy.toggle_selection("L1"));
        assert!(policy.selected_ids().is_empty());
    }

    #[test]
    fn non_custom_constructor_drops_ids() {
        let policy = ResourceAccessPolicy::new(ResourceAccessMode::All, ["L1"]);
        assert!(policy.selected_ids().is_empty());
    }

    #[test]
    fn allows_follows_mode() {
        let custom = ResourceAccessPolicy::new(ResourceAccessMode::Custom, ["abc"]);
        assert!(custom.allows(" ABC ", "", "admin-1"));
        assert!(!custom.allows("def", "", "admin-1"));

        let own = ResourceAccessPolicy::new(ResourceAccessMode::Own, Vec::<String>::new());
        assert!(own.allows("x", "Admin-1", "admin-1"));
        assert!(!own.allows("x", "admin-2", "admin-1"));
        assert!(!own.allows("x", "", " "));

        let none = ResourceAccessPolicy::new(ResourceAccessMode::None, Vec::<String>::new());
        assert!(!none.allows("x", "admin-1", "admin-1"));
        assert!(ResourceAccessPolicy::default().allows("x", "", ""));
    }

    #[test]
    fn from_payload_replaces_per_type_and_ignores_unknown_keys() {
        let payload = ResourcePermissionsPayload::from([
            (
                "Licenses".to_owned(),
                ResourcePolicyPayload::new("custom", ["L2", " L1 ", "", "L2"]),
            ),
            ("devices".to_owned(), ResourcePolicyPayload::new("none", Vec::<String>::new())),
        ]);

        let permissions = AdminResourcePermissions::from_payload(&payload);
        let licenses = permissions.policy(ResourceType::Licenses);
        assert_eq!(licenses.mode(), ResourceAccessMode::Custom);
        assert_eq!(
            licenses.selected_ids().iter().cloned().collect::<Vec<_>>(),
            vec!["L1".to_owned(), "L2".to_owned()]
        );
        assert_eq!(
            permissions.policy(ResourceType::Products),
            &ResourceAccessPolicy::default()
        );
        assert_eq!(permissions.to_payload().len(), ResourceType::all().len());
    }

    #[test]
    fn null_selected_ids_deserialize_as_empty() {
        let payload: Result<ResourcePolicyPayload, _> =
            serde_json::from_str(r#"{"mode":"own","selected_ids":null}"#);
        assert_eq!(
            payload.ok(),
            Some(ResourcePolicyPayload::new("own", Vec::<String>::new()))
        );
    }

    fn mode_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("all".to_owned()),
            Just("NONE".to_owned()),
            Just("Own".to_owned()),
            Just("cus-tom".to_owned()),
            Just("custom".to_owned()),
            "[a-zA-Z_ -]{0,12}",
        ]
    }

    fn payload_strategy() -> impl Strategy<Value = ResourcePermissionsPayload> {
        let key = prop_oneof![
            Just("licenses".to_owned()),
            Just("policies".to_owned()),
            Just("products".to_owned()),
            Just("devices".to_owned()),
        ];
        let policy = (mode_strategy(), proptest::collection::vec("[ A-Za-z0-9]{0,6}", 0..6))
            .prop_map(|(mode, ids)| ResourcePolicyPayload::new(mode, ids));

        proptest::collection::btree_map(key, policy, 0..4)
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(payload in payload_strategy()) {
            let normalized = normalize_resource_permissions(&payload);
            prop_assert_eq!(normalize_resource_permissions(&normalized), normalized.clone());
        }

        #[test]
        fn normalized_payloads_only_carry_ids_for_custom(payload in payload_strategy()) {
            for policy in normalize_resource_permissions(&payload).values() {
                prop_assert!(policy.mode == "custom" || policy.selected_ids.is_empty());
                let mode = ResourceAccessMode::normalize(policy.mode.as_str());
                prop_assert_eq!(mode.as_str(), policy.mode.as_str());
            }
        }
    }
}
