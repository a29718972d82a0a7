use super::*;

impl AdminPermissionEditor {
    /// Checks or unchecks one functional permission of the open administrator.
    ///
    /// Returns whether the checklist changed.
    pub fn set_permission_checked(&mut self, key: PermissionKey, checked: bool) -> AppResult<bool> {
        let admin_id = self.require_active()?;
        let checklist = self.checklists.entry(admin_id).or_default();

        Ok(if checked {
            checklist.insert(key)
        } else {
            checklist.remove(&key)
        })
    }

    /// Flips one functional permission of the open administrator.
    ///
    /// Returns the new checked state.
    pub fn toggle_permission(&mut self, key: PermissionKey) -> AppResult<bool> {
        let checked = !self.is_permission_checked(key.as_str());
        self.set_permission_checked(key, checked)?;
        Ok(checked)
    }

    /// Returns whether the open administrator has a permission checked.
    #[must_use]
    pub fn is_permission_checked(&self, key: &str) -> bool {
        self.active_admin
            .as_ref()
            .and_then(|admin_id| self.checklists.get(admin_id))
            .is_some_and(|checklist| checklist.iter().any(|checked| checked.as_str() == key))
    }

    /// Sets the access mode of one resource type for the open administrator.
    pub fn set_resource_mode(
        &mut self,
        resource_type: ResourceType,
        mode: ResourceAccessMode,
    ) -> AppResult<()> {
        let admin_id = self.require_active()?;
        self.store.set_mode(&admin_id, resource_type, mode);
        Ok(())
    }

    /// Adds or removes one allow-list id for the open administrator.
    ///
    /// Returns `false` without changing anything unless the type is in
    /// custom mode.
    pub fn toggle_resource_selection(
        &mut self,
        resource_type: ResourceType,
        item_id: &str,
    ) -> AppResult<bool> {
        let admin_id = self.require_active()?;
        Ok(self.store.toggle_selection(&admin_id, resource_type, item_id))
    }

    /// Returns the open administrator's policy for one resource type.
    #[must_use]
    pub fn resource_policy(&self, resource_type: ResourceType) -> Option<ResourceAccessPolicy> {
        self.active_admin
            .as_ref()
            .map(|admin_id| self.store.policy(admin_id, resource_type))
    }

    /// Returns the in-memory resource policies of an administrator.
    #[must_use]
    pub fn resource_permissions(&self, admin_id: &AdminId) -> Option<&AdminResourcePermissions> {
        self.store.state(admin_id)
    }

    /// Returns whether an administrator's resource policies came from the backend.
    #[must_use]
    pub fn is_loaded_from_server(&self, admin_id: &AdminId) -> bool {
        self.store.is_loaded_from_server(admin_id)
    }

    /// Lists the items offered for a custom allow-list.
    ///
    /// Returns `None` unless the open administrator has the type in custom
    /// mode; the resource catalog is only fetched in that case.
    pub async fn custom_selection(
        &self,
        resource_type: ResourceType,
        search_term: &str,
    ) -> Option<CustomSelectionView> {
        let policy = self.resource_policy(resource_type)?;
        if policy.mode() != ResourceAccessMode::Custom {
            return None;
        }

        let snapshot = self.resource_catalog.get(resource_type, false).await;
        let visible_items = filtered_catalog_items(&snapshot.items, search_term)
            .into_iter()
            .cloned()
            .collect();

        Some(CustomSelectionView {
            snapshot,
            visible_items,
            selected_ids: policy.selected_ids().clone(),
        })
    }

    /// Returns the checked functional permissions of an administrator.
    ///
    /// With the catalog loaded the keys follow catalog order and unknown keys
    /// are dropped; otherwise every checked key is returned sorted.
    pub async fn collect_functional_permissions(&self, admin_id: &AdminId) -> Vec<PermissionKey> {
        let Some(checklist) = self.checklists.get(admin_id) else {
            return Vec::new();
        };

        match self.permission_catalog.catalog().await {
            Some(catalog) => catalog
                .entries()
                .iter()
                .map(PermissionDefinition::key)
                .filter(|key| checklist.contains(*key))
                .cloned()
                .collect(),
            None => checklist.iter().cloned().collect(),
        }
    }
}
