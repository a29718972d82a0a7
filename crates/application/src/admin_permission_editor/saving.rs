use super::*;

impl AdminPermissionEditor {
    /// Saves an administrator's checklist and resource policies.
    ///
    /// Only administrators with an edit buffer from [`Self::load_for_admin`]
    /// can be saved. Super-administrators are refused before any request is
    /// sent. On success the backend echo replaces local state; on failure
    /// every local edit is kept so the save can be retried.
    pub async fn save(&mut self, admin_id: &AdminId) -> AppResult<AdminPermissionsEcho> {
        if self
            .profiles
            .get(admin_id)
            .is_some_and(|profile| profile.identity.role().is_super_admin())
        {
            return Err(AppError::Forbidden(format!(
                "super administrator '{admin_id}' holds every permission and cannot be edited"
            )));
        }

        if !self.checklists.contains_key(admin_id) || self.store.state(admin_id).is_none() {
            return Err(AppError::Validation(format!(
                "administrator '{admin_id}' has no edits to save; open it for editing first"
            )));
        }

        let input = UpdateAdminPermissionsInput {
            permissions: self.collect_functional_permissions(admin_id).await,
            resource_permissions: self.store.serialize(admin_id),
        };

        let echo = match self
            .admin_repository
            .update_admin_permissions(admin_id, input)
            .await
        {
            Ok(echo) => echo,
            Err(error) => {
                warn!(admin_id = %admin_id, error = %error, "failed to save admin permissions");
                return Err(error);
            }
        };

        self.adopt_echo(admin_id, &echo);
        info!(
            admin_id = %admin_id,
            permissions = echo.permissions.len(),
            "admin permissions saved"
        );

        Ok(echo)
    }

    fn adopt_echo(&mut self, admin_id: &AdminId, echo: &AdminPermissionsEcho) {
        self.store.hydrate(admin_id, &echo.resource_permissions);
        self.checklists.insert(
            admin_id.clone(),
            echo.permissions.iter().cloned().collect(),
        );

        if let Some(profile) = self.profiles.get_mut(admin_id) {
            profile.permissions = echo.permissions.clone();
            profile.resource_permissions = Some(echo.resource_permissions.clone());
        }
    }
}
