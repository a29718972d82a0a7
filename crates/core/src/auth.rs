use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AdminId, AppError};

/// Role of an administrator account on the license backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Always holds every functional and resource permission.
    SuperAdmin,
    /// Sub-administrator restricted by assigned permissions.
    Admin,
}

impl AdminRole {
    /// Returns the stable transport value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
        }
    }

    /// Returns whether the role bypasses permission checks.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin)
    }
}

impl FromStr for AdminRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "super_admin" | "superadmin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            other => Err(AppError::Validation(format!(
                "unknown admin role '{other}'"
            ))),
        }
    }
}

/// Administrator account information returned by the admin directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    admin_id: AdminId,
    username: String,
    email: Option<String>,
    role: AdminRole,
}

impl AdminIdentity {
    /// Creates an administrator identity.
    #[must_use]
    pub fn new(
        admin_id: AdminId,
        username: impl Into<String>,
        email: Option<String>,
        role: AdminRole,
    ) -> Self {
        let email = email.and_then(|value| {
            let trimmed = value.trim().to_owned();
            (!trimmed.is_empty()).then_some(trimmed)
        });

        Self {
            admin_id,
            username: username.into(),
            email,
            role,
        }
    }

    /// Returns the backend identifier.
    #[must_use]
    pub fn admin_id(&self) -> &AdminId {
        &self.admin_id
    }

    /// Returns the login name.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Returns the email, if one is on file.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the account role.
    #[must_use]
    pub fn role(&self) -> AdminRole {
        self.role
    }
}
