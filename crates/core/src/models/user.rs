//! User accounts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, Role, UserId};
use crate::validation::{self, ValidationError};

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 50;

/// A registered account.
///
/// The password hash is opaque to the storage layer and never serialized.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Insert shape for [`User`].
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: Email,
    /// Already hashed by the caller.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    /// `None` stores [`Role::Customer`].
    #[serde(default)]
    pub role: Option<Role>,
}

impl NewUser {
    /// Check name lengths. The email is validated by its type.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::length("firstName", &self.first_name, NAME_MIN, Some(NAME_MAX))?;
        validation::length("lastName", &self.last_name, NAME_MIN, Some(NAME_MAX))
    }

    /// The role that will be stored.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role.unwrap_or_default()
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("role", &self.role)
            .finish()
    }
}

/// Partial update for [`User`]. Absent fields are left unchanged.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub email: Option<Email>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
}

impl UserUpdate {
    /// Apply the [`NewUser`] rules to every present field.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(first_name) = &self.first_name {
            validation::length("firstName", first_name, NAME_MIN, Some(NAME_MAX))?;
        }
        if let Some(last_name) = &self.last_name {
            validation::length("lastName", last_name, NAME_MIN, Some(NAME_MAX))?;
        }
        Ok(())
    }

    /// Copy every present field onto `user`.
    pub fn apply_to(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(password_hash) = self.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }
}

impl fmt::Debug for UserUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserUpdate")
            .field("email", &self.email)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "[REDACTED]"),
            )
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("role", &self.role)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            email: Email::parse("ada@example.com").unwrap(),
            password_hash: "$argon2id$hash".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            role: None,
        }
    }

    #[test]
    fn test_role_defaults_to_customer() {
        assert_eq!(new_user().role(), Role::Customer);
    }

    #[test]
    fn test_name_bounds() {
        assert!(new_user().validate().is_ok());

        let short = NewUser {
            first_name: "A".to_owned(),
            ..new_user()
        };
        assert_eq!(short.validate().unwrap_err().field(), "firstName");

        let long = NewUser {
            last_name: "x".repeat(51),
            ..new_user()
        };
        assert_eq!(long.validate().unwrap_err().field(), "lastName");
    }

    #[test]
    fn test_debug_redacts_password_hash() {
        let debug = format!("{:?}", new_user());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("argon2id"));
    }

    #[test]
    fn test_serialize_omits_password_hash() {
        let user = User {
            id: UserId::new(1),
            email: Email::parse("ada@example.com").unwrap(),
            password_hash: "$argon2id$hash".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            role: Role::Customer,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["role"], "customer");
    }

    #[test]
    fn test_update_validates_present_fields_only() {
        assert!(UserUpdate::default().validate().is_ok());
        let update = UserUpdate {
            last_name: Some("L".to_owned()),
            ..UserUpdate::default()
        };
        assert!(update.validate().is_err());
    }
}
