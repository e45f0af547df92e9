//! User profile and role model.

use serde::{Deserialize, Serialize};

/// Application role stored on the user's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Operator,
    /// Head of a dusun; data access is scoped to that dusun.
    Kadus,
    #[default]
    Warga,
}

impl Role {
    /// Parse a role name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "operator" => Some(Role::Operator),
            "kadus" => Some(Role::Kadus),
            "warga" => Some(Role::Warga),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Operator => "operator",
            Role::Kadus => "kadus",
            Role::Warga => "warga",
        }
    }

    /// Whether this role may use the admin dashboard at all.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Warga)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the backend `profiles` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nama: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Dusun a kadus is responsible for.
    #[serde(default)]
    pub dusun: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl UserProfile {
    /// Name to show in listings.
    pub fn display_name(&self) -> &str {
        self.nama
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!(Role::parse(" Kadus "), Some(Role::Kadus));
        assert_eq!(Role::parse("root"), None);
        assert_eq!(Role::Admin.to_string(), "admin");
        assert!(!Role::Warga.is_staff());
    }

    #[test]
    fn test_profile_defaults_to_warga() {
        let p: UserProfile = serde_json::from_value(serde_json::json!({"id": "u1"})).unwrap();
        assert_eq!(p.role, Role::Warga);
        assert_eq!(p.display_name(), "u1");
    }
}
