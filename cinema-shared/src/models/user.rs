use serde::{Deserialize, Serialize};

/// Coarse access tier gating which routes a signed-in user may reach.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Role {
    /// Parses a role claim as sent by the backend: case-insensitive, with an
    /// optional Spring-style `ROLE_` prefix.
    pub fn from_claim(claim: &str) -> Option<Self> {
        let upper = claim.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        match name {
            "ADMIN" => Some(Role::Admin),
            "STAFF" => Some(Role::Staff),
            "CUSTOMER" | "USER" => Some(Role::Customer),
            _ => None,
        }
    }

    /// Where a user with this role lands after login or a refused route.
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Staff => "/staff",
            Role::Customer => "/",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Staff => "STAFF",
            Role::Customer => "CUSTOMER",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

/// The signed-in user as persisted under the `user` storage key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_claims() {
        assert_eq!(Role::from_claim("ROLE_ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_claim("staff"), Some(Role::Staff));
        assert_eq!(Role::from_claim("role_customer"), Some(Role::Customer));
        assert_eq!(Role::from_claim("OWNER"), None);
        assert!(Role::Admin > Role::Staff && Role::Staff > Role::Customer);
    }

    #[test]
    fn test_user_record_defaults_to_customer() {
        let user: UserRecord = serde_json::from_str(r#"{"uid":"u1","email":"a@b.c"}"#).unwrap();
        assert_eq!(user.role, Role::Customer);
        assert_eq!(user.role.landing_path(), "/");
    }
}
