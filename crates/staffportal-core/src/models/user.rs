use serde::{Deserialize, Serialize};

/// The signed-in staff member, as returned by login and verify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(rename = "companyId")]
    pub company_id: i64,
}

impl UserIdentity {
    /// "First Last", or the email when no name is on file
    pub fn display_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }

    /// Up to two uppercase initials for avatar badges
    pub fn initials(&self) -> String {
        let first = self.first_name.as_deref().and_then(|s| s.chars().next());
        let last = self.last_name.as_deref().and_then(|s| s.chars().next());
        match (first, last) {
            (None, None) => self
                .email
                .chars()
                .next()
                .map(|c| c.to_uppercase().collect())
                .unwrap_or_default(),
            (f, l) => f.into_iter().chain(l).flat_map(char::to_uppercase).collect(),
        }
    }
}

/// Body sent to the mobile login endpoint
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Login response. Both fields are optional on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserIdentity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    pub user: UserIdentity,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: Option<&str>, last: Option<&str>) -> UserIdentity {
        UserIdentity {
            id: "u1".to_string(),
            email: "sam@example.com".to_string(),
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            role: "staff".to_string(),
            company_id: 7,
        }
    }

    #[test]
    fn test_parse_user_identity() {
        let json = r#"{"id":"42","email":"a@b.com","firstName":"Ana","lastName":"Bell","role":"admin","companyId":3}"#;
        let user: UserIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.first_name.as_deref(), Some("Ana"));
        assert_eq!(user.company_id, 3);
    }

    #[test]
    fn test_parse_user_without_names() {
        let json = r#"{"id":"42","email":"a@b.com","role":"staff","companyId":3}"#;
        let user: UserIdentity = serde_json::from_str(json).unwrap();
        assert!(user.first_name.is_none());
        assert_eq!(user.display_name(), "a@b.com");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(user(Some("Sam"), Some("Lee")).display_name(), "Sam Lee");
        assert_eq!(user(Some("Sam"), None).display_name(), "Sam");
        assert_eq!(user(None, None).display_name(), "sam@example.com");
    }

    #[test]
    fn test_initials() {
        assert_eq!(user(Some("sam"), Some("lee")).initials(), "SL");
        assert_eq!(user(None, Some("Lee")).initials(), "L");
        assert_eq!(user(None, None).initials(), "S");
    }

    #[test]
    fn test_login_response_without_token() {
        let resp: LoginResponse = serde_json::from_str(r#"{"message":"ok"}"#).unwrap();
        assert!(resp.token.is_none());
        assert!(resp.user.is_none());
    }
}
