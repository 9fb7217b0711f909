//! Session state threaded between steps

use crate::api::protocol::LoginData;

/// Credentials of the account the run is using
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

impl Account {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: None,
        }
    }

    /// A fresh account whose names are unique per second
    pub fn generated(timestamp: u64, password: impl Into<String>) -> Self {
        Self {
            username: format!("test_user_{}", timestamp),
            password: password.into(),
            email: Some(format!("test_{}@example.com", timestamp)),
        }
    }
}

/// Tokens and ids collected during one run
#[derive(Debug, Default)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_id: Option<String>,
    pub channel_id: Option<String>,
    pub message_id: Option<String>,
    /// Account the tokens belong to
    pub account: Option<Account>,
}

/// Server-issued value, or `None` when the server sent an empty string
pub fn filled(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Whether a session value is absent or empty
pub fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().unwrap_or_default().is_empty()
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.bearer().is_some()
    }

    /// Token to send as bearer auth, if any
    pub fn bearer(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Store the result of a successful login
    ///
    /// Empty tokens or ids are stored as missing.
    pub fn apply_login(&mut self, mut account: Account, data: &LoginData) {
        self.access_token = filled(&data.access_token);
        self.refresh_token = filled(&data.refresh_token);
        self.user_id = filled(&data.user.id);
        if data.user.email.is_some() {
            account.email = data.user.email.clone();
        }
        self.account = Some(account);
    }

    /// Record the password set by a successful change
    pub fn update_password(&mut self, password: &str) {
        if let Some(account) = self.account.as_mut() {
            account.password = password.to_string();
        }
    }

    /// Forget the access token; other state survives logout
    pub fn logout(&mut self) {
        self.access_token = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::protocol::LoginUser;

    fn login_data() -> LoginData {
        LoginData {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: None,
            user: LoginUser {
                id: "7".to_string(),
                email: Some("server@example.com".to_string()),
            },
        }
    }

    #[test]
    fn test_generated_account_is_timestamped() {
        let account = Account::generated(1700000000, "pw");
        assert_eq!(account.username, "test_user_1700000000");
        assert_eq!(account.email.as_deref(), Some("test_1700000000@example.com"));
        assert_eq!(account.password, "pw");
    }

    #[test]
    fn test_apply_login_populates_everything() {
        let mut session = Session::default();
        session.apply_login(Account::new("alice", "pw"), &login_data());

        assert_eq!(session.bearer(), Some("a"));
        assert_eq!(session.refresh_token.as_deref(), Some("r"));
        assert_eq!(session.user_id.as_deref(), Some("7"));
        let account = session.account.as_ref().unwrap();
        assert_eq!(account.email.as_deref(), Some("server@example.com"));
    }

    #[test]
    fn test_empty_login_values_count_as_missing() {
        let mut data = login_data();
        data.access_token = String::new();
        data.refresh_token = String::new();
        data.user.id = String::new();

        let mut session = Session::default();
        session.apply_login(Account::new("alice", "pw"), &data);

        assert!(!session.is_authenticated());
        assert_eq!(session.bearer(), None);
        assert!(session.refresh_token.is_none());
        assert!(session.user_id.is_none());
    }

    #[test]
    fn test_blank_values() {
        assert!(is_blank(&None));
        assert!(is_blank(&Some(String::new())));
        assert!(!is_blank(&Some("c".to_string())));

        let session = Session {
            access_token: Some(String::new()),
            ..Session::default()
        };
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_logout_clears_access_token_only() {
        let mut session = Session::default();
        session.apply_login(Account::new("alice", "pw"), &login_data());
        session.channel_id = Some("c".to_string());

        session.logout();

        assert!(!session.is_authenticated());
        assert_eq!(session.bearer(), None);
        assert_eq!(session.refresh_token.as_deref(), Some("r"));
        assert_eq!(session.channel_id.as_deref(), Some("c"));
    }

    #[test]
    fn test_update_password() {
        let mut session = Session::default();
        session.update_password("ignored");
        assert!(session.account.is_none());

        session.apply_login(Account::new("alice", "old"), &login_data());
        session.update_password("new");
        assert_eq!(session.account.unwrap().password, "new");
    }
}
