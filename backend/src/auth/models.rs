use serde::{Deserialize, Serialize};

/// The authenticated caller behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
}

/// Per-request session state, derived from the bearer token. Identity is
/// never held in process-global state; every request carries its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn(SessionIdentity),
}

impl SessionState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, SessionState::LoggedIn(_))
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        match self {
            SessionState::LoggedIn(identity) => Some(identity),
            SessionState::LoggedOut => None,
        }
    }

    pub fn is_authorized_to_persist(&self) -> bool {
        self.is_logged_in()
    }

    pub fn is_authorized_to_read_history(&self) -> bool {
        self.is_logged_in()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub name: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: SessionIdentity,
}

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshForm {
    pub refresh_token: String,
}

/// Profile stored under `users/{user_id}` at registration and read back
/// on every sign-in to populate the display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> SessionIdentity {
        SessionIdentity {
            user_id: "uid-1".to_string(),
            email: "a@x.com".to_string(),
            display_name: "Alice".to_string(),
        }
    }

    #[test]
    fn logged_out_callers_may_neither_persist_nor_read_history() {
        let state = SessionState::LoggedOut;
        assert!(!state.is_authorized_to_persist());
        assert!(!state.is_authorized_to_read_history());
        assert!(state.identity().is_none());
    }

    #[test]
    fn logged_in_callers_may_persist_and_read_history() {
        let state = SessionState::LoggedIn(identity());
        assert!(state.is_authorized_to_persist());
        assert!(state.is_authorized_to_read_history());
        assert_eq!(state.identity().unwrap().user_id, "uid-1");
    }
}
