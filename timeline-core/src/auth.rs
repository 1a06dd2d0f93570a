//! Who is looking at the page and what the auth provider's errors mean to them.

use serde::{Deserialize, Serialize};

use crate::rate_limit::LocalStore;

/// Local storage flag set by the "continue as guest" button.
pub const GUEST_MODE_KEY: &str = "guestMode";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Session {
    /// Not signed in and not browsing as a guest; pages redirect to login.
    #[default]
    Anonymous,
    Guest,
    Member { uid: String, email: String },
}

impl Session {
    /// Resolves the session from the provider's user (if any) and the guest flag.
    pub fn resolve(user: Option<(String, String)>, store: &impl LocalStore) -> Self {
        let guest = store.get(GUEST_MODE_KEY).as_deref() == Some("true");
        match (guest, user) {
            (true, _) => Session::Guest,
            (false, Some((uid, email))) => Session::Member { uid, email },
            (false, None) => Session::Anonymous,
        }
    }

    pub fn enter_guest_mode(store: &mut impl LocalStore) -> Self {
        store.set(GUEST_MODE_KEY, "true");
        Session::Guest
    }

    /// Signing in or out drops the guest flag.
    pub fn clear_guest_mode(store: &mut impl LocalStore) {
        store.remove(GUEST_MODE_KEY);
    }

    pub fn uid(&self) -> Option<&str> {
        match self {
            Session::Member { uid, .. } => Some(uid),
            _ => None,
        }
    }

    pub fn can_write(&self) -> bool {
        matches!(self, Session::Member { .. })
    }

    pub fn needs_login(&self) -> bool {
        matches!(self, Session::Anonymous)
    }

    /// Name stored on comments: the e-mail local part.
    pub fn display_name(&self) -> Option<String> {
        match self {
            Session::Member { email, .. } => Some(display_name_from_email(email)),
            _ => None,
        }
    }
}

pub fn display_name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_string()
}

/// Sign-in failure reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("No account found with this email. Contact an admin to create an account.")]
    UserNotFound,
    #[error("Incorrect password. Please try again.")]
    WrongPassword,
    #[error("Invalid email address format.")]
    InvalidEmail,
    #[error("Too many failed attempts. Account temporarily locked by Firebase. Please try again later.")]
    ProviderThrottled,
    #[error("Network error. Check your internet connection.")]
    Network,
    #[error("Login failed. Please try again.")]
    Other(String),
}

impl AuthFailure {
    pub fn from_code(code: &str) -> Self {
        match code {
            "auth/user-not-found" => AuthFailure::UserNotFound,
            "auth/wrong-password" => AuthFailure::WrongPassword,
            "auth/invalid-email" => AuthFailure::InvalidEmail,
            "auth/too-many-requests" => AuthFailure::ProviderThrottled,
            "auth/network-request-failed" => AuthFailure::Network,
            other => AuthFailure::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::MemoryStore;

    #[test]
    fn guest_flag_wins_over_user() {
        let mut store = MemoryStore::default();
        assert_eq!(Session::resolve(None, &store), Session::Anonymous);

        Session::enter_guest_mode(&mut store);
        let session = Session::resolve(Some(("u1".into(), "ann@example.com".into())), &store);
        assert_eq!(session, Session::Guest);
        assert!(!session.can_write());

        Session::clear_guest_mode(&mut store);
        let session = Session::resolve(Some(("u1".into(), "ann@example.com".into())), &store);
        assert_eq!(session.uid(), Some("u1"));
        assert_eq!(session.display_name().as_deref(), Some("ann"));
        assert!(session.can_write());
    }

    #[test]
    fn maps_provider_codes() {
        assert_eq!(
            AuthFailure::from_code("auth/wrong-password").to_string(),
            "Incorrect password. Please try again."
        );
        assert_eq!(
            AuthFailure::from_code("auth/internal-error").to_string(),
            "Login failed. Please try again."
        );
    }
}
