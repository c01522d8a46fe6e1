// ── Session lifecycle ──
//
// An explicit state machine for the client's authentication state. Only
// `Session::apply` moves between states; states without a usable
// credential (`Anonymous`, `Expired`) never hold a token.

use secrecy::{ExposeSecret, SecretString};
use strum::{Display, IntoStaticStr};
use tracing::{debug, info, warn};

use netpulse_api::ApiClient;

use crate::error::CoreError;
use crate::validation::{LoginForm, ResetForm, SignupForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    #[default]
    Anonymous,
    /// A login or a stored-token check is in flight.
    Authenticating,
    Authenticated,
    /// The backend rejected the credential. The user must log in again.
    Expired,
}

impl SessionState {
    pub fn is_authenticated(self) -> bool {
        self == Self::Authenticated
    }

    /// Whether the login view should be shown.
    pub fn needs_login(self) -> bool {
        matches!(self, Self::Anonymous | Self::Expired)
    }
}

/// Transition triggers.
#[derive(Debug, Clone, IntoStaticStr)]
pub enum SessionEvent {
    /// A persisted token was found at startup and is about to be checked.
    TokenLoaded(SecretString),
    LoginStarted,
    LoginSucceeded(SecretString),
    LoginFailed(String),
    CheckPassed,
    CheckFailed(String),
    /// An authenticated request or the stream handshake was refused.
    AuthRejected(String),
    LoggedOut,
}

/// Current state plus the credential that belongs to it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: SessionState,
    token: Option<SecretString>,
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Why the session last left the authenticated path, if it did.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply one event. Events that make no sense in the current state are
    /// rejected and leave the session untouched.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionState, CoreError> {
        use SessionEvent as E;
        use SessionState as S;

        let name: &'static str = (&event).into();
        let next = match (self.state, event) {
            (S::Anonymous | S::Expired, E::TokenLoaded(token)) => {
                self.token = Some(token);
                self.last_error = None;
                S::Authenticating
            }
            (S::Anonymous | S::Expired, E::LoginStarted) => {
                self.last_error = None;
                S::Authenticating
            }
            (S::Authenticating, E::LoginSucceeded(token)) => {
                self.token = Some(token);
                S::Authenticated
            }
            (S::Authenticating, E::LoginFailed(message)) => {
                self.token = None;
                self.last_error = Some(message);
                S::Anonymous
            }
            (S::Authenticating, E::CheckPassed) if self.token.is_some() => S::Authenticated,
            (S::Authenticating, E::CheckFailed(message))
            | (S::Authenticating | S::Authenticated, E::AuthRejected(message)) => {
                self.token = None;
                self.last_error = Some(message);
                S::Expired
            }
            (_, E::LoggedOut) => {
                self.token = None;
                self.last_error = None;
                S::Anonymous
            }
            (from, _) => {
                return Err(CoreError::InvalidTransition { from, event: name });
            }
        };

        debug!(from = %self.state, to = %next, event = name, "session transition");
        self.state = next;
        Ok(next)
    }
}

// ── Authenticator ────────────────────────────────────────────────────

/// Drives a [`Session`] against the auth endpoints.
///
/// Forms are validated before anything is sent; an invalid form never
/// changes the session state.
pub struct Authenticator {
    client: ApiClient,
    session: Session,
}

impl Authenticator {
    /// `client` must point at the backend; any token it carries is ignored.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Client carrying the current session token, for the network
    /// endpoints.
    pub fn authorized_client(&self) -> Result<ApiClient, CoreError> {
        let token = self.session.token().ok_or(CoreError::NotAuthenticated)?;
        Ok(self.client.authenticated(token)?)
    }

    /// Validate a persisted token with `GET /api/auth/check`.
    ///
    /// Any failure, transport errors included, leaves the session
    /// `Expired`. The returned error tells the caller whether the stored
    /// credential itself was refused.
    pub async fn restore(&mut self, token: SecretString) -> Result<SessionState, CoreError> {
        self.session.apply(SessionEvent::TokenLoaded(token))?;
        let checked = match self.authorized_client() {
            Ok(client) => client.check().await.map_err(CoreError::from),
            Err(e) => Err(e),
        };
        match checked {
            Ok(()) => {
                info!("stored session token accepted");
                self.session.apply(SessionEvent::CheckPassed)
            }
            Err(e) => {
                warn!(error = %e, "stored session token check failed");
                self.session.apply(SessionEvent::CheckFailed(e.to_string()))?;
                Err(e)
            }
        }
    }

    pub async fn login(&mut self, form: &LoginForm) -> Result<SecretString, CoreError> {
        form.validate()?;
        self.session.apply(SessionEvent::LoginStarted)?;
        let result = self.client.login(form.email.trim(), &form.password).await;
        self.finish_login(result)
    }

    pub async fn signup(&mut self, form: &SignupForm) -> Result<SecretString, CoreError> {
        form.validate()?;
        self.session.apply(SessionEvent::LoginStarted)?;
        let result = self
            .client
            .signup(form.email.trim(), &form.password, form.agree_policy)
            .await;
        self.finish_login(result)
    }

    fn finish_login(
        &mut self,
        result: Result<SecretString, netpulse_api::Error>,
    ) -> Result<SecretString, CoreError> {
        match result {
            Ok(token) => {
                self.session
                    .apply(SessionEvent::LoginSucceeded(token.clone()))?;
                info!("logged in");
                Ok(token)
            }
            Err(e) => {
                let core = CoreError::from(e);
                self.session.apply(SessionEvent::LoginFailed(core.to_string()))?;
                Err(core)
            }
        }
    }

    /// Does not touch the session: a reset ends with the user logging in
    /// with the new password.
    pub async fn reset_password(&self, form: &ResetForm) -> Result<(), CoreError> {
        form.validate()?;
        self.client
            .reset_password(&form.reset_token, &form.password)
            .await?;
        Ok(())
    }

    /// Invalidate the token server-side (best effort) and drop it locally.
    pub async fn logout(&mut self) -> Result<(), CoreError> {
        if let Some(token) = self.session.token() {
            let client = self.client.authenticated(token)?;
            if let Err(e) = client.logout().await {
                warn!(error = %e, "server-side logout failed (non-fatal)");
            }
        }
        self.session.apply(SessionEvent::LoggedOut)?;
        Ok(())
    }

    /// Record that an authenticated call was refused.
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<SessionState, CoreError> {
        self.session.apply(SessionEvent::AuthRejected(reason.into()))
    }

    /// Current token, exposed for persistence.
    pub fn token_text(&self) -> Option<&str> {
        self.session.token().map(|t| t.expose_secret())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token() -> SecretString {
        SecretString::from("tok".to_owned())
    }

    #[test]
    fn login_path() {
        let mut s = Session::new();
        assert_eq!(s.apply(SessionEvent::LoginStarted).unwrap(), SessionState::Authenticating);
        assert_eq!(
            s.apply(SessionEvent::LoginSucceeded(token())).unwrap(),
            SessionState::Authenticated
        );
        assert!(s.token().is_some());
    }

    #[test]
    fn failed_login_returns_to_anonymous() {
        let mut s = Session::new();
        s.apply(SessionEvent::LoginStarted).unwrap();
        s.apply(SessionEvent::LoginFailed("bad password".into())).unwrap();
        assert_eq!(s.state(), SessionState::Anonymous);
        assert_eq!(s.last_error(), Some("bad password"));
        assert!(s.token().is_none());
    }

    #[test]
    fn stored_token_check() {
        let mut s = Session::new();
        s.apply(SessionEvent::TokenLoaded(token())).unwrap();
        assert_eq!(s.apply(SessionEvent::CheckPassed).unwrap(), SessionState::Authenticated);

        let mut s = Session::new();
        s.apply(SessionEvent::TokenLoaded(token())).unwrap();
        s.apply(SessionEvent::CheckFailed("401".into())).unwrap();
        assert_eq!(s.state(), SessionState::Expired);
        assert!(s.token().is_none());
    }

    #[test]
    fn rejection_expires_and_clears_token() {
        let mut s = Session::new();
        s.apply(SessionEvent::LoginStarted).unwrap();
        s.apply(SessionEvent::LoginSucceeded(token())).unwrap();
        s.apply(SessionEvent::AuthRejected("stream refused".into())).unwrap();
        assert_eq!(s.state(), SessionState::Expired);
        assert!(s.state().needs_login());
        assert!(s.token().is_none());

        // Expired sessions can log in again.
        assert_eq!(s.apply(SessionEvent::LoginStarted).unwrap(), SessionState::Authenticating);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut s = Session::new();
        let err = s.apply(SessionEvent::CheckPassed).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition {
                from: SessionState::Anonymous,
                event: "CheckPassed"
            }
        ));
        assert_eq!(s.state(), SessionState::Anonymous);

        assert!(s.apply(SessionEvent::LoginSucceeded(token())).is_err());
        assert!(s.apply(SessionEvent::AuthRejected("x".into())).is_err());
    }

    #[test]
    fn check_without_token_is_invalid() {
        let mut s = Session::new();
        s.apply(SessionEvent::LoginStarted).unwrap();
        assert!(s.apply(SessionEvent::CheckPassed).is_err());
    }

    #[test]
    fn logout_from_any_state() {
        for setup in [
            vec![],
            vec![SessionEvent::LoginStarted],
            vec![SessionEvent::LoginStarted, SessionEvent::LoginSucceeded(token())],
        ] {
            let mut s = Session::new();
            for event in setup {
                s.apply(event).unwrap();
            }
            assert_eq!(s.apply(SessionEvent::LoggedOut).unwrap(), SessionState::Anonymous);
            assert!(s.token().is_none());
        }
    }
}
