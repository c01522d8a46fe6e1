// Auth service endpoints
//
// Bearer-token session lifecycle: login and signup issue a token, logout
// revokes it, check validates it. The token itself is opaque to this crate.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::{ApiClient, error_message, parse_body};
use crate::error::Error;
use crate::types::{LoginRequest, ResetPasswordRequest, SignupRequest, TokenResponse};

const LOGIN_PATH: &str = "api/auth/login";
const SIGNUP_PATH: &str = "api/auth/signup";
const LOGOUT_PATH: &str = "api/auth/logout";
const RESET_PATH: &str = "api/auth/reset-password";
const CHECK_PATH: &str = "api/auth/check";

impl ApiClient {
    /// Exchange email/password for a session token.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<SecretString, Error> {
        let body = LoginRequest {
            email,
            password: password.expose_secret(),
        };
        let resp = self.post_raw(LOGIN_PATH, Some(&body)).await?;
        let token = token_from(resp, "login").await?;
        debug!("login successful");
        Ok(token)
    }

    /// Create an account. The backend logs the new user in immediately and
    /// returns a session token.
    pub async fn signup(
        &self,
        email: &str,
        password: &SecretString,
        agree_policy: bool,
    ) -> Result<SecretString, Error> {
        let body = SignupRequest {
            email,
            password: password.expose_secret(),
            agree_policy,
        };
        let resp = self.post_raw(SIGNUP_PATH, Some(&body)).await?;
        let token = token_from(resp, "signup").await?;
        debug!("signup successful");
        Ok(token)
    }

    /// Revoke the current token. A 401 means the server already considers
    /// the session gone, which is the outcome the caller wants.
    pub async fn logout(&self) -> Result<(), Error> {
        self.require_token()?;

        let resp = self.post_raw::<()>(LOGOUT_PATH, None).await?;
        let status = resp.status();
        if status.is_success() || status == reqwest::StatusCode::UNAUTHORIZED {
            debug!("logout complete");
            Ok(())
        } else {
            Err(Error::Api {
                status: status.as_u16(),
                message: error_message(status, resp).await,
            })
        }
    }

    /// Set a new password using a reset token delivered out of band.
    pub async fn reset_password(
        &self,
        reset_token: &SecretString,
        password: &SecretString,
    ) -> Result<(), Error> {
        let body = ResetPasswordRequest {
            token: reset_token.expose_secret(),
            password: password.expose_secret(),
        };
        let resp = self.post_raw(RESET_PATH, Some(&body)).await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Error::Authentication {
            message: format!(
                "password reset failed (HTTP {status}): {}",
                error_message(status, resp).await
            ),
        })
    }

    /// Validate the current token. `Ok(())` means the session is live.
    pub async fn check(&self) -> Result<(), Error> {
        self.require_token()?;

        let resp = self.get_status(CHECK_PATH).await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }
}

async fn token_from(resp: reqwest::Response, action: &str) -> Result<SecretString, Error> {
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Authentication {
            message: format!(
                "{action} failed (HTTP {status}): {}",
                error_message(status, resp).await
            ),
        });
    }

    let body = resp.text().await?;
    let parsed: TokenResponse = parse_body(body)?;
    Ok(SecretString::from(parsed.token))
}
