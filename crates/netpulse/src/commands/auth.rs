//! Session commands: login, signup, logout, reset-password, whoami.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::warn;

use netpulse_core::{Authenticator, LoginForm, ResetForm, SignupForm};

use crate::cli::{LoginArgs, ResetPasswordArgs, SignupArgs};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

/// Authenticator bound to the active backend, without a token.
fn authenticator(ctx: &Context) -> Result<Authenticator, CliError> {
    let client = ctx.monitor_config_with(None)?.client()?;
    Ok(Authenticator::new(client))
}

fn remembered_email(ctx: &Context) -> Option<String> {
    ctx.active_profile().and_then(|p| p.email.clone())
}

pub async fn login(args: LoginArgs, ctx: &mut Context) -> Result<(), CliError> {
    let email = util::text_or_prompt(args.email, "Email", remembered_email(ctx).as_deref())?;
    let (password, _) = util::password(args.password_stdin, "Password", false)?;
    let form = LoginForm {
        email: email.trim().to_owned(),
        password,
    };

    let mut auth = authenticator(ctx)?;
    let token = auth.login(&form).await?;
    ctx.remember_login(&form.email, &token)?;

    if !ctx.quiet {
        eprintln!("✓ Logged in as {} (profile '{}')", form.email, ctx.profile);
    }
    Ok(())
}

pub async fn signup(args: SignupArgs, ctx: &mut Context) -> Result<(), CliError> {
    let email = util::text_or_prompt(args.email, "Email", None)?;
    let (password, confirm) = util::password(args.password_stdin, "Password", true)?;
    let agree_policy =
        util::agree_or_ask(args.agree_policy, "Do you agree to the privacy policy?")?;

    // The signup form has no confirmation field; a mismatch is caught here.
    if password.expose_secret() != confirm.expose_secret() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "Passwords do not match".into(),
        });
    }

    let form = SignupForm {
        email: email.trim().to_owned(),
        password,
        agree_policy,
    };
    let mut auth = authenticator(ctx)?;
    let token = auth.signup(&form).await?;
    ctx.remember_login(&form.email, &token)?;

    if !ctx.quiet {
        eprintln!("✓ Account created for {}", form.email);
    }
    Ok(())
}

pub async fn logout(ctx: &mut Context) -> Result<(), CliError> {
    if let Some(token) = ctx.token() {
        let client = ctx.monitor_config_with(Some(token))?.client()?;
        if let Err(e) = client.logout().await {
            warn!(error = %e, "server-side logout failed (non-fatal)");
        }
    }
    ctx.forget_token()?;
    if !ctx.quiet {
        eprintln!("✓ Logged out of profile '{}'", ctx.profile);
    }
    Ok(())
}

pub async fn reset_password(args: ResetPasswordArgs, ctx: &mut Context) -> Result<(), CliError> {
    let (password, confirm_password) =
        util::password(args.password_stdin, "New password", true)?;
    let form = ResetForm {
        reset_token: SecretString::from(args.reset_token),
        password,
        confirm_password,
    };
    authenticator(ctx)?.reset_password(&form).await?;
    if !ctx.quiet {
        eprintln!("✓ Password updated. Run: netpulse login");
    }
    Ok(())
}

#[derive(Serialize)]
struct WhoAmI {
    profile: String,
    api_url: String,
    email: Option<String>,
    session: String,
}

fn whoami_detail(w: &WhoAmI) -> String {
    [
        format!("Profile: {}", w.profile),
        format!("API URL: {}", w.api_url),
        format!("Email:   {}", w.email.as_deref().unwrap_or("-")),
        format!("Session: {}", w.session),
    ]
    .join("\n")
}

pub async fn whoami(ctx: &mut Context) -> Result<(), CliError> {
    let token = ctx
        .token()
        .ok_or_else(|| CliError::NotLoggedIn {
            profile: ctx.profile.clone(),
        })?;

    let mut auth = authenticator(ctx)?;
    let session = match auth.restore(token).await {
        Ok(state) => state,
        Err(e) => return Err(ctx.fail(e)),
    };

    let info = WhoAmI {
        profile: ctx.profile.clone(),
        api_url: ctx.api_url(),
        email: remembered_email(ctx),
        session: session.to_string(),
    };
    let out = output::render_single(ctx.output, &info, whoami_detail, |w| {
        w.email.clone().unwrap_or_default()
    })?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
