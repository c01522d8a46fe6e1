//! CLI configuration: thin wrapper around `netpulse_config`.
//!
//! Folds the global flags into the loaded config file once, so command
//! handlers see a single resolved `Context`.

use clap::ValueEnum;
use secrecy::SecretString;
use tracing::{debug, warn};

use netpulse_config::{Config, Profile, TokenStorage, config_path};
use netpulse_core::{CoreError, MonitorConfig};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Everything a command handler needs from flags, env and config file.
pub struct Context {
    pub cfg: Config,
    pub profile: String,
    pub output: OutputFormat,
    pub color: bool,
    pub quiet: bool,
    api_url: Option<String>,
    token_flag: Option<String>,
    timeout: Option<u64>,
}

impl Context {
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let cfg = netpulse_config::load_config()?;
        let profile = cfg.profile_name(global.profile.as_deref());
        debug!(profile = %profile, path = %config_path().display(), "config loaded");

        let output = global
            .output
            .or_else(|| OutputFormat::from_str(&cfg.defaults.output, true).ok())
            .unwrap_or(OutputFormat::Table);
        let color_mode = global
            .color
            .or_else(|| ColorMode::from_str(&cfg.defaults.color, true).ok())
            .unwrap_or(ColorMode::Auto);

        Ok(Self {
            profile,
            output,
            color: output::should_color(color_mode),
            quiet: global.quiet,
            api_url: global.api_url.clone(),
            token_flag: global.token.clone(),
            timeout: global.timeout,
            cfg,
        })
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.cfg.profile(&self.profile)
    }

    pub fn api_url(&self) -> String {
        netpulse_config::resolve_api_url(self.api_url.as_deref(), self.active_profile())
    }

    /// Token from `--token`/`NETPULSE_TOKEN`, the keyring or the profile.
    pub fn token(&self) -> Option<SecretString> {
        netpulse_config::resolve_token(
            self.token_flag.clone().map(SecretString::from),
            self.active_profile(),
            &self.profile,
        )
    }

    /// Monitor settings with the resolved token attached.
    pub fn monitor_config(&self) -> Result<MonitorConfig, CliError> {
        self.monitor_config_with(self.token())
    }

    /// Monitor settings with an explicit token (or none, for the auth
    /// endpoints).
    pub fn monitor_config_with(
        &self,
        token: Option<SecretString>,
    ) -> Result<MonitorConfig, CliError> {
        Ok(netpulse_config::monitor_config(
            &self.cfg,
            &self.profile,
            self.api_url.as_deref(),
            token,
            self.timeout,
        )?)
    }

    /// Persist a fresh token and the email it belongs to.
    pub fn remember_login(&mut self, email: &str, token: &SecretString) -> Result<(), CliError> {
        let api_url = self.api_url();
        let storage = netpulse_config::store_token(&mut self.cfg, &self.profile, token);
        let profile = self.cfg.profile_mut(&self.profile);
        profile.email = Some(email.to_owned());
        profile.api_url.get_or_insert(api_url);
        netpulse_config::save_config(&self.cfg)?;
        if storage == TokenStorage::Plaintext {
            warn!("system keyring unavailable; token saved in plaintext config");
        }
        Ok(())
    }

    /// Drop the stored token for the active profile.
    pub fn forget_token(&mut self) -> Result<(), CliError> {
        if netpulse_config::clear_token(&mut self.cfg, &self.profile) {
            netpulse_config::save_config(&self.cfg)?;
        }
        Ok(())
    }

    /// Turn a core error into a CLI error. A refused stored token is
    /// removed first; a `--token` value leaves storage alone.
    pub fn fail(&mut self, err: CoreError) -> CliError {
        let stored = self.token_flag.is_none();
        if stored && matches!(err, CoreError::SessionExpired { .. }) {
            if let Err(e) = self.forget_token() {
                warn!(error = %e, "could not clear expired token");
            }
        }
        CliError::from_core(err, &self.profile)
    }

    /// `Result` adapter for [`fail`](Self::fail).
    pub fn check<T>(&mut self, result: Result<T, CoreError>) -> Result<T, CliError> {
        result.map_err(|e| self.fail(e))
    }
}
