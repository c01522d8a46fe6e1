//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::Input;

use netpulse_config::{Config, config_path, save_config};
use netpulse_core::{DEFAULT_API_URL, MonitorConfig};

use crate::cli::{ConfigArgs, ConfigCommand};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

/// Copy of `cfg` with plaintext tokens masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some("****".into());
        }
    }
    cfg
}

/// TOML-style listing for table output.
fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out, "\n[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "stream_window_ms = {}", cfg.defaults.stream_window_ms);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out, "\n[profiles.{name}]");
        if let Some(ref url) = p.api_url {
            let _ = writeln!(out, "api_url = \"{url}\"");
        }
        if let Some(ref email) = p.email {
            let _ = writeln!(out, "email = \"{email}\"");
        }
        if let Some(ref token) = p.token {
            let _ = writeln!(out, "token = \"{token}\"");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
    }

    out.trim_end().to_owned()
}

/// Print the config path. Works even when the file does not parse.
pub fn print_path() {
    println!("{}", config_path().display());
}

pub fn handle(args: ConfigArgs, ctx: &mut Context) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => {
            eprintln!("netpulse configuration");
            eprintln!("   Config path: {}\n", config_path().display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default(ctx.profile.clone())
                .interact_text()?;

            let current = ctx.cfg.profile(&profile_name).cloned().unwrap_or_default();
            let api_url: String = Input::new()
                .with_prompt("API URL")
                .default(current.api_url.unwrap_or_else(|| DEFAULT_API_URL.into()))
                .validate_with(|s: &String| {
                    MonitorConfig::from_url(s)
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })
                .interact_text()?;

            let email: String = Input::new()
                .with_prompt("Email (optional)")
                .default(current.email.unwrap_or_default())
                .allow_empty(true)
                .interact_text()?;

            let profile = ctx.cfg.profile_mut(&profile_name);
            profile.api_url = Some(api_url);
            profile.email = Some(email).filter(|e| !e.is_empty());
            ctx.cfg.default_profile = Some(profile_name.clone());

            let path = save_config(&ctx.cfg)?;
            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Next: netpulse login");
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redacted(&ctx.cfg);
            let out = output::render_single(ctx.output, &cfg, format_config, |c| {
                c.default_profile.clone().unwrap_or_default()
            })?;
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            ctx.cfg.set(&key, &value)?;
            save_config(&ctx.cfg)?;
            if !ctx.quiet {
                eprintln!("✓ Set {key} = {value}");
            }
            Ok(())
        }

        ConfigCommand::Path => {
            print_path();
            Ok(())
        }
    }
}
