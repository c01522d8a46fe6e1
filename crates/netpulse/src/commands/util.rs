//! Shared helpers for command handlers.

use std::io::{self, BufRead, IsTerminal};

use dialoguer::{Confirm, Input, Password};
use secrecy::SecretString;

use crate::error::CliError;

/// First line of stdin, without the trailing newline.
pub fn read_stdin_line() -> Result<SecretString, CliError> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let trimmed = line.trim_end_matches(['\r', '\n']).to_owned();
    Ok(SecretString::from(trimmed))
}

/// Use `value` if given, otherwise prompt with `default` pre-filled.
pub fn text_or_prompt(
    value: Option<String>,
    prompt: &str,
    default: Option<&str>,
) -> Result<String, CliError> {
    if let Some(value) = value {
        return Ok(value);
    }
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default.to_owned());
    }
    Ok(input.interact_text()?)
}

/// Password from stdin or a hidden prompt. `confirm` asks twice and
/// returns both entries so the form can check they match.
pub fn password(
    from_stdin: bool,
    prompt: &str,
    confirm: bool,
) -> Result<(SecretString, SecretString), CliError> {
    if from_stdin {
        let pw = read_stdin_line()?;
        return Ok((pw.clone(), pw));
    }
    let first = Password::new().with_prompt(prompt).interact()?;
    let second = if confirm {
        Password::new().with_prompt("Repeat password").interact()?
    } else {
        first.clone()
    };
    Ok((SecretString::from(first), SecretString::from(second)))
}

/// `true` if `flag` is set; otherwise ask, but only on a terminal.
pub fn agree_or_ask(flag: bool, prompt: &str) -> Result<bool, CliError> {
    if flag {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Ok(false);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

/// Timestamp for table cells.
pub fn when(ts: Option<chrono::DateTime<chrono::Utc>>) -> String {
    ts.map_or_else(
        || "-".into(),
        |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}
