//! Credential lookup for the CalDAV client.
//!
//! Secrets come from the environment first, then the configuration file.
//! A missing basic-auth password is prompted for when running in a terminal.

use std::io::IsTerminal;

use anyhow::{Context, Result, bail};
use calsync_core::config::AuthMethod;
use calsync_core::constants::{PASSWORD_ENV, TOKEN_ENV};
use calsync_core::remote::Credentials;
use calsync_core::Config;

pub fn resolve(config: &Config) -> Result<Credentials> {
    resolve_with(
        config,
        std::env::var(PASSWORD_ENV).ok(),
        std::env::var(TOKEN_ENV).ok(),
        prompt_password,
    )
}

fn resolve_with(
    config: &Config,
    env_password: Option<String>,
    env_token: Option<String>,
    prompt: impl FnOnce(&str) -> Result<Option<String>>,
) -> Result<Credentials> {
    match config.general.auth_method {
        AuthMethod::None => Ok(Credentials::None),
        AuthMethod::Basic => {
            // Without a user name the server is contacted anonymously.
            let Some(username) = config.auth.username.clone().filter(|u| !u.is_empty()) else {
                return Ok(Credentials::None);
            };

            let password = match env_password.or_else(|| config.auth.password.clone()) {
                Some(password) => password,
                None => match prompt(&username)? {
                    Some(password) => password,
                    None => bail!(
                        "No password for {}. Set {} or auth.password in the configuration file.",
                        username,
                        PASSWORD_ENV
                    ),
                },
            };

            Ok(Credentials::Basic { username, password })
        }
        AuthMethod::Bearer => match env_token.or_else(|| config.auth.token.clone()) {
            Some(token) => Ok(Credentials::Bearer(token)),
            None => bail!(
                "Bearer authentication needs a token. Set {} or auth.token in the configuration file.",
                TOKEN_ENV
            ),
        },
    }
}

/// Ask for the password on the terminal; `None` when there is no terminal.
fn prompt_password(username: &str) -> Result<Option<String>> {
    if !std::io::stdin().is_terminal() {
        return Ok(None);
    }

    let prompt = format!("Password for {}: ", username);
    rpassword::prompt_password(&prompt)
        .map(Some)
        .context("Failed to read password")
}
