//! CLI configuration: a thin layer over `assetctl_config`.
//!
//! Adds resolution that respects `GlobalOpts` overrides (--url, --token,
//! --insecure, --timeout) on top of the profile.

use secrecy::SecretString;

use assetctl_core::{ClientConfig, Credentials};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use assetctl_config::{Config, Profile, config_path, load_config, store_token};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ClientConfig` from the config file, profile, and CLI overrides.
pub fn resolve_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        // An explicitly requested profile must exist.
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", "),
            });
        }
        // No profile: flags alone must name the service.
        None => {
            let url = global.url.clone().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            Profile {
                url,
                auth_mode: "token".into(),
                ..Profile::default()
            }
        }
    };

    let profile = apply_overrides(profile, global);
    let auth = match &global.token {
        Some(token) => Credentials::Token(SecretString::from(token.clone())),
        None => assetctl_config::resolve_auth(&profile, &profile_name)?,
    };

    Ok(assetctl_config::client_config(&profile, &cfg.defaults, auth)?)
}

/// Flag values take priority over profile values.
fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(url) = &global.url {
        profile.url.clone_from(url);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}
