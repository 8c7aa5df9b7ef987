//! Config subcommand handlers.

use std::fmt::Write;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Format config for display, masking the plaintext token.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let d = &cfg.defaults;
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", d.output);
    let _ = writeln!(out, "color = \"{}\"", d.color);
    let _ = writeln!(out, "timeout = {}", d.timeout);
    let _ = writeln!(out, "storage_timeout = {}", d.storage_timeout);
    let _ = writeln!(out, "upload_concurrency = {}", d.upload_concurrency);
    let _ = writeln!(out, "part_retries = {}", d.part_retries);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "url = \"{}\"", p.url);
        let _ = writeln!(out, "auth_mode = \"{}\"", p.auth_mode);
        if p.token.is_some() {
            let _ = writeln!(out, "token = \"****\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(timeout) = p.storage_timeout {
            let _ = writeln!(out, "storage_timeout = {timeout}");
        }
        if let Some(n) = p.upload_concurrency {
            let _ = writeln!(out, "upload_concurrency = {n}");
        }
        if let Some(n) = p.part_retries {
            let _ = writeln!(out, "part_retries = {n}");
        }
    }

    out
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), false);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetToken => {
            let cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);

            let token = rpassword::prompt_password(format!("Token for '{profile_name}': "))?;
            let token = token.trim();
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }

            config::store_token(&profile_name, token)?;
            if !global.quiet {
                eprintln!("Token for '{profile_name}' stored in system keyring");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use assetctl_config::Profile;

    use super::*;

    #[test]
    fn plaintext_token_is_masked() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "prod".into(),
            Profile {
                url: "https://sda.example.com".into(),
                auth_mode: "token".into(),
                token: Some("secret-value".into()),
                part_retries: Some(2),
                ..Profile::default()
            },
        );

        let out = format_config_redacted(&cfg);
        assert!(out.contains("[profiles.prod]"));
        assert!(out.contains("token = \"****\""));
        assert!(out.contains("part_retries = 2"));
        assert!(!out.contains("secret-value"));
    }
}
