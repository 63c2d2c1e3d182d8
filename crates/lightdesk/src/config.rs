//! CLI configuration: thin wrapper around `lightdesk_config` shared types.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--server, --ws-url, --insecure, --timeout).

use lightdesk_core::DeskConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use lightdesk_config::{
    Config, ConfigError, Profile, config_path, load_config, profile_to_desk_config, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Pick the profile to run against and apply flag overrides to it.
///
/// With `--server` set a matching profile is optional: flags alone are
/// enough to build a working configuration.
pub fn resolve_profile(global: &GlobalOpts, config: &Config) -> Result<Profile, CliError> {
    let selected = config.profile(global.profile.as_deref());

    let mut profile = match (selected, global.server.as_deref()) {
        (Ok((name, profile)), _) => {
            tracing::debug!(profile = name, "using profile");
            profile.clone()
        }
        (Err(_), Some(_)) if global.profile.is_none() => Profile::default(),
        (Err(_), _) if config.profiles.is_empty() => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
        (Err(_), _) => {
            return Err(CliError::ProfileNotFound {
                name: active_profile_name(global, config),
                available: config.profiles.keys().cloned().collect::<Vec<_>>().join(", "),
            });
        }
    };

    if let Some(ref server) = global.server {
        profile.server.clone_from(server);
    }
    if let Some(ref ws_url) = global.ws_url {
        profile.ws_url = Some(ws_url.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    Ok(profile)
}

/// Build the `DeskConfig` for this invocation: config file, profile,
/// then CLI flag overrides.
pub fn build_desk_config(global: &GlobalOpts) -> Result<DeskConfig, CliError> {
    let config = load_config()?;
    let profile = resolve_profile(global, &config)?;
    Ok(profile_to_desk_config(&profile, &config.defaults)?)
}
