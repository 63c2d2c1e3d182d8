//! Config subcommand handlers.

use std::fmt::Write as _;

use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Server")]
    server: String,
    #[tabled(rename = "WebSocket")]
    ws_url: String,
}

#[derive(serde::Serialize)]
struct ProfileEntry<'a> {
    name: &'a str,
    default: bool,
    #[serde(flatten)]
    profile: &'a Profile,
}

/// TOML rendering of the effective config for `config show`.
fn format_config(cfg: &Config) -> Result<String, CliError> {
    let body = toml::to_string_pretty(cfg)
        .map_err(|e| CliError::Config(config::ConfigError::Serialization(e)))?;
    let mut out = String::new();
    let _ = writeln!(out, "# {}", config::config_path().display());
    out.push_str(&body);
    Ok(out)
}

/// Insert or replace a profile. Becomes the default when asked to, or
/// when it is the first profile.
fn upsert_profile(cfg: &mut Config, name: String, profile: Profile, set_default: bool) {
    let first = cfg.profiles.is_empty();
    if set_default || first {
        cfg.default_profile = Some(name.clone());
    }
    cfg.profiles.insert(name, profile);
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let text = format_config(&cfg)?;
            let out = output::render_single(&global.output, &cfg, |_| text.clone(), |_| text.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let active = config::active_profile_name(global, &cfg);
            let entries: Vec<ProfileEntry<'_>> = cfg
                .profiles
                .iter()
                .map(|(name, profile)| ProfileEntry {
                    name,
                    default: *name == active,
                    profile,
                })
                .collect();
            let out = output::render_list(
                &global.output,
                &entries,
                |e| ProfileRow {
                    marker: if e.default { "*" } else { "" },
                    name: e.name.to_owned(),
                    server: e.profile.server.clone(),
                    ws_url: e.profile.ws_url.clone().unwrap_or_default(),
                },
                |e| e.name.to_owned(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init {
            server,
            ws_url,
            name,
            set_default,
        } => {
            let mut cfg = config::load_config()?;
            let existing = cfg.profiles.get(&name).cloned().unwrap_or_default();
            let profile = Profile {
                server,
                ws_url: ws_url.or(existing.ws_url),
                insecure: global.insecure.then_some(true).or(existing.insecure),
                timeout: global.timeout.or(existing.timeout),
                ..existing
            };
            // Validate before writing anything.
            config::profile_to_desk_config(&profile, &cfg.defaults)?;

            upsert_profile(&mut cfg, name.clone(), profile, set_default);
            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Profile '{name}' saved to {}", path.display());
            }
            Ok(())
        }
    }
}
