//! Channel level command handlers.

use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;

use lightdesk_core::{ChannelKey, ChannelLevels, CoreError, LightingDesk};

use crate::cli::{ChannelsArgs, ChannelsCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util::{self, PushSignal};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct LevelEntry {
    universe: u16,
    id: u16,
    level: u8,
}

#[derive(Tabled)]
struct LevelRow {
    #[tabled(rename = "Universe")]
    universe: u16,
    #[tabled(rename = "Channel")]
    id: u16,
    #[tabled(rename = "Level")]
    level: String,
}

fn entries(levels: &ChannelLevels, universe: Option<u16>) -> Vec<LevelEntry> {
    levels
        .iter()
        .filter(|(key, _)| universe.is_none_or(|u| key.universe == u))
        .map(|(key, level)| LevelEntry {
            universe: key.universe,
            id: key.id,
            level: *level,
        })
        .collect()
}

/// One change batch as streamed by `channels watch`.
fn render_batch(
    format: &OutputFormat,
    batch: &[LevelEntry],
    color: bool,
) -> Result<String, CliError> {
    let line = |e: &LevelEntry| {
        format!(
            "{} {}",
            ChannelKey::new(e.universe, e.id),
            output::paint_level(e.level, color)
        )
    };
    Ok(match format {
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(batch)?,
        OutputFormat::Yaml => format!("---\n{}", serde_yaml::to_string(batch)?),
        OutputFormat::Table | OutputFormat::Plain => {
            batch.iter().map(line).collect::<Vec<_>>().join("\n")
        }
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    desk: &LightingDesk,
    args: &ChannelsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ChannelsCommand::Get { universe } => {
            let signal = PushSignal::new();
            let trigger = signal.clone();
            let _sub = desk.channels().subscribe(move |_| trigger.trigger());

            util::wait_open(desk).await?;
            if !signal.wait(desk.config().timeout).await {
                tracing::warn!("backend sent no channel levels; showing the empty cache");
            }

            let color = output::should_color(&global.color);
            let snap = entries(&desk.channels().get_all(), universe);
            let out = output::render_list(
                &global.output,
                &snap,
                |e| LevelRow {
                    universe: e.universe,
                    id: e.id,
                    level: output::paint_level(e.level, color),
                },
                |e| format!("{} {}", ChannelKey::new(e.universe, e.id), e.level),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ChannelsCommand::Watch { universe } => {
            let format = global.output.clone();
            let quiet = global.quiet;
            let color = output::should_color(&global.color);

            let _sub = desk.channels().subscribe(move |levels| {
                let batch = entries(levels, universe);
                if batch.is_empty() {
                    return;
                }
                match render_batch(&format, &batch, color) {
                    Ok(out) => output::print_output(&out, quiet),
                    Err(err) => tracing::warn!(error = %err, "failed to render channel batch"),
                }
            });

            util::until_interrupted().await
        }

        ChannelsCommand::Set {
            universe,
            id,
            level,
            fade,
        } => {
            util::wait_open(desk).await?;
            let fade: Duration = fade.into();
            if !desk
                .channels()
                .update_channel(universe, id, level, fade)
                .is_sent()
            {
                return Err(CoreError::NotDelivered {
                    command: "updateChannel".into(),
                }
                .into());
            }
            if !global.quiet {
                eprintln!(
                    "Channel {} -> {level} over {}",
                    ChannelKey::new(universe, id),
                    humantime::format_duration(fade)
                );
            }
            Ok(())
        }
    }
}
