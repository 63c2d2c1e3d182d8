//! Channel mapping command handlers.

use serde::Serialize;
use tabled::Tabled;

use lightdesk_core::{ChannelMapping, LightingDesk};

use crate::cli::{GlobalOpts, MappingArgs, MappingCommand};
use crate::error::CliError;
use crate::output;

use super::util::{self, PushSignal};

#[derive(Serialize)]
struct MappedChannel {
    universe: u16,
    channel: u16,
    fixture_key: String,
    fixture_name: String,
    description: String,
}

#[derive(Tabled)]
struct MappingRow {
    #[tabled(rename = "Universe")]
    universe: u16,
    #[tabled(rename = "Channel")]
    channel: u16,
    #[tabled(rename = "Fixture")]
    fixture: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&MappedChannel> for MappingRow {
    fn from(m: &MappedChannel) -> Self {
        Self {
            universe: m.universe,
            channel: m.channel,
            fixture: m.fixture_name.clone(),
            description: m.description.clone(),
        }
    }
}

fn flatten(mapping: &ChannelMapping, universe: Option<u16>) -> Vec<MappedChannel> {
    mapping
        .iter()
        .filter(|(u, _)| universe.is_none_or(|want| **u == want))
        .flat_map(|(u, channels)| {
            channels.iter().map(|(channel, fixture)| MappedChannel {
                universe: *u,
                channel: *channel,
                fixture_key: fixture.fixture_key.clone(),
                fixture_name: fixture.fixture_name.clone(),
                description: fixture.description.clone(),
            })
        })
        .collect()
}

pub async fn handle(
    desk: &LightingDesk,
    args: &MappingArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        MappingCommand::Show { universe } => {
            let signal = PushSignal::new();
            let trigger = signal.clone();
            let _sub = desk.channel_mapping().subscribe(move |_| trigger.trigger());

            util::wait_open(desk).await?;
            if !signal.wait(desk.config().timeout).await {
                return Err(CliError::Timeout {
                    seconds: desk.config().timeout.as_secs(),
                });
            }

            let rows = flatten(&desk.channel_mapping().get_all(), universe);
            let out = output::render_list(
                &global.output,
                &rows,
                |m| MappingRow::from(m),
                |m| format!("{}:{} {}", m.universe, m.channel, m.fixture_key),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
