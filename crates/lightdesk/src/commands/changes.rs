//! Stream list-change notifications.

use serde::Serialize;
use strum::IntoEnumIterator;

use lightdesk_core::{ChangeKind, LightingDesk};

use crate::cli::{ChangeKindArg, ChangesArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

impl From<ChangeKindArg> for ChangeKind {
    fn from(kind: ChangeKindArg) -> Self {
        match kind {
            ChangeKindArg::Fixtures => Self::Fixtures,
            ChangeKindArg::Scenes => Self::Scenes,
            ChangeKindArg::Cues => Self::Cues,
            ChangeKindArg::CueStacks => Self::CueStacks,
            ChangeKindArg::CueSlots => Self::CueSlots,
            ChangeKindArg::FxPresets => Self::FxPresets,
        }
    }
}

#[derive(Serialize)]
struct ChangeEvent {
    kind: ChangeKind,
}

fn selected(args: &ChangesArgs) -> Vec<ChangeKind> {
    if args.kinds.is_empty() {
        ChangeKind::iter().collect()
    } else {
        let mut kinds: Vec<ChangeKind> = args.kinds.iter().copied().map(ChangeKind::from).collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }
}

fn render(format: &OutputFormat, kind: ChangeKind) -> Result<String, CliError> {
    let event = ChangeEvent { kind };
    Ok(match format {
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(&event)?,
        OutputFormat::Yaml => format!("---\n{}", serde_yaml::to_string(&event)?),
        OutputFormat::Table | OutputFormat::Plain => kind.to_string(),
    })
}

/// Print one line per notification until interrupted. Each kind also
/// fires whenever the socket (re)opens.
pub async fn handle(desk: &LightingDesk, args: &ChangesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let subs: Vec<_> = selected(args)
        .into_iter()
        .map(|kind| {
            let format = global.output.clone();
            let quiet = global.quiet;
            desk.notifier(kind).subscribe(move |kind| match render(&format, kind) {
                Ok(out) => output::print_output(&out, quiet),
                Err(err) => tracing::warn!(error = %err, "failed to render change"),
            })
        })
        .collect();
    tracing::debug!(count = subs.len(), "watching change notifiers");

    util::until_interrupted().await
}
