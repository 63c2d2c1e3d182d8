//! Stored script listing (REST only).

use tabled::Tabled;

use lightdesk_core::{DeskConfig, LightingDesk, Script};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ScriptRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Lines")]
    lines: usize,
}

impl From<&Script> for ScriptRow {
    fn from(s: &Script) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            lines: s.script.lines().count(),
        }
    }
}

pub async fn handle(config: &DeskConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let scripts = LightingDesk::fetch_scripts(config).await?;
    let out = output::render_list(
        &global.output,
        &scripts,
        |s| ScriptRow::from(s),
        |s| s.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
