//! Now-playing track display.

use futures_util::StreamExt;

use lightdesk_core::{LightingDesk, Track};

use crate::cli::{GlobalOpts, TrackArgs};
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(track: &Track, color: bool) -> String {
    [
        format!("Playing:  {}", output::paint_flag(track.is_playing, color)),
        format!("Artist:   {}", track.artist),
        format!("Title:    {}", track.name),
    ]
    .join("\n")
}

fn line(track: &Track) -> String {
    match (track.is_playing, track.artist.is_empty()) {
        (false, _) => "(stopped)".into(),
        (true, true) => track.name.clone(),
        (true, false) => format!("{} - {}", track.artist, track.name),
    }
}

pub async fn handle(desk: &LightingDesk, args: &TrackArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let print = |track: &Track| -> Result<(), CliError> {
        let out = output::render_single(&global.output, track, |t| detail(t, color), line)?;
        output::print_output(&out, global.quiet);
        Ok(())
    };

    if args.watch {
        // The stream yields the cached value first, then every push.
        let mut stream = desk.track().stream();
        let interrupted = util::until_interrupted();
        tokio::pin!(interrupted);
        loop {
            tokio::select! {
                result = &mut interrupted => return result,
                next = stream.next() => match next {
                    Some(track) => print(&track)?,
                    None => return Err(CliError::Disconnected),
                },
            }
        }
    }

    let mut changes = desk.track().watch();
    util::wait_open(desk).await?;
    let timeout = desk.config().timeout;
    if tokio::time::timeout(timeout, changes.changed()).await.is_err() {
        return Err(CliError::Timeout {
            seconds: timeout.as_secs(),
        });
    }
    print(&desk.track().get())
}
