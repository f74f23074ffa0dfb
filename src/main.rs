use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use pixgrid::{FillConfig, FillEvent, FillScheduler, Viewport};

/// Default grid geometry when no window exists yet.
const DEFAULT_VIEWPORT: Viewport = Viewport {
    width: 900,
    height: 500,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pixgrid=info".parse()?),
        )
        .init();

    let start = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    // a file argument opens its containing directory
    let dir = if start.is_dir() {
        start
    } else {
        start
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };

    let (mut scheduler, events) = FillScheduler::new(FillConfig::default());
    scheduler.open_directory(&dir, DEFAULT_VIEWPORT);
    scheduler.drive_until_idle();

    for event in events.try_iter() {
        match event {
            FillEvent::InitialReady { model, resolved } => {
                info!(dir = ?model.dir(), total = model.len(), resolved, "listing ready");
            }
            FillEvent::Published { model } => {
                info!(dir = ?model.dir(), ready = model.ready_count(), "model published");
            }
            FillEvent::DirectoryUnreadable { path, message } => {
                anyhow::bail!("cannot open {}: {message}", path.display());
            }
        }
    }

    Ok(())
}
