use anyhow::Result;
use eos_dashboard::{config, source, telemetry, view};
use config::Config;
use source::{FileSnapshotSource, SnapshotSource};
use std::time::Duration;
use telemetry::init_tracing;
use tracing::{info, warn};
use view::{JsonRenderer, RenderContext};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;
    let settings = cfg.dashboard.settings()?;
    let source = FileSnapshotSource::new(cfg.source.snapshot_dir.clone());
    let mut ctx = RenderContext::new(JsonRenderer::new(std::io::stdout()), settings);

    info!(
        dir = %source.dir().display(),
        time_zone = %settings.time_zone,
        poll_seconds = cfg.source.poll_seconds,
        "starting EOS dashboard"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.source.poll_seconds.max(1)));
    let shutdown = telemetry::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match source.fetch() {
                    Ok(snapshot) => {
                        if let Err(e) = ctx.update(&snapshot) {
                            warn!(error = %e, "render failed, keeping previous view");
                        }
                    }
                    Err(e) => warn!(error = %e, "snapshot rejected, skipping cycle"),
                }
            }
            _ = &mut shutdown => break,
        }
    }

    warn!("shutdown complete");
    Ok(())
}
