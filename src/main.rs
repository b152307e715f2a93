use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use watchme::ad::provider::provider_for;
use watchme::config::{Config, MarkerSource};
use watchme::error::Result;
use watchme::hls::{DemoPlaylist, cue_timeline};
use watchme::player::{MediaSource, SimulatedSession};
use watchme::session::{PlaybackScreen, ScreenOptions, Video};

/// Length of every simulated ad creative
const DEMO_AD_DURATION_MS: u64 = 15_000;

#[tokio::main]
async fn main() {
    // Setup logging
    tracing_subscriber::fmt::init();

    info!("🚀 Starting WatchMe - client-side ad insertion demo");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Running in {} mode",
        if config.is_dev { "DEV" } else { "PROD" }
    );

    let prometheus = match watchme::metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    if let Err(e) = run_demo(&config).await {
        error!("Demo run failed: {}", e);
        std::process::exit(1);
    }

    if let Some(handle) = prometheus {
        info!("📈 Metrics:\n{}", handle.render());
    }
}

/// Play the configured content on a simulated engine, speeding the clock up
/// by `demo_speed`, until the content ends.
async fn run_demo(config: &Config) -> Result<()> {
    let content_duration_ms = config.demo_duration_secs * 1000;

    let session = match config.marker_source {
        MarkerSource::Simulated => {
            info!("Marker source: none, fallback scheduler active");
            SimulatedSession::new(Some(content_duration_ms), DEMO_AD_DURATION_MS)
        }
        MarkerSource::Playlist => {
            let demo = DemoPlaylist::default();
            let timeline = cue_timeline(&demo.build())?;
            info!(
                "Marker source: demo playlist with CUE-OUT at {:?}ms",
                demo.cue_out_positions_ms()
            );
            SimulatedSession::new(
                Some(content_duration_ms.min(demo.duration_ms())),
                DEMO_AD_DURATION_MS,
            )
            .with_metadata(timeline)
        }
    };

    let speed = config.demo_speed.max(1);
    let mut options = ScreenOptions::from_config(config);
    options.poll_interval = (options.poll_interval / speed).max(Duration::from_millis(1));

    // Two clock steps per poll keep every poll inside the trigger window
    let step_ms = (config.poll_interval_ms / 2).max(1);
    let step = (Duration::from_millis(step_ms) / speed).max(Duration::from_millis(1));

    let mut screen = PlaybackScreen::new(session.clone(), provider_for(config), options);
    screen.load_content(Video {
        id: "big-buck-bunny".to_string(),
        title: "Big Buck Bunny".to_string(),
        uri: config.content_url.clone(),
        has_ads: config.content_has_ads,
    });

    let (tx, mut rx) = mpsc::channel(256);
    let cancel = screen.cancellation_token();
    let clock_session = session.clone();

    let clock = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(step);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    for event in clock_session.advance(step_ms) {
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    let content_ended = clock_session.has_ended()
                        && matches!(clock_session.source(), Some(MediaSource::Content(_)));
                    if content_ended {
                        info!("Content reached its end, stopping clock");
                        break;
                    }
                }
            }
        }
    });

    screen.run(&mut rx).await;

    if let Err(e) = clock.await {
        error!("Clock task failed: {}", e);
    }

    match serde_json::to_string_pretty(screen.analytics().summary()) {
        Ok(summary) => info!("📊 Analytics summary:\n{}", summary),
        Err(e) => error!("Failed to serialize analytics summary: {}", e),
    }

    Ok(())
}
