mod commands;
mod config;
mod session;
mod sinks;

use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use config::TwinConfig;
use session::TwinSession;
use sinks::{ConsoleHud, GhostBody, LogEffects};

fn main() -> anyhow::Result<()> {
    let cfg_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = TwinConfig::load(cfg_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level)))
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("twin-io")
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    let body = GhostBody::new(0.0);
    let hud = ConsoleHud::new();
    let (body_view, hud_view) = (body.view(), hud.view());
    let mut session = TwinSession::new(cfg.clone(), runtime.handle().clone(), body, LogEffects, hud);

    if cfg.auto_connect {
        session.connect();
    }
    let console = commands::spawn_stdin_reader();

    let interval = cfg.tick_interval();
    let mut last = Instant::now();
    'run: loop {
        for cmd in console.try_iter() {
            if !commands::apply(&session, cmd, &hud_view, &body_view) {
                break 'run;
            }
        }

        let now = Instant::now();
        session.tick(now.duration_since(last).as_secs_f32());
        last = now;

        let spent = now.elapsed();
        if spent < interval {
            thread::sleep(interval - spent);
        }
    }

    // close before the runtime goes so the close frame has a chance to go out
    session.close();
    drop(session);
    runtime.shutdown_timeout(Duration::from_millis(250));
    Ok(())
}
