// apps/twin-headless/src/commands.rs
use std::io::BufRead;
use std::{sync::Arc, thread};

use crossbeam_channel::Receiver;
use model::PlaybackMode;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::session::TwinSession;
use crate::sinks::{BodyView, HudView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Mode(PlaybackMode),
    Connect,
    Close,
    Status,
    Quit,
}

pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "live" => Some(ConsoleCommand::Mode(PlaybackMode::Live)),
        "playback" | "replay" => Some(ConsoleCommand::Mode(PlaybackMode::Playback)),
        "connect" => Some(ConsoleCommand::Connect),
        "close" | "disconnect" => Some(ConsoleCommand::Close),
        "status" | "" => Some(ConsoleCommand::Status),
        "quit" | "exit" | "q" => Some(ConsoleCommand::Quit),
        _ => None,
    }
}

/// Reads stdin on its own thread so the tick loop never blocks on it.
/// EOF counts as `quit`.
pub fn spawn_stdin_reader() -> Receiver<ConsoleCommand> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(cmd) => {
                    if tx.send(cmd).is_err() {
                        return;
                    }
                }
                None => warn!(input = %line.trim(), "unknown command (live, playback, connect, close, status, quit)"),
            }
        }
        let _ = tx.send(ConsoleCommand::Quit);
    });
    rx
}

/// Returns false when the loop should stop.
pub fn apply(session: &TwinSession, cmd: ConsoleCommand, hud: &Arc<Mutex<HudView>>, body: &Arc<Mutex<BodyView>>) -> bool {
    match cmd {
        ConsoleCommand::Mode(mode) => {
            session.set_playback_mode(mode);
        }
        ConsoleCommand::Connect => {
            if !session.connect() {
                info!(state = ?session.connection_state(), "already connecting or connected");
            }
        }
        ConsoleCommand::Close => session.close(),
        ConsoleCommand::Status => {
            let b = body.lock().clone();
            let anomaly = session.hud().lock().state().anomaly;
            info!(state = ?session.connection_state(), samples = session.reader().version(), anomaly, "{}", hud.lock());
            if let Some(err) = session.last_error() {
                info!(error = %err, "last connection failure");
            }
            info!(vx = b.velocity.x, vy = b.velocity.y, vz = b.velocity.z, gear = b.gear, steering = b.steering, "body");
        }
        ConsoleCommand::Quit => return false,
    }
    true
}
