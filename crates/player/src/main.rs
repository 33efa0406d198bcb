//! RailBldr Player - headless session runner.
//!
//! Usage: `railbldr-player <ROOM> [IRT|BMT]`
//!
//! Joins the room, prints every server payload as a JSON line on stdout, and
//! forwards each JSON line read from stdin as an action.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use railbldr_player::{SessionClient, SessionConfig, SessionHandlers};
use railbldr_shared::Team;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "railbldr_player=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(room) = args.next() else {
        anyhow::bail!("usage: railbldr-player <ROOM> [IRT|BMT]");
    };
    let team = args
        .next()
        .map(|name| name.parse::<Team>())
        .transpose()
        .context("invalid team argument")?;

    let config = SessionConfig::from_env().context("invalid session configuration")?;
    tracing::info!(endpoint = %config.endpoint(), %room, ?team, "Starting RailBldr Player");

    let client = SessionClient::new(config);
    let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();

    let joined = AtomicBool::new(false);
    let session = client.downgrade();
    let handlers = SessionHandlers::new()
        .on_message(|payload| println!("{payload}"))
        .on_open(move || {
            let Some(session) = session.upgrade() else {
                return;
            };
            if let Some(team) = team {
                if !joined.swap(true, Ordering::SeqCst) {
                    session.join_team(team);
                    session.set_team(team);
                }
            }
            session.request_state();
        })
        .on_close(move || {
            let _ = closed_tx.send(());
        });

    client.connect(room, handlers);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("reading stdin")? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => match serde_json::from_str::<serde_json::Value>(&line) {
                    Ok(action) => client.send(&action),
                    Err(e) => tracing::warn!(error = %e, "Ignoring input line that is not JSON"),
                },
                None => break,
            },
            _ = closed_rx.recv() => {
                tracing::warn!("Session closed");
                break;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.disconnect();
    tracing::info!("RailBldr Player stopped");
    Ok(())
}
