//! `session-buddy`: the thin handler layer that owns the tool transport
//! and a CLI for local operation, forwarding every request to the typed
//! core operations in `config`, `state`, and `handlers`.

use std::io::{self, BufRead, Write};

use clap::Parser;
use sb_protocol::ToolRequest;
use session_buddy::config::{Cli, Command};
use session_buddy::handlers;
use session_buddy::state::AppState;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    sb_logging::init_logging(sb_logging::LogConfig {
        app_name: "session-buddy",
        verbose: cli.verbose,
        tui_mode: false,
    })?;

    let config = cli.to_session_buddy_config();

    match &cli.command {
        Command::Serve => serve(config).await,
        Command::Checkpoint { dir, project, quality_score } => {
            let (outcome, lines) = sb_git::create_checkpoint_commit(dir, project, *quality_score)?;
            for line in lines {
                println!("{line}");
            }
            println!("{outcome:?}");
            Ok(())
        }
        Command::Gc { dir, prune_delay, auto_threshold } => {
            let message = sb_git::schedule_automatic_git_gc(dir, prune_delay, *auto_threshold)?;
            println!("{message}");
            Ok(())
        }
        Command::Health => {
            let state = AppState::new(config).await?;
            let response = handlers::dispatch(
                &state,
                ToolRequest { id: "health".to_string(), tool: "health".to_string(), arguments: serde_json::json!({}) },
            )
            .await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

/// Read one [`ToolRequest`] JSON object per line from stdin, dispatch it,
/// and write the matching [`sb_protocol::ToolResponse`] to stdout. A line
/// that fails to parse gets a validation-error response with id `""`
/// rather than killing the loop, so one malformed request doesn't take
/// down the session.
async fn serve(config: sb_protocol::SessionBuddyConfig) -> anyhow::Result<()> {
    info!("session-buddy starting stdio tool loop");
    let state = AppState::new(config).await?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolRequest>(&line) {
            Ok(request) => handlers::dispatch(&state, request).await,
            Err(err) => {
                error!(error = %err, "failed to parse tool request");
                sb_protocol::ToolResponse::err(
                    String::new(),
                    sb_protocol::ToolError::validation(format!("invalid request: {err}")),
                )
            }
        };

        let serialized = serde_json::to_string(&response)?;
        writeln!(stdout, "{serialized}")?;
        stdout.flush()?;
    }

    Ok(())
}
