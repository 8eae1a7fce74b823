use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, trace, warn};

use crate::app::App;
use crate::cli::SessionLine;
use crate::views::RowChange;

enum Step {
    Line(Option<String>),
    Fetched(Option<Result<compute::sync::FetchOutcome, tokio::task::JoinError>>),
}

/// Interactive loop over stdin.
pub async fn session(app: &mut App) -> Result<()> {
    info!("Session started");
    println!("{}", app.render());
    println!("Type a command (e.g. `rule add <region>`), `help` or `quit`.");

    // Values restored from the snapshot may be stale; fetch everything once
    app.store.invalidate_all();
    run(app, tokio::io::stdin()).await?;

    info!("Session ended");
    Ok(())
}

/// Applies commands read from `input` while fetch results keep arriving, and
/// prints the rows each step changed.
pub async fn run<R>(app: &mut App, input: R) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut input_open = true;

    loop {
        app.schedule();
        print_changes(app);

        if !input_open && app.sync.is_idle() {
            break;
        }

        let busy = !app.sync.is_idle();
        let step = tokio::select! {
            line = lines.next_line(), if input_open => Step::Line(line?),
            joined = app.sync.join_next(), if busy => Step::Fetched(joined),
        };

        match step {
            Step::Line(None) => {
                debug!("Input closed, waiting for {} pending fetches", app.sync.pending().len());
                input_open = false;
            }
            Step::Line(Some(line)) => {
                if !handle_line(app, line.trim()) {
                    break;
                }
            }
            Step::Fetched(Some(joined)) => app.sync.handle_joined(joined, &mut app.store),
            Step::Fetched(None) => trace!("No fetch task left"),
        }
    }
    Ok(())
}

/// Returns false when the session should end.
fn handle_line(app: &mut App, line: &str) -> bool {
    match line {
        "" => return true,
        "quit" | "exit" => return false,
        "show" => {
            println!("{}", app.render());
            return true;
        }
        _ => {}
    }

    match SessionLine::try_parse_from(line.split_whitespace()) {
        Ok(parsed) => {
            if let Err(e) = parsed.command.apply(app) {
                warn!("Command failed: {}", e);
                println!("error: {}", e);
            }
        }
        // Also covers `help`
        Err(e) => println!("{}", e),
    }
    true
}

fn print_changes(app: &mut App) {
    let dashboard = app.take_dashboard_changes();
    let map = app.take_map_changes();
    if dashboard.is_empty() && map.is_empty() {
        return;
    }
    for RowChange { id, line } in dashboard {
        match line {
            Some(panel) => print!("{}", panel),
            None => println!("({} removed)", id),
        }
    }
    for change in map {
        if let Some(tooltip) = change.line {
            println!("  map: {}", tooltip);
        }
    }
}
