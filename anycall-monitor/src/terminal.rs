//! Line-oriented terminal front end for a running poller.
//!
//! The table is reprinted whenever a new view arrives. Input lines:
//! `r` refreshes now, a row number prints that row's details, `q` quits.

use crate::poller::PollerHandle;
use crate::view::LogView;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

const HELP: &str = "[r] refresh  [<row #>] details  [q] quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Refresh,
    Detail(usize),
    Quit,
    Help,
}

impl Command {
    pub fn parse(line: &str) -> Option<Command> {
        match line.trim() {
            "" => None,
            "r" | "refresh" => Some(Command::Refresh),
            "q" | "quit" | "exit" => Some(Command::Quit),
            "h" | "help" | "?" => Some(Command::Help),
            other => other.parse().ok().map(Command::Detail),
        }
    }
}

/// Drive the screen until `q` or end of input, then stop the poller.
pub async fn run<R, W>(handle: PollerHandle, input: R, out: &mut W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut view_rx = handle.view();
    let mut lines = input.lines();
    // Detail lookups use the rows as last printed.
    let mut shown = LogView::default();

    loop {
        tokio::select! {
            biased;
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                shown = view_rx.borrow_and_update().clone();
                print_table(out, &shown)?;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Input closed");
                        break;
                    }
                };
                match Command::parse(&line) {
                    Some(Command::Refresh) => handle.refresh(),
                    Some(Command::Quit) => break,
                    Some(Command::Help) => writeln!(out, "{HELP}")?,
                    Some(Command::Detail(index)) => match shown.render_detail(index) {
                        Some(text) => write!(out, "{text}")?,
                        None => writeln!(out, "No row {index}")?,
                    },
                    None => {}
                }
                out.flush()?;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

fn print_table<W: Write>(out: &mut W, view: &LogView) -> std::io::Result<()> {
    writeln!(out, "Recent API Calls ({})", view.len())?;
    write!(out, "{}", view.render_table())?;
    writeln!(out, "{HELP}")?;
    out.flush()
}
