//! [`Event`] / [`Error`] → human-readable line formatting.
//!
//! Every formatted line is self-contained and newline-free, one per
//! `println!` call from the driver in `repl.rs` — this module only builds
//! strings, it never writes to stdout itself.

use repcrec_coordinator::Event;
use repcrec_core::Error;

/// Render a single event as the line the REPL/pipe/file driver prints.
pub fn format_event(event: &Event) -> Option<String> {
    match event {
        Event::Began { tx, read_only } => Some(format!(
            "{} begins{}",
            tx,
            if *read_only { " (read-only)" } else { "" }
        )),
        Event::ReadResult { tx, var, value } => Some(format!("{}: {} = {}", tx, var, value)),
        Event::WriteAccepted { tx, var, value } => {
            Some(format!("{} writes {} = {}", tx, var, value))
        }
        Event::Committed { tx } => Some(format!("{} commits", tx)),
        Event::Aborted { tx, reason } => Some(format!("{} aborts ({})", tx, reason)),
        Event::SiteFailed { site } => Some(format!("site {} fails", site)),
        Event::SiteRecovered { site } => Some(format!("site {} recovers", site)),
        Event::Dump(sites) => Some(format_dump(sites)),
    }
}

/// Render `dump()`'s per-site report, one site per line, ascending by
/// site id, each line listing its owned variables ascending by index.
fn format_dump(sites: &[repcrec_coordinator::SiteDump]) -> String {
    let mut lines = Vec::with_capacity(sites.len());
    for site in sites {
        let status = if site.up { "" } else { " [DOWN]" };
        let values: Vec<String> = site
            .values
            .iter()
            .map(|(var, value)| format!("{}: {}", var, value))
            .collect();
        lines.push(format!("site {}{}: {}", site.site, status, values.join(", ")));
    }
    lines.join("\n")
}

/// Render an [`Error`] as the line printed to stderr for an invalid
/// command; does not halt the input stream (§7).
pub fn format_error(err: &Error) -> String {
    err.to_string()
}
