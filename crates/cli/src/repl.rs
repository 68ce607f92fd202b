//! The three input-driving modes (§10.2): file, pipe, and interactive
//! REPL, all funneling into the same [`drive_line`] per-line core so their
//! behavior cannot drift apart.

use std::io::{self, BufRead, IsTerminal, Write};

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use repcrec_coordinator::Coordinator;

use crate::format::{format_error, format_event};
use crate::parse::{parse_line, Line};

/// What happened after handing one raw line to the Coordinator.
pub enum Outcome {
    /// Continue reading more input.
    Continue,
    /// Stop reading input (terminator line, `QUIT`, or EOF); exit cleanly.
    Stop,
}

/// Parse and apply one raw input line against `coordinator`, printing
/// every resulting line to `out`. Returns whether the caller should keep
/// reading.
pub fn drive_line(coordinator: &mut Coordinator, raw: &str, out: &mut impl Write) -> Outcome {
    match parse_line(raw) {
        Ok(Line::Blank) => Outcome::Continue,
        Ok(Line::Terminator) => Outcome::Stop,
        Ok(Line::Quit) => Outcome::Stop,
        Ok(Line::Command(command)) => {
            match coordinator.apply(command) {
                Ok(events) => {
                    for event in &events {
                        if let Some(line) = format_event(event) {
                            let _ = writeln!(out, "{}", line);
                        }
                    }
                }
                Err(err) => {
                    let _ = writeln!(out, "{}", format_error(&err));
                }
            }
            Outcome::Continue
        }
        Err(err) => {
            let _ = writeln!(out, "{}", format_error(&err));
            Outcome::Continue
        }
    }
}

/// File and pipe mode: read every line from `reader` in order, driving the
/// Coordinator one tick per line, until the reader is exhausted, a
/// terminator line is seen, or `QUIT` is read.
pub fn run_lines(coordinator: &mut Coordinator, reader: impl BufRead, out: &mut impl Write) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if matches!(drive_line(coordinator, &line, out), Outcome::Stop) {
            break;
        }
    }
}

/// Interactive REPL mode: `rustyline`-backed prompt, line history, `QUIT`
/// to exit. Each raw line is echoed before being driven, matching the
/// source's "raw line : ..." diagnostic convention.
pub fn run_repl(coordinator: &mut Coordinator, out: &mut impl Write) -> io::Result<()> {
    let mut editor =
        DefaultEditor::new().map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    loop {
        match editor.readline("repcrec> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                writeln!(out, "raw line : {}", line)?;
                if matches!(drive_line(coordinator, &line, out), Outcome::Stop) {
                    break;
                }
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(_) => break,
        }
    }
    Ok(())
}

/// Dispatch to file mode (a path argument given), pipe mode (stdin is not
/// a TTY), or REPL mode (stdin is a TTY), per §10.2.
pub fn run(path: Option<&str>) -> io::Result<()> {
    let mut coordinator = Coordinator::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(path) = path {
        let file = std::fs::File::open(path)?;
        run_lines(&mut coordinator, io::BufReader::new(file), &mut out);
    } else if io::stdin().is_terminal() {
        run_repl(&mut coordinator, &mut out)?;
    } else {
        run_lines(&mut coordinator, io::stdin().lock(), &mut out);
    }
    Ok(())
}
