//! Per-file progress for `fidx index`.
//!
//! OCR runs can take minutes per scanned page, so the indexer reports each
//! visited file as it goes. Everything here writes to stderr; stdout is
//! reserved for the run summary.

use serde::Serialize;
use std::io::Write;

/// Something the walker or pipeline wants to tell the user about.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Traversal of a root path started.
    Walking { root: String },
    /// The n-th visited file was handled. `outcome` is one of
    /// `indexed`, `skipped` or `failed`.
    File {
        n: u64,
        path: String,
        outcome: &'static str,
    },
}

impl ProgressEvent {
    fn human_line(&self) -> String {
        match self {
            ProgressEvent::Walking { root } => format!("fidx: walking {}", root),
            ProgressEvent::File { n, path, outcome } => {
                format!("fidx: [{:>7}] {:<8} {}", group_digits(*n), outcome, path)
            }
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Terminal output, e.g. `fidx: [  1,204] indexed  /docs/scan.pdf`.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        emit(&event.human_line());
    }
}

/// JSON lines tagged with `"phase"`, for wrapping tools.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => emit(&line),
            Err(e) => tracing::debug!("dropping progress event: {}", e),
        }
    }
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn emit(line: &str) {
    let mut err = std::io::stderr().lock();
    let _ = writeln!(err, "{}", line);
}

/// `1234567` -> `1,234,567`.
pub(crate) fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::from(&digits[..head]);
    for chunk in digits.as_bytes()[head..].chunks(3) {
        if !out.is_empty() {
            out.push(',');
        }
        out.extend(chunk.iter().map(|&b| b as char));
    }
    out
}

/// How `fidx index` reports progress.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human output when stderr is a terminal, nothing when piped.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_grouped_in_thousands() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(42), "42");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(123_456), "123,456");
        assert_eq!(group_digits(9_876_543), "9,876,543");
    }

    #[test]
    fn file_event_serializes_with_phase_tag() {
        let event = ProgressEvent::File {
            n: 3,
            path: "/docs/a.txt".into(),
            outcome: "indexed",
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["phase"], "file");
        assert_eq!(value["n"], 3);
        assert_eq!(value["outcome"], "indexed");
    }

    #[test]
    fn human_line_names_outcome_and_path() {
        let line = ProgressEvent::File {
            n: 1500,
            path: "/docs/scan.pdf".into(),
            outcome: "failed",
        }
        .human_line();
        assert!(line.contains("1,500"));
        assert!(line.contains("failed"));
        assert!(line.ends_with("/docs/scan.pdf"));
    }
}
