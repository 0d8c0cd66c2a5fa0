//! The `fidx query` command.
//!
//! Joins the command-line terms into one free-text query, runs it against
//! the index and prints ranked hits:
//!
//! ```text
//! 1. "/docs/report.pdf" (4.271)
//! 	text: ...deploying [kubernetes] on bare metal...
//! 	type: application/pdf
//! Total results: 3 Retrieved 1 to 3 in 2.1ms
//! ```

use anyhow::{Context, Result};
use std::fmt::Write;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::models::{Highlight, QueryRequest, QueryResponse};
use crate::store::{IndexSink, SqliteSink};

/// Run a query and print the results to stdout.
pub async fn run_query(config: &Config, terms: &[String]) -> Result<()> {
    let mut request = QueryRequest::from_terms(terms, config.query.limit, config.query.from);
    if config.query.highlight {
        request.highlight = Some(Highlight::ansi());
    }

    if request.query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let sink = SqliteSink::open(&config.storage.index_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open index at {}",
                config.storage.index_path.display()
            )
        })?;

    let started = Instant::now();
    let response = sink.query(&request).await?;
    let elapsed = started.elapsed();
    sink.close().await?;

    print!("{}", format_response(&response, elapsed));
    Ok(())
}

/// Render a response the way `fidx query` prints it.
pub fn format_response(response: &QueryResponse, elapsed: Duration) -> String {
    let mut out = String::new();
    if response.hits.is_empty() {
        let _ = writeln!(out, "No results.");
        return out;
    }

    for (i, hit) in response.hits.iter().enumerate() {
        let rank = response.from + i as i64 + 1;
        let _ = writeln!(out, "{}. \"{}\" ({:.3})", rank, hit.id, hit.score);
        for (field, fragments) in &hit.fragments {
            for fragment in fragments {
                let _ = writeln!(out, "\t{}: {}", field, format_fragment(fragment));
            }
        }
        for (field, value) in &hit.fields {
            if hit.fragments.iter().any(|(f, _)| f == field) {
                continue;
            }
            let _ = writeln!(out, "\t{}: {}", field, value);
        }
    }

    let first = response.from + 1;
    let last = response.from + response.hits.len() as i64;
    let _ = writeln!(
        out,
        "Total results: {} Retrieved {} to {} in {:?}",
        response.total, first, last, elapsed
    );
    out
}

/// Collapse line breaks so every fragment prints on a single line.
pub fn format_fragment(fragment: &str) -> String {
    fragment
        .split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchHit;

    fn hit(id: &str, score: f64) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            score,
            fragments: vec![("text".into(), vec!["first line\nsecond [match]".into()])],
            fields: vec![
                ("text".into(), "ignored because a fragment exists".into()),
                ("type".into(), "text/plain".into()),
            ],
        }
    }

    #[test]
    fn fragment_newlines_are_flattened() {
        assert_eq!(format_fragment("a\nb\r\nc"), "a b c");
        assert_eq!(format_fragment("no breaks"), "no breaks");
    }

    #[test]
    fn response_lists_hits_and_totals() {
        let response = QueryResponse {
            hits: vec![hit("/d/a.txt", 2.5), hit("/d/b.txt", 1.0)],
            total: 7,
            from: 2,
        };
        let out = format_response(&response, Duration::from_millis(3));
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "3. \"/d/a.txt\" (2.500)");
        assert_eq!(lines[1], "\ttext: first line second [match]");
        assert_eq!(lines[2], "\ttype: text/plain");
        assert_eq!(lines[3], "4. \"/d/b.txt\" (1.000)");
        assert_eq!(lines.last().unwrap(), &"Total results: 7 Retrieved 3 to 4 in 3ms");
    }

    #[test]
    fn empty_response_says_no_results() {
        let response = QueryResponse {
            hits: Vec::new(),
            total: 0,
            from: 0,
        };
        assert_eq!(format_response(&response, Duration::ZERO), "No results.\n");
    }
}
