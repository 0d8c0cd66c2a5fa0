//! In-memory index sink for tests and embedding applications.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::IndexSink;
use crate::error::SinkError;
use crate::models::{Document, QueryRequest, QueryResponse, SearchHit};

/// Characters of context kept on each side of a highlighted match.
const FRAGMENT_CONTEXT: usize = 40;

#[derive(Default)]
pub struct MemorySink {
    docs: Mutex<BTreeMap<String, Document>>,
    puts: AtomicUsize,
    failures: AtomicUsize,
    closed: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put` calls so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Reject the next `n` puts with [`SinkError::Rejected`].
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn get(&self, path: &str) -> Option<Document> {
        self.lock().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Document>> {
        // A poisoned map is still a valid map.
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl IndexSink for MemorySink {
    async fn put(&self, doc: &Document) -> Result<(), SinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }
        let rejected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(SinkError::Rejected(doc.path().to_string()));
        }
        self.lock().insert(doc.path().to_string(), doc.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, SinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }
        let terms: Vec<String> = request
            .query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        let mut hits: Vec<SearchHit> = self
            .lock()
            .values()
            .filter_map(|doc| score(doc, &terms, request))
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = hits.len() as i64;
        let hits = hits
            .into_iter()
            .skip(request.from.max(0) as usize)
            .take(request.limit.max(0) as usize)
            .collect();

        Ok(QueryResponse {
            hits,
            total,
            from: request.from,
        })
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn score(doc: &Document, terms: &[String], request: &QueryRequest) -> Option<SearchHit> {
    let file = doc.file();
    let text = file.text.to_lowercase();
    let name = file.file_name.to_lowercase();

    let count: usize = terms
        .iter()
        .map(|t| text.matches(t.as_str()).count() + name.matches(t.as_str()).count())
        .sum();
    if count == 0 {
        return None;
    }

    let mut fragments = Vec::new();
    if let Some(hl) = &request.highlight {
        if let Some(frag) = terms.iter().find_map(|t| fragment(&file.text, t, &hl.open, &hl.close)) {
            fragments.push(("text".to_string(), vec![frag]));
        }
    }

    Some(SearchHit {
        id: file.full_path.clone(),
        score: count as f64,
        fragments,
        fields: vec![
            ("file_name".to_string(), file.file_name.clone()),
            ("type".to_string(), doc.doc_type().to_string()),
        ],
    })
}

/// Window of `text` around the first case-insensitive match of `term`.
fn fragment(text: &str, term: &str, open: &str, close: &str) -> Option<String> {
    let lower = text.to_lowercase();
    // Offsets are only valid when lowercasing keeps byte lengths.
    if lower.len() != text.len() {
        return None;
    }
    let start = lower.find(term)?;
    let end = start + term.len();
    let from = floor_char_boundary(text, start.saturating_sub(FRAGMENT_CONTEXT));
    let to = ceil_char_boundary(text, (end + FRAGMENT_CONTEXT).min(text.len()));
    Some(format!(
        "{}{}{}{}{}",
        &text[from..start],
        open,
        &text[start..end],
        close,
        &text[end..to]
    ))
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
