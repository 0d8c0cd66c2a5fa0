//! # fileindex
//!
//! Incremental full-text indexing of heterogeneous files on local disk.
//!
//! Every file under the given roots is classified by MIME type, checked
//! against its last recorded content digest, converted to text by a
//! type-specific strategy and handed to an index sink. Scanned PDFs and
//! images fall back to rasterization and OCR through external tools.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────────────────┐   ┌──────────┐
//! │  Walker  │──▶│ ExtractionPipeline          │──▶│  SQLite  │
//! │ (walkdir)│   │ Classifier + HashStore      │   │  FTS5    │
//! └──────────┘   │ Translator (text/pdf/ocr/…) │   └────┬─────┘
//!                └────────────────────────────┘        │
//!                              ┌───────────────────────┤
//!                              ▼                       ▼
//!                         ┌──────────┐           ┌──────────┐
//!                         │   CLI    │           │   HTTP   │
//!                         │  (fidx)  │           │  (/api)  │
//!                         └──────────┘           └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! fidx init                        # create the index database
//! fidx index ~/Documents ~/Music   # index (re-runs only touch changed files)
//! fidx query kubernetes docker     # ranked results with highlighted fragments
//! fidx serve                       # start the HTTP search API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and CLI overrides |
//! | [`models`] | Documents and query types |
//! | [`error`] | Error taxonomy |
//! | [`mime`] | Extension to MIME type table |
//! | [`hash_store`] | Content digests for change detection |
//! | [`registry`] | MIME type to extraction strategy registry |
//! | [`extract`] | `Extractor` trait and plain strategies |
//! | [`process`] | External tool runner |
//! | [`ocr`] | OCR engine and rasterizer |
//! | [`pdf`] | PDF text layer with OCR fallback |
//! | [`audio`] | Audio tag enrichment |
//! | [`classify`] | Process/skip gate |
//! | [`ingest`] | Per-file pipeline and `fidx index` |
//! | [`walker`] | Directory traversal |
//! | [`store`] | Index sinks (SQLite FTS5, in-memory) |
//! | [`search`] | `fidx query` |
//! | [`stats`] | `fidx stats` |
//! | [`progress`] | Progress reporting on stderr |
//! | [`server`] | HTTP search API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod audio;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod hash_store;
pub mod ingest;
pub mod migrate;
pub mod mime;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod process;
pub mod progress;
pub mod registry;
pub mod search;
pub mod server;
pub mod stats;
pub mod store;
pub mod walker;
