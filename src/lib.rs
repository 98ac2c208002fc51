//! # mdpack
//!
//! An incremental markdown-to-JSON artifact synchronizer.
//!
//! mdpack keeps a destination tree of JSON artifacts (one per markdown
//! document with YAML frontmatter, plus a single aggregate `index.json`)
//! synchronized with a source tree. No state is persisted between runs:
//! each pass re-derives what changed by comparing the two trees and by
//! hashing content, then applies the minimal set of writes and deletes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────────┐
//! │  Scan    │──▶│   Diff    │──▶│ Sweep deleted │
//! │ src/dest │   │ A / D / C │   └───────┬───────┘
//! └──────────┘   └──────────┘           ▼
//!                              ┌─────────────────┐   ┌─────────────┐
//!                              │ Convert + write │──▶│ Index build │
//!                              │ (hash-gated)    │   │ (optional)  │
//!                              └─────────────────┘   └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mdpack sync ./docs --output ./out                 # convert a tree
//! mdpack sync ./docs --output ./out --index ./out   # and rebuild index.json
//! mdpack sync note.md --output ./out                # single document
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration (retry, worker pool, extensions) |
//! | [`models`] | Comparison records and conversion tasks |
//! | [`scan`] | Glob-filtered tree enumeration |
//! | [`compare`] | Source/destination diff classification |
//! | [`retry`] | Bounded exponential-backoff retry |
//! | [`store`] | Retried file access and content hashing |
//! | [`convert`] | Frontmatter-to-JSON conversion and index rendering |
//! | [`pipeline`] | Bounded-parallel conversion workers |
//! | [`sweep`] | Artifact deletion and empty-directory pruning |
//! | [`index`] | Deterministic aggregate index rebuild |
//! | [`sync`] | Run orchestration |

pub mod compare;
pub mod config;
pub mod convert;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod retry;
pub mod scan;
pub mod store;
pub mod sweep;
pub mod sync;
