// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # vnest-graph
//!
//! A word-compatibility graph for Verb Network Strengthening exercises:
//! which (subject, verb, object) word triples form allowed sentences.
//!
//! ## Architecture
//!
//! - **Words** (`word`): role-tagged nodes with niche-optimized ids
//! - **Graph** (`graph`): allowed combinations as 3-ary edges, plus batch
//!   expansion, suggestion aggregation and validation
//! - **Storage** (`store`): in-memory (DashMap) or durable (redb) backends
//!   that enforce triple uniqueness themselves
//! - **Engine** (`engine`): fetch and persist orchestration over a store
//! - **Boundary** (`api`, `config`, `export`): request/response shapes,
//!   TOML settings, JSON export and ingest
//!
//! ## Library usage
//!
//! ```no_run
//! use vnest_graph::engine::{Engine, EngineConfig};
//! use vnest_graph::word::WordRole;
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let cat = engine.create_word("cat", WordRole::Subject).unwrap();
//! let eats = engine.create_word("eats", WordRole::Verb).unwrap();
//! let fish = engine.create_word("fish", WordRole::Object).unwrap();
//! engine.create_combination(cat.id, eats.id, fish.id).unwrap();
//! assert!(engine.validate(cat.id, eats.id, fish.id).unwrap().valid);
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
pub mod store;
pub mod word;
