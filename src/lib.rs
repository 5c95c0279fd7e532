//! # Rule Profiler
//!
//! Turns regulatory reporting instructions into machine-readable validation
//! rules with an LLM, and profiles CSV datasets against those rules by having
//! the LLM write a validation script that is then executed locally.
//!
//! ## Architecture
//!
//! ```text
//! upload ─▶ extract text ─▶ LLM: rules ─▶ SQLite (documents)
//!                                             │
//! profile ◀─ run script ◀─ LLM: script ◀──────┘
//!    │          ▲   │
//!    │          └───┘ regenerate on failure (bounded)
//!    ▼
//! CSV report (download, then deleted)
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Rules, documents, users |
//! | [`extract`] | PDF / DOCX / CSV / text extraction |
//! | [`llm`] | LLM client trait and providers |
//! | [`parse`] | Rule-array and code-block parsing of LLM replies |
//! | [`prompts`] | Prompt templates |
//! | [`rules`] | Rule extraction and rule updates |
//! | [`script_gen`] | Validation script generation |
//! | [`runner`] | Script execution with bounded regeneration |
//! | [`profile`] | Profiling orchestration |
//! | [`storage`] | Upload and scratch file layout |
//! | [`store`] | Document and user persistence |
//! | [`auth`] | Tokens, password hashing, bearer extractor |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod auth;
pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod extract;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod parse;
pub mod profile;
pub mod prompts;
pub mod rules;
pub mod runner;
pub mod script_gen;
pub mod server;
pub mod storage;
pub mod store;
