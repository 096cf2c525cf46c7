//! Memory moat toolkit for LLM agents.
//!
//! Three stores sit behind a small reasoning agent:
//!
//! | Store | Backing | Access |
//! |-------|---------|--------|
//! | **Journal** | JSON file | substring search over content, category, tags |
//! | **Data moat** | SQLite `key → JSON` | overwrite by key, substring match on key |
//! | **Long-term memory** | SQLite + [sqlite-vec](https://github.com/asg017/sqlite-vec) | nearest-neighbour recall |
//!
//! The [`agent`] loop retrieves from the data moat and long-term memory,
//! prompts a language model, traces each decision with the [`tracer`], and
//! writes accepted answers back.
//!
//! # Modules
//!
//! - [`config`]: TOML + `.env` + environment configuration
//! - [`db`]: SQLite initialization, schema, migrations, health checks
//! - [`data`]: key → JSON store
//! - [`memory`]: journal, long-term vector memory, session memory
//! - [`embedding`]: text-to-vector via ONNX Runtime
//! - [`llm`]: language model trait and OpenAI-compatible client
//! - [`tracer`]: append-only decision log
//! - [`agent`]: the reasoning loop

pub mod agent;
pub mod config;
pub mod data;
pub mod db;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod memory;
pub mod tracer;
