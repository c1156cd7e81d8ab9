//! mdtask - Markdown Task Library
//!
//! This library stores tasks as Markdown files with YAML front matter, so the
//! same files can be edited in any note-taking tool.
//!
//! # Core Concepts
//!
//! - **Tasks**: One `.md` file each, identified by a `task/<timestamp>` ID
//! - **Attribute tags**: Status, deadline, reminder, wait reason, parent and
//!   archival are encoded as reserved `mdtask/...` tags
//! - **Managed marker**: Only files tagged `mdtask` are treated as tasks
//! - **Cascading archive**: Archiving a task archives its subtasks
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.mdtask.toml`
//! - `error`: Error types and result aliases
//! - `id`: Timestamp ID generation
//! - `markdown`: Front-matter parsing and writing
//! - `output`: Human and JSON output
//! - `repository`: File-backed task storage over directory trees
//! - `service`: Creation defaults, updates and archive rules
//! - `tags`: Tag attribute codec
//! - `task`: Task entity and status

pub mod cli;
pub mod config;
pub mod error;
pub mod id;
pub mod markdown;
pub mod output;
pub mod repository;
pub mod service;
pub mod tags;
pub mod task;

pub use error::{Error, Result};
