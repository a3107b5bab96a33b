//! student-records-mcp: MCP server for a student grade book
//!
//! This library exposes a collection of student records (a name plus a grade
//! per subject) to AI assistants as Model Context Protocol tools.
//!
//! # Architecture
//!
//! The server speaks newline-delimited JSON-RPC 2.0 over stdio or TCP:
//!
//! - **Tools**: list students, find a student by name, a student's grades,
//!   one subject's grades across students, a student's average, and adding
//!   a student
//! - **Stores**: in-memory, or JSON files on disk
//! - **Transports**: one stdio session, or one session per TCP connection
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation
//! - [`store`] — Record model and storage backends

pub mod config;
pub mod error;
pub mod mcp;
pub mod store;
