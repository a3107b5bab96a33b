//! Model Context Protocol (MCP) server implementation.
//!
//! This module exposes the student record store as MCP tools. Clients talk
//! JSON-RPC 2.0, one message per line, over stdio or TCP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│   Session   │───▶│ Dispatcher  │    │
//! │   │ (stdio/tcp) │    │ (per line)  │    │  (tools)    │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌──────────────────────────┐       ┌─────────────────┐   │
//! │   │     JSON-RPC Messages    │       │  Record Store   │   │
//! │   └──────────────────────────┘       └─────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod dispatch;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;
pub mod transport;

pub use dispatch::{DispatchError, Dispatcher};
pub use protocol::{JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use session::Session;
pub use transport::{LineTransport, StdioTransport, TcpTransport};
