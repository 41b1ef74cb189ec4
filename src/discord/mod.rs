//! Read-only projections backing the chat-room slash commands.
//!
//! This module builds a point-in-time [`CommandContext`] snapshot from the
//! store and formats command responses as plain strings. The gateway
//! transport that would deliver them is intentionally not part of this crate.

mod commands;
mod macros;

pub use commands::{run_command, CommandContext, DappStatus, RpcStatus};
pub use macros::{all_fix_topics, fix_content};
