//! Subcommand implementations.

pub mod cache;
pub mod check;
pub mod init;
pub mod list_rule_sets;
pub mod output;

/// Rule violations failed the check.
pub const EXIT_VIOLATIONS: u8 = 1;

/// Configuration, rule resolution, analyzer or cancellation error.
pub const EXIT_ERROR: u8 = 2;
