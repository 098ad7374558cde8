//! # CLI Templates
//!
//! Terminal output goes through minijinja templates kept as stand-alone files
//! under `templates/` and embedded at compile time.
//!
//! Layout math (column widths, truncation, padding) is done in Rust before
//! rendering, because it needs Unicode width handling. Templates receive
//! ready-to-print text plus a semantic style name for each piece and apply it
//! with the `style` filter.
//!
//! Line breaks are literal in the template files; loops are written on a single
//! line so that each iteration emits exactly one output line.

pub const PAGE_TEMPLATE: &str = include_str!("templates/page.tmp");
pub const KINDS_TEMPLATE: &str = include_str!("templates/kinds.tmp");
pub const CONFIG_TEMPLATE: &str = include_str!("templates/config.tmp");
pub const MESSAGES_TEMPLATE: &str = include_str!("templates/messages.tmp");
pub const BROWSE_HELP_TEMPLATE: &str = include_str!("templates/browse_help.tmp");
