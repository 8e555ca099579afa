//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success (warnings may still have been reported)          |
//! | 1    | General error (unspecified)                              |
//! | 2    | CLI usage error (bad args)                               |
//! | 3    | Config file unreadable or invalid                        |
//! | 4    | Sales report could not be loaded; no output written      |
//! | 5    | Pipeline failed (duplicate key under `reject`)           |
//! | 6    | Output file could not be written                         |
//!
//! Reference or customer tables that fail to load are warnings, not errors:
//! the run continues and exits 0.

/// Success - command completed.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments. Clap exits with this code itself.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

/// Config cannot be read, parsed or validated.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// The sales report cannot be opened or its sheet is missing.
pub const EXIT_LOAD: u8 = 4;

/// The engine rejected the inputs.
pub const EXIT_PIPELINE: u8 = 5;

/// The output directory or file cannot be written.
pub const EXIT_WRITE: u8 = 6;
