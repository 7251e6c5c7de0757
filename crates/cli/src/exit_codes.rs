//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 60-69   | link             | Record linkage codes                     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `link_exit_code` or the relevant command

use reclink_linkage::LinkageError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Link (60-69)
// =============================================================================

/// Config file cannot be parsed or fails validation.
pub const EXIT_LINK_INVALID_CONFIG: u8 = 60;

/// A party's input file cannot be opened or read.
pub const EXIT_LINK_SOURCE: u8 = 61;

/// A record identifier appears twice within one party.
pub const EXIT_LINK_DUPLICATE_ID: u8 = 62;

/// A configured attribute position exceeds a record's field count.
pub const EXIT_LINK_ATTRIBUTE: u8 = 63;

/// The candidate pair file or report cannot be written.
pub const EXIT_LINK_OUTPUT: u8 = 64;

/// Map an engine error to its exit code.
pub fn link_exit_code(err: &LinkageError) -> u8 {
    match err {
        LinkageError::ConfigParse(_) | LinkageError::ConfigValidation(_) => EXIT_LINK_INVALID_CONFIG,
        LinkageError::SourceUnavailable { .. } => EXIT_LINK_SOURCE,
        LinkageError::DuplicateIdentifier { .. } => EXIT_LINK_DUPLICATE_ID,
        LinkageError::AttributeIndex { .. } => EXIT_LINK_ATTRIBUTE,
        LinkageError::Output(_) => EXIT_LINK_OUTPUT,
        LinkageError::IndexMismatch(_) => EXIT_ERROR,
    }
}
