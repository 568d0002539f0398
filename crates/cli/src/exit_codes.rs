//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `vglink` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | link             | Linkage-specific codes                   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use visigrid_linkage::LinkageError;

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
// Link (3-9)
// =============================================================================

/// Config failed to parse or validate (bad bounds, unknown blocking field,
/// mismatched comparable fields).
pub const EXIT_LINK_INVALID_CONFIG: u8 = 3;

/// Runtime failure: unreadable file, malformed CSV, missing column, write error.
pub const EXIT_LINK_RUNTIME: u8 = 4;

/// Training corpus unusable: empty label set, bad or out-of-range known link.
pub const EXIT_LINK_TRAINING: u8 = 5;

/// Run succeeded but left pairs for clerical review (`--fail-on-possible`).
pub const EXIT_LINK_POSSIBLES: u8 = 6;

/// Map an engine error to its exit code.
pub fn linkage_exit_code(err: &LinkageError) -> u8 {
    if err.is_training() {
        return EXIT_LINK_TRAINING;
    }
    match err {
        LinkageError::ConfigParse(_)
        | LinkageError::ConfigValidation(_)
        | LinkageError::BoundOutOfRange { .. }
        | LinkageError::SchemaMismatch { .. }
        | LinkageError::UnknownField(_) => EXIT_LINK_INVALID_CONFIG,
        LinkageError::MissingColumn { .. } | LinkageError::Io(_) => EXIT_LINK_RUNTIME,
        _ => EXIT_ERROR,
    }
}
