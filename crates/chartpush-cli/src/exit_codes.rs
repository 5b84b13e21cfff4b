//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Selection error - repository or revision range could not be resolved
pub const SELECTION_ERROR: i32 = 3;

/// Package error - a chart failed to package (with --fail-on-error)
pub const PACKAGE_ERROR: i32 = 4;

/// IO error - chart root unreadable, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Upload error - a chart failed to upload (with --fail-on-error)
pub const UPLOAD_ERROR: i32 = 6;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
