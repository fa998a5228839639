//! Process exit codes, following BSD `sysexits.h`.
//!
//! Which failures land on which code is decided in `CliError::exit_code`.

pub const OK: i32 = 0;

/// Bad arguments: malformed or dangling node path, unknown field type,
/// `key=value` without the `=`.
pub const USAGE: i32 = 64;

/// The tree was refused: a structural rule (cycle, container nesting,
/// root escape) or save-time validation failed. Nothing was written.
pub const DATAERR: i32 = 65;

/// A schema file named on the command line does not exist.
pub const NOINPUT: i32 = 66;

/// The arena and the ordering lists disagree, or the editor process failed.
pub const SOFTWARE: i32 = 70;

/// The schema repository or an import/export file could not be read or written.
pub const IOERR: i32 = 74;

/// Broken settings file or field-type template file.
pub const CONFIG: i32 = 78;
