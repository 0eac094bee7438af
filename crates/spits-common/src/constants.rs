//! System-wide constants.

/// Maximum length of a table identifier, in bytes.
///
/// Matches the MySQL identifier limit so that names accepted here are
/// accepted by every supported backend.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Characters allowed in a table identifier besides ASCII alphanumerics.
pub const IDENTIFIER_EXTRA_CHARS: &[char] = &['_', '$'];
