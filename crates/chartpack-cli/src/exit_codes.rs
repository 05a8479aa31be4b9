//! Process exit codes
//!
//! A pipeline step either produces its artifact or fails; there is no
//! partial success, so every failure shares one code.

/// Success - the archive was created and reported
pub const SUCCESS: i32 = 0;

/// Any failure: bad input, missing file, tool error, no artifact found
pub const ERROR: i32 = 1;
