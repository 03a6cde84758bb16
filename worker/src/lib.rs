//! Library surface for the `worker` binary, split out so integration
//! tests in other crates can drive handler dispatch directly instead of
//! spawning the whole process.

pub mod handlers;
pub mod session;
