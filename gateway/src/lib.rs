//! Library surface for the `gateway` binary, split out so integration
//! tests in other crates can drive the dispatch/remote/state/ws plumbing
//! directly instead of spawning the whole process.

pub mod dispatch;
pub mod remote;
pub mod state;
pub mod ws;
