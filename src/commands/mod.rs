//! CLI command implementations
//!
//! Each command takes the engine opened over the image file. Commands
//! that change the array return normally and leave persisting it to the
//! caller.

pub mod flash;
pub mod kill;
pub mod rpc;
pub mod sweep;
