//! Flash command protocol
//!
//! This module contains the SST25 command sequences layered on a
//! [`Transport`](crate::transport::Transport).

mod sst25;

pub use sst25::*;
