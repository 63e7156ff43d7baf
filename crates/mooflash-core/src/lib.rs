//! mooflash-core - SST25 serial flash engine and remote command dispatch
//!
//! This crate drives an external SST25WF040 serial NOR flash over a
//! byte-oriented synchronous serial bus, persists a one-way kill switch in
//! that flash, and dispatches numeric remote commands to local handlers.
//! It is `no_std` and allocation free.
//!
//! # Features
//!
//! - `std` - Enable `std::error::Error` and serde support for configuration
//!
//! # Example
//!
//! ```ignore
//! use mooflash_core::protocol::Flash;
//! use mooflash_core::killswitch::KillSwitch;
//!
//! fn disable_unit<T: mooflash_core::transport::Transport>(flash: &mut Flash<T>) {
//!     let mut switch = KillSwitch::new(flash);
//!     match switch.kill() {
//!         Ok(()) => log::info!("unit disabled"),
//!         Err(e) => log::error!("kill failed: {}", e),
//!     }
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod error;
pub mod killswitch;
pub mod protocol;
pub mod rpc;
pub mod spi;
pub mod transport;

pub use error::{Error, Result};
