//! Remote command dispatch
//!
//! An external controller posts a command id (and a parameter byte) into a
//! [`Mailbox`]. [`Dispatcher::dispatch`] looks the id up in a fixed-capacity
//! table, runs the matching handler and publishes its 16-bit result.
//!
//! Handlers take no arguments. The command set is closed ([`Rpc`]); the
//! resources the handlers act on are supplied through [`Handlers`], which
//! [`Board`] implements for the flash engine plus a buzzer.

mod board;
mod mailbox;
mod tone;

pub use board::Board;
pub use mailbox::{Mailbox, Response, Session};
pub use tone::Beeper;

use heapless::Vec;

use crate::error::{Error, Result};

/// Command id of the tone generator
pub const RPC_BEEP: u8 = 1;
/// Command id of the kill switch
pub const RPC_KILL: u8 = 66;

/// Capacity of the default dispatch table
pub const DISPATCH_TABLE_SIZE: usize = 4;

/// The commands a dispatch entry can name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rpc {
    /// Sound the buzzer, returns 1
    Beep,
    /// Set the kill switch, returns 1 on success and 0 on failure
    Kill,
}

impl Rpc {
    /// Run this command against `handlers`
    pub fn invoke<H: Handlers + ?Sized>(self, handlers: &mut H) -> u16 {
        match self {
            Self::Beep => handlers.beep(),
            Self::Kill => handlers.kill(),
        }
    }
}

/// Zero-argument handlers for every [`Rpc`] variant
pub trait Handlers {
    /// Handle [`Rpc::Beep`]
    fn beep(&mut self) -> u16;

    /// Handle [`Rpc::Kill`]
    fn kill(&mut self) -> u16;
}

/// One row of the dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchEntry {
    /// Command id matched against the mailbox
    pub id: u8,
    /// Command run on a match
    pub command: Rpc,
}

/// Fixed-capacity command table
pub struct Dispatcher<const N: usize = DISPATCH_TABLE_SIZE> {
    table: Vec<DispatchEntry, N>,
}

impl<const N: usize> Dispatcher<N> {
    /// Create an empty table
    pub const fn new() -> Self {
        Self { table: Vec::new() }
    }

    /// Add an entry after the existing ones
    pub fn register(&mut self, id: u8, command: Rpc) -> Result<()> {
        if self.lookup(id).is_some() {
            return Err(Error::DuplicateCommand(id));
        }
        self.table
            .push(DispatchEntry { id, command })
            .map_err(|_| Error::DispatchTableFull)?;
        log::debug!("registered command {} -> {:?}", id, command);
        Ok(())
    }

    /// Registered entries in registration order
    pub fn entries(&self) -> &[DispatchEntry] {
        &self.table
    }

    /// Command registered for `id`
    pub fn lookup(&self, id: u8) -> Option<Rpc> {
        self.table
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.command)
    }

    /// Serve the pending request in `mailbox`
    ///
    /// On a hit the handler's result is published and returned. On a miss
    /// every session cell is zeroed, a [`Response::Rejected`] is published and
    /// [`Error::UnknownCommand`] returned.
    pub fn dispatch<H: Handlers + ?Sized>(&self, mailbox: &Mailbox, handlers: &mut H) -> Result<u16> {
        let (id, param) = mailbox.pending().ok_or(Error::NoPendingRequest)?;

        let Some(command) = self.lookup(id) else {
            log::warn!("rejecting unknown command {} (param {})", id, param);
            mailbox.reject();
            return Err(Error::UnknownCommand(id));
        };

        log::debug!("dispatching command {} ({:?}), param {}", id, command, param);
        let retval = command.invoke(handlers);
        mailbox.complete(retval);
        Ok(retval)
    }
}

impl Dispatcher<DISPATCH_TABLE_SIZE> {
    /// Table with the standard commands: 1 = beep, 66 = kill
    pub fn with_defaults() -> Result<Self> {
        let mut dispatcher = Self::new();
        dispatcher.register(RPC_BEEP, Rpc::Beep)?;
        dispatcher.register(RPC_KILL, Rpc::Kill)?;
        Ok(dispatcher)
    }
}

impl<const N: usize> Default for Dispatcher<N> {
    fn default() -> Self {
        Self::new()
    }
}
