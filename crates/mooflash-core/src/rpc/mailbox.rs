//! Single-slot request/response mailbox

use core::cell::Cell;

use critical_section::Mutex;

use crate::error::{Error, Result};

/// The four command/response cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    /// Pending command id
    pub command: u8,
    /// Pending parameter byte
    pub param: u8,
    /// Set by the requester, cleared when the response is published
    pub in_progress: bool,
    /// Last handler return value
    pub retval: u16,
}

/// Outcome of a dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Handler ran and returned this value
    Done(u16),
    /// No handler is registered for the command id
    Rejected,
}

#[derive(Clone, Copy, Default)]
struct Slot {
    session: Session,
    response: Option<Response>,
}

/// Request/response hand-off between a requester and the dispatcher
///
/// Holds exactly one call. Every update happens inside a critical section,
/// so a reader never observes a half-written session.
pub struct Mailbox {
    slot: Mutex<Cell<Slot>>,
}

impl Mailbox {
    /// Create an idle mailbox (usable in a `static`)
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(Slot {
                session: Session {
                    command: 0,
                    param: 0,
                    in_progress: false,
                    retval: 0,
                },
                response: None,
            })),
        }
    }

    fn update<R>(&self, f: impl FnOnce(&mut Slot) -> R) -> R {
        critical_section::with(|cs| {
            let cell = self.slot.borrow(cs);
            let mut slot = cell.get();
            let result = f(&mut slot);
            cell.set(slot);
            result
        })
    }

    /// Post a command
    ///
    /// Fails with [`Error::SessionBusy`] while a call is in flight or its
    /// response has not been taken.
    pub fn request(&self, command: u8, param: u8) -> Result<()> {
        self.update(|slot| {
            if slot.session.in_progress || slot.response.is_some() {
                return Err(Error::SessionBusy);
            }
            slot.session = Session {
                command,
                param,
                in_progress: true,
                retval: 0,
            };
            Ok(())
        })
    }

    /// Command id and parameter awaiting dispatch
    pub fn pending(&self) -> Option<(u8, u8)> {
        self.update(|slot| {
            (slot.session.in_progress && slot.response.is_none())
                .then_some((slot.session.command, slot.session.param))
        })
    }

    /// Publish a handler result and clear the in-progress flag
    pub fn complete(&self, retval: u16) {
        self.update(|slot| {
            slot.session.retval = retval;
            slot.session.in_progress = false;
            slot.response = Some(Response::Done(retval));
        })
    }

    /// Reset every cell to zero and mark the request rejected
    pub fn reject(&self) {
        self.update(|slot| {
            slot.session = Session::default();
            slot.response = Some(Response::Rejected);
        })
    }

    /// Consume the published response, freeing the mailbox
    pub fn take_response(&self) -> Option<Response> {
        self.update(|slot| slot.response.take())
    }

    /// Snapshot of the four cells
    pub fn session(&self) -> Session {
        self.update(|slot| slot.session)
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
