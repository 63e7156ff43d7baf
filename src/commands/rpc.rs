//! Remote command dispatch against the emulated board

use mooflash_core::config::ToneConfig;
use mooflash_core::protocol::Flash;
use mooflash_core::rpc::{Beeper, Board, Dispatcher, Mailbox, Response};
use mooflash_core::transport::Transport;
use mooflash_dummy::{SimDelay, ToggleCounter};

use crate::error::Result;

/// Post `id` with `param` and serve it with the standard dispatch table
///
/// Returns the handler's result. Unknown ids surface as
/// [`mooflash_core::Error::UnknownCommand`] once the rejection is printed.
pub fn run_rpc<T: Transport>(
    flash: &mut Flash<T>,
    tone: ToneConfig,
    id: u8,
    param: u8,
) -> Result<u16> {
    let config = *flash.config();
    let mut board = Board::new(
        Flash::with_config(flash.transport_mut(), config),
        Beeper::with_config(ToggleCounter::default(), SimDelay::default(), tone),
    );
    let dispatcher = Dispatcher::with_defaults()?;
    let mailbox = Mailbox::new();

    mailbox.request(id, param)?;
    let outcome = dispatcher.dispatch(&mailbox, &mut board);
    let session = mailbox.session();

    match mailbox.take_response() {
        Some(Response::Done(retval)) => println!("command {} returned {}", id, retval),
        Some(Response::Rejected) => println!("command {} rejected", id),
        None => {}
    }
    println!(
        "session: command={} param={} in_progress={} retval={}",
        session.command, session.param, session.in_progress, session.retval
    );

    let (pin, delay) = board.beeper.release();
    log::debug!(
        "tone pin rose {} times over {}us",
        pin.rising_edges(),
        delay.elapsed_ns() / 1_000
    );

    Ok(outcome?)
}
