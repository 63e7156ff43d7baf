//! Kill switch commands

use mooflash_core::killswitch::KillSwitch;
use mooflash_core::protocol::Flash;
use mooflash_core::transport::Transport;

use crate::error::Result;

/// Set the kill switch
pub fn run_kill<T: Transport>(flash: &mut Flash<T>) -> Result<()> {
    let mut switch = KillSwitch::new(flash);
    let was_killed = switch.is_killed()?;
    switch.kill()?;
    if was_killed {
        println!("Already killed (kill switch at {})", switch.address());
    } else {
        println!("Killed (kill switch at {})", switch.address());
    }
    Ok(())
}

/// Print whether the kill switch is set
pub fn run_is_killed<T: Transport>(flash: &mut Flash<T>) -> Result<()> {
    let mut switch = KillSwitch::new(flash);
    let value = switch.value()?;
    println!(
        "{} (value {})",
        if value != 0 { "killed" } else { "alive" },
        value
    );
    Ok(())
}
