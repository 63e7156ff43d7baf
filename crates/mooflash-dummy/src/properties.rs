//! Engine, kill switch and dispatcher behaviour against the emulator

use mooflash_core::config::{FlashConfig, WaitPolicy};
use mooflash_core::killswitch::{KillSwitch, KILLED, KILL_SWITCH_ADDR};
use mooflash_core::protocol::{Flash, IdSelector};
use mooflash_core::rpc::{Beeper, Board, Dispatcher, Mailbox, Response, Rpc, Session};
use mooflash_core::spi::FlashAddress;
use mooflash_core::Error;

use crate::{DeviceTimings, DummyConfig, DummyFlash, SimDelay, ToggleCounter};

fn addr(a: u32) -> FlashAddress {
    FlashAddress::new(a).unwrap()
}

fn engine() -> Flash<DummyFlash> {
    Flash::new(DummyFlash::new_default())
}

fn board(dev: DummyFlash) -> Board<DummyFlash, ToggleCounter, SimDelay> {
    Board::new(
        Flash::new(dev),
        Beeper::new(ToggleCounter::default(), SimDelay::default()),
    )
}

#[test]
fn test_write_read_round_trip() {
    let mut flash = engine();
    for (i, value) in [0x00u8, 0x5A, 0xA5, 0x7F, 0xFF].into_iter().enumerate() {
        let a = addr(0x0100 + i as u32 * 0x1111);
        flash.write_byte(a, value).unwrap();
        assert_eq!(flash.read_byte(a), Ok(value));
    }
}

#[test]
fn test_program_only_clears_bits() {
    let mut flash = engine();
    flash.write_byte(addr(0x40), 0x0F).unwrap();
    assert_eq!(
        flash.write_byte(addr(0x40), 0xF0),
        Err(Error::VerifyFailed {
            addr: 0x40,
            wrote: 0xF0,
            read: 0x00
        })
    );
}

#[test]
fn test_erases_restore_ff() {
    let mut data = vec![0u8; 0x2_0000];
    data.iter_mut().enumerate().for_each(|(i, b)| *b = i as u8 & 0x7F);
    let mut flash = Flash::new(DummyFlash::with_data(DummyConfig::default(), &data));

    flash.erase_sector(addr(0x1234)).unwrap();
    let dev = flash.transport();
    assert!(dev.data()[0x1000..0x2000].iter().all(|&b| b == 0xFF));
    assert_ne!(dev.data()[0x0FFF], 0xFF);
    assert_ne!(dev.data()[0x2000], 0xFF);

    flash.erase_block_32k(addr(0x8001)).unwrap();
    assert!(flash.transport().data()[0x8000..0x1_0000].iter().all(|&b| b == 0xFF));

    flash.erase_block_64k(addr(0x1_FFFF)).unwrap();
    assert!(flash.transport().data()[0x1_0000..0x2_0000].iter().all(|&b| b == 0xFF));

    let mut buf = [0u8; 16];
    flash.read(addr(0x1_0000), &mut buf).unwrap();
    assert_eq!(buf, [0xFF; 16]);
}

#[test]
fn test_chip_erase_without_kill_switch_guard() {
    let config = FlashConfig {
        guard_kill_switch: false,
        ..FlashConfig::default()
    };
    let mut flash = Flash::with_config(
        DummyFlash::with_data(DummyConfig::default(), &[0u8; 64]),
        config,
    );
    flash.erase_chip().unwrap();
    assert!(flash.transport().data().iter().all(|&b| b == 0xFF));
}

#[test]
fn test_no_write_enable_no_change() {
    use mooflash_core::spi::opcodes;
    use mooflash_core::transport::Transport;

    let mut dev = DummyFlash::with_data(DummyConfig::default(), &[0x00; 0x1000]);
    let before = dev.data().to_vec();

    // Program and erase sent raw, with no WREN.
    for frame in [
        &[opcodes::BYTE_PROGRAM, 0x00, 0x20, 0x00, 0x00][..],
        &[opcodes::SE_20, 0x00, 0x00, 0x00][..],
        &[opcodes::CE_60][..],
    ] {
        dev.select();
        for &b in frame {
            dev.send_byte(b).unwrap();
        }
        dev.deselect();
    }
    assert_eq!(dev.data(), &before[..]);

    // WRDI cancels a preceding WREN.
    dev.select();
    dev.send_byte(opcodes::WREN).unwrap();
    dev.deselect();
    dev.select();
    dev.send_byte(opcodes::WRDI).unwrap();
    dev.deselect();
    dev.select();
    for b in [opcodes::SE_20, 0x00, 0x00, 0x00] {
        dev.send_byte(b).unwrap();
    }
    dev.deselect();
    assert_eq!(dev.data(), &before[..]);
}

#[test]
fn test_kill_is_monotonic() {
    let mut flash = engine();

    {
        let mut ks = KillSwitch::new(&mut flash);
        assert_eq!(ks.is_killed(), Ok(false));
        ks.kill().unwrap();
        assert_eq!(ks.is_killed(), Ok(true));
        // A second kill is a no-op.
        ks.kill().unwrap();
    }
    assert_eq!(
        flash.transport().data()[KILL_SWITCH_ADDR.value() as usize],
        KILLED
    );

    // Nothing the engine offers can erase the switch.
    assert_eq!(flash.erase_chip(), Err(Error::ReservedRegion));
    assert_eq!(flash.erase_sector(KILL_SWITCH_ADDR), Err(Error::ReservedRegion));
    assert_eq!(flash.erase_block_32k(addr(0x7_8000)), Err(Error::ReservedRegion));
    assert_eq!(flash.erase_block_64k(addr(0x7_0000)), Err(Error::ReservedRegion));
    // Neighbouring regions are still erasable.
    flash.erase_sector(addr(0x7_E000)).unwrap();

    assert_eq!(KillSwitch::new(&mut flash).is_killed(), Ok(true));
}

#[test]
fn test_relocated_kill_switch_survives_erase() {
    let config = FlashConfig {
        kill_switch: addr(0x3_FFFF),
        ..FlashConfig::default()
    };
    assert_eq!(config.validate(), Ok(()));
    let mut flash = Flash::with_config(DummyFlash::new_default(), config);

    let mut ks = KillSwitch::new(&mut flash);
    assert_eq!(ks.address(), addr(0x3_FFFF));
    ks.kill().unwrap();

    // Erasing the default location is allowed and does not touch the switch.
    flash.erase_sector(addr(0x7_F000)).unwrap();
    assert_eq!(flash.erase_sector(addr(0x3_F000)), Err(Error::ReservedRegion));
    assert_eq!(flash.erase_chip(), Err(Error::ReservedRegion));

    assert_eq!(KillSwitch::new(&mut flash).is_killed(), Ok(true));
    assert_eq!(flash.transport().data()[0x3_FFFF], KILLED);
}

#[test]
fn test_kill_on_smaller_chip() {
    let size = 256 * 1024;
    let device = DummyFlash::new(DummyConfig {
        size: size as usize,
        ..DummyConfig::default()
    });
    let config = FlashConfig {
        size,
        kill_switch: addr(size - 1),
        ..FlashConfig::default()
    };
    assert_eq!(config.validate(), Ok(()));
    let mut flash = Flash::with_config(device, config);

    KillSwitch::new(&mut flash).kill().unwrap();
    assert_eq!(KillSwitch::new(&mut flash).is_killed(), Ok(true));
    assert_eq!(flash.erase_block_64k(addr(0x3_0000)), Err(Error::ReservedRegion));
    assert_eq!(KillSwitch::new(&mut flash).is_killed(), Ok(true));
}

#[test]
fn test_kill_survives_reload() {
    let mut flash = engine();
    KillSwitch::new(&mut flash).kill().unwrap();
    let image = flash.into_inner().data().to_vec();

    let mut reloaded = Flash::new(DummyFlash::with_data(DummyConfig::default(), &image));
    assert_eq!(KillSwitch::new(&mut reloaded).is_killed(), Ok(true));
}

#[test]
fn test_dispatch_default_commands() {
    let dispatcher = Dispatcher::with_defaults().unwrap();
    let mailbox = Mailbox::new();
    let mut board = board(DummyFlash::new_default());

    mailbox.request(1, 0).unwrap();
    assert_eq!(dispatcher.dispatch(&mailbox, &mut board), Ok(1));
    assert_eq!(mailbox.take_response(), Some(Response::Done(1)));
    assert_eq!(board.beeper.config().cycles, 500);
    assert_eq!(board.kill_switch().is_killed(), Ok(false));

    mailbox.request(66, 0).unwrap();
    assert_eq!(dispatcher.dispatch(&mailbox, &mut board), Ok(1));
    assert_eq!(mailbox.session().retval, 1);
    assert!(!mailbox.session().in_progress);
    assert_eq!(mailbox.take_response(), Some(Response::Done(1)));
    assert_eq!(board.kill_switch().is_killed(), Ok(true));
}

#[test]
fn test_dispatch_kill_reports_failure() {
    // Protected and never unprotected: programming the marker fails.
    let config = DummyConfig {
        initial_status: 0x1C,
        ..DummyConfig::default()
    };
    let dispatcher = Dispatcher::with_defaults().unwrap();
    let mailbox = Mailbox::new();
    let mut board = board(DummyFlash::new(config));

    mailbox.request(66, 0).unwrap();
    assert_eq!(dispatcher.dispatch(&mailbox, &mut board), Ok(0));
    assert_eq!(mailbox.take_response(), Some(Response::Done(0)));
    assert_eq!(board.kill_switch().is_killed(), Ok(false));
}

#[test]
fn test_dispatch_unknown_zeroes_session() {
    let dispatcher = Dispatcher::with_defaults().unwrap();
    let mailbox = Mailbox::new();
    let mut board = board(DummyFlash::new_default());

    mailbox.request(255, 3).unwrap();
    assert_eq!(
        dispatcher.dispatch(&mailbox, &mut board),
        Err(Error::UnknownCommand(255))
    );
    assert_eq!(mailbox.session(), Session::default());
    assert_eq!(mailbox.take_response(), Some(Response::Rejected));
    // The kill switch was not touched.
    assert_eq!(board.flash.transport().executed().len(), 0);
}

#[test]
fn test_registered_ids_resolve() {
    let mut dispatcher = Dispatcher::<4>::new();
    dispatcher.register(1, Rpc::Beep).unwrap();
    dispatcher.register(66, Rpc::Kill).unwrap();
    assert_eq!(dispatcher.lookup(1), Some(Rpc::Beep));
    assert_eq!(dispatcher.lookup(66), Some(Rpc::Kill));
    assert_eq!(dispatcher.lookup(2), None);
}

#[test]
fn test_read_id_is_stable() {
    let mut flash = engine();
    for _ in 0..3 {
        assert_eq!(flash.read_id(IdSelector::Manufacturer), Ok(0xBF));
        assert_eq!(flash.read_id(IdSelector::Device), Ok(0x04));
    }
}

#[test]
fn test_slow_device_reports_busy() {
    let config = DummyConfig {
        timings: DeviceTimings {
            byte_program_us: 5_000,
            ..DeviceTimings::default()
        },
        ..DummyConfig::default()
    };

    let mut fixed = Flash::new(DummyFlash::new(config.clone()));
    assert_eq!(fixed.write_byte(addr(0x10), 0x00), Err(Error::DeviceBusy));

    let polling = FlashConfig {
        wait: WaitPolicy::PollBusy { interval_us: 10 },
        ..FlashConfig::default()
    };
    let mut polled = Flash::with_config(DummyFlash::new(config), polling);
    assert_eq!(polled.write_byte(addr(0x10), 0x00), Err(Error::DeviceBusy));
}

#[test]
fn test_polling_finishes_early() {
    let polling = FlashConfig {
        wait: WaitPolicy::PollBusy { interval_us: 1_000 },
        ..FlashConfig::default()
    };
    let mut flash = Flash::with_config(DummyFlash::new_default(), polling);
    flash.erase_sector(addr(0)).unwrap();
    // Device finishes in 20ms; the budget is 75ms.
    assert!(flash.transport().now_us() < 25_000);
}

#[test]
fn test_unprotect_then_write() {
    let config = DummyConfig {
        initial_status: 0x9C,
        ..DummyConfig::default()
    };
    let mut flash = Flash::new(DummyFlash::new(config));
    assert!(flash.status().unwrap().is_protected());

    flash.unprotect().unwrap();
    assert_eq!(flash.read_status_register(), Ok(0x00));
    flash.write_byte(addr(0x0300), 0x12).unwrap();
    assert_eq!(flash.read_byte(addr(0x0300)), Ok(0x12));
}

#[test]
fn test_out_of_bounds_rejected() {
    let mut flash = engine();
    assert_eq!(flash.read_byte(addr(0x08_0000)), Err(Error::AddressOutOfBounds));
    assert_eq!(
        flash.write_byte(addr(0x08_0000), 0x00),
        Err(Error::AddressOutOfBounds)
    );
    let mut buf = [0u8; 2];
    assert_eq!(
        flash.read(KILL_SWITCH_ADDR, &mut buf),
        Err(Error::AddressOutOfBounds)
    );
    assert!(flash.transport().executed().is_empty());
}
