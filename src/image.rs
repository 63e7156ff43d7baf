//! Emulated chip backed by an image file
//!
//! The flash array lives in a plain binary file between runs, so a kill
//! switch set in one invocation is still set in the next. Missing files
//! start as an erased chip; short files are padded with 0xFF.
//!
//! The status register's block protection bits are non-volatile on the
//! real part. They are kept in a one-byte sidecar next to the image
//! (`<image>.status`); without one, `[device] initial_status` applies.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use mooflash_core::protocol::Flash;
use mooflash_core::spi::StatusRegister;
use mooflash_core::transport::{RxLatch, SpiTransport};
use mooflash_dummy::{DummyConfig, DummyFlash, LatchedPort};

use crate::config::Settings;
use crate::error::{CliError, Result};

/// Engine over the emulator, wired through the latched serial transport
pub type HostFlash<'a> = Flash<SpiTransport<'a, LatchedPort<'a>>>;

/// Path of the status sidecar for the image at `path`
pub fn status_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".status");
    PathBuf::from(name)
}

fn load_status(path: &Path) -> Result<Option<u8>> {
    let sidecar = status_path(path);
    match fs::read(&sidecar) {
        Ok(bytes) => match bytes.as_slice() {
            [status] => Ok(Some(*status & StatusRegister::PROTECTION.bits())),
            _ => Err(CliError::InvalidParameter(format!(
                "{} must hold exactly one byte",
                sidecar.display()
            ))),
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(CliError::ReadFailed {
            path: sidecar,
            source,
        }),
    }
}

/// Load the emulated chip from `path`
pub fn load_device(path: &Path, defaults: &DummyConfig) -> Result<DummyFlash> {
    let mut config = defaults.clone();
    if let Some(status) = load_status(path)? {
        log::debug!("restored block protection 0x{:02X}", status);
        config.initial_status = status;
    }

    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!("{} not found, starting with an erased chip", path.display());
            return Ok(DummyFlash::new(config));
        }
        Err(source) => {
            return Err(CliError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if data.len() > config.size {
        return Err(CliError::ImageSize {
            path: path.to_path_buf(),
            actual: data.len(),
            expected: config.size,
        });
    }
    log::debug!("loaded {} bytes from {}", data.len(), path.display());
    Ok(DummyFlash::with_data(config, &data))
}

/// Write the emulated chip's array to `path` and its protection to the sidecar
pub fn save_device(path: &Path, device: &DummyFlash) -> Result<()> {
    fs::write(path, device.data()).map_err(|source| CliError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let sidecar = status_path(path);
    fs::write(&sidecar, [device.protection()])
        .map_err(|source| CliError::WriteFailed { path: sidecar, source })?;
    log::debug!("saved {} bytes to {}", device.data().len(), path.display());
    Ok(())
}

/// Open the engine over the image at `path`
pub fn open<'a>(settings: &Settings, path: &Path, latch: &'a RxLatch) -> Result<HostFlash<'a>> {
    let device = load_device(path, &settings.device)?;
    let port = LatchedPort::new(device, latch);
    let transport = SpiTransport::with_spin_limit(port, latch, settings.spin_limit);
    Ok(Flash::with_config(transport, settings.flash))
}

/// Persist the engine's chip back to `path`
pub fn close(flash: HostFlash<'_>, path: &Path) -> Result<()> {
    let device = flash.into_inner().into_inner().into_inner();
    save_device(path, &device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mooflash_core::killswitch::KillSwitch;

    fn temp_image(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("mooflash-{}-{}.img", name, std::process::id()));
        let _ = fs::remove_file(&path);
        let _ = fs::remove_file(status_path(&path));
        path
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_file(path);
        let _ = fs::remove_file(status_path(path));
    }

    #[test]
    fn test_missing_image_is_erased() {
        let path = temp_image("missing");
        let device = load_device(&path, &DummyConfig::default()).unwrap();
        assert!(device.data().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_short_image_is_padded() {
        let path = temp_image("short");
        fs::write(&path, [0x11, 0x22]).unwrap();
        let device = load_device(&path, &DummyConfig::default()).unwrap();
        assert_eq!(&device.data()[..3], &[0x11, 0x22, 0xFF]);
        assert_eq!(device.data().len(), 512 * 1024);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_oversized_image_rejected() {
        let path = temp_image("oversized");
        let config = DummyConfig {
            size: 16,
            ..DummyConfig::default()
        };
        fs::write(&path, [0u8; 32]).unwrap();
        assert!(matches!(
            load_device(&path, &config),
            Err(CliError::ImageSize { actual: 32, .. })
        ));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_kill_persists_across_runs() {
        let path = temp_image("kill");
        let settings = Settings::default();
        let latch = RxLatch::new();

        let mut flash = open(&settings, &path, &latch).unwrap();
        KillSwitch::new(&mut flash).kill().unwrap();
        close(flash, &path).unwrap();

        let mut flash = open(&settings, &path, &latch).unwrap();
        assert_eq!(KillSwitch::new(&mut flash).is_killed(), Ok(true));
        cleanup(&path);
    }

    #[test]
    fn test_unprotect_persists_across_runs() {
        let path = temp_image("unprotect");
        let mut settings = Settings::default();
        settings.device.initial_status = 0x1C;
        let latch = RxLatch::new();

        let mut flash = open(&settings, &path, &latch).unwrap();
        assert!(flash.status().unwrap().is_protected());
        flash.unprotect().unwrap();
        close(flash, &path).unwrap();
        assert_eq!(fs::read(status_path(&path)).unwrap(), vec![0x00]);

        // The sidecar wins over the configured power-up status.
        let mut flash = open(&settings, &path, &latch).unwrap();
        assert!(!flash.status().unwrap().is_protected());
        close(flash, &path).unwrap();

        fs::write(status_path(&path), [0x9C | 0x03]).unwrap();
        let mut flash = open(&Settings::default(), &path, &latch).unwrap();
        assert_eq!(flash.read_status_register(), Ok(0x9C));
        cleanup(&path);
    }

    #[test]
    fn test_bad_sidecar_rejected() {
        let path = temp_image("sidecar");
        fs::write(status_path(&path), [0x00, 0x00]).unwrap();
        assert!(matches!(
            load_device(&path, &DummyConfig::default()),
            Err(CliError::InvalidParameter(_))
        ));
        cleanup(&path);
    }
}
