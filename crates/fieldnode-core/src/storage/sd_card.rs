use embedded_sdmmc::{Mode, SdCard, SdCardError, TimeSource, VolumeIdx, VolumeManager};
use log::{debug, warn};

use super::{LogMedium, StorageError};

/// SD card on an SPI bus, accessed through a FAT volume.
///
/// The card is not kept open between calls. Every call builds a fresh card
/// and volume session from the borrowed bus, so the card is re-initialized
/// on every access and a card swapped between ticks is simply picked up.
///
/// Only the root directory of the first volume is used; a leading `/` in a
/// path is ignored and names must fit 8.3.
pub struct SdCardMedium<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource + Clone,
{
    spi: S,
    delay: D,
    time_source: T,
}

impl<S, D, T> SdCardMedium<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource + Clone,
{
    pub fn new(spi: S, delay: D, time_source: T) -> Self {
        Self {
            spi,
            delay,
            time_source,
        }
    }

    fn volume_manager(&mut self) -> VolumeManager<SdCard<&mut S, &mut D>, T, 4, 4, 1> {
        let card = SdCard::new(&mut self.spi, &mut self.delay);
        VolumeManager::new(card, self.time_source.clone())
    }
}

fn file_name(path: &str) -> Result<&str, StorageError> {
    let name = path.trim_start_matches('/');
    if name.is_empty() || name.contains('/') {
        return Err(StorageError::InvalidName);
    }
    Ok(name)
}

fn log_sd_error(operation: &str, e: &embedded_sdmmc::Error<SdCardError>) {
    warn!("SD card {} failed: {:?}", operation, e);
}

impl<S, D, T> LogMedium for SdCardMedium<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource + Clone,
{
    fn reinitialize(&mut self) -> Result<(), StorageError> {
        let card = SdCard::new(&mut self.spi, &mut self.delay);
        // Reading the size forces the init sequence.
        let bytes = card.num_bytes().map_err(|e| {
            warn!("SD card init failed: {:?}", e);
            StorageError::Unavailable
        })?;
        debug!("SD card ready, {} bytes", bytes);
        Ok(())
    }

    fn exists(&mut self, path: &str) -> Result<bool, StorageError> {
        let name = file_name(path)?;
        let volume_mgr = self.volume_manager();

        let volume0 = volume_mgr.open_volume(VolumeIdx(0)).map_err(|e| {
            log_sd_error("open volume", &e);
            StorageError::Unavailable
        })?;
        let root_dir = volume0.open_root_dir().map_err(|e| {
            log_sd_error("open root", &e);
            StorageError::Unavailable
        })?;

        let found = match root_dir.find_directory_entry(name) {
            Ok(_) => Ok(true),
            Err(embedded_sdmmc::Error::NotFound) => Ok(false),
            Err(e) => {
                log_sd_error("directory lookup", &e);
                Err(StorageError::Unavailable)
            }
        };

        root_dir.close().map_err(|_| StorageError::CloseFailed)?;
        volume0.close().map_err(|_| StorageError::CloseFailed)?;
        found
    }

    fn append(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let name = file_name(path)?;
        let volume_mgr = self.volume_manager();

        let volume0 = volume_mgr.open_volume(VolumeIdx(0)).map_err(|e| {
            log_sd_error("open volume", &e);
            StorageError::Unavailable
        })?;
        let root_dir = volume0.open_root_dir().map_err(|e| {
            log_sd_error("open root", &e);
            StorageError::Unavailable
        })?;
        let file = root_dir
            .open_file_in_dir(name, Mode::ReadWriteCreateOrAppend)
            .map_err(|e| {
                log_sd_error("open file", &e);
                StorageError::OpenFailed
            })?;

        file.write(data).map_err(|e| {
            log_sd_error("write", &e);
            StorageError::WriteFailed
        })?;
        file.flush().map_err(|e| {
            log_sd_error("flush", &e);
            StorageError::WriteFailed
        })?;

        file.close().map_err(|_| StorageError::CloseFailed)?;
        root_dir.close().map_err(|_| StorageError::CloseFailed)?;
        volume0.close().map_err(|_| StorageError::CloseFailed)?;

        Ok(())
    }

    fn release(&mut self) {
        // Sessions end with each call; nothing is held between cycles.
    }
}
