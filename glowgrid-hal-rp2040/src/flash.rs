//! Flash-backed preference store for RP2040.
//!
//! Uses sequential-storage for wear-leveled key-value storage in the last
//! 16KB of flash. Values are stored as 4 little-endian bytes.
//!
//! Implements the `PrefsStore` trait from `glowgrid-hal`.

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

pub use glowgrid_hal::{PrefKey, PrefsError, PrefsStore};

/// Total flash on the board.
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
/// Space reserved for preferences at the end of flash.
pub const PREFS_PARTITION_SIZE: usize = 16 * 1024;

/// Flash range holding the preference partition.
pub const PREFS_RANGE: core::ops::Range<u32> =
    ((FLASH_SIZE - PREFS_PARTITION_SIZE) as u32)..(FLASH_SIZE as u32);

/// Scratch size for sequential-storage item headers plus a 4-byte value.
const ITEM_BUFFER_SIZE: usize = 32;

/// RP2040 preference store.
pub struct FlashPrefsStore<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
}

impl<'d> FlashPrefsStore<'d> {
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
        }
    }
}

impl PrefsStore for FlashPrefsStore<'_> {
    async fn load(&mut self, key: PrefKey) -> Result<Option<u32>, PrefsError> {
        let mut item_buffer = [0u8; ITEM_BUFFER_SIZE];

        let result = map::fetch_item::<PrefKey, &[u8], _>(
            &mut self.flash,
            PREFS_RANGE,
            &mut NoCache::new(),
            &mut item_buffer,
            &key,
        )
        .await;

        match result {
            Ok(Some(data)) => {
                let bytes: [u8; 4] = data.try_into().map_err(|_| PrefsError::Corrupted)?;
                Ok(Some(u32::from_le_bytes(bytes)))
            }
            Ok(None) => Ok(None),
            Err(_) => Err(PrefsError::Storage),
        }
    }

    async fn store(&mut self, key: PrefKey, value: u32) -> Result<(), PrefsError> {
        let mut item_buffer = [0u8; ITEM_BUFFER_SIZE];
        let bytes = value.to_le_bytes();

        map::store_item(
            &mut self.flash,
            PREFS_RANGE,
            &mut NoCache::new(),
            &mut item_buffer,
            &key,
            &bytes.as_slice(),
        )
        .await
        .map_err(|e| match e {
            sequential_storage::Error::FullStorage => PrefsError::Full,
            sequential_storage::Error::Corrupted { .. } => PrefsError::Corrupted,
            _ => PrefsError::Storage,
        })
    }

    async fn remove(&mut self, key: PrefKey) -> Result<(), PrefsError> {
        let mut item_buffer = [0u8; ITEM_BUFFER_SIZE];

        map::remove_item(
            &mut self.flash,
            PREFS_RANGE,
            &mut NoCache::new(),
            &mut item_buffer,
            &key,
        )
        .await
        .map_err(|_| PrefsError::Storage)
    }
}
