//! Persistent preference storage.
//!
//! A handful of `u32` values survive reboots: the power override, the color
//! correction, the mounting rotation, brightness, and dithering. The store
//! is read once at boot and written only from the main loop when a command
//! changed something.

/// Keys for persisted preferences.
///
/// Every key holds a `u32`; the encodings are defined next to the types
/// they persist (packed RGB for the correction, degrees for the rotation,
/// milliamps for the power override).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PrefKey {
    /// Host-forced USB current belief.
    PowerOverride = 0,
    /// Packed `R<<16|G<<8|B` color correction.
    ColorCorrection = 1,
    /// Matrix mounting rotation in degrees.
    Rotation = 2,
    /// User brightness.
    Brightness = 3,
    /// Binary dithering on/off.
    Dither = 4,
}

impl PrefKey {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PrefKey::PowerOverride),
            1 => Some(PrefKey::ColorCorrection),
            2 => Some(PrefKey::Rotation),
            3 => Some(PrefKey::Brightness),
            4 => Some(PrefKey::Dither),
            _ => None,
        }
    }
}

/// Errors from preference storage operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PrefsError {
    /// Underlying flash operation failed.
    Storage,
    /// Stored data did not decode.
    Corrupted,
    /// Storage is full.
    Full,
}

/// Wear-leveled key/value preference store.
pub trait PrefsStore {
    /// Read a preference; `None` when the key was never written or was
    /// removed.
    async fn load(&mut self, key: PrefKey) -> Result<Option<u32>, PrefsError>;

    /// Write a preference.
    async fn store(&mut self, key: PrefKey, value: u32) -> Result<(), PrefsError>;

    /// Remove a preference so the default applies again.
    async fn remove(&mut self, key: PrefKey) -> Result<(), PrefsError>;
}

// Key encoding for sequential-storage backed implementations.
#[cfg(feature = "sequential-storage")]
impl sequential_storage::map::Key for PrefKey {
    fn serialize_into(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        buffer[0] = self.as_u8();
        Ok(1)
    }

    fn deserialize_from(
        buffer: &[u8],
    ) -> Result<(Self, usize), sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        match PrefKey::from_u8(buffer[0]) {
            Some(key) => Ok((key, 1)),
            None => Err(sequential_storage::map::SerializationError::InvalidFormat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trip() {
        for key in [
            PrefKey::PowerOverride,
            PrefKey::ColorCorrection,
            PrefKey::Rotation,
            PrefKey::Brightness,
            PrefKey::Dither,
        ] {
            assert_eq!(PrefKey::from_u8(key.as_u8()), Some(key));
        }
        assert_eq!(PrefKey::from_u8(99), None);
    }
}
