//! 2.4 GHz channel / centre-frequency table

use crate::{ReplayError, Result};

/// Centre frequencies (MHz) of the 2.4 GHz channels 1 through 14.
///
/// Position + 1 is the channel number. Values are kept at full 16-bit width:
/// every entry is above 2400 and would not survive a narrower type.
pub const FREQUENCIES_24GHZ: [u16; 14] =
    [2412, 2417, 2422, 2427, 2432, 2437, 2442, 2447, 2452, 2457, 2462, 2467, 2472, 2484];

/// Map a centre frequency to its 2.4 GHz channel number.
///
/// Scans [`FREQUENCIES_24GHZ`] in order and returns the 1-based position of
/// the first exact match.
pub fn frequency_to_channel(frequency: u16) -> Result<u8> {
    FREQUENCIES_24GHZ
        .iter()
        .position(|&candidate| candidate == frequency)
        .map(|index| index as u8 + 1)
        .ok_or(ReplayError::FrequencyNotFound { frequency })
}

/// Centre frequency of a 2.4 GHz channel, if the channel exists.
pub fn channel_to_frequency(channel: u8) -> Option<u16> {
    let index = usize::from(channel).checked_sub(1)?;
    FREQUENCIES_24GHZ.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_frequencies_map_to_channels() {
        assert_eq!(frequency_to_channel(2412).unwrap(), 1);
        assert_eq!(frequency_to_channel(2437).unwrap(), 6);
        assert_eq!(frequency_to_channel(2472).unwrap(), 13);
        assert_eq!(frequency_to_channel(2484).unwrap(), 14);
    }

    #[test]
    fn unlisted_frequency_is_rejected() {
        for frequency in [0, 2400, 2413, 2500, 5180] {
            assert!(matches!(
                frequency_to_channel(frequency),
                Err(ReplayError::FrequencyNotFound { frequency: f }) if f == frequency
            ));
        }
    }

    #[test]
    fn low_byte_collisions_do_not_match() {
        // 2412 & 0xff == 108; a byte-wide comparison would confuse these.
        assert!(frequency_to_channel(108).is_err());
        assert!(frequency_to_channel(2412 + 256).is_err());
    }

    #[test]
    fn table_index_maps_to_channel_plus_one() {
        for (index, &frequency) in FREQUENCIES_24GHZ.iter().enumerate() {
            assert_eq!(frequency_to_channel(frequency).unwrap() as usize, index + 1);
            assert_eq!(channel_to_frequency(index as u8 + 1), Some(frequency));
        }
        assert_eq!(channel_to_frequency(0), None);
        assert_eq!(channel_to_frequency(15), None);
    }
}
