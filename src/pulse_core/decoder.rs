//! Fixed-width frame decoding
//!
//! Each packed word carries a 12-bit ADC amplitude in its low bits and a
//! 2-bit gain code in bits 12-13.

/// Number of time samples in one digitized frame
pub const NUM_SAMPLES: usize = 10;

const AMPLITUDE_MASK: u16 = 0xFFF;
const GAIN_SHIFT: u16 = 12;
const GAIN_MASK: u16 = 0x3;

/// One channel's pulse for one event, decoded
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub id: u32,
    pub pulse: [f32; NUM_SAMPLES],
    pub gain: [u8; NUM_SAMPLES],
    /// Mean amplitude of the leading pedestal samples
    pub pedestal: f32,
    /// Bit `g` set if any sample was digitized at gain `g`
    pub gain_mask: u16,
}

impl DecodedFrame {
    /// Highest amplitude above the pedestal
    pub fn peak_above_pedestal(&self) -> f32 {
        let max = self.pulse.iter().copied().fold(f32::MIN, f32::max);
        max - self.pedestal
    }
}

/// Decode a packed frame.
///
/// `pedestal_samples` must be in `1..=NUM_SAMPLES`; this is checked once by
/// `ProcessorConfig::validate` and not per frame.
pub fn decode_frame(id: u32, words: &[u16; NUM_SAMPLES], pedestal_samples: usize) -> DecodedFrame {
    let mut pulse = [0.0f32; NUM_SAMPLES];
    let mut gain = [0u8; NUM_SAMPLES];
    let mut gain_mask = 0u16;

    for (j, word) in words.iter().enumerate() {
        pulse[j] = f32::from(word & AMPLITUDE_MASK);
        gain[j] = ((word >> GAIN_SHIFT) & GAIN_MASK) as u8;
        gain_mask |= 1 << gain[j];
    }

    let pedestal = pulse[..pedestal_samples].iter().sum::<f32>() / pedestal_samples as f32;

    DecodedFrame {
        id,
        pulse,
        gain,
        pedestal,
        gain_mask,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_uniform_gain1_frame() {
        let frame = decode_frame(838861313, &[0x1064; NUM_SAMPLES], 3);

        assert_eq!(frame.id, 838861313);
        assert!(frame.pulse.iter().all(|&a| a == 100.0));
        assert!(frame.gain.iter().all(|&g| g == 1));
        assert_eq!(frame.pedestal, 100.0);
        assert_eq!(frame.gain_mask, 0b10);
    }

    #[test]
    fn test_pedestal_uses_leading_samples_only() {
        let words = [200, 202, 204, 900, 1500, 1200, 700, 400, 300, 250];
        let frame = decode_frame(1, &words, 3);

        assert_eq!(frame.pedestal, 202.0);
        assert_eq!(frame.peak_above_pedestal(), 1298.0);
    }

    #[test]
    fn test_gain_switch_sets_multiple_mask_bits() {
        let mut words = [0x1000 | 210; NUM_SAMPLES];
        words[4] = 0x2000 | 3000;
        words[5] = 0x3000 | 4095;
        let frame = decode_frame(7, &words, 1);

        assert_eq!(frame.gain[0], 1);
        assert_eq!(frame.gain[4], 2);
        assert_eq!(frame.gain[5], 3);
        assert_eq!(frame.pulse[5], 4095.0);
        assert_eq!(frame.gain_mask, 0b1110);
    }

    #[test]
    fn test_high_bits_above_gain_are_ignored() {
        let frame = decode_frame(1, &[0xC123; NUM_SAMPLES], NUM_SAMPLES);

        assert_eq!(frame.pulse[0], 0x123 as f32);
        assert_eq!(frame.gain[0], 0);
        assert_eq!(frame.gain_mask, 0b1);
    }
}
