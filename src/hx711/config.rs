use super::Error;

/// Bits in one HX711 conversion.
pub const HX711_BITS: u8 = 24;
pub const HX711_MINIMUM: i32 = -(1 << (HX711_BITS - 1));
pub const HX711_MAXIMUM: i32 = (1 << (HX711_BITS - 1)) - 1;

/// Conventional wiring, clock on GPIO 6 and data on GPIO 5.
pub const DEFAULT_SCK_PIN: u8 = 6;
pub const DEFAULT_DOUT_PIN: u8 = 5;

/// The chip powers down once the clock has been high for 60us.
const CLOCK_HIGH_LIMIT_NS: u32 = 50_000;

/// Channel and gain for the next conversion.
///
/// The discriminant is the number of clock pulses sent after the data bits.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GainMode {
    /// Channel A, gain 128.
    A128 = 1, // extra pulses
    /// Channel B, gain 32.
    B32 = 2,
    /// Channel A, gain 64.
    A64 = 3,
}

impl GainMode {
    /// Look up the mode for an amplification factor.
    pub const fn from_gain(gain: u16) -> Option<Self> {
        match gain {
            128 => Some(Self::A128),
            64 => Some(Self::A64),
            32 => Some(Self::B32),
            _ => None,
        }
    }

    pub const fn gain(self) -> u16 {
        match self {
            Self::A128 => 128,
            Self::A64 => 64,
            Self::B32 => 32,
        }
    }

    /// Clock pulses to append after a read to select this mode.
    pub const fn pulses(self) -> u8 {
        self as u8
    }
}

impl Default for GainMode {
    fn default() -> Self {
        Self::A128
    }
}

/// Settings fixed when the driver is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub gain: GainMode,
    /// Width of a conversion, MSB first. 24 for the HX711.
    pub bits_to_read: u8,
    /// Settle time after each clock edge. Zero relies on the pin call cost alone.
    pub edge_delay_ns: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            gain: GainMode::A128,
            bits_to_read: HX711_BITS,
            edge_delay_ns: 0,
        }
    }
}

impl DeviceConfig {
    pub fn with_gain(gain: GainMode) -> Self {
        Self {
            gain,
            ..Self::default()
        }
    }

    pub(crate) fn validate<E>(&self) -> Result<(), Error<E>> {
        if !(1..=32).contains(&self.bits_to_read) || self.edge_delay_ns >= CLOCK_HIGH_LIMIT_NS {
            return Err(Error::InvalidConfiguration);
        }
        Ok(())
    }
}

/// Sign correction for a conversion of a given width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TwosComplement {
    threshold: i64,
    offset: i64,
}

impl TwosComplement {
    /// `bits` must be in `1..=32`.
    pub(crate) const fn for_bits(bits: u8) -> Self {
        Self {
            threshold: 1 << (bits - 1),
            offset: -(1 << bits),
        }
    }

    pub(crate) const fn decode(&self, value: u32) -> i32 {
        let value = value as i64;
        if value >= self.threshold {
            (value + self.offset) as i32
        } else {
            value as i32
        }
    }
}

/// Interpret the low `bits` of `raw` as a two's complement number.
///
/// `bits` must be in `1..=32`.
pub const fn decode_twos_complement(raw: u32, bits: u8) -> i32 {
    TwosComplement::for_bits(bits).decode(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_24_bit_boundaries() {
        assert_eq!(decode_twos_complement(0x80_0000, 24), -8_388_608);
        assert_eq!(decode_twos_complement(0x80_0000, 24), HX711_MINIMUM);
        assert_eq!(decode_twos_complement(0x7F_FFFF, 24), 8_388_607);
        assert_eq!(decode_twos_complement(0x7F_FFFF, 24), HX711_MAXIMUM);
        assert_eq!(decode_twos_complement(0, 24), 0);
        assert_eq!(decode_twos_complement(0xFF_FFFF, 24), -1);
        assert_eq!(decode_twos_complement(0xFF_FFF3, 24), -13);
    }

    #[test]
    fn decode_then_mask_recovers_input() {
        for raw in (0..=0xFF_FFFFu32).step_by(4099).chain([0x7F_FFFF, 0x80_0000, 0xFF_FFFF]) {
            let signed = decode_twos_complement(raw, 24);
            assert_eq!(signed as u32 & 0xFF_FFFF, raw);
        }
    }

    #[test]
    fn decodes_other_widths() {
        assert_eq!(decode_twos_complement(0b1, 1), -1);
        assert_eq!(decode_twos_complement(0b0, 1), 0);
        assert_eq!(decode_twos_complement(0x8000_0000, 32), i32::MIN);
        assert_eq!(decode_twos_complement(0x7FFF_FFFF, 32), i32::MAX);
    }

    #[test]
    fn gain_table() {
        assert_eq!(GainMode::from_gain(128), Some(GainMode::A128));
        assert_eq!(GainMode::from_gain(64), Some(GainMode::A64));
        assert_eq!(GainMode::from_gain(32), Some(GainMode::B32));
        assert_eq!(GainMode::A128.pulses(), 1);
        assert_eq!(GainMode::A64.pulses(), 3);
        assert_eq!(GainMode::B32.pulses(), 2);
        for mode in [GainMode::A128, GainMode::A64, GainMode::B32] {
            assert_eq!(GainMode::from_gain(mode.gain()), Some(mode));
        }
    }

    #[test]
    fn rejects_unknown_gains() {
        for gain in [0, 1, 2, 3, 16, 63, 65, 127, 129, 256, u16::MAX] {
            assert_eq!(GainMode::from_gain(gain), None);
        }
    }

    #[test]
    fn validates_config() {
        assert!(DeviceConfig::default().validate::<()>().is_ok());
        let zero_bits = DeviceConfig {
            bits_to_read: 0,
            ..DeviceConfig::default()
        };
        assert_eq!(zero_bits.validate::<()>(), Err(Error::InvalidConfiguration));
        let wide = DeviceConfig {
            bits_to_read: 33,
            ..DeviceConfig::default()
        };
        assert_eq!(wide.validate::<()>(), Err(Error::InvalidConfiguration));
        let slow = DeviceConfig {
            edge_delay_ns: 50_000,
            ..DeviceConfig::default()
        };
        assert_eq!(slow.validate::<()>(), Err(Error::InvalidConfiguration));
    }
}
