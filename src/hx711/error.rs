use core::fmt::{self, Debug, Display, Formatter};

/// HX711 driver error, generic over the error type of the two pins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Digital I/O error from the clock or data line.
    Io(E),
    /// The requested gain is not 128, 64 or 32.
    InvalidGain(u16),
    /// A zero or non-finite reference unit, a bit width outside `1..=32`,
    /// an edge delay too long for the clock-high limit, or more tare
    /// samples than the driver can buffer.
    InvalidConfiguration,
    /// Tare asked for fewer samples than the outlier trim needs.
    InsufficientSamples,
    /// A read was attempted while the chip is powered down.
    DevicePoweredDown,
    /// The data line did not signal ready before the deadline.
    Timeout,
}

impl<E: Debug> Display for Error<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "HX711 line I/O failed: {:?}", err),
            Self::InvalidGain(gain) => {
                write!(f, "HX711 gain {} is not one of 128, 64 or 32", gain)
            }
            Self::InvalidConfiguration => write!(f, "HX711 configuration is invalid"),
            Self::InsufficientSamples => write!(f, "too few samples to tare the HX711"),
            Self::DevicePoweredDown => write!(f, "the HX711 is powered down"),
            Self::Timeout => write!(f, "timed out waiting for the HX711 to be ready"),
        }
    }
}
