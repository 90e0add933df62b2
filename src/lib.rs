#![cfg_attr(not(test), no_std)]

//! A no-std embedded-hal driver for the HX711 load cell amplifier.
//!
//! The chip is read by bit-banging its clock line (PD_SCK) and sampling its
//! data line (DOUT). See [`hx711::HX711`] for the driver itself.

pub mod hx711;

pub use hx711::{Error, HX711};

pub trait LoadCell {
    type Offset;
    type Scale;
    type Error;

    /// Read the raw value from the load cell
    fn read(&mut self) -> Result<i32, Self::Error>;

    /// Read the value after applying the offset and scale.
    /// Casts to the type of Scale.
    fn read_scaled(&mut self) -> Result<Self::Scale, Self::Error>;

    /// Zero the load cell offset from `num_samples` readings,
    /// returning the new offset.
    fn tare(&mut self, num_samples: usize) -> Result<Self::Offset, Self::Error>;

    /// Get the load cell offset.
    fn get_offset(&self) -> Self::Offset;

    /// Set the scale (AKA calibrate the scale).
    /// Use this to ensure that 1kg ~ 1kg
    fn set_scale(&mut self, scale: Self::Scale) -> Result<(), Self::Error>;

    /// Get the scale.
    fn get_scale(&self) -> Self::Scale;
}
