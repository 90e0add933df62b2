//! Bit-banged HX711 driver.
//!
//! The HX711 pulls DOUT low when a conversion is ready. Each rising edge on
//! PD_SCK shifts out one bit, MSB first, and the 1 to 3 pulses after the
//! data bits choose the channel and gain of the *next* conversion.
//! Holding PD_SCK high for more than 60us powers the chip down.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, trace, warn};

use crate::LoadCell;

mod calibration;
mod config;
mod error;
#[cfg(test)]
mod mock;

pub use calibration::{trimmed_mean, Calibration, DEFAULT_TARE_SAMPLES, MAX_TARE_SAMPLES};
pub use config::{
    decode_twos_complement, DeviceConfig, GainMode, DEFAULT_DOUT_PIN, DEFAULT_SCK_PIN,
    HX711_BITS, HX711_MAXIMUM, HX711_MINIMUM,
};
pub use error::Error;

use config::TwosComplement;

/// How long PD_SCK is held for a power transition. The datasheet asks for 60us.
pub const POWER_TRANSITION_US: u32 = 100;
/// Sleep between readiness polls in [`HX711::wait_for_ready_timeout`].
pub const READY_POLL_INTERVAL_US: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    Powered,
    PoweredDown,
}

pub struct HX711<SckPin, DTPin, Delay> {
    sck_pin: SckPin,
    dt_pin: DTPin,
    delay: Delay,
    config: DeviceConfig,
    gain_mode: GainMode,
    twos_complement: TwosComplement,
    calibration: Calibration,
    power_state: PowerState,
}

impl<SckPin, DTPin, Delay, E> HX711<SckPin, DTPin, Delay>
where
    SckPin: OutputPin<Error = E>,
    DTPin: InputPin<Error = E>,
    Delay: DelayNs,
{
    /// Create a driver with gain 128 and 24 bit readings.
    ///
    /// Blocks until the chip has delivered one conversion, which is discarded.
    pub fn new(sck_pin: SckPin, dt_pin: DTPin, delay: Delay) -> Result<Self, Error<E>> {
        Self::with_config(sck_pin, dt_pin, delay, DeviceConfig::default())
    }

    /// Create a driver for a gain of 128, 64 or 32.
    pub fn with_gain(
        sck_pin: SckPin,
        dt_pin: DTPin,
        delay: Delay,
        gain: u16,
    ) -> Result<Self, Error<E>> {
        let gain = GainMode::from_gain(gain).ok_or(Error::<E>::InvalidGain(gain))?;
        Self::with_config(sck_pin, dt_pin, delay, DeviceConfig::with_gain(gain))
    }

    pub fn with_config(
        sck_pin: SckPin,
        dt_pin: DTPin,
        delay: Delay,
        config: DeviceConfig,
    ) -> Result<Self, Error<E>> {
        config.validate::<E>()?;
        let mut hx711 = Self {
            sck_pin,
            dt_pin,
            delay,
            config,
            gain_mode: config.gain,
            twos_complement: TwosComplement::for_bits(config.bits_to_read),
            calibration: Calibration::default(),
            power_state: PowerState::Powered,
        };
        // flush the conversion started under the chip's previous gain
        hx711.set_gain_mode(config.gain)?;
        Ok(hx711)
    }

    /// Give back the pins and delay.
    pub fn release(self) -> (SckPin, DTPin, Delay) {
        (self.sck_pin, self.dt_pin, self.delay)
    }

    /// Current settings. `gain` follows [`set_gain_mode`](Self::set_gain_mode).
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn gain_mode(&self) -> GainMode {
        self.gain_mode
    }

    pub fn power_state(&self) -> PowerState {
        self.power_state
    }

    pub fn offset(&self) -> i32 {
        self.calibration.offset()
    }

    pub fn reference_unit(&self) -> f32 {
        self.calibration.reference_unit()
    }

    /// The raw value of the last successful read.
    pub fn last_value(&self) -> i32 {
        self.calibration.last_value()
    }

    /// Set the gain from its amplification factor. Anything but 128, 64 or
    /// 32 is rejected without touching the chip.
    pub fn set_gain(&mut self, gain: u16) -> Result<(), Error<E>> {
        let mode = GainMode::from_gain(gain).ok_or(Error::<E>::InvalidGain(gain))?;
        self.set_gain_mode(mode)
    }

    /// Select the channel and gain, then read once so the chip latches it.
    ///
    /// The mode is only kept once that read succeeds. Fails with
    /// [`Error::DevicePoweredDown`] without touching the clock while the chip
    /// is asleep, since pulling the clock low would start waking it.
    pub fn set_gain_mode(&mut self, mode: GainMode) -> Result<(), Error<E>> {
        self.ensure_powered()?;
        self.sck_pin.set_low().map_err(Error::Io)?;
        self.wait_for_ready()?;
        self.read_frame(mode)?;
        self.gain_mode = mode;
        self.config.gain = mode;
        debug!("hx711 gain set to {}", mode.gain());
        Ok(())
    }

    pub fn is_ready(&mut self) -> Result<bool, Error<E>> {
        // if the dt pin is low, device is ready for read
        self.dt_pin.is_low().map_err(Error::Io)
    }

    /// Spin until the chip is ready, without sleeping and without a deadline.
    ///
    /// If the chip is disconnected this never returns; use
    /// [`wait_for_ready_timeout`](Self::wait_for_ready_timeout) where that matters.
    pub fn wait_for_ready(&mut self) -> Result<(), Error<E>> {
        while !self.is_ready()? {
            core::hint::spin_loop();
        }
        Ok(())
    }

    /// Poll until the chip is ready, failing with [`Error::Timeout`] once
    /// `timeout_us` has been spent sleeping between polls.
    pub fn wait_for_ready_timeout(&mut self, timeout_us: u32) -> Result<(), Error<E>> {
        let mut waited_us: u32 = 0;
        loop {
            if self.is_ready()? {
                return Ok(());
            }
            if waited_us >= timeout_us {
                warn!("hx711 not ready after {}us", waited_us);
                return Err(Error::Timeout);
            }
            self.delay.delay_us(READY_POLL_INTERVAL_US);
            waited_us = waited_us.saturating_add(READY_POLL_INTERVAL_US);
        }
    }

    /// Wait for a conversion and read it, returning the signed raw value.
    pub fn read(&mut self) -> Result<i32, Error<E>> {
        self.ensure_powered()?;
        self.wait_for_ready()?;
        self.read_frame(self.gain_mode)
    }

    /// Like [`read`](Self::read) with a bounded wait for the chip.
    pub fn read_timeout(&mut self, timeout_us: u32) -> Result<i32, Error<E>> {
        self.ensure_powered()?;
        self.wait_for_ready_timeout(timeout_us)?;
        self.read_frame(self.gain_mode)
    }

    /// A fresh reading minus the offset.
    pub fn get_value(&mut self) -> Result<i32, Error<E>> {
        let raw = self.read()?;
        Ok(self.calibration.value(raw))
    }

    /// A fresh reading minus the offset, divided by the reference unit.
    pub fn get_weight(&mut self) -> Result<f32, Error<E>> {
        let value = self.get_value()?;
        Ok(self.calibration.weight(value))
    }

    pub fn set_offset(&mut self, offset: i32) {
        self.calibration.set_offset(offset);
    }

    /// Fails with [`Error::InvalidConfiguration`] for zero or a non-finite
    /// unit; the previous unit is kept.
    pub fn set_reference_unit(&mut self, reference_unit: f32) -> Result<(), Error<E>> {
        self.calibration.set_reference_unit(reference_unit)
    }

    /// Zero the scale from `sample_count` readings and make the result the
    /// new offset.
    ///
    /// The readings are sorted and a fifth is dropped from each end before
    /// averaging. `sample_count` must be between 5 and [`MAX_TARE_SAMPLES`].
    pub fn tare(&mut self, sample_count: usize) -> Result<i32, Error<E>> {
        let offset = self.tare_preview(sample_count)?;
        self.calibration.set_offset(offset);
        debug!("hx711 tare offset = {}", offset);
        Ok(offset)
    }

    /// Compute the offset [`tare`](Self::tare) would set, without setting it.
    pub fn tare_preview(&mut self, sample_count: usize) -> Result<i32, Error<E>> {
        calibration::check_sample_count::<E>(sample_count)?;
        let mut samples = [0i32; MAX_TARE_SAMPLES];
        let samples = &mut samples[..sample_count];
        for sample in samples.iter_mut() {
            *sample = self.read()?;
        }
        trimmed_mean(samples).ok_or(Error::InsufficientSamples)
    }

    /// Hold the clock high to put the chip to sleep.
    pub fn power_down(&mut self) -> Result<(), Error<E>> {
        self.sck_pin.set_low().map_err(Error::Io)?;
        self.sck_pin.set_high().map_err(Error::Io)?;
        self.delay.delay_us(POWER_TRANSITION_US);
        self.power_state = PowerState::PoweredDown;
        debug!("hx711 powered down");
        Ok(())
    }

    /// Wake the chip. Its first conversion afterwards uses gain 128.
    pub fn power_up(&mut self) -> Result<(), Error<E>> {
        self.sck_pin.set_low().map_err(Error::Io)?;
        self.delay.delay_us(POWER_TRANSITION_US);
        self.power_state = PowerState::Powered;
        debug!("hx711 powered up");
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), Error<E>> {
        self.power_down()?;
        self.power_up()
    }

    fn ensure_powered(&self) -> Result<(), Error<E>> {
        match self.power_state {
            PowerState::Powered => Ok(()),
            PowerState::PoweredDown => Err(Error::DevicePoweredDown),
        }
    }

    /// Shift in one conversion and send the pulses selecting `next` for the
    /// following one. The chip must be ready.
    fn read_frame(&mut self, next: GainMode) -> Result<i32, Error<E>> {
        // a late falling edge on the clock corrupts the frame, or powers the chip down
        let value = critical_section::with(|_cs| -> Result<u32, Error<E>> {
            let value = self.shift_in()?;
            self.send_gain_pulses(next)?;
            Ok(value)
        })?;

        let reading = self.twos_complement.decode(value);
        self.calibration.record(reading);
        trace!("hx711 raw = {:#x} reading = {}", value, reading);
        Ok(reading)
    }

    fn shift_in(&mut self) -> Result<u32, Error<E>> {
        let mut value: u32 = 0;
        for _ in 0..self.config.bits_to_read {
            // bits arrive MSB first
            let bit = self.read_bit()?;
            value = (value << 1) | u32::from(bit);
        }
        Ok(value)
    }

    fn send_gain_pulses(&mut self, mode: GainMode) -> Result<(), Error<E>> {
        for _ in 0..mode.pulses() {
            self.toggle_sck()?;
        }
        Ok(())
    }

    /// The clock is brought low again even if sampling fails.
    fn read_bit(&mut self) -> Result<bool, Error<E>> {
        self.sck_pin.set_high().map_err(Error::Io)?;
        self.settle();
        let bit = self.dt_pin.is_high();
        self.sck_pin.set_low().map_err(Error::Io)?;
        self.settle();
        bit.map_err(Error::Io)
    }

    fn toggle_sck(&mut self) -> Result<(), Error<E>> {
        self.sck_pin.set_high().map_err(Error::Io)?;
        self.settle();
        self.sck_pin.set_low().map_err(Error::Io)?;
        self.settle();
        Ok(())
    }

    fn settle(&mut self) {
        if self.config.edge_delay_ns > 0 {
            self.delay.delay_ns(self.config.edge_delay_ns);
        }
    }
}

impl<SckPin, DTPin, Delay, E> LoadCell for HX711<SckPin, DTPin, Delay>
where
    SckPin: OutputPin<Error = E>,
    DTPin: InputPin<Error = E>,
    Delay: DelayNs,
{
    type Offset = i32;
    type Scale = f32;
    type Error = Error<E>;

    fn read(&mut self) -> Result<i32, Self::Error> {
        HX711::read(self)
    }

    fn read_scaled(&mut self) -> Result<f32, Self::Error> {
        self.get_weight()
    }

    fn tare(&mut self, num_samples: usize) -> Result<i32, Self::Error> {
        HX711::tare(self, num_samples)
    }

    fn get_offset(&self) -> i32 {
        self.offset()
    }

    fn set_scale(&mut self, scale: f32) -> Result<(), Self::Error> {
        self.set_reference_unit(scale)
    }

    fn get_scale(&self) -> f32 {
        self.reference_unit()
    }
}
