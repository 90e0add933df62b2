use super::Error;

pub const DEFAULT_TARE_SAMPLES: usize = 25;
/// Tare buffers its samples on the stack.
pub const MAX_TARE_SAMPLES: usize = 64;
/// One fifth of the sorted samples is dropped from each end.
const TRIM_DIVISOR: usize = 5;

/// Offset and reference unit that turn a raw reading into a weight.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    offset: i32,
    reference_unit: f32,
    last_value: i32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            offset: 1,
            reference_unit: 1.0,
            last_value: 0,
        }
    }
}

impl Calibration {
    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn reference_unit(&self) -> f32 {
        self.reference_unit
    }

    /// Most recent raw reading.
    pub fn last_value(&self) -> i32 {
        self.last_value
    }

    pub(crate) fn set_offset(&mut self, offset: i32) {
        self.offset = offset;
    }

    /// Zero and non-finite units are rejected so a weight is never a division by zero.
    pub(crate) fn set_reference_unit<E>(&mut self, reference_unit: f32) -> Result<(), Error<E>> {
        if reference_unit == 0.0 || !reference_unit.is_finite() {
            return Err(Error::InvalidConfiguration);
        }
        self.reference_unit = reference_unit;
        Ok(())
    }

    pub(crate) fn record(&mut self, raw: i32) {
        self.last_value = raw;
    }

    /// `raw - offset`, saturating at the `i32` range.
    pub fn value(&self, raw: i32) -> i32 {
        let value = i64::from(raw) - i64::from(self.offset);
        value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    pub fn weight(&self, value: i32) -> f32 {
        value as f32 / self.reference_unit
    }
}

/// Check that `sample_count` can be buffered and trimmed.
pub(crate) fn check_sample_count<E>(sample_count: usize) -> Result<(), Error<E>> {
    if sample_count > MAX_TARE_SAMPLES {
        return Err(Error::InvalidConfiguration);
    }
    if sample_count / TRIM_DIVISOR == 0 {
        return Err(Error::InsufficientSamples);
    }
    Ok(())
}

/// Sort `samples`, drop a fifth from each end and average the rest.
///
/// The mean is rounded to the nearest integer, halves away from zero.
/// Returns `None` when the trim would be empty (fewer than five samples).
pub fn trimmed_mean(samples: &mut [i32]) -> Option<i32> {
    let cut = samples.len() / TRIM_DIVISOR;
    if cut == 0 {
        return None;
    }
    samples.sort_unstable();
    let kept = &samples[cut..samples.len() - cut];

    let sum: i64 = kept.iter().map(|&v| i64::from(v)).sum();
    let count = kept.len() as i64;
    let mut mean = sum / count;
    if 2 * (sum % count).abs() >= count {
        mean += sum.signum();
    }
    Some(mean as i32)
}
