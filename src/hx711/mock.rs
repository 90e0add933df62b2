//! Recording stand-ins for the clock pin, data pin and delay.
//!
//! All three share one [`Bus`] so a test can see the order of edges,
//! samples and sleeps. The data pin answers readiness polls while the
//! clock is low and shifts out queued bits while it is high.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    SckHigh,
    SckLow,
    Sample(bool),
    Delay { ns: u32, sck_high: bool },
}

#[derive(Default)]
pub struct State {
    pub events: Vec<Event>,
    pub sck_high: bool,
    /// Readiness polls that report busy before the chip reports ready.
    pub busy_polls: usize,
    pub bits: VecDeque<bool>,
    /// Fail the sample once this many bits have been shifted out.
    pub fail_after_bits: Option<usize>,
    pub fail_writes: bool,
    pub bits_shifted: usize,
}

#[derive(Clone, Default)]
pub struct Bus(Rc<RefCell<State>>);

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pins(&self) -> (SckPin, DataPin, Delay) {
        (SckPin(self.clone()), DataPin(self.clone()), Delay(self.clone()))
    }

    /// Queue one conversion, MSB first.
    pub fn push_reading(&self, raw: u32, bits: u8) {
        let mut state = self.0.borrow_mut();
        for i in (0..bits).rev() {
            state.bits.push_back((raw >> i) & 1 == 1);
        }
    }

    pub fn push_readings(&self, raws: &[i32]) {
        for &raw in raws {
            self.push_reading(raw as u32 & 0xFF_FFFF, 24);
        }
    }

    pub fn state(&self) -> std::cell::RefMut<'_, State> {
        self.0.borrow_mut()
    }

    pub fn take_events(&self) -> Vec<Event> {
        core::mem::take(&mut self.0.borrow_mut().events)
    }

    pub fn rising_edges(&self) -> usize {
        self.0
            .borrow()
            .events
            .iter()
            .filter(|e| **e == Event::SckHigh)
            .count()
    }

    pub fn samples(&self) -> usize {
        self.0
            .borrow()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Sample(_)))
            .count()
    }
}

pub struct SckPin(Bus);

impl ErrorType for SckPin {
    type Error = PinFault;
}

impl OutputPin for SckPin {
    fn set_low(&mut self) -> Result<(), PinFault> {
        let mut state = self.0.state();
        if state.fail_writes {
            return Err(PinFault);
        }
        state.sck_high = false;
        state.events.push(Event::SckLow);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        let mut state = self.0.state();
        if state.fail_writes {
            return Err(PinFault);
        }
        state.sck_high = true;
        state.events.push(Event::SckHigh);
        Ok(())
    }
}

pub struct DataPin(Bus);

impl ErrorType for DataPin {
    type Error = PinFault;
}

impl InputPin for DataPin {
    fn is_high(&mut self) -> Result<bool, PinFault> {
        let mut state = self.0.state();
        if !state.sck_high {
            if state.busy_polls > 0 {
                state.busy_polls -= 1;
                return Ok(true);
            }
            return Ok(false);
        }
        if state.fail_after_bits == Some(state.bits_shifted) {
            return Err(PinFault);
        }
        let bit = state.bits.pop_front().unwrap_or(false);
        state.bits_shifted += 1;
        state.events.push(Event::Sample(bit));
        Ok(bit)
    }

    fn is_low(&mut self) -> Result<bool, PinFault> {
        self.is_high().map(|high| !high)
    }
}

pub struct Delay(Bus);

impl DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        let mut state = self.0.state();
        let sck_high = state.sck_high;
        state.events.push(Event::Delay { ns, sck_high });
    }
}
