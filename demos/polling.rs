//! HX 711 Polling Example
//!
//! Board agnostic: `SimChip` stands in for the two GPIO lines of a real
//! HX711 so the example runs on the host. On a board, pass the HAL's push-pull
//! output (PD_SCK) and floating input (DOUT) pins and its delay instead.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use hx711_scale::{hx711::HX711, LoadCell};

/// Counts per gram of the simulated load cell.
const COUNTS_PER_GRAM: f32 = 420.0;
const EMPTY_SCALE: i32 = 8_100;

/// A load cell carrying `load_grams`.
struct SimChip {
    sck_high: bool,
    shift: Option<(u32, u8)>,
    load_grams: f32,
}

impl SimChip {
    fn conversion(&self) -> u32 {
        let counts = EMPTY_SCALE + (self.load_grams * COUNTS_PER_GRAM) as i32;
        counts as u32 & 0xFF_FFFF
    }
}

struct Sck(Rc<RefCell<SimChip>>);
struct Dout(Rc<RefCell<SimChip>>);
struct Delay;

impl ErrorType for Sck {
    type Error = Infallible;
}

impl OutputPin for Sck {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().sck_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().sck_high = true;
        Ok(())
    }
}

impl ErrorType for Dout {
    type Error = Infallible;
}

impl InputPin for Dout {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        let mut chip = self.0.borrow_mut();
        if !chip.sck_high {
            // a conversion is always ready
            return Ok(false);
        }
        let (word, remaining) = match chip.shift {
            Some(frame) => frame,
            None => (chip.conversion(), 24),
        };
        let bit = (word >> (remaining - 1)) & 1 == 1;
        chip.shift = if remaining > 1 {
            Some((word, remaining - 1))
        } else {
            None
        };
        Ok(bit)
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

impl DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let chip = Rc::new(RefCell::new(SimChip {
        sck_high: false,
        shift: None,
        load_grams: 0.0,
    }));

    // create the load sensor
    let mut load_sensor = HX711::new(Sck(chip.clone()), Dout(chip.clone()), Delay)
        .expect("hx711 did not answer");
    // zero the readings with an empty scale
    let offset = LoadCell::tare(&mut load_sensor, 16).expect("hx711 tare failed");
    log::info!("Tare = {}", offset);

    load_sensor
        .set_scale(COUNTS_PER_GRAM)
        .expect("scale must be non-zero");

    for step in 1..=10 {
        chip.borrow_mut().load_grams = 50.0 * step as f32;
        if load_sensor.is_ready().unwrap_or(false) {
            match load_sensor.read_scaled() {
                Ok(grams) => log::info!("Last Reading = {:.1}g", grams),
                Err(e) => log::warn!("read failed: {}", e),
            }
        }
        thread::sleep(Duration::from_millis(100));
    }

    load_sensor.power_down().expect("hx711 power down failed");
}
