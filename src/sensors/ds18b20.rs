//! DS18B20 digital thermometers sharing one one-wire bus.
//!
//! Bus access goes through the `one-wire-bus` and `ds18b20` crates; this
//! module only adds the non-blocking conversion cycle. A bus-wide
//! conversion is started on one poll and collected on the first poll after
//! the resolution's conversion time, so the caller never waits on it.
//!
//! ```text
//!  poll ──▶ start (SKIP ROM + CONVERT T)
//!  poll ──▶ not due yet, nothing to do
//!  poll ──▶ due: collect every device (MATCH ROM + READ SCRATCHPAD),
//!           then start the next conversion
//! ```

use core::fmt::Write as _;

use ds18b20::{Ds18b20, Resolution};
use embedded_hal_0_2::blocking::delay::DelayUs;
use embedded_hal_0_2::digital::v2::{InputPin, OutputPin};
use heapless::{String, Vec};
use log::{info, warn};
use one_wire_bus::{Address, OneWire, OneWireError};

use crate::config::MAX_ONEWIRE_SENSORS;
use crate::error::SensorFault;

/// Value the Dallas library reports for a vanished device.
pub const DISCONNECTED_C: f32 = -127.0;

pub const MIN_TEMP_C: f32 = -55.0;
pub const MAX_TEMP_C: f32 = 125.0;

/// Alarm thresholds written alongside the resolution (unused).
const ALARM_LOW_C: i8 = 70;
const ALARM_HIGH_C: i8 = 75;

/// Resolution for a configured bit count (9..=12).
pub const fn resolution(bits: u8) -> Resolution {
    match bits {
        9 => Resolution::Bits9,
        10 => Resolution::Bits10,
        11 => Resolution::Bits11,
        _ => Resolution::Bits12,
    }
}

/// ROM code as sixteen hex digits, family code first.
pub fn rom_hex(address: &Address) -> String<16> {
    let mut s = String::new();
    for b in address.0.to_le_bytes() {
        let _ = write!(s, "{b:02X}");
    }
    s
}

/// Raw 1/16 °C count of a converted temperature.
pub fn celsius_to_raw(celsius: f32) -> i16 {
    (celsius * 16.0) as i16
}

/// Reject the disconnect sentinel and implausible values.
pub fn check_celsius(celsius: f32) -> Result<f32, SensorFault> {
    if celsius == DISCONNECTED_C {
        return Err(SensorFault::Disconnected);
    }
    if !(MIN_TEMP_C..=MAX_TEMP_C).contains(&celsius) {
        return Err(SensorFault::OutOfRange);
    }
    Ok(celsius)
}

fn bus_fault<E>(e: OneWireError<E>) -> SensorFault {
    match e {
        OneWireError::CrcMismatch => SensorFault::CrcMismatch,
        OneWireError::PinError(_) => SensorFault::BusError,
        _ => SensorFault::Disconnected,
    }
}

// ---------------------------------------------------------------------------
// Bus seam
// ---------------------------------------------------------------------------

/// Thermometer operations the conversion cycle needs from a bus.
pub trait Thermometers {
    /// Every DS18B20 on the bus, in search order.
    fn search(&mut self) -> Result<Vec<Address, MAX_ONEWIRE_SENSORS>, SensorFault>;

    fn configure(&mut self, address: &Address, resolution_bits: u8) -> Result<(), SensorFault>;

    /// Start a conversion on every device at once.
    fn start_conversion(&mut self) -> Result<(), SensorFault>;

    /// A read slot after CONVERT T returns 1 once every device is done.
    fn conversion_complete(&mut self) -> Result<bool, SensorFault>;

    /// Last conversion result of one device.
    fn read_celsius(&mut self, address: &Address) -> Result<f32, SensorFault>;
}

/// [`Thermometers`] over an open-drain GPIO.
pub struct OneWireThermometers<P, D> {
    bus: OneWire<P>,
    delay: D,
}

impl<P, D, E> OneWireThermometers<P, D>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayUs<u16>,
{
    pub fn new(pin: P, delay: D) -> Result<Self, SensorFault> {
        let bus = OneWire::new(pin).map_err(bus_fault)?;
        Ok(Self { bus, delay })
    }

    fn device(address: &Address) -> Result<Ds18b20, SensorFault> {
        Ds18b20::new::<E>(*address).map_err(bus_fault)
    }
}

impl<P, D, E> Thermometers for OneWireThermometers<P, D>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayUs<u16>,
{
    fn search(&mut self) -> Result<Vec<Address, MAX_ONEWIRE_SENSORS>, SensorFault> {
        let mut found = Vec::new();
        for result in self.bus.devices(false, &mut self.delay) {
            let address = result.map_err(bus_fault)?;
            if address.family_code() != ds18b20::FAMILY_CODE {
                warn!("onewire: ignoring family 0x{:02X} at {}", address.family_code(), rom_hex(&address));
                continue;
            }
            if found.push(address).is_err() {
                warn!("onewire: bus holds more than {} thermometers", MAX_ONEWIRE_SENSORS);
                break;
            }
        }
        Ok(found)
    }

    fn configure(&mut self, address: &Address, resolution_bits: u8) -> Result<(), SensorFault> {
        Self::device(address)?
            .set_config(ALARM_LOW_C, ALARM_HIGH_C, resolution(resolution_bits), &mut self.bus, &mut self.delay)
            .map_err(bus_fault)
    }

    fn start_conversion(&mut self) -> Result<(), SensorFault> {
        // The crates ignore the presence pulse; an empty bus must not look
        // like a running conversion.
        if !self.bus.reset(&mut self.delay).map_err(bus_fault)? {
            return Err(SensorFault::Disconnected);
        }
        ds18b20::start_simultaneous_temp_measurement(&mut self.bus, &mut self.delay).map_err(bus_fault)
    }

    fn conversion_complete(&mut self) -> Result<bool, SensorFault> {
        self.bus.read_bit(&mut self.delay).map_err(bus_fault)
    }

    fn read_celsius(&mut self, address: &Address) -> Result<f32, SensorFault> {
        let data = Self::device(address)?
            .read_data(&mut self.bus, &mut self.delay)
            .map_err(bus_fault)?;
        Ok(data.temperature)
    }
}

// ---------------------------------------------------------------------------
// Conversion cycle
// ---------------------------------------------------------------------------

pub struct Ds18b20Bus<T> {
    bus: T,
    roms: Vec<Address, MAX_ONEWIRE_SENSORS>,
    resolution_bits: u8,
    converting_since: Option<u64>,
}

impl<T: Thermometers> Ds18b20Bus<T> {
    pub fn new(bus: T, resolution_bits: u8) -> Self {
        Self {
            bus,
            roms: Vec::new(),
            resolution_bits,
            converting_since: None,
        }
    }

    /// Search the bus, keep up to `expected` thermometers, and program
    /// their resolution. Returns how many were found.
    pub fn discover(&mut self, expected: usize) -> Result<usize, SensorFault> {
        let all = self.bus.search()?;
        self.roms.clear();
        for address in all {
            if self.roms.len() == expected {
                warn!("onewire: more thermometers than configured, ignoring {}", rom_hex(&address));
                continue;
            }
            let _ = self.roms.push(address);
        }

        for address in &self.roms {
            if let Err(e) = self.bus.configure(address, self.resolution_bits) {
                warn!("onewire: {} resolution setup failed: {}", rom_hex(address), e);
            }
        }

        info!(
            "onewire: {}/{} thermometers, {}-bit ({} ms)",
            self.roms.len(),
            expected,
            self.resolution_bits,
            self.conversion_time_ms()
        );
        Ok(self.roms.len())
    }

    /// Discovered thermometers, in search order.
    pub fn roms(&self) -> &[Address] {
        &self.roms
    }

    /// Worst-case conversion time at the configured resolution.
    pub fn conversion_time_ms(&self) -> u16 {
        resolution(self.resolution_bits).max_measurement_time_millis()
    }

    pub fn is_converting(&self) -> bool {
        self.converting_since.is_some()
    }

    /// Whether a running conversion has had its full conversion time.
    pub fn conversion_due(&self, now_ms: u64) -> bool {
        self.converting_since
            .is_some_and(|t0| now_ms.saturating_sub(t0) >= u64::from(self.conversion_time_ms()))
    }

    pub fn start_conversion(&mut self, now_ms: u64) -> Result<(), SensorFault> {
        self.converting_since = None;
        self.bus.start_conversion()?;
        self.converting_since = Some(now_ms);
        Ok(())
    }

    pub fn conversion_complete(&mut self) -> Result<bool, SensorFault> {
        self.bus.conversion_complete()
    }

    /// Forget the running conversion (its results are about to be read).
    pub fn finish_conversion(&mut self) {
        self.converting_since = None;
    }

    /// Read and validate the last result of one device.
    pub fn read(&mut self, address: &Address) -> Result<f32, SensorFault> {
        self.bus.read_celsius(address).and_then(check_celsius)
    }
}

// ---------------------------------------------------------------------------
// In-memory thermometers for host tests
// ---------------------------------------------------------------------------


#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::fake::{FakeDevice, FakeThermometers};
    use super::*;
    use crate::drivers::delay::BusDelay;

    /// A bus with only its pull-up: nothing ever answers a reset.
    struct IdleLine;

    impl OutputPin for IdleLine {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    impl InputPin for IdleLine {
        type Error = Infallible;

        fn is_high(&self) -> Result<bool, Infallible> {
            Ok(true)
        }

        fn is_low(&self) -> Result<bool, Infallible> {
            Ok(false)
        }
    }

    #[test]
    fn resolution_follows_configured_bits() {
        assert_eq!(resolution(9).max_measurement_time_millis(), 94);
        assert_eq!(resolution(10).max_measurement_time_millis(), 188);
        assert_eq!(resolution(11).max_measurement_time_millis(), 375);
        assert_eq!(resolution(12).max_measurement_time_millis(), 750);
    }

    #[test]
    fn rom_hex_starts_with_family_code() {
        let device = FakeDevice::new(0x01, 0.0);
        assert_eq!(rom_hex(&device.address).as_str(), "2801000000000000");
    }

    #[test]
    fn sentinel_and_range_are_rejected() {
        assert_eq!(check_celsius(25.0625), Ok(25.0625));
        assert_eq!(check_celsius(-10.125), Ok(-10.125));
        assert_eq!(check_celsius(DISCONNECTED_C), Err(SensorFault::Disconnected));
        assert_eq!(check_celsius(126.0), Err(SensorFault::OutOfRange));
        assert_eq!(check_celsius(-56.0), Err(SensorFault::OutOfRange));
        assert_eq!(celsius_to_raw(25.0625), 0x0191);
        assert_eq!(celsius_to_raw(-10.125), -162);
    }

    #[test]
    fn idle_line_has_no_thermometers() {
        let mut bus = OneWireThermometers::new(IdleLine, BusDelay).unwrap();
        assert_eq!(bus.search().map(|found| found.len()), Ok(0));
        assert_eq!(bus.start_conversion(), Err(SensorFault::Disconnected));
    }

    #[test]
    fn idle_line_never_reports_converting() {
        let bus = OneWireThermometers::new(IdleLine, BusDelay).unwrap();
        let mut ds = Ds18b20Bus::new(bus, 12);
        assert_eq!(ds.discover(2), Ok(0));
        assert_eq!(ds.start_conversion(0), Err(SensorFault::Disconnected));
        assert!(!ds.is_converting());
    }

    #[test]
    fn discover_programs_resolution() {
        let (bus, devices) = FakeThermometers::new(vec![FakeDevice::new(1, 25.0), FakeDevice::new(2, 30.0)]);
        let mut ds = Ds18b20Bus::new(bus, 11);
        assert_eq!(ds.discover(2), Ok(2));
        for p in devices.borrow().iter() {
            assert_eq!(p.resolution_bits, Some(11));
        }
    }

    #[test]
    fn discover_caps_at_expected_count() {
        let devices = (1..=4).map(|s| FakeDevice::new(s, 20.0)).collect();
        let (bus, _) = FakeThermometers::new(devices);
        let mut ds = Ds18b20Bus::new(bus, 12);
        assert_eq!(ds.discover(2), Ok(2));
        assert_eq!(ds.roms().len(), 2);
    }

    #[test]
    fn conversion_is_collected_after_its_time() {
        let (bus, devices) = FakeThermometers::new(vec![FakeDevice::new(1, 25.0625)]);
        let mut ds = Ds18b20Bus::new(bus, 11);
        ds.discover(1).unwrap();

        ds.start_conversion(1_000).unwrap();
        assert!(ds.is_converting());
        assert!(!ds.conversion_due(1_374));
        assert!(ds.conversion_due(1_375));

        let rom = ds.roms()[0];
        assert_eq!(ds.read(&rom), Ok(25.0625));

        devices.borrow_mut()[0].celsius = DISCONNECTED_C;
        assert_eq!(ds.read(&rom), Err(SensorFault::Disconnected));
        devices.borrow_mut()[0].unplugged = true;
        assert_eq!(ds.read(&rom), Err(SensorFault::CrcMismatch));
    }
}
