//! Fuzz target: heater command payloads
//!
//! Feeds arbitrary UTF-8 into the command parser and, for anything it
//! accepts, into the induction controller. Asserts that nothing panics
//! and that the controller only ever accepts the six discrete levels.
//!
//! cargo fuzz run fuzz_command_payload

#![no_main]

use brewstation::app::ports::{InductionPort, TxBusy};
use brewstation::bus::payload::parse_power_command;
use brewstation::config::SystemConfig;
use brewstation::control::feedback::EdgeBuffer;
use brewstation::control::induction::InductionController;
use brewstation::control::protocol::{Frame, PowerLevel};
use libfuzzer_sys::fuzz_target;

struct NullCooker;

impl InductionPort for NullCooker {
    fn set_relay(&mut self, _on: bool) {}
    fn set_indicator(&mut self, _level: PowerLevel, _on: bool) {}
    fn transmit(&mut self, _frame: Frame) -> Result<(), TxBusy> {
        Ok(())
    }
    fn drain_feedback(&mut self, _out: &mut EdgeBuffer) -> bool {
        false
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(percent) = parse_power_command(text) else {
        return;
    };

    let mut ctl = InductionController::new(&SystemConfig::default().induction);
    let before = *ctl.state();
    match ctl.set_power(percent, 0, &mut NullCooker) {
        Ok(level) => assert_eq!(i64::from(level.percent()), percent),
        Err(_) => assert_eq!(*ctl.state(), before, "rejected command changed state"),
    }
});
