//! Integration tests for the AppService → induction controller → ports
//! pipeline.
//!
//! These run on the host (x86_64) and verify that a bus command travels
//! all the way down to the cooker lines, and that telemetry reflects the
//! result, without any real hardware.

use brewstation::app::service::AppService;
use brewstation::bus::channels::InboundCommand;
use brewstation::config::SystemConfig;
use brewstation::control::protocol::{FeedbackReport, PowerLevel};
use brewstation::error::{CommandError, Error, LineFault, PublishError, SensorFault, SystemFault};
use brewstation::sensors::SensorKind;

use super::mock_hw::{CountingDelay, MockHardware, MockPublisher, faulted_reading, valid_reading};

const COMMAND_TOPIC: &str = "root/brewery/heater/power";
const STATUS_TOPIC: &str = "root/brewery/status";
const HEATER_TOPIC: &str = "root/brewery/heater";

fn make_app() -> (AppService, MockHardware, MockPublisher) {
    let app = AppService::new(SystemConfig::default()).unwrap();
    (app, MockHardware::new(), MockPublisher::new())
}

fn inbound(topic: &str, payload: &str) -> InboundCommand {
    InboundCommand {
        topic: topic.try_into().unwrap(),
        payload: payload.try_into().unwrap(),
    }
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn bus_command_drives_cooker_lines() {
    let (mut app, mut hw, _) = make_app();

    let r = app.handle_inbound(&inbound(COMMAND_TOPIC, "{\"power\": 40}"), 100, &mut hw);
    assert_eq!(r, Ok(Some(PowerLevel::P40)));

    assert_eq!(hw.last_frame(), Some(PowerLevel::P40.frame()));
    assert!(hw.relay);
    assert_eq!(hw.lit_levels(), vec![PowerLevel::P40]);

    let st = app.induction_status(100);
    assert_eq!(st.requested, PowerLevel::P40);
    assert_eq!(st.actual, PowerLevel::P40);
    assert_eq!(st.last_command_ms, Some(100));
}

#[test]
fn invalid_level_leaves_everything_untouched() {
    let (mut app, mut hw, _) = make_app();
    app.handle_inbound(&inbound(COMMAND_TOPIC, "60"), 0, &mut hw).unwrap();
    let before = *app.induction().state();
    let frames = hw.frames.len();

    let r = app.handle_inbound(&inbound(COMMAND_TOPIC, "50"), 10, &mut hw);
    assert_eq!(r, Err(Error::Command(CommandError::InvalidLevel(50))));
    assert_eq!(*app.induction().state(), before);
    assert_eq!(hw.frames.len(), frames);
}

#[test]
fn malformed_payload_is_rejected() {
    let (mut app, mut hw, _) = make_app();
    let r = app.handle_inbound(&inbound(COMMAND_TOPIC, "full blast"), 0, &mut hw);
    assert_eq!(r, Err(Error::Command(CommandError::Malformed)));
    assert!(hw.frames.is_empty());
}

#[test]
fn messages_on_other_topics_are_ignored() {
    let (mut app, mut hw, _) = make_app();
    let r = app.handle_inbound(&inbound("root/brewery/other", "40"), 0, &mut hw);
    assert_eq!(r, Ok(None));
    assert!(hw.frames.is_empty());
}

// ── Cooldown ──────────────────────────────────────────────────

#[test]
fn fan_keeps_running_for_the_cooldown_after_power_off() {
    let (mut app, mut hw, _) = make_app();
    app.handle_inbound(&inbound(COMMAND_TOPIC, "60"), 0, &mut hw).unwrap();
    app.handle_inbound(&inbound(COMMAND_TOPIC, "0"), 1_000, &mut hw).unwrap();

    assert!(hw.relay, "relay stays on while the fan cools the coil");
    assert!(hw.lit_levels().is_empty());
    assert_eq!(app.induction_status(1_000).cooldown_remaining_ms, 60_000);

    app.update_induction(30_000, &mut hw);
    assert!(hw.relay);

    app.update_induction(61_000, &mut hw);
    assert!(!hw.relay);
    assert_eq!(app.induction_status(61_000).cooldown_remaining_ms, 0);
}

// ── Feedback line ─────────────────────────────────────────────

#[test]
fn cooker_fault_forces_off_and_latches_until_next_command() {
    let (mut app, mut hw, mut publisher) = make_app();
    app.handle_inbound(&inbound(COMMAND_TOPIC, "80"), 0, &mut hw).unwrap();

    hw.queue_report(FeedbackReport { level: PowerLevel::Off, fault: Some(LineFault { code: 3 }) }, 0);
    app.update_induction(700, &mut hw);

    let st = app.induction_status(700);
    assert_eq!(st.actual, PowerLevel::Off);
    assert_eq!(st.line_fault, Some(LineFault { code: 3 }));
    assert!(hw.relay, "fault still starts the fan cooldown");
    assert_ne!(app.fault_mask() & SystemFault::CookerLine.mask(), 0);

    app.send_status(800, &mut publisher).unwrap();
    let heater = publisher.last_json(HEATER_TOPIC);
    assert_eq!(heater["line_fault"]["code"], 3);
    assert_eq!(heater["actual"], 0);

    app.handle_inbound(&inbound(COMMAND_TOPIC, "20"), 900, &mut hw).unwrap();
    assert_eq!(app.induction_status(900).line_fault, None);
    assert_eq!(app.fault_mask() & SystemFault::CookerLine.mask(), 0);
}

#[test]
fn cooker_override_is_adopted() {
    let (mut app, mut hw, _) = make_app();
    app.handle_inbound(&inbound(COMMAND_TOPIC, "40"), 0, &mut hw).unwrap();

    // Sent after our 40 % frame left the line.
    hw.queue_report(FeedbackReport { level: PowerLevel::P100, fault: None }, 400_000);
    app.update_induction(700, &mut hw);

    let st = app.induction_status(700);
    assert_eq!(st.requested, PowerLevel::P100);
    assert_eq!(st.actual, PowerLevel::P100);
    assert_eq!(hw.lit_levels(), vec![PowerLevel::P100]);
}

#[test]
fn report_overlapping_a_bus_command_does_not_revert_it() {
    let (mut app, mut hw, _) = make_app();
    app.handle_inbound(&inbound(COMMAND_TOPIC, "60"), 0, &mut hw).unwrap();
    app.update_induction(700, &mut hw);

    app.handle_inbound(&inbound(COMMAND_TOPIC, "20"), 1_000, &mut hw).unwrap();
    hw.queue_report(FeedbackReport { level: PowerLevel::P60, fault: None }, 1_050_000);
    app.update_induction(1_400, &mut hw);

    let st = app.induction_status(1_400);
    assert_eq!(st.requested, PowerLevel::P20);
    assert_eq!(st.actual, PowerLevel::P20);
    assert_eq!(hw.last_frame(), Some(PowerLevel::P20.frame()));
}

#[test]
fn busy_line_keeps_the_previous_actual_level() {
    let (mut app, mut hw, _) = make_app();
    hw.busy = true;
    assert_eq!(
        app.handle_inbound(&inbound(COMMAND_TOPIC, "60"), 0, &mut hw),
        Ok(Some(PowerLevel::P60))
    );
    let st = app.induction_status(0);
    assert_eq!(st.requested, PowerLevel::P60);
    assert_eq!(st.actual, PowerLevel::Off);

    hw.busy = false;
    app.update_induction(700, &mut hw);
    assert_eq!(app.induction_status(700).actual, PowerLevel::P60);
    assert_eq!(hw.last_frame(), Some(PowerLevel::P60.frame()));
}

// ── Sensors and telemetry ─────────────────────────────────────

#[test]
fn status_snapshot_reports_sensor_slots() {
    let (mut app, _, mut publisher) = make_app();
    let mut hw = MockHardware::with_readings(vec![
        valid_reading("2801020304000059", SensorKind::OneWire, 65.5),
        faulted_reading("ow1", SensorKind::OneWire, SensorFault::Disconnected),
        valid_reading("rtd0", SensorKind::Rtd, 66.25),
    ]);

    assert_eq!(app.read_temperatures(100, &mut hw), 2);
    assert_ne!(app.fault_mask() & SystemFault::Sensor.mask(), 0);

    app.send_status(600, &mut publisher).unwrap();
    assert_eq!(publisher.on_topic(STATUS_TOPIC).len(), 1);
    assert_eq!(publisher.on_topic(HEATER_TOPIC).len(), 1);

    let status = publisher.last_json(STATUS_TOPIC);
    assert_eq!(status["uptime_ms"], 600);
    let sensors = status["sensors"].as_array().unwrap();
    assert_eq!(sensors.len(), 3);
    assert_eq!(sensors[0]["temperature_c"], 65.5);
    assert_eq!(sensors[0]["kind"], "one_wire");
    assert!(sensors[1]["temperature_c"].is_null());
    assert_eq!(sensors[1]["valid"], false);
    assert_eq!(status["faults"], u64::from(SystemFault::Sensor.mask()));
}

#[test]
fn dropped_publish_is_flagged_then_recovers() {
    let (mut app, _, mut publisher) = make_app();
    publisher.fail = true;

    assert_eq!(app.send_status(600, &mut publisher), Err(Error::Publish(PublishError::Unavailable)));
    assert_eq!(app.publish_counts(), (0, 1));
    assert_ne!(app.fault_mask() & SystemFault::PublishDropped.mask(), 0);

    publisher.fail = false;
    app.send_status(1_200, &mut publisher).unwrap();
    // The snapshot built for the recovering publish still carries the flag.
    let status = publisher.last_json(STATUS_TOPIC);
    assert_eq!(status["faults"], u64::from(SystemFault::PublishDropped.mask()));
    assert_eq!(app.publish_counts(), (1, 1));
    assert_eq!(app.fault_mask(), 0);
}

// ── Start-up ──────────────────────────────────────────────────

#[test]
fn lamp_test_lights_each_indicator_once() {
    let (mut app, mut hw, _) = make_app();
    let mut delay = CountingDelay::default();
    app.lamp_test(&mut hw, &mut delay);

    let on: Vec<PowerLevel> = hw.indicator_log.iter().filter(|(_, on)| *on).map(|(l, _)| *l).collect();
    assert_eq!(on, PowerLevel::ALL.to_vec());
    assert!(hw.lit_levels().is_empty());
    assert_eq!(delay.total_ns, 6 * 150 * 1_000_000);
}

#[test]
fn invalid_config_is_refused() {
    let mut cfg = SystemConfig::default();
    cfg.timing.read_temp_interval_ms = 0;
    assert!(matches!(AppService::new(cfg), Err(Error::Config(_))));
}
