//! Integration tests for the scheduler loop: Scheduler → TaskRunner →
//! AppService → mock ports, driven by a simulated millisecond clock.

use brewstation::app::service::{AppService, TaskRunner};
use brewstation::config::SystemConfig;
use brewstation::control::protocol::PowerLevel;
use brewstation::scheduler::{Scheduler, TaskId};
use brewstation::sensors::SensorKind;

use super::mock_hw::{MockHardware, MockPublisher, valid_reading};

struct Rig {
    app: AppService,
    hw: MockHardware,
    publisher: MockPublisher,
    sched: Scheduler,
}

impl Rig {
    fn new() -> Self {
        let config = SystemConfig::default();
        let sched = Scheduler::new(&config.timing);
        Self {
            app: AppService::new(config).unwrap(),
            hw: MockHardware::with_readings(vec![valid_reading("rtd0", SensorKind::Rtd, 20.0)]),
            publisher: MockPublisher::new(),
            sched,
        }
    }

    /// Poll once per millisecond over `from..=to`.
    fn run(&mut self, from: u64, to: u64) {
        for now in from..=to {
            self.sched.poll(
                now,
                &mut TaskRunner {
                    service: &mut self.app,
                    hw: &mut self.hw,
                    publisher: &mut self.publisher,
                },
            );
        }
    }
}

#[test]
fn default_periods_over_twelve_hundred_ms() {
    let mut rig = Rig::new();
    rig.run(1, 1_200);

    assert_eq!(rig.hw.polls, 12);
    // Two status passes, two topics each.
    assert_eq!(rig.publisher.messages.len(), 4);
    // One induction tick re-asserts the idle level.
    assert_eq!(rig.hw.frames, vec![PowerLevel::Off.frame()]);
    assert_eq!(rig.sched.task(TaskId::SendStatus).map(|t| t.runs), Some(2));
}

#[test]
fn induction_tick_repeats_the_requested_level() {
    let mut rig = Rig::new();
    rig.app.handle_inbound(
        &brewstation::bus::channels::InboundCommand {
            topic: "root/brewery/heater/power".try_into().unwrap(),
            payload: "80".try_into().unwrap(),
        },
        0,
        &mut rig.hw,
    )
    .unwrap();
    rig.run(1, 1_400);

    // Once for the command, then at 700 and 1400.
    assert_eq!(rig.hw.frames, vec![PowerLevel::P80.frame(); 3]);
}

#[test]
fn status_reflects_the_latest_temperature_pass() {
    let mut rig = Rig::new();
    rig.run(1, 599);
    rig.hw.readings[0].temperature_c = 78.0;
    rig.run(600, 600);

    // At 600 the temperature task runs before the status task.
    let status = rig.publisher.last_json("root/brewery/status");
    assert_eq!(status["sensors"][0]["temperature_c"], 78.0);
}
