//! Cooperative periodic scheduler.
//!
//! The scheduler only keeps time: each pass it checks every task and
//! notifies a [`SchedulerDelegate`] for each one whose period has elapsed.
//! The main loop implements the delegate to run the matching service
//! operation, then yields.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  poll(now)                                                   │
//! │                                                              │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐        │
//! │  │ induction    │─▶│ read temps   │─▶│ send status  │        │
//! │  │ 700 ms       │  │ 100 ms       │  │ 600 ms       │        │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘        │
//! │         │ due?            │ due?            │ due?           │
//! │         ▼                 ▼                 ▼                │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulerDelegate::on_task_due            │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tasks are checked in fixed priority order, so when several are due in
//! the same pass they run induction first, then temperature, then status.

use log::{debug, info};

use crate::app::ports::SchedulerDelegate;
use crate::config::TimingConfig;

// ═══════════════════════════════════════════════════════════════
//  Task table
// ═══════════════════════════════════════════════════════════════

/// Scheduled tasks, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    InductionUpdate,
    ReadTemperature,
    SendStatus,
}

impl TaskId {
    pub const ALL: [Self; 3] = [Self::InductionUpdate, Self::ReadTemperature, Self::SendStatus];

    pub const fn name(self) -> &'static str {
        match self {
            Self::InductionUpdate => "induction",
            Self::ReadTemperature => "read-temp",
            Self::SendStatus => "status",
        }
    }
}

/// One periodic task.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleTask {
    pub id: TaskId,
    pub period_ms: u64,
    /// Time of the last run; 0 until the first one.
    pub last_run_ms: u64,
    pub enabled: bool,
    pub runs: u64,
}

impl ScheduleTask {
    const fn new(id: TaskId, period_ms: u32) -> Self {
        Self {
            id,
            period_ms: period_ms as u64,
            last_run_ms: 0,
            enabled: true,
            runs: 0,
        }
    }

    fn is_due(&self, now_ms: u64) -> bool {
        // A clock that went backwards waits for it to catch up.
        self.enabled && now_ms.checked_sub(self.last_run_ms).is_some_and(|dt| dt >= self.period_ms)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

pub struct Scheduler {
    tasks: [ScheduleTask; 3],
}

impl Scheduler {
    pub fn new(timing: &TimingConfig) -> Self {
        let tasks = [
            ScheduleTask::new(TaskId::InductionUpdate, timing.induction_interval_ms),
            ScheduleTask::new(TaskId::ReadTemperature, timing.read_temp_interval_ms),
            ScheduleTask::new(TaskId::SendStatus, timing.status_interval_ms),
        ];
        for t in &tasks {
            info!("scheduler: '{}' every {} ms", t.id.name(), t.period_ms);
        }
        Self { tasks }
    }

    /// Run every due task once, in priority order. Returns how many ran.
    pub fn poll(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) -> usize {
        let mut ran = 0;
        for task in self.tasks.iter_mut() {
            if !task.is_due(now_ms) {
                continue;
            }
            debug!("scheduler: '{}' due at {} ms", task.id.name(), now_ms);
            delegate.on_task_due(task.id, now_ms);
            task.last_run_ms = now_ms;
            task.runs += 1;
            ran += 1;
        }
        ran
    }

    /// Enable or disable one task. A re-enabled task keeps its phase.
    pub fn set_enabled(&mut self, id: TaskId, enabled: bool) {
        if let Some(t) = self.tasks.iter_mut().find(|t| t.id == id) {
            if t.enabled != enabled {
                info!("scheduler: '{}' {}", id.name(), if enabled { "enabled" } else { "disabled" });
            }
            t.enabled = enabled;
        }
    }

    pub fn task(&self, id: TaskId) -> Option<&ScheduleTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Shortest enabled period; the loop must never block close to it.
    pub fn shortest_period_ms(&self) -> Option<u64> {
        self.tasks.iter().filter(|t| t.enabled).map(|t| t.period_ms).min()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    /// Test delegate that records every run.
    #[derive(Default)]
    struct RecordingDelegate {
        runs: Vec<(TaskId, u64)>,
    }

    impl SchedulerDelegate for RecordingDelegate {
        fn on_task_due(&mut self, task: TaskId, now_ms: u64) {
            self.runs.push((task, now_ms));
        }
    }

    impl RecordingDelegate {
        fn count(&self, id: TaskId) -> usize {
            self.runs.iter().filter(|(t, _)| *t == id).count()
        }

        fn at(&self, now_ms: u64) -> Vec<TaskId> {
            self.runs.iter().filter(|(_, t)| *t == now_ms).map(|(id, _)| *id).collect()
        }
    }

    fn timing(read: u32, status: u32, induction: u32) -> TimingConfig {
        TimingConfig {
            read_temp_interval_ms: read,
            status_interval_ms: status,
            induction_interval_ms: induction,
            loop_yield_ms: 1,
        }
    }

    #[test]
    fn seven_hundred_ms_of_default_periods() {
        let mut sched = Scheduler::new(&timing(100, 600, 700));
        let mut d = RecordingDelegate::default();

        for now in 1..=700 {
            sched.poll(now, &mut d);
        }

        assert_eq!(d.count(TaskId::ReadTemperature), 7);
        assert_eq!(d.count(TaskId::SendStatus), 1);
        assert_eq!(d.count(TaskId::InductionUpdate), 1);
        assert_eq!(d.at(600), vec![TaskId::ReadTemperature, TaskId::SendStatus]);
        assert_eq!(d.at(700), vec![TaskId::InductionUpdate, TaskId::ReadTemperature]);
    }

    #[test]
    fn all_due_together_run_in_priority_order() {
        let mut sched = Scheduler::new(&timing(50, 50, 50));
        let mut d = RecordingDelegate::default();
        assert_eq!(sched.poll(50, &mut d), 3);
        assert_eq!(d.at(50), TaskId::ALL.to_vec());
    }

    #[test]
    fn coarse_polling_runs_each_task_once_per_pass() {
        let mut sched = Scheduler::new(&timing(100, 600, 700));
        let mut d = RecordingDelegate::default();
        // A late pass does not replay missed periods.
        sched.poll(1_000, &mut d);
        assert_eq!(d.runs.len(), 3);
        assert_eq!(sched.task(TaskId::ReadTemperature).map(|t| t.last_run_ms), Some(1_000));
    }

    #[test]
    fn disabled_task_is_skipped() {
        let mut sched = Scheduler::new(&timing(100, 600, 700));
        let mut d = RecordingDelegate::default();
        sched.set_enabled(TaskId::SendStatus, false);
        for now in (100..=1_200).step_by(100) {
            sched.poll(now, &mut d);
        }
        assert_eq!(d.count(TaskId::SendStatus), 0);
        assert_eq!(sched.shortest_period_ms(), Some(100));

        sched.set_enabled(TaskId::SendStatus, true);
        sched.poll(1_300, &mut d);
        assert_eq!(d.count(TaskId::SendStatus), 1);
    }

    #[test]
    fn clock_going_backwards_waits() {
        let mut sched = Scheduler::new(&timing(100, 600, 700));
        let mut d = RecordingDelegate::default();
        sched.poll(500, &mut d);
        let before = d.runs.len();
        sched.poll(400, &mut d);
        assert_eq!(d.runs.len(), before);
        sched.poll(600, &mut d);
        assert_eq!(d.count(TaskId::ReadTemperature), 2);
    }
}
