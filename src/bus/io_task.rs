//! Async bus I/O task — bridges the channels to a [`BusClient`].
//!
//! Runs in a dedicated thread using `edge-executor` for cooperative
//! multi-task scheduling and `async-io-mini` for reactor-driven
//! timers (no busy-spinning). Two concurrent futures:
//!
//! 1. **Publish**: truly async via `OUTBOUND.receive().await`
//!    (wakes instantly when the scheduler loop queues telemetry)
//! 2. **Inbound**: polls the client every 20ms via reactor timer and
//!    forwards commands into `INBOUND`
//!
//! ```text
//!  ┌────────────────────────────────────────────────────────────┐
//!  │  Bus I/O Thread                                            │
//!  │  ┌──────────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                        │  │
//!  │  │                                                      │  │
//!  │  │  ┌─────────────────┐        ┌──────────────────┐     │  │
//!  │  │  │ Publish (async) │        │ Inbound poll     │     │  │
//!  │  │  │ wake-on-send    │        │ 20ms ⏱           │     │  │
//!  │  │  └─────────────────┘        └──────────────────┘     │  │
//!  │  └──────────────────────────────────────────────────────┘  │
//!  └────────────────────────────────────────────────────────────┘
//! ```

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use log::{info, warn};

use super::channels::{INBOUND, InboundChannel, InboundCommand, OUTBOUND, OutboundChannel};
use crate::error::PublishError;

const INBOUND_POLL_MS: u64 = 20;

/// A message bus connection (MQTT client, serial bridge, log sink).
pub trait BusClient {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), PublishError>;

    /// Next command received since the last call, if any.
    fn poll_inbound(&mut self) -> Option<InboundCommand>;
}

// ── Single steps (shared by the loops and the tests) ─────────

/// Wait for the next outbound message and hand it to the client.
/// A failed publish is logged and the message dropped.
pub async fn publish_next<C: BusClient>(
    client: &RefCell<C>,
    outbound: &OutboundChannel,
) -> Result<(), PublishError> {
    let msg = outbound.receive().await;
    let result = client.borrow_mut().publish(&msg.topic, &msg.payload);
    if let Err(e) = result {
        warn!("bus: publish to '{}' failed: {}", msg.topic, e);
    }
    result
}

/// Move every pending client command into `inbound`. Returns how many
/// were forwarded.
pub fn forward_inbound<C: BusClient>(client: &RefCell<C>, inbound: &InboundChannel) -> usize {
    let mut forwarded = 0;
    while let Some(cmd) = client.borrow_mut().poll_inbound() {
        if inbound.try_send(cmd).is_err() {
            warn!("bus: inbound channel full, dropping command");
            break;
        }
        forwarded += 1;
    }
    forwarded
}

// ── Async loops ──────────────────────────────────────────────

async fn publish_loop<C: BusClient>(client: Rc<RefCell<C>>, outbound: &OutboundChannel) {
    loop {
        let _ = publish_next(&client, outbound).await;
    }
}

async fn inbound_loop<C: BusClient>(client: Rc<RefCell<C>>, inbound: &InboundChannel) {
    loop {
        forward_inbound(&client, inbound);
        async_io_mini::Timer::after(Duration::from_millis(INBOUND_POLL_MS)).await;
    }
}

/// Entry point for the I/O thread. Sets up the executor, spawns the
/// two async tasks, and drives them forever.
fn run_io_loop<C: BusClient>(client: C) {
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    let client = Rc::new(RefCell::new(client));

    executor.spawn(publish_loop(client.clone(), &OUTBOUND)).detach();
    executor.spawn(inbound_loop(client, &INBOUND)).detach();

    info!("bus: I/O task started (async, reactor-driven)");

    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
}

// ── Thread spawn ─────────────────────────────────────────────

/// Spawn the bus I/O task in a dedicated thread pinned to Core 0
/// (PRO_CPU), next to the network stack.
pub fn spawn<C: BusClient + Send + 'static>(client: C) -> std::io::Result<std::thread::JoinHandle<()>> {
    crate::drivers::task_pin::spawn_on_core(
        crate::drivers::task_pin::Core::Pro,
        10,
        12,
        "bus-io\0",
        move || run_io_loop(client),
    )
}

// ── Channel accessors for the scheduler loop ─────────────────

/// Try to receive an inbound command from the I/O task.
pub fn try_recv_command() -> Option<InboundCommand> {
    INBOUND.try_receive().ok()
}

// ── Tests ────────────────────────────────────────────────────
