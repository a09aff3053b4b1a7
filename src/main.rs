//! Brewstation Firmware — Main Entry Point
//!
//! Hexagonal architecture driven by a cooperative periodic scheduler.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter        QueuedPublisher     Esp32TimeAdapter   │
//! │  (Temperature+Induction)(Publish)           (Clock)            │
//! │  LogBusClient on the bus I/O thread (Core 0)                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Induction controller · sensor slots · telemetry       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (delegate-driven) · Watchdog                        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use std::rc::Rc;

use anyhow::Result;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyInputPin, AnyOutputPin, PinDriver, Pull};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::spi::{self, SPI3, SpiDeviceDriver, SpiDriver};
use esp_idf_svc::hal::units::FromValueType;
use heapless::Vec;
use log::{error, info, warn};

use brewstation::adapters::bus::QueuedPublisher;
use brewstation::adapters::hardware::{BoardAdapter, BoardOneWire, BoardSpi, HardwareAdapter};
use brewstation::adapters::log_sink::LogBusClient;
use brewstation::adapters::time::Esp32TimeAdapter;
use brewstation::app::ports::ClockPort;
use brewstation::app::service::{AppService, TaskRunner};
use brewstation::bus::io_task;
use brewstation::config::SystemConfig;
use brewstation::drivers::delay::{BusDelay, task_delay};
use brewstation::drivers::{hw_init, hw_timer, watchdog::Watchdog};
use brewstation::error::Error;
use brewstation::scheduler::Scheduler;
use brewstation::sensors::TemperatureHub;
use brewstation::sensors::ds18b20::OneWireThermometers;
use brewstation::sensors::rtd::Max31865;

// ── Board assembly ────────────────────────────────────────────

fn build_hardware(config: &SystemConfig, spi_host: SPI3, now_ms: u64) -> Result<BoardAdapter> {
    // SAFETY: pin numbers come from the validated board configuration and
    // each one is handed to exactly one driver below.
    let mut ow_pin = PinDriver::input_output_od(unsafe { AnyIOPin::new(config.onewire.bus_gpio) })?;
    ow_pin.set_pull(Pull::Up)?;
    let bus: BoardOneWire = OneWireThermometers::new(ow_pin, BusDelay).map_err(Error::from)?;

    // All converters share clk/di/do; validate() checked that.
    let lines = config.rtd.first().ok_or(Error::Config("no RTD probe"))?;
    let host = Rc::new(SpiDriver::new(
        spi_host,
        unsafe { AnyOutputPin::new(lines.clk_gpio) },
        unsafe { AnyOutputPin::new(lines.di_gpio) },
        Some(unsafe { AnyInputPin::new(lines.do_gpio) }),
        &spi::config::DriverConfig::new(),
    )?);
    let device_cfg = spi::config::Config::new()
        .baudrate(1.MHz().into())
        .data_mode(embedded_hal::spi::MODE_1);

    let mut rtds = Vec::new();
    for rtd in &config.rtd {
        let cs = unsafe { AnyOutputPin::new(rtd.cs_gpio) };
        let spi: BoardSpi = SpiDeviceDriver::new(host.clone(), Some(cs), &device_cfg)?;
        if rtds.push(Max31865::new(spi, *rtd)).is_err() {
            return Err(Error::Config("too many RTD probes").into());
        }
    }

    let mut hub = TemperatureHub::new(bus, rtds, &config.onewire);
    hub.start(now_ms);
    Ok(HardwareAdapter::new(hub, &config.induction))
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Brewstation v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::default();
    config.validate()?;

    // ── 3. Initialise hardware peripherals ────────────────────
    let peripherals = Peripherals::take()?;
    if let Err(e) = hw_init::init_peripherals(&config) {
        // Without GPIOs nothing below can run; the watchdog resets us.
        error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    if let Err(e) = hw_init::init_isr_service(config.induction.interrupt_gpio) {
        warn!("ISR service init failed: {} — cooker feedback disabled", e);
    }
    hw_timer::init_pulse_timer(config.induction.tx_gpio).map_err(Error::from)?;

    let clock = Esp32TimeAdapter::new();
    let mut hw = build_hardware(&config, peripherals.spi3, clock.now_ms())?;

    // ── 4. App service + lamp test ────────────────────────────
    let mut app = AppService::new(config.clone())?;
    app.lamp_test(&mut hw, &mut task_delay());

    // ── 5. Bus I/O thread ─────────────────────────────────────
    let _bus_io = io_task::spawn(LogBusClient::new())?;
    let mut publisher = QueuedPublisher::new();

    let mut sched = Scheduler::new(&config.timing);
    if let Some(shortest) = sched.shortest_period_ms() {
        let yield_ms = u64::from(config.timing.loop_yield_ms);
        if yield_ms * 4 > shortest {
            warn!("Loop yield {} ms is close to the {} ms task period; tasks will run late", yield_ms, shortest);
        }
    }
    let watchdog = Watchdog::new();

    info!("System ready. Entering scheduler loop.");

    // ── 6. Scheduler loop ─────────────────────────────────────
    loop {
        let now_ms = clock.now_ms();

        sched.poll(
            now_ms,
            &mut TaskRunner {
                service: &mut app,
                hw: &mut hw,
                publisher: &mut publisher,
            },
        );

        while let Some(cmd) = io_task::try_recv_command() {
            match app.handle_inbound(&cmd, now_ms, &mut hw) {
                Ok(Some(level)) => info!("Command: power set to {}", level),
                Ok(None) => {}
                Err(e) => warn!("Command on '{}' rejected: {}", cmd.topic, e),
            }
        }

        watchdog.feed();

        // Yield so the idle task (and its watchdog) can run.
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(config.timing.loop_yield_ms);
    }
}
