//! GPIO / peripheral pin assignments for the brewing station board.
//!
//! Single source of truth: [`SystemConfig::default`](crate::config::SystemConfig)
//! and the hardware init code reference this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// One-wire temperature bus (DS18B20)
// ---------------------------------------------------------------------------

/// Open-drain data line shared by every DS18B20 on the bus.
pub const ONEWIRE_BUS_GPIO: i32 = 16;

// ---------------------------------------------------------------------------
// RTD bridge converter (MAX31865 on the VSPI host, mode 1)
// ---------------------------------------------------------------------------

pub const RTD_CS_GPIO: i32 = 22;
/// Converter SDI (our MOSI), routed through the GPIO matrix.
pub const RTD_DI_GPIO: i32 = 4;
/// Converter SDO (our MISO).
pub const RTD_DO_GPIO: i32 = 19;
pub const RTD_CLK_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Induction cooker interface
// ---------------------------------------------------------------------------

/// White wire: relay powering the cooker (and its cooling fan).
pub const INDUCTION_RELAY_GPIO: i32 = 32;
/// Yellow wire: pulse command line to the cooker.
pub const INDUCTION_TX_GPIO: i32 = 33;
/// Blue wire: cooker feedback line, interrupt on any edge.
pub const INDUCTION_INTERRUPT_GPIO: i32 = 21;

// ---------------------------------------------------------------------------
// Power level indicator LEDs (one per discrete step)
// ---------------------------------------------------------------------------

pub const INDUCTION_LED_0_GPIO: i32 = 13;
pub const INDUCTION_LED_20_GPIO: i32 = 12;
pub const INDUCTION_LED_40_GPIO: i32 = 14;
pub const INDUCTION_LED_60_GPIO: i32 = 27;
pub const INDUCTION_LED_80_GPIO: i32 = 26;
pub const INDUCTION_LED_100_GPIO: i32 = 25;

/// Indicator pins in step order (0 %, 20 %, … 100 %).
pub const INDUCTION_LED_GPIOS: [i32; 6] = [
    INDUCTION_LED_0_GPIO,
    INDUCTION_LED_20_GPIO,
    INDUCTION_LED_40_GPIO,
    INDUCTION_LED_60_GPIO,
    INDUCTION_LED_80_GPIO,
    INDUCTION_LED_100_GPIO,
];
