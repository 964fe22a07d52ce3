//! Application-wide constants and runtime configuration.
//!
//! Timing parameters, queue capacities and USB identity live here so they
//! can be tuned in one place. `DeviceConfig` carries the few settings the
//! configuration layer may choose per device instance.

use crate::hid::keyboard::ModifierMask;
use crate::layout::{KeyStroke, KeyboardLayout};

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0004;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "hid-composite";
pub const USB_PRODUCT: &str = "HID Composite (Keyboard + Mouse + Headset)";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 1;

// GPIO pin assignments (nRF52840-DK defaults)
//
// Wired in `main.rs`; adjust for your board.
//
//   Button MUTE       → P0.11
//   Button HOOK       → P0.12
//   Button KEEP-AWAKE → P0.24
//   I²C SDA           → P0.26
//   I²C SCL           → P0.27

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

/// How often the OLED status view is redrawn (ms).
pub const DISPLAY_REFRESH_MS: u64 = 250;

/// Keep-awake settings the KEEP-AWAKE button toggles.
pub const BUTTON_KEEP_AWAKE_INTERVAL_MS: u32 = 60_000;
pub const BUTTON_KEEP_AWAKE_JITTER_MS: u32 = 5_000;

/// Largest IN report on the shared endpoint (report ID + 8-byte keyboard).
pub const MAX_REPORT_LEN: usize = 9;

// Report IDs on the shared endpoint

pub const REPORT_ID_KEYBOARD: u8 = 1;
pub const REPORT_ID_MOUSE: u8 = 2;
pub const REPORT_ID_TELEPHONY: u8 = 3;
pub const REPORT_ID_CONSUMER: u8 = 4;

// Dispatch

/// Period of the cooperative dispatch tick (ms).
pub const TICK_PERIOD_MS: u64 = 1;

/// Capacity of the REALTIME command class.
pub const REALTIME_QUEUE_CAPACITY: usize = 16;

/// Capacity of the BACKGROUND command class.
pub const BACKGROUND_QUEUE_CAPACITY: usize = 4;

/// Reports the transport gate may hold while the endpoint is busy.
pub const TRANSPORT_QUEUE_CAPACITY: usize = 8;

/// Failures recorded per tick; extra failures are still logged.
pub const MAX_FAILURES_PER_TICK: usize = 4;

/// Consecutive busy ticks tolerated before a report or command is dropped.
pub const DEFAULT_BUSY_RETRY_LIMIT: u8 = 3;

// Timing

/// Hard floor between two typed key events (ms).
pub const MIN_KEY_DELAY_MS: u32 = 10;

/// Hold time of a key tap (ms).
pub const KEY_TAP_HOLD_MS: u32 = 10;

/// Hold time of a mouse click (ms).
pub const CLICK_HOLD_MS: u32 = 10;

/// Hold time of the momentary mute / hook buttons (ms).
pub const TELEPHONY_PULSE_MS: u32 = 50;

/// Gap between the two halves of a keep-awake jiggle or tap (ms).
pub const KEEP_AWAKE_STEP_MS: u32 = 10;

/// Default typing speed (ms per key event).
pub const DEFAULT_TYPING_SPEED_MS: u32 = 50;

/// Longest text accepted by a single `TypeText` command (bytes).
pub const MAX_TEXT_LEN: usize = 128;

/// What a keyboard keep-awake tick sends to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeepAwakeKey {
    /// Press and release modifiers only; no usage code reaches the host.
    Modifier(ModifierMask),
    /// Tap a translated key.
    Key(KeyStroke),
}

impl Default for KeepAwakeKey {
    fn default() -> Self {
        KeepAwakeKey::Modifier(ModifierMask::RIGHT_SHIFT)
    }
}

/// Per-instance settings chosen by the configuration layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Layout used to translate characters and key names.
    pub layout: KeyboardLayout,
    /// Hook-switch toggles closer together than this are ignored (ms).
    /// Zero queues every toggle.
    pub hook_debounce_ms: u32,
    /// See [`DEFAULT_BUSY_RETRY_LIMIT`].
    pub busy_retry_limit: u8,
    /// Keyboard keep-awake action.
    pub keyboard_keep_awake: KeepAwakeKey,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            layout: KeyboardLayout::QwertyUs,
            hook_debounce_ms: 0,
            busy_retry_limit: DEFAULT_BUSY_RETRY_LIMIT,
            keyboard_keep_awake: KeepAwakeKey::default(),
        }
    }
}
