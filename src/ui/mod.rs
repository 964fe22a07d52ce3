//! User interface subsystem - OLED status view + physical buttons.
//!
//! ## Components
//!
//! - **Display**: SSD1306 128×64 OLED via I²C, redrawn from `DeviceStatus`
//! - **Buttons**: 3 tactile switches with debouncing, each a trigger

pub mod buttons;
pub mod display;

use defmt::Format;

/// Physical button events (after debouncing).
///
/// Every button is a trigger into the device core:
///   - MUTE: toggle mute on the telephony page
///   - HOOK: toggle the hook switch
///   - KEEP_AWAKE: start or stop the mouse keep-awake timer
#[derive(Clone, Copy, PartialEq, Eq, Format)]
pub enum ButtonEvent {
    Mute,
    Hook,
    KeepAwake,
}
