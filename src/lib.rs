//! Device core for hid-composite.
//!
//! Everything between "a trigger fired" and "a report left on the
//! endpoint": layout translation, report encoding, the priority queue and
//! dispatcher, typing, keep-awake and the call/mute state machine. None of
//! it touches hardware, so the whole core builds and tests on the host.
//!
//! Usage: `cargo test --lib` / `cargo test --test integration`
//!
//! The embedded binary (`src/main.rs`, feature `embedded`) wraps this core
//! with the Embassy USB stack, buttons and the status display.

#![cfg_attr(not(test), no_std)]

// Must stay first so every module below sees the logging macros.
mod fmt;

pub mod config;
pub mod device;
pub mod dispatcher;
pub mod encoder;
pub mod error;
pub mod hid;
pub mod jitter;
pub mod keep_awake;
pub mod layout;
pub mod queue;
pub mod telephony;
pub mod transport;
pub mod typing;

pub use config::DeviceConfig;
pub use device::{CompositeDevice, DeviceStatus};
pub use dispatcher::{Failure, TickOutcome};
pub use error::{Error, LinkError, Result, TransportError};
pub use hid::keyboard::ModifierMask;
pub use hid::mouse::MouseButton;
pub use hid::HidReport;
pub use jitter::{JitterSource, NoJitter, RngJitter};
pub use layout::{KeyStroke, KeyboardLayout};
pub use queue::{MutePath, SubDevice};
pub use telephony::{CallState, TelephonyChange, TelephonyState};
pub use transport::HidLink;

// ═══════════════════════════════════════════════════════════════════════════
// Crate-level Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════
    // Configuration Defaults
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn default_config_matches_constants() {
        let cfg = DeviceConfig::default();
        assert_eq!(cfg.layout, KeyboardLayout::QwertyUs);
        assert_eq!(cfg.hook_debounce_ms, 0);
        assert_eq!(cfg.busy_retry_limit, config::DEFAULT_BUSY_RETRY_LIMIT);
        assert_eq!(
            cfg.keyboard_keep_awake,
            config::KeepAwakeKey::Modifier(ModifierMask::RIGHT_SHIFT)
        );
    }

    #[test]
    fn every_report_fits_the_endpoint_buffer() {
        use hid::consumer::ConsumerReport;
        use hid::keyboard::KeyboardReport;
        use hid::mouse::MouseReport;
        use hid::telephony::TelephonyReport;

        for report in [
            HidReport::Keyboard(KeyboardReport::empty()),
            HidReport::Mouse(MouseReport::empty()),
            HidReport::Telephony(TelephonyReport::empty()),
            HidReport::Consumer(ConsumerReport::empty()),
        ] {
            let packet = report.to_packet();
            assert!(!packet.is_empty());
            assert!(packet.len() <= config::MAX_REPORT_LEN);
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Error Conversions
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn link_errors_surface_as_device_errors() {
        let e: TransportError = LinkError::Busy.into();
        assert_eq!(Error::from(e), Error::Busy);
        let e: TransportError = LinkError::NotConnected.into();
        assert_eq!(Error::from(e), Error::NotConnected);
    }

    #[test]
    fn error_display_is_human_readable() {
        assert_eq!(
            Error::UnknownKey { position: Some(3) }.to_string(),
            "unknown key at index 3"
        );
        assert_eq!(Error::QueueFull.to_string(), "command queue full");
    }
}
