//! Consumer Control HID support - system mute.
//!
//! Consumer Control is a separate HID usage page (0x0C). This device uses
//! it as the fallback mute path for hosts and applications that ignore the
//! telephony page.
//!
//! Transmitted with report ID 4 on the shared endpoint.

use crate::config::REPORT_ID_CONSUMER;

/// Consumer control report size (2 bytes for usage ID).
pub const CONSUMER_REPORT_SIZE: usize = 2;

/// Consumer control usages this device sends (Usage Page 0x0C).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ConsumerUsage {
    None = 0x0000,
    /// System mute toggle.
    Mute = 0x00E2,
}

impl From<u16> for ConsumerUsage {
    fn from(code: u16) -> Self {
        match code {
            0x00E2 => ConsumerUsage::Mute,
            _ => ConsumerUsage::None,
        }
    }
}

/// Consumer Control HID report.
///
/// One 16-bit usage code; zero means released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsumerReport {
    /// Active consumer control usage (little-endian u16).
    pub usage: u16,
}

impl ConsumerReport {
    pub const REPORT_ID: u8 = REPORT_ID_CONSUMER;

    /// Create an empty (no keys pressed) report.
    pub const fn empty() -> Self {
        Self { usage: 0 }
    }

    /// Create a report with a single usage.
    pub const fn new(usage: ConsumerUsage) -> Self {
        Self {
            usage: usage as u16,
        }
    }

    /// Parse a report body (without report ID).
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < CONSUMER_REPORT_SIZE {
            return None;
        }
        let usage = u16::from_le_bytes([data[0], data[1]]);
        Some(Self { usage })
    }

    /// Serialize to USB HID report bytes.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < CONSUMER_REPORT_SIZE {
            return 0;
        }
        buf[..CONSUMER_REPORT_SIZE].copy_from_slice(&self.usage.to_le_bytes());
        CONSUMER_REPORT_SIZE
    }

    /// Check if any key is pressed.
    pub fn is_empty(&self) -> bool {
        self.usage == 0
    }

    pub fn get_usage(&self) -> ConsumerUsage {
        ConsumerUsage::from(self.usage)
    }
}

/// Report descriptor section for Consumer Control (report ID 4).
pub const CONSUMER_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x0C, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID_CONSUMER, //   Report ID (4)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x03, //   Logical Maximum (1023)
    0x19, 0x00, //   Usage Minimum (0)
    0x2A, 0xFF, 0x03, //   Usage Maximum (1023)
    0x75, 0x10, //   Report Size (16)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0xC0, // End Collection
];
