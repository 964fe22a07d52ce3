//! Telephony (headset) HID report, usage page 0x0B.
//!
//! Input, 1 byte after report ID 3:
//! ```text
//! Bit 0 = Hook Switch (absolute: 1 = off hook)
//! Bit 1 = Phone Mute  (momentary: pulse 1 then 0)
//! ```
//!
//! Output from the host, 1 byte after report ID 3:
//! ```text
//! Bit 0 = Mute LED, Bit 1 = Off-Hook LED, Bit 2 = Ring LED, Bit 3 = Hold LED
//! ```

use crate::config::REPORT_ID_TELEPHONY;

/// Telephony input report size in bytes (without report ID).
pub const TELEPHONY_REPORT_SIZE: usize = 1;

/// Controls this headset exposes on the telephony page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelephonyUsage {
    /// Usage 0x20.
    HookSwitch,
    /// Usage 0x2F.
    PhoneMute,
}

impl TelephonyUsage {
    pub const fn usage_id(self) -> u8 {
        match self {
            TelephonyUsage::HookSwitch => 0x20,
            TelephonyUsage::PhoneMute => 0x2F,
        }
    }

    const fn bit(self) -> u8 {
        match self {
            TelephonyUsage::HookSwitch => 0x01,
            TelephonyUsage::PhoneMute => 0x02,
        }
    }
}

/// Telephony input report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelephonyReport {
    pub hook_switch: bool,
    pub phone_mute: bool,
}

impl TelephonyReport {
    pub const REPORT_ID: u8 = REPORT_ID_TELEPHONY;

    pub const fn empty() -> Self {
        Self {
            hook_switch: false,
            phone_mute: false,
        }
    }

    pub fn set(&mut self, usage: TelephonyUsage, active: bool) {
        match usage {
            TelephonyUsage::HookSwitch => self.hook_switch = active,
            TelephonyUsage::PhoneMute => self.phone_mute = active,
        }
    }

    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.hook_switch {
            bits |= TelephonyUsage::HookSwitch.bit();
        }
        if self.phone_mute {
            bits |= TelephonyUsage::PhoneMute.bit();
        }
        bits
    }

    /// Parse a report body (without report ID).
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let bits = *data.first()?;
        Some(Self {
            hook_switch: bits & TelephonyUsage::HookSwitch.bit() != 0,
            phone_mute: bits & TelephonyUsage::PhoneMute.bit() != 0,
        })
    }

    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < TELEPHONY_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.bits();
        TELEPHONY_REPORT_SIZE
    }
}

/// LED state the host pushes in the telephony OUT report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HostLeds {
    pub mute: bool,
    pub off_hook: bool,
    pub ring: bool,
    pub hold: bool,
}

impl HostLeds {
    /// Decode an OUT report. Accepts the body alone or prefixed with
    /// report ID 3; any other report ID is ignored.
    pub fn from_output_report(data: &[u8]) -> Option<Self> {
        let bits = match data {
            [] => return None,
            [bits] => *bits,
            [id, bits, ..] if *id == REPORT_ID_TELEPHONY => *bits,
            _ => return None,
        };
        Some(Self {
            mute: bits & 0x01 != 0,
            off_hook: bits & 0x02 != 0,
            ring: bits & 0x04 != 0,
            hold: bits & 0x08 != 0,
        })
    }
}

/// Report descriptor section for the headset collection (report ID 3).
pub const TELEPHONY_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x0B, // Usage Page (Telephony Devices)
    0x09, 0x05, // Usage (Headset)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID_TELEPHONY, //   Report ID (3)
    //
    //   - Input: hook switch (absolute) -
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x09, 0x20, //   Usage (Hook Switch)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x22, //   Input (Data, Variable, Absolute, No Preferred)
    //
    //   - Input: phone mute (relative, pulsed) -
    0x09, 0x2F, //   Usage (Phone Mute)
    0x81, 0x06, //   Input (Data, Variable, Relative)
    0x95, 0x06, //   Report Count (6)
    0x81, 0x03, //   Input (Constant) - padding
    //
    //   - Output: LEDs from host -
    0x05, 0x08, //   Usage Page (LEDs)
    0x09, 0x09, //   Usage (Mute)
    0x09, 0x17, //   Usage (Off-Hook)
    0x09, 0x18, //   Usage (Ring)
    0x09, 0x20, //   Usage (Hold)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x04, //   Report Count (4)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0x95, 0x04, //   Report Count (4)
    0x91, 0x03, //   Output (Constant) - padding
    //
    0xC0, // End Collection
];
