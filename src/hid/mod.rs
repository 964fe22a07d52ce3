//! HID report types for the composite device.
//!
//! All four collections share one interrupt IN endpoint and are told apart
//! by the report ID in the first byte of every transfer.

pub mod consumer;
pub mod keyboard;
pub mod mouse;
pub mod telephony;


use crate::config::{
    MAX_REPORT_LEN, REPORT_ID_CONSUMER, REPORT_ID_KEYBOARD, REPORT_ID_MOUSE, REPORT_ID_TELEPHONY,
};
use consumer::{ConsumerReport, CONSUMER_REPORT_DESCRIPTOR};
use keyboard::{KeyboardReport, KEYBOARD_REPORT_DESCRIPTOR};
use mouse::{MouseReport, MOUSE_REPORT_DESCRIPTOR};
use telephony::{TelephonyReport, TELEPHONY_REPORT_DESCRIPTOR};

/// One complete report ready for the transport gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidReport {
    Keyboard(KeyboardReport),
    Mouse(MouseReport),
    Telephony(TelephonyReport),
    Consumer(ConsumerReport),
}

impl HidReport {
    pub fn report_id(&self) -> u8 {
        match self {
            HidReport::Keyboard(_) => REPORT_ID_KEYBOARD,
            HidReport::Mouse(_) => REPORT_ID_MOUSE,
            HidReport::Telephony(_) => REPORT_ID_TELEPHONY,
            HidReport::Consumer(_) => REPORT_ID_CONSUMER,
        }
    }

    /// Serialise the report body (no report ID).
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        match self {
            HidReport::Keyboard(k) => k.serialize(buf),
            HidReport::Mouse(m) => m.serialize(buf),
            HidReport::Telephony(t) => t.serialize(buf),
            HidReport::Consumer(c) => c.serialize(buf),
        }
    }

    /// Serialise as sent on the shared endpoint: report ID then body.
    /// Returns 0 if `buf` is too small.
    pub fn write_with_id(&self, buf: &mut [u8]) -> usize {
        if buf.len() < 2 {
            return 0;
        }
        buf[0] = self.report_id();
        match self.serialize(&mut buf[1..]) {
            0 => 0,
            n => n + 1,
        }
    }

    /// Encode into an owned endpoint buffer.
    pub fn to_packet(&self) -> heapless::Vec<u8, MAX_REPORT_LEN> {
        let mut buf = [0u8; MAX_REPORT_LEN];
        let n = self.write_with_id(&mut buf);
        heapless::Vec::from_slice(&buf[..n]).unwrap_or_default()
    }

    /// Decode a packet as produced by [`HidReport::write_with_id`].
    pub fn from_packet(data: &[u8]) -> Option<Self> {
        let (&id, body) = data.split_first()?;
        match id {
            REPORT_ID_KEYBOARD => KeyboardReport::from_bytes(body).map(HidReport::Keyboard),
            REPORT_ID_MOUSE => MouseReport::from_bytes(body).map(HidReport::Mouse),
            REPORT_ID_TELEPHONY => TelephonyReport::from_bytes(body).map(HidReport::Telephony),
            REPORT_ID_CONSUMER => ConsumerReport::from_bytes(body).map(HidReport::Consumer),
            _ => None,
        }
    }

    pub fn is_keyboard(&self) -> bool {
        matches!(self, HidReport::Keyboard(_))
    }

    pub fn is_mouse(&self) -> bool {
        matches!(self, HidReport::Mouse(_))
    }

    pub fn is_telephony(&self) -> bool {
        matches!(self, HidReport::Telephony(_))
    }

    pub fn is_consumer(&self) -> bool {
        matches!(self, HidReport::Consumer(_))
    }
}

const COMPOSITE_LEN: usize = KEYBOARD_REPORT_DESCRIPTOR.len()
    + MOUSE_REPORT_DESCRIPTOR.len()
    + TELEPHONY_REPORT_DESCRIPTOR.len()
    + CONSUMER_REPORT_DESCRIPTOR.len();

const fn concat<const N: usize>(parts: &[&[u8]]) -> [u8; N] {
    let mut out = [0u8; N];
    let mut at = 0;
    let mut p = 0;
    while p < parts.len() {
        let part = parts[p];
        let mut i = 0;
        while i < part.len() {
            out[at] = part[i];
            at += 1;
            i += 1;
        }
        p += 1;
    }
    assert!(at == N);
    out
}

/// Report descriptor of the whole composite interface, fixed at build time.
pub static COMPOSITE_REPORT_DESCRIPTOR: [u8; COMPOSITE_LEN] = concat(&[
    KEYBOARD_REPORT_DESCRIPTOR,
    MOUSE_REPORT_DESCRIPTOR,
    TELEPHONY_REPORT_DESCRIPTOR,
    CONSUMER_REPORT_DESCRIPTOR,
]);
