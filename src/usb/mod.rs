//! USB Device subsystem - presents the composite HID device to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`. One HID interface carries all four collections
//! (keyboard, mouse, telephony, consumer) on a single interrupt IN
//! endpoint, told apart by report ID; the OUT endpoint carries the host's
//! telephony LED report.
//!
//! The device core never touches the stack directly: it writes through
//! [`hid_device::UsbLink`], and the writer task signals back when each
//! transfer has left.

pub mod hid_device;
