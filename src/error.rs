//! Unified error type for the device core.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.

use core::fmt;

/// Top-level error type returned by command submission and dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The key name or character has no mapping in the selected layout.
    /// `position` is the character index when the key came from typed text.
    UnknownKey { position: Option<usize> },

    /// No host session; the pending report was dropped.
    NotConnected,

    /// Transport stayed busy past the retry limit.
    Busy,

    /// The command queue for this priority class is full.
    QueueFull,

    /// Text longer than `config::MAX_TEXT_LEN`.
    TextTooLong,
}

/// Errors reported by the transport gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Host session not established. Dropped, not buffered.
    NotConnected,
    /// Endpoint or pending queue full. Retried by the caller.
    Busy,
}

/// Errors a `HidLink` may return when starting a physical transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    NotConnected,
    Busy,
}

// Convenience conversions

impl From<LinkError> for TransportError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::NotConnected => TransportError::NotConnected,
            LinkError::Busy => TransportError::Busy,
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NotConnected => Error::NotConnected,
            TransportError::Busy => Error::Busy,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownKey {
                position: Some(index),
            } => write!(f, "unknown key at index {}", index),
            Error::UnknownKey { position: None } => f.write_str("unknown key"),
            Error::NotConnected => f.write_str("host not connected"),
            Error::Busy => f.write_str("transport busy"),
            Error::QueueFull => f.write_str("command queue full"),
            Error::TextTooLong => f.write_str("text too long"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
