//! Call and mute state of the headset.
//!
//! The machine only decides *whether* a command changes state and which
//! report (if any) the host must see; the dispatcher turns that into
//! reports. Commands that make no sense in the current state are silent
//! no-ops, never errors.

use crate::hid::telephony::HostLeds;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallState {
    #[default]
    Idle,
    Ringing,
    InCall,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelephonyState {
    pub call: CallState,
    pub muted: bool,
    pub on_hold: bool,
}

impl TelephonyState {
    pub fn on_hook(&self) -> bool {
        self.call != CallState::InCall
    }
}

/// Before/after snapshot for observers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelephonyChange {
    pub before: TelephonyState,
    pub after: TelephonyState,
}

impl TelephonyChange {
    pub fn is_empty(&self) -> bool {
        self.before == self.after
    }

    pub fn mute_changed(&self) -> bool {
        self.before.muted != self.after.muted
    }

    pub fn call_changed(&self) -> bool {
        self.before.call != self.after.call
    }

    pub fn hold_changed(&self) -> bool {
        self.before.on_hold != self.after.on_hold
    }
}

/// What the host must be told after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostSignal {
    /// Nothing to send.
    None,
    /// Set the hook-switch level (`true` = off hook).
    Hook(bool),
    /// Pulse the mute button once.
    MutePulse,
}

#[derive(Debug, Default)]
pub struct TelephonyMachine {
    state: TelephonyState,
    debounce_ms: u32,
    last_hook_ms: Option<u64>,
}

impl TelephonyMachine {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            ..Self::default()
        }
    }

    pub fn state(&self) -> TelephonyState {
        self.state
    }

    /// Toggle the hook. A toggle inside the debounce window of the previous
    /// accepted one is ignored.
    pub fn hook_switch(&mut self, now_ms: u64) -> HostSignal {
        if let Some(last) = self.last_hook_ms {
            if self.debounce_ms > 0 && now_ms.saturating_sub(last) < u64::from(self.debounce_ms) {
                debug!("hook switch debounced");
                return HostSignal::None;
            }
        }
        self.last_hook_ms = Some(now_ms);
        self.state.call = match self.state.call {
            CallState::Idle | CallState::Ringing => CallState::InCall,
            CallState::InCall => CallState::Idle,
        };
        info!("hook switch -> {}", self.state.call);
        HostSignal::Hook(self.state.call == CallState::InCall)
    }

    pub fn answer_call(&mut self) -> HostSignal {
        if self.state.call != CallState::Ringing {
            return HostSignal::None;
        }
        self.state.call = CallState::InCall;
        info!("call answered");
        HostSignal::Hook(true)
    }

    pub fn hang_up(&mut self) -> HostSignal {
        if self.state.call == CallState::Idle {
            return HostSignal::None;
        }
        self.state.call = CallState::Idle;
        self.state.on_hold = false;
        info!("call ended");
        HostSignal::Hook(false)
    }

    /// The host has no input usage for ringing; this only moves the state.
    pub fn incoming_call(&mut self) -> HostSignal {
        if self.state.call == CallState::Idle {
            self.state.call = CallState::Ringing;
            info!("incoming call");
        }
        HostSignal::None
    }

    pub fn mute(&mut self) -> HostSignal {
        if self.state.muted {
            return HostSignal::None;
        }
        self.state.muted = true;
        HostSignal::MutePulse
    }

    pub fn unmute(&mut self) -> HostSignal {
        if !self.state.muted {
            return HostSignal::None;
        }
        self.state.muted = false;
        HostSignal::MutePulse
    }

    pub fn toggle_mute(&mut self) -> HostSignal {
        self.state.muted = !self.state.muted;
        HostSignal::MutePulse
    }

    /// Adopt the state the host reports through its LEDs.
    pub fn apply_host_leds(&mut self, leds: HostLeds) -> TelephonyChange {
        let before = self.state;
        self.state.muted = leds.mute;
        self.state.on_hold = leds.hold;
        self.state.call = if leds.off_hook {
            CallState::InCall
        } else if leds.ring {
            CallState::Ringing
        } else {
            CallState::Idle
        };
        let change = TelephonyChange {
            before,
            after: self.state,
        };
        if !change.is_empty() {
            info!("host state: {}", self.state);
        }
        change
    }
}
