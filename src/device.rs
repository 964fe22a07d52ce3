//! The composite device: every entry point a trigger or the firmware calls.
//!
//! Entry points validate and translate their input, then queue a command;
//! nothing reaches the host until the next [`CompositeDevice::tick`].
//! Translation happens here, at submission, so a bad key name is reported
//! to the caller rather than surfacing later in a tick.

use crate::config::{DeviceConfig, KeepAwakeKey};
use crate::dispatcher::{ActivityKind, Dispatcher, TickOutcome};
use crate::error::{Error, Result};
use crate::hid::keyboard::ModifierMask;
use crate::hid::mouse::MouseButton;
use crate::hid::telephony::HostLeds;
use crate::jitter::JitterSource;
use crate::keep_awake::KeepAwakeScheduler;
use crate::layout::{translate, KeyStroke, KeyboardLayout};
use crate::queue::{ButtonAction, Command, MutePath, SubDevice};
use crate::telephony::{CallState, TelephonyChange};
use crate::transport::{HidLink, TransportGate};
use crate::typing::TypingSequence;

/// Point-in-time view for displays and status sensors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceStatus {
    pub connected: bool,
    pub ready: bool,
    pub muted: bool,
    pub in_call: bool,
    pub ringing: bool,
    pub on_hold: bool,
    pub mouse_keep_awake: bool,
    pub keyboard_keep_awake: bool,
    pub typing: bool,
}

pub struct CompositeDevice<L, J> {
    gate: TransportGate<L>,
    dispatcher: Dispatcher,
    keep_awake: KeepAwakeScheduler,
    jitter: J,
    now_ms: u64,
}

impl<L: HidLink, J: JitterSource> CompositeDevice<L, J> {
    pub fn new(link: L, jitter: J, config: DeviceConfig) -> Self {
        info!("composite device up, layout {}", config.layout);
        Self {
            gate: TransportGate::new(link, config.busy_retry_limit),
            dispatcher: Dispatcher::new(config),
            keep_awake: KeepAwakeScheduler::new(),
            jitter,
            now_ms: 0,
        }
    }

    pub fn link(&self) -> &L {
        self.gate.link()
    }

    pub fn link_mut(&mut self) -> &mut L {
        self.gate.link_mut()
    }

    fn submit(&mut self, command: Command) -> Result<()> {
        self.dispatcher.submit(command, &mut self.gate)
    }

    /// A modifier name (`"SHIFT"`, `"ctrl+alt"`) holds just those bits.
    fn stroke(&self, key: &str, modifiers: ModifierMask) -> Result<KeyStroke> {
        let base = match ModifierMask::from_name(key) {
            Some(mask) if !mask.is_empty() => KeyStroke::new(0, mask),
            _ => translate(self.layout(), key)?,
        };
        Ok(base.with_modifiers(modifiers))
    }

    // Mouse

    pub fn move_by(&mut self, dx: i8, dy: i8) -> Result<()> {
        self.submit(Command::MouseMove { dx, dy })
    }

    pub fn scroll(&mut self, wheel: i8, pan: i8) -> Result<()> {
        self.submit(Command::MouseScroll { wheel, pan })
    }

    pub fn click(&mut self, button: MouseButton) -> Result<()> {
        self.submit(Command::MouseButton(button, ButtonAction::Click))
    }

    pub fn mouse_press(&mut self, button: MouseButton) -> Result<()> {
        self.submit(Command::MouseButton(button, ButtonAction::Press))
    }

    pub fn mouse_release(&mut self, button: MouseButton) -> Result<()> {
        self.submit(Command::MouseButton(button, ButtonAction::Release))
    }

    pub fn mouse_release_all(&mut self) -> Result<()> {
        self.submit(Command::MouseReleaseAll)
    }

    // Keyboard

    /// Press `key` (a character or key name) with extra `modifiers` held.
    pub fn key_press(&mut self, key: &str, modifiers: ModifierMask) -> Result<()> {
        let stroke = self.stroke(key, modifiers)?;
        self.submit(Command::KeyPress(stroke))
    }

    pub fn key_release(&mut self, key: &str, modifiers: ModifierMask) -> Result<()> {
        let stroke = self.stroke(key, modifiers)?;
        self.submit(Command::KeyRelease(stroke))
    }

    pub fn key_tap(&mut self, key: &str, modifiers: ModifierMask) -> Result<()> {
        let stroke = self.stroke(key, modifiers)?;
        self.submit(Command::KeyTap(stroke))
    }

    pub fn key_release_all(&mut self) -> Result<()> {
        self.submit(Command::KeyReleaseAll)
    }

    /// Type `text` with `speed_ms ± jitter_ms` between events.
    pub fn type_text(&mut self, text: &str, speed_ms: u32, jitter_ms: u32) -> Result<()> {
        let seq = TypingSequence::new(self.layout(), text, speed_ms, jitter_ms)?;
        self.submit(Command::TypeText(seq))
    }

    // Telephony

    pub fn mute(&mut self, path: MutePath) -> Result<()> {
        self.submit(Command::Mute(path))
    }

    pub fn unmute(&mut self, path: MutePath) -> Result<()> {
        self.submit(Command::Unmute(path))
    }

    pub fn toggle_mute(&mut self, path: MutePath) -> Result<()> {
        self.submit(Command::ToggleMute(path))
    }

    pub fn hook_switch(&mut self) -> Result<()> {
        self.submit(Command::HookSwitch)
    }

    pub fn answer_call(&mut self) -> Result<()> {
        self.submit(Command::AnswerCall)
    }

    pub fn hang_up(&mut self) -> Result<()> {
        self.submit(Command::HangUp)
    }

    pub fn incoming_call(&mut self) -> Result<()> {
        self.submit(Command::IncomingCall)
    }

    // Keep-awake

    pub fn start_mouse_keep_awake(&mut self, interval_ms: u32, jitter_ms: u32) {
        self.keep_awake.start(
            SubDevice::Mouse,
            interval_ms,
            jitter_ms,
            self.now_ms,
            &mut self.jitter,
        );
    }

    pub fn stop_mouse_keep_awake(&mut self) {
        self.keep_awake.stop(SubDevice::Mouse);
    }

    pub fn start_keyboard_keep_awake(&mut self, interval_ms: u32, jitter_ms: u32) {
        self.keep_awake.start(
            SubDevice::Keyboard,
            interval_ms,
            jitter_ms,
            self.now_ms,
            &mut self.jitter,
        );
    }

    pub fn stop_keyboard_keep_awake(&mut self) {
        self.keep_awake.stop(SubDevice::Keyboard);
    }

    /// Choose what a keyboard keep-awake tick sends: a modifier name
    /// (`RIGHT_SHIFT`, `ctrl+alt`, ...) is tapped on its own, anything else
    /// is translated as a key.
    pub fn set_keyboard_keep_awake_key(&mut self, name: &str) -> Result<()> {
        let action = match ModifierMask::from_name(name) {
            Some(mask) if !mask.is_empty() => KeepAwakeKey::Modifier(mask),
            _ => KeepAwakeKey::Key(translate(self.layout(), name)?),
        };
        self.dispatcher.set_keyboard_keep_awake(action);
        Ok(())
    }

    // Layout

    pub fn set_layout(&mut self, layout: KeyboardLayout) {
        debug!("layout -> {}", layout);
        self.dispatcher.set_layout(layout);
    }

    pub fn layout(&self) -> KeyboardLayout {
        self.dispatcher.config().layout
    }

    // Runtime

    /// Advance time to `now_ms`: fire keep-awake timers, then dispatch.
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        self.now_ms = now_ms;
        self.keep_awake
            .poll(now_ms, &mut self.jitter, self.dispatcher.queue_mut());
        self.dispatcher.tick(now_ms, &mut self.gate, &mut self.jitter)
    }

    /// The link finished the in-flight transfer.
    pub fn transfer_complete(&mut self) -> Result<()> {
        self.gate.on_transfer_complete().map_err(Error::from)
    }

    /// Feed an OUT report from the host. Returns the resulting telephony
    /// change, or `None` if the report is not a telephony LED report.
    pub fn host_output_report(&mut self, data: &[u8]) -> Option<TelephonyChange> {
        let leds = HostLeds::from_output_report(data)?;
        Some(self.dispatcher.apply_host_leds(leds))
    }

    // State

    pub fn is_connected(&self) -> bool {
        self.gate.is_connected()
    }

    /// Connected and the endpoint is free for a new transfer.
    pub fn is_ready(&self) -> bool {
        self.gate.is_connected() && !self.gate.in_flight()
    }

    pub fn is_muted(&self) -> bool {
        self.dispatcher.telephony().muted
    }

    pub fn is_in_call(&self) -> bool {
        self.dispatcher.telephony().call == CallState::InCall
    }

    pub fn is_ringing(&self) -> bool {
        self.dispatcher.telephony().call == CallState::Ringing
    }

    pub fn is_on_hold(&self) -> bool {
        self.dispatcher.telephony().on_hold
    }

    pub fn pressed_keys(&self) -> &[u8] {
        self.dispatcher.encoder().pressed_keys()
    }

    pub fn held_modifiers(&self) -> ModifierMask {
        self.dispatcher.encoder().held_modifiers()
    }

    pub fn held_buttons(&self) -> u8 {
        self.dispatcher.encoder().held_buttons()
    }

    pub fn pending_commands(&self) -> usize {
        self.dispatcher.queue().realtime_len() + self.dispatcher.queue().background_len()
    }

    pub fn activity(&self, device: SubDevice) -> Option<ActivityKind> {
        self.dispatcher.activity(device)
    }

    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            connected: self.is_connected(),
            ready: self.is_ready(),
            muted: self.is_muted(),
            in_call: self.is_in_call(),
            ringing: self.is_ringing(),
            on_hold: self.is_on_hold(),
            mouse_keep_awake: self.keep_awake.is_enabled(SubDevice::Mouse),
            keyboard_keep_awake: self.keep_awake.is_enabled(SubDevice::Keyboard),
            typing: self.activity(SubDevice::Keyboard) == Some(ActivityKind::Typing),
        }
    }
}
