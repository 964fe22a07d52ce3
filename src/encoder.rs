//! Report encoder.
//!
//! Owns the "what is currently held" state of every sub-device and turns
//! each state change into one complete report. Mouse deltas are one-shot:
//! they appear in exactly one report and never accumulate.

use heapless::Vec;

use crate::hid::consumer::{ConsumerReport, ConsumerUsage};
use crate::hid::keyboard::{KeyboardReport, ModifierMask, MAX_PRESSED_KEYS};
use crate::hid::mouse::{MouseButton, MouseReport};
use crate::hid::telephony::{TelephonyReport, TelephonyUsage};
use crate::hid::HidReport;
use crate::layout::KeyStroke;

/// One press or release. `usage == 0` means modifier-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    pub usage: u8,
    pub modifiers: ModifierMask,
    pub pressed: bool,
}

impl KeyEvent {
    pub const fn press(stroke: KeyStroke) -> Self {
        Self {
            usage: stroke.usage,
            modifiers: stroke.modifiers,
            pressed: true,
        }
    }

    pub const fn release(stroke: KeyStroke) -> Self {
        Self {
            usage: stroke.usage,
            modifiers: stroke.modifiers,
            pressed: false,
        }
    }
}

/// Held key usages in press order, plus the held modifier bits.
///
/// Modifiers that arrive with a key belong to that key and go away with
/// it; modifiers pressed on their own are held until released on their own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PressedKeySet {
    keys: Vec<u8, MAX_PRESSED_KEYS>,
    /// Parallel to `keys`.
    key_modifiers: Vec<ModifierMask, MAX_PRESSED_KEYS>,
    standalone: ModifierMask,
}

impl PressedKeySet {
    pub const fn new() -> Self {
        Self {
            keys: Vec::new(),
            key_modifiers: Vec::new(),
            standalone: ModifierMask::NONE,
        }
    }

    /// Insert `usage` with the modifiers it needs. A seventh key evicts the
    /// oldest one; an already held usage is left where it is.
    pub fn press(&mut self, usage: u8, modifiers: ModifierMask) {
        if usage == 0 {
            self.standalone.insert(modifiers);
            return;
        }
        if let Some(index) = self.position(usage) {
            self.key_modifiers[index].insert(modifiers);
            return;
        }
        if self.keys.is_full() {
            trace!("key set full, evicting oldest");
            self.keys.remove(0);
            self.key_modifiers.remove(0);
        }
        // Cannot fail: a slot was freed above if needed.
        let _ = self.keys.push(usage);
        let _ = self.key_modifiers.push(modifiers);
    }

    /// Remove `usage` and the modifiers it brought. Releasing a key that is
    /// not held is a no-op. A modifier-only release (`usage == 0`) lets go
    /// of those bits everywhere.
    pub fn release(&mut self, usage: u8, modifiers: ModifierMask) {
        if usage == 0 {
            self.standalone.remove(modifiers);
            for held in self.key_modifiers.iter_mut() {
                held.remove(modifiers);
            }
            return;
        }
        if let Some(index) = self.position(usage) {
            self.keys.remove(index);
            self.key_modifiers.remove(index);
        }
    }

    fn position(&self, usage: u8) -> Option<usize> {
        self.keys.iter().position(|&k| k == usage)
    }

    pub fn keys(&self) -> &[u8] {
        &self.keys
    }

    pub fn modifiers(&self) -> ModifierMask {
        self.key_modifiers
            .iter()
            .fold(self.standalone, |acc, &held| acc | held)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.standalone.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.key_modifiers.clear();
        self.standalone = ModifierMask::NONE;
    }

    fn report(&self) -> KeyboardReport {
        let mut report = KeyboardReport::empty();
        report.modifier = self.modifiers().bits();
        for (slot, &key) in report.keycodes.iter_mut().zip(self.keys.iter()) {
            *slot = key;
        }
        report
    }
}

/// Stateful encoder for all four collections.
#[derive(Clone, Debug, Default)]
pub struct ReportEncoder {
    keys: PressedKeySet,
    buttons: u8,
    telephony: TelephonyReport,
    consumer: ConsumerReport,
}

impl ReportEncoder {
    pub const fn new() -> Self {
        Self {
            keys: PressedKeySet::new(),
            buttons: 0,
            telephony: TelephonyReport::empty(),
            consumer: ConsumerReport::empty(),
        }
    }

    pub fn apply_key(&mut self, event: KeyEvent) -> HidReport {
        if event.pressed {
            self.keys.press(event.usage, event.modifiers);
        } else {
            self.keys.release(event.usage, event.modifiers);
        }
        HidReport::Keyboard(self.keys.report())
    }

    pub fn apply_mouse_delta(&mut self, dx: i8, dy: i8, wheel: i8, pan: i8) -> HidReport {
        HidReport::Mouse(MouseReport {
            buttons: self.buttons,
            x: dx,
            y: dy,
            wheel,
            pan,
        })
    }

    pub fn apply_button(&mut self, button: MouseButton, pressed: bool) -> HidReport {
        if pressed {
            self.buttons |= button.mask();
        } else {
            self.buttons &= !button.mask();
        }
        self.apply_mouse_delta(0, 0, 0, 0)
    }

    pub fn apply_telephony(&mut self, usage: TelephonyUsage, pressed: bool) -> HidReport {
        self.telephony.set(usage, pressed);
        HidReport::Telephony(self.telephony)
    }

    pub fn apply_consumer(&mut self, usage: ConsumerUsage, pressed: bool) -> HidReport {
        self.consumer = if pressed {
            ConsumerReport::new(usage)
        } else {
            ConsumerReport::empty()
        };
        HidReport::Consumer(self.consumer)
    }

    /// Clear every held key and modifier; the result is an empty report.
    pub fn release_all_keys(&mut self) -> HidReport {
        self.keys.clear();
        HidReport::Keyboard(KeyboardReport::empty())
    }

    /// Clear every held button; the result is an idle mouse report.
    pub fn release_all_buttons(&mut self) -> HidReport {
        self.buttons = 0;
        HidReport::Mouse(MouseReport::empty())
    }

    pub fn pressed_keys(&self) -> &[u8] {
        self.keys.keys()
    }

    pub fn held_modifiers(&self) -> ModifierMask {
        self.keys.modifiers()
    }

    pub fn held_buttons(&self) -> u8 {
        self.buttons
    }

    pub fn hook_off(&self) -> bool {
        self.telephony.hook_switch
    }

    pub fn keyboard_idle(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn mouse_idle(&self) -> bool {
        self.buttons == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::keyboard::usage;

    fn key(usage: u8) -> KeyStroke {
        KeyStroke::new(usage, ModifierMask::NONE)
    }

    fn keyboard(report: HidReport) -> KeyboardReport {
        match report {
            HidReport::Keyboard(k) => k,
            other => panic!("expected keyboard report, got {:?}", other),
        }
    }

    #[test]
    fn seventh_key_evicts_oldest() {
        let mut enc = ReportEncoder::new();
        for i in 0..7u8 {
            enc.apply_key(KeyEvent::press(key(usage::A + i)));
        }
        assert_eq!(enc.pressed_keys().len(), 6);
        assert!(!enc.pressed_keys().contains(&usage::A));
        assert_eq!(enc.pressed_keys()[0], usage::A + 1);
        assert_eq!(enc.pressed_keys()[5], usage::A + 6);
    }

    #[test]
    fn release_is_idempotent() {
        let mut enc = ReportEncoder::new();
        enc.apply_key(KeyEvent::press(key(usage::A)));
        let first = keyboard(enc.apply_key(KeyEvent::release(key(usage::A))));
        let second = keyboard(enc.apply_key(KeyEvent::release(key(usage::A))));
        assert!(first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn repeated_press_does_not_duplicate() {
        let mut enc = ReportEncoder::new();
        enc.apply_key(KeyEvent::press(key(usage::A)));
        let report = keyboard(enc.apply_key(KeyEvent::press(key(usage::A))));
        assert_eq!(report.key_count(), 1);
    }

    #[test]
    fn implicit_modifier_follows_key() {
        let mut enc = ReportEncoder::new();
        let bang = KeyStroke::new(usage::N1, ModifierMask::LEFT_SHIFT);
        let down = keyboard(enc.apply_key(KeyEvent::press(bang)));
        assert_eq!(down.modifier, 0x02);
        assert_eq!(down.keycodes[0], usage::N1);
        let up = keyboard(enc.apply_key(KeyEvent::release(bang)));
        assert!(up.is_empty());
        assert!(enc.keyboard_idle());
    }

    #[test]
    fn shifted_key_keeps_a_separately_held_shift() {
        let mut enc = ReportEncoder::new();
        let shift = KeyStroke::new(0, ModifierMask::LEFT_SHIFT);
        enc.apply_key(KeyEvent::press(shift));

        let upper_a = KeyStroke::new(usage::A, ModifierMask::LEFT_SHIFT);
        enc.apply_key(KeyEvent::press(upper_a));
        let up = keyboard(enc.apply_key(KeyEvent::release(upper_a)));
        assert_eq!(up.modifier, 0x02);
        assert_eq!(up.key_count(), 0);

        enc.apply_key(KeyEvent::release(shift));
        assert!(enc.keyboard_idle());
    }

    #[test]
    fn modifier_release_applies_to_keys_holding_it() {
        let mut enc = ReportEncoder::new();
        enc.apply_key(KeyEvent::press(KeyStroke::new(usage::A, ModifierMask::LEFT_CTRL)));
        let report = keyboard(enc.apply_key(KeyEvent::release(KeyStroke::new(
            0,
            ModifierMask::LEFT_CTRL,
        ))));
        assert_eq!(report.modifier, 0);
        assert_eq!(report.keycodes[0], usage::A);
    }

    #[test]
    fn modifier_only_event() {
        let mut enc = ReportEncoder::new();
        let shift = KeyStroke::new(0, ModifierMask::RIGHT_SHIFT);
        let down = keyboard(enc.apply_key(KeyEvent::press(shift)));
        assert_eq!(down.modifier, 0x20);
        assert_eq!(down.key_count(), 0);
        assert!(!enc.keyboard_idle());
        enc.apply_key(KeyEvent::release(shift));
        assert!(enc.keyboard_idle());
    }

    #[test]
    fn mouse_deltas_do_not_accumulate() {
        let mut enc = ReportEncoder::new();
        enc.apply_mouse_delta(10, 0, 0, 0);
        let report = enc.apply_mouse_delta(1, 0, 0, 0);
        assert_eq!(
            report,
            HidReport::Mouse(MouseReport {
                buttons: 0,
                x: 1,
                y: 0,
                wheel: 0,
                pan: 0
            })
        );
    }

    #[test]
    fn held_buttons_carry_into_movement() {
        let mut enc = ReportEncoder::new();
        enc.apply_button(MouseButton::Left, true);
        let report = enc.apply_mouse_delta(5, -5, 0, 0);
        match report {
            HidReport::Mouse(m) => {
                assert_eq!(m.buttons, 0x01);
                assert_eq!((m.x, m.y), (5, -5));
            }
            _ => panic!("expected mouse report"),
        }
        assert!(!enc.mouse_idle());
        assert_eq!(enc.release_all_buttons(), HidReport::Mouse(MouseReport::empty()));
        assert!(enc.mouse_idle());
    }

    #[test]
    fn telephony_bits_are_independent() {
        let mut enc = ReportEncoder::new();
        enc.apply_telephony(TelephonyUsage::HookSwitch, true);
        let report = enc.apply_telephony(TelephonyUsage::PhoneMute, true);
        match report {
            HidReport::Telephony(t) => assert_eq!(t.bits(), 0x03),
            _ => panic!("expected telephony report"),
        }
        let report = enc.apply_telephony(TelephonyUsage::PhoneMute, false);
        match report {
            HidReport::Telephony(t) => assert_eq!(t.bits(), 0x01),
            _ => panic!("expected telephony report"),
        }
        assert!(enc.hook_off());
    }

    #[test]
    fn consumer_press_and_release() {
        let mut enc = ReportEncoder::new();
        let down = enc.apply_consumer(ConsumerUsage::Mute, true);
        assert_eq!(down, HidReport::Consumer(ConsumerReport::new(ConsumerUsage::Mute)));
        let up = enc.apply_consumer(ConsumerUsage::Mute, false);
        assert_eq!(up, HidReport::Consumer(ConsumerReport::empty()));
    }

    #[test]
    fn release_all_keys_empties_set() {
        let mut enc = ReportEncoder::new();
        enc.apply_key(KeyEvent::press(KeyStroke::new(
            usage::A,
            ModifierMask::LEFT_CTRL,
        )));
        enc.apply_key(KeyEvent::press(key(usage::A + 1)));
        let report = keyboard(enc.release_all_keys());
        assert!(report.is_empty());
        assert!(enc.pressed_keys().is_empty());
        assert!(enc.held_modifiers().is_empty());
    }
}
