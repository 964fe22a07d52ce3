//! Typing engine.
//!
//! Turns a string into a timed stream of key events. Every character is
//! checked against the layout when the sequence is built so that a bad
//! character is reported before anything reaches the host; the events
//! themselves are produced lazily, one per dispatcher step.

use heapless::String;

use crate::config::{MAX_TEXT_LEN, MIN_KEY_DELAY_MS};
use crate::encoder::KeyEvent;
use crate::error::{Error, Result};
use crate::jitter::{jittered, JitterSource};
use crate::layout::{translate_char, KeyStroke, KeyboardLayout};

/// A key event plus how long to wait before the next one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimedKeyEvent {
    pub event: KeyEvent,
    pub delay_ms: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypingSequence {
    text: String<MAX_TEXT_LEN>,
    layout: KeyboardLayout,
    speed_ms: u32,
    jitter_ms: u32,
    /// Byte offset of the next character to press.
    cursor: usize,
    /// Pressed but not yet released.
    held: Option<KeyStroke>,
}

impl TypingSequence {
    pub fn new(layout: KeyboardLayout, text: &str, speed_ms: u32, jitter_ms: u32) -> Result<Self> {
        let text: String<MAX_TEXT_LEN> = text.try_into().map_err(|_| Error::TextTooLong)?;
        for (position, c) in text.chars().enumerate() {
            translate_char(layout, c).map_err(|_| Error::UnknownKey {
                position: Some(position),
            })?;
        }
        Ok(Self {
            text,
            layout,
            speed_ms,
            jitter_ms,
            cursor: 0,
            held: None,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn layout(&self) -> KeyboardLayout {
        self.layout
    }

    /// Start over from the first character.
    pub fn restart(&mut self) {
        self.cursor = 0;
        self.held = None;
    }

    pub fn is_finished(&self) -> bool {
        self.held.is_none() && self.cursor >= self.text.len()
    }

    /// The key that is down right now, if any. A cancelled sequence must
    /// still release it.
    pub fn pending_release(&self) -> Option<KeyStroke> {
        self.held
    }

    /// Produce the next press or release.
    pub fn next_event(&mut self, jitter: &mut impl JitterSource) -> Option<TimedKeyEvent> {
        let event = if let Some(stroke) = self.held.take() {
            KeyEvent::release(stroke)
        } else {
            let c = self.text.as_str()[self.cursor..].chars().next()?;
            self.cursor += c.len_utf8();
            // Validated in `new`, and the layout cannot change afterwards.
            let stroke = translate_char(self.layout, c).ok()?;
            self.held = Some(stroke);
            KeyEvent::press(stroke)
        };
        Some(TimedKeyEvent {
            event,
            delay_ms: jittered(self.speed_ms, self.jitter_ms, MIN_KEY_DELAY_MS, jitter),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::keyboard::{usage, ModifierMask};
    use crate::jitter::{NoJitter, RngJitter};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn drain(seq: &mut TypingSequence) -> std::vec::Vec<TimedKeyEvent> {
        core::iter::from_fn(|| seq.next_event(&mut NoJitter)).collect()
    }

    #[test]
    fn hi_is_four_events_at_fifty_ms() {
        let mut seq = TypingSequence::new(KeyboardLayout::QwertyUs, "Hi", 50, 0).unwrap();
        let events = drain(&mut seq);
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.delay_ms == 50));

        let h = usage::A + (b'h' - b'a');
        let i = usage::A + (b'i' - b'a');
        assert_eq!(events[0].event.usage, h);
        assert_eq!(events[0].event.modifiers, ModifierMask::LEFT_SHIFT);
        assert!(events[0].event.pressed);
        assert!(!events[1].event.pressed);
        assert_eq!(events[2].event.usage, i);
        assert!(events[2].event.modifiers.is_empty());
        assert!(!events[3].event.pressed);
        assert!(seq.is_finished());
    }

    #[test]
    fn first_bad_character_is_located() {
        let err = TypingSequence::new(KeyboardLayout::QwertyUs, "ok\u{e9}x\u{e9}", 50, 0);
        assert_eq!(err, Err(Error::UnknownKey { position: Some(2) }));
    }

    #[test]
    fn too_long_text_is_rejected() {
        let text = [b'a'; MAX_TEXT_LEN + 1];
        let text = core::str::from_utf8(&text).unwrap();
        assert_eq!(
            TypingSequence::new(KeyboardLayout::QwertyUs, text, 50, 0),
            Err(Error::TextTooLong)
        );
    }

    #[test]
    fn delay_never_below_floor() {
        let mut seq = TypingSequence::new(KeyboardLayout::QwertyUs, "hello world", 12, 30).unwrap();
        let mut rng = RngJitter(SmallRng::seed_from_u64(99));
        while let Some(e) = seq.next_event(&mut rng) {
            assert!(e.delay_ms >= MIN_KEY_DELAY_MS);
            assert!(e.delay_ms <= 42);
        }
    }

    #[test]
    fn pending_release_tracks_held_key() {
        let mut seq = TypingSequence::new(KeyboardLayout::QwertyUs, "a", 50, 0).unwrap();
        assert_eq!(seq.pending_release(), None);
        seq.next_event(&mut NoJitter);
        assert_eq!(
            seq.pending_release(),
            Some(KeyStroke::new(usage::A, ModifierMask::NONE))
        );
        seq.next_event(&mut NoJitter);
        assert_eq!(seq.pending_release(), None);
    }

    #[test]
    fn restart_replays_from_start() {
        let mut seq = TypingSequence::new(KeyboardLayout::AzertyFr, "a1", 20, 0).unwrap();
        let first = drain(&mut seq);
        seq.restart();
        let second = drain(&mut seq);
        assert_eq!(first, second);
        assert_eq!(first[0].event.usage, usage::Q);
        assert_eq!(first[2].event.modifiers, ModifierMask::LEFT_SHIFT);
    }

    #[test]
    fn empty_text_yields_nothing() {
        let mut seq = TypingSequence::new(KeyboardLayout::QwertyUs, "", 50, 0).unwrap();
        assert!(seq.is_finished());
        assert_eq!(seq.next_event(&mut NoJitter), None);
    }
}
