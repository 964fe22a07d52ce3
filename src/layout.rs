//! Layout translator: symbolic key names and characters to usage codes.
//!
//! USB keyboards report *physical* key positions. The host applies its own
//! layout, so producing a given character means pressing whichever key sits
//! in that position on the host's layout, sometimes with an implicit SHIFT.
//! Everything here is pure and callable from any context.

use crate::error::{Error, Result};
use crate::hid::keyboard::{usage, ModifierMask};

/// Host keyboard layouts the translator knows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyboardLayout {
    #[default]
    QwertyUs,
    AzertyFr,
    QwertzDe,
}

impl KeyboardLayout {
    /// Parse `QWERTY_US` / `AZERTY_FR` / `QWERTZ_DE`.
    pub fn from_name(name: &str) -> Option<Self> {
        [
            ("QWERTY_US", KeyboardLayout::QwertyUs),
            ("AZERTY_FR", KeyboardLayout::AzertyFr),
            ("QWERTZ_DE", KeyboardLayout::QwertzDe),
        ]
        .into_iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
        .map(|(_, l)| l)
    }
}

/// A physical key plus the modifiers needed to produce the requested symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyStroke {
    pub usage: u8,
    pub modifiers: ModifierMask,
}

impl KeyStroke {
    pub const fn new(usage: u8, modifiers: ModifierMask) -> Self {
        Self { usage, modifiers }
    }

    const fn plain(usage: u8) -> Self {
        Self::new(usage, ModifierMask::NONE)
    }

    const fn shifted(usage: u8) -> Self {
        Self::new(usage, ModifierMask::LEFT_SHIFT)
    }

    /// The same key with extra modifiers held.
    pub fn with_modifiers(self, extra: ModifierMask) -> Self {
        Self::new(self.usage, self.modifiers | extra)
    }
}

/// Translate a key name or single printable character.
///
/// Single characters go through the layout tables; longer names are looked
/// up as named keys (`ENTER`, `F5`, `PAGEUP`, ...), which do not depend on
/// the layout.
pub fn translate(layout: KeyboardLayout, key_name: &str) -> Result<KeyStroke> {
    let mut chars = key_name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return translate_char(layout, c);
    }
    named_key(key_name)
        .map(KeyStroke::plain)
        .ok_or(Error::UnknownKey { position: None })
}

/// Translate one character for the given layout.
pub fn translate_char(layout: KeyboardLayout, c: char) -> Result<KeyStroke> {
    let stroke = match c {
        ' ' => Some(KeyStroke::plain(usage::SPACE)),
        '\n' => Some(KeyStroke::plain(usage::ENTER)),
        '\t' => Some(KeyStroke::plain(usage::TAB)),
        _ => match layout {
            KeyboardLayout::QwertyUs => qwerty_us(c),
            KeyboardLayout::AzertyFr => azerty_fr(c),
            KeyboardLayout::QwertzDe => qwertz_de(c),
        },
    };
    stroke.ok_or(Error::UnknownKey { position: None })
}

fn letter(c: char) -> Option<KeyStroke> {
    match c {
        'a'..='z' => Some(KeyStroke::plain(usage::A + (c as u8 - b'a'))),
        'A'..='Z' => Some(KeyStroke::shifted(usage::A + (c as u8 - b'A'))),
        _ => None,
    }
}

/// Usage of the digit row key labelled `d` on a US board.
fn digit_key(d: char) -> Option<u8> {
    match d {
        '1'..='9' => Some(usage::N1 + (d as u8 - b'1')),
        '0' => Some(usage::N0),
        _ => None,
    }
}

fn qwerty_us(c: char) -> Option<KeyStroke> {
    if let Some(stroke) = letter(c) {
        return Some(stroke);
    }
    if let Some(key) = digit_key(c) {
        return Some(KeyStroke::plain(key));
    }
    let stroke = match c {
        '-' => KeyStroke::plain(usage::MINUS),
        '=' => KeyStroke::plain(usage::EQUAL),
        '[' => KeyStroke::plain(usage::LEFT_BRACE),
        ']' => KeyStroke::plain(usage::RIGHT_BRACE),
        '\\' => KeyStroke::plain(usage::BACKSLASH),
        ';' => KeyStroke::plain(usage::SEMICOLON),
        '\'' => KeyStroke::plain(usage::APOSTROPHE),
        '`' => KeyStroke::plain(usage::GRAVE),
        ',' => KeyStroke::plain(usage::COMMA),
        '.' => KeyStroke::plain(usage::PERIOD),
        '/' => KeyStroke::plain(usage::SLASH),
        '!' => KeyStroke::shifted(usage::N1),
        '@' => KeyStroke::shifted(usage::N1 + 1),
        '#' => KeyStroke::shifted(usage::N1 + 2),
        '$' => KeyStroke::shifted(usage::N1 + 3),
        '%' => KeyStroke::shifted(usage::N5),
        '^' => KeyStroke::shifted(usage::N6),
        '&' => KeyStroke::shifted(usage::N7),
        '*' => KeyStroke::shifted(usage::N8),
        '(' => KeyStroke::shifted(usage::N9),
        ')' => KeyStroke::shifted(usage::N0),
        '_' => KeyStroke::shifted(usage::MINUS),
        '+' => KeyStroke::shifted(usage::EQUAL),
        '{' => KeyStroke::shifted(usage::LEFT_BRACE),
        '}' => KeyStroke::shifted(usage::RIGHT_BRACE),
        '|' => KeyStroke::shifted(usage::BACKSLASH),
        ':' => KeyStroke::shifted(usage::SEMICOLON),
        '"' => KeyStroke::shifted(usage::APOSTROPHE),
        '~' => KeyStroke::shifted(usage::GRAVE),
        '<' => KeyStroke::shifted(usage::COMMA),
        '>' => KeyStroke::shifted(usage::PERIOD),
        '?' => KeyStroke::shifted(usage::SLASH),
        _ => return None,
    };
    Some(stroke)
}

fn azerty_fr(c: char) -> Option<KeyStroke> {
    // A<->Q and Z<->W are swapped, M sits on the US semicolon key.
    let swapped = match c.to_ascii_lowercase() {
        'a' => Some(usage::Q),
        'q' => Some(usage::A),
        'z' => Some(usage::W),
        'w' => Some(usage::Z),
        'm' => Some(usage::SEMICOLON),
        _ => None,
    };
    if let Some(key) = swapped {
        return Some(if c.is_ascii_uppercase() {
            KeyStroke::shifted(key)
        } else {
            KeyStroke::plain(key)
        });
    }
    if let Some(stroke) = letter(c) {
        return Some(stroke);
    }
    // Digits live on the shifted layer of the top row.
    if let Some(key) = digit_key(c) {
        return Some(KeyStroke::shifted(key));
    }
    let stroke = match c {
        '&' => KeyStroke::plain(usage::N1),
        '"' => KeyStroke::plain(usage::N1 + 2),
        '\'' => KeyStroke::plain(usage::N1 + 3),
        '(' => KeyStroke::plain(usage::N5),
        '-' => KeyStroke::plain(usage::N6),
        '_' => KeyStroke::plain(usage::N8),
        ')' => KeyStroke::plain(usage::MINUS),
        '=' => KeyStroke::plain(usage::EQUAL),
        '+' => KeyStroke::shifted(usage::EQUAL),
        '$' => KeyStroke::plain(usage::RIGHT_BRACE),
        '*' => KeyStroke::plain(usage::NON_US_HASH),
        ',' => KeyStroke::plain(usage::M),
        '?' => KeyStroke::shifted(usage::M),
        ';' => KeyStroke::plain(usage::COMMA),
        '.' => KeyStroke::shifted(usage::COMMA),
        ':' => KeyStroke::plain(usage::PERIOD),
        '/' => KeyStroke::shifted(usage::PERIOD),
        '!' => KeyStroke::plain(usage::SLASH),
        '<' => KeyStroke::plain(usage::NON_US_BACKSLASH),
        '>' => KeyStroke::shifted(usage::NON_US_BACKSLASH),
        _ => return None,
    };
    Some(stroke)
}

fn qwertz_de(c: char) -> Option<KeyStroke> {
    // Y and Z are swapped.
    let swapped = match c.to_ascii_lowercase() {
        'y' => Some(usage::Z),
        'z' => Some(usage::Y),
        _ => None,
    };
    if let Some(key) = swapped {
        return Some(if c.is_ascii_uppercase() {
            KeyStroke::shifted(key)
        } else {
            KeyStroke::plain(key)
        });
    }
    if let Some(stroke) = letter(c) {
        return Some(stroke);
    }
    if let Some(key) = digit_key(c) {
        return Some(KeyStroke::plain(key));
    }
    let stroke = match c {
        '-' => KeyStroke::plain(usage::SLASH),
        '_' => KeyStroke::shifted(usage::SLASH),
        '.' => KeyStroke::plain(usage::PERIOD),
        ':' => KeyStroke::shifted(usage::PERIOD),
        ',' => KeyStroke::plain(usage::COMMA),
        ';' => KeyStroke::shifted(usage::COMMA),
        '!' => KeyStroke::shifted(usage::N1),
        '"' => KeyStroke::shifted(usage::N1 + 1),
        '$' => KeyStroke::shifted(usage::N1 + 3),
        '%' => KeyStroke::shifted(usage::N5),
        '&' => KeyStroke::shifted(usage::N6),
        '/' => KeyStroke::shifted(usage::N7),
        '(' => KeyStroke::shifted(usage::N8),
        ')' => KeyStroke::shifted(usage::N9),
        '=' => KeyStroke::shifted(usage::N0),
        '?' => KeyStroke::shifted(usage::MINUS),
        '+' => KeyStroke::plain(usage::RIGHT_BRACE),
        '*' => KeyStroke::shifted(usage::RIGHT_BRACE),
        '#' => KeyStroke::plain(usage::NON_US_HASH),
        '\'' => KeyStroke::shifted(usage::NON_US_HASH),
        '<' => KeyStroke::plain(usage::NON_US_BACKSLASH),
        '>' => KeyStroke::shifted(usage::NON_US_BACKSLASH),
        _ => return None,
    };
    Some(stroke)
}

/// Layout-independent named keys.
fn named_key(name: &str) -> Option<u8> {
    const NAMED: &[(&str, u8)] = &[
        ("ENTER", usage::ENTER),
        ("RETURN", usage::ENTER),
        ("ESC", usage::ESCAPE),
        ("ESCAPE", usage::ESCAPE),
        ("BACKSPACE", usage::BACKSPACE),
        ("TAB", usage::TAB),
        ("SPACE", usage::SPACE),
        ("DELETE", usage::DELETE),
        ("INSERT", usage::INSERT),
        ("HOME", usage::HOME),
        ("END", usage::END),
        ("PAGEUP", usage::PAGE_UP),
        ("PAGEDOWN", usage::PAGE_DOWN),
        ("UP", usage::UP_ARROW),
        ("DOWN", usage::DOWN_ARROW),
        ("LEFT", usage::LEFT_ARROW),
        ("RIGHT", usage::RIGHT_ARROW),
        ("CAPSLOCK", usage::CAPS_LOCK),
        ("PRINTSCREEN", usage::PRINT_SCREEN),
        ("SCROLLLOCK", usage::SCROLL_LOCK),
        ("PAUSE", usage::PAUSE),
    ];
    let name = name.trim();
    if let Some(&(_, code)) = NAMED.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
        return Some(code);
    }
    function_key(name)
}

/// `F1`..`F12`.
fn function_key(name: &str) -> Option<u8> {
    let digits = name.strip_prefix('F').or_else(|| name.strip_prefix('f'))?;
    match digits.parse::<u8>() {
        Ok(n @ 1..=12) => Some(usage::F1 + n - 1),
        _ => None,
    }
}
