//! Key descriptions accepted by `send_key`.
//!
//! Hosts describe keys either as a single character or as a symbolic string
//! with optional modifiers (`"Control+Shift+a"`, `"BackSpace"`, `"space"`).
//! Both forms resolve to the same [`Key`] before anything is scheduled, so the
//! engine only ever sees one representation.

use phf::phf_map;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Non-character keys the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NamedKey {
    BackSpace,
    Delete,
    Return,
    Escape,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
}

impl NamedKey {
    /// Canonical name, as accepted by [`Key::parse`].
    pub fn name(self) -> &'static str {
        match self {
            NamedKey::BackSpace => "BackSpace",
            NamedKey::Delete => "Delete",
            NamedKey::Return => "Return",
            NamedKey::Escape => "Escape",
            NamedKey::Tab => "Tab",
            NamedKey::Left => "Left",
            NamedKey::Right => "Right",
            NamedKey::Up => "Up",
            NamedKey::Down => "Down",
            NamedKey::Home => "Home",
            NamedKey::End => "End",
            NamedKey::PageUp => "Page_Up",
            NamedKey::PageDown => "Page_Down",
        }
    }
}

/// The symbol part of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum KeySym {
    Char(char),
    Named(NamedKey),
}

// Symbolic names, including the usual aliases for printable keys.
static NAMED_KEYS: phf::Map<&'static str, KeySym> = phf_map! {
    "BackSpace" => KeySym::Named(NamedKey::BackSpace),
    "Backspace" => KeySym::Named(NamedKey::BackSpace),
    "Delete" => KeySym::Named(NamedKey::Delete),
    "Return" => KeySym::Named(NamedKey::Return),
    "Enter" => KeySym::Named(NamedKey::Return),
    "Escape" => KeySym::Named(NamedKey::Escape),
    "Esc" => KeySym::Named(NamedKey::Escape),
    "Tab" => KeySym::Named(NamedKey::Tab),
    "Left" => KeySym::Named(NamedKey::Left),
    "Right" => KeySym::Named(NamedKey::Right),
    "Up" => KeySym::Named(NamedKey::Up),
    "Down" => KeySym::Named(NamedKey::Down),
    "Home" => KeySym::Named(NamedKey::Home),
    "End" => KeySym::Named(NamedKey::End),
    "Page_Up" => KeySym::Named(NamedKey::PageUp),
    "Prior" => KeySym::Named(NamedKey::PageUp),
    "Page_Down" => KeySym::Named(NamedKey::PageDown),
    "Next" => KeySym::Named(NamedKey::PageDown),
    "space" => KeySym::Char(' '),
    "minus" => KeySym::Char('-'),
    "equal" => KeySym::Char('='),
    "comma" => KeySym::Char(','),
    "period" => KeySym::Char('.'),
    "plus" => KeySym::Char('+'),
    "apostrophe" => KeySym::Char('\''),
    "semicolon" => KeySym::Char(';'),
    "slash" => KeySym::Char('/'),
};

/// Modifier state carried with a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct KeyStates {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub super_key: bool,
}

impl KeyStates {
    /// True when no modifier is held.
    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.alt || self.shift || self.super_key)
    }

    fn set(&mut self, name: &str) -> Result<(), KeyParseError> {
        match name {
            "Control" | "Ctrl" => self.ctrl = true,
            "Alt" => self.alt = true,
            "Shift" => self.shift = true,
            "Super" => self.super_key = true,
            _ => return Err(KeyParseError::UnknownModifier(name.to_string())),
        }
        Ok(())
    }
}

/// Errors produced while resolving a key descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("empty key descriptor")]
    Empty,
    #[error("unknown key name '{0}'")]
    UnknownKey(String),
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
}

/// A resolved key: symbol plus modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Key {
    pub sym: KeySym,
    pub states: KeyStates,
}

impl Key {
    /// Key for a single character with no modifiers.
    pub fn from_char(ch: char) -> Self {
        Self {
            sym: KeySym::Char(ch),
            states: KeyStates::default(),
        }
    }

    /// Key for a named (non-character) key with no modifiers.
    pub fn named(key: NamedKey) -> Self {
        Self {
            sym: KeySym::Named(key),
            states: KeyStates::default(),
        }
    }

    /// Parse a symbolic descriptor such as `"Control+Shift+a"` or `"Page_Down"`.
    pub fn parse(descriptor: &str) -> Result<Self, KeyParseError> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let (modifiers, sym) = split_descriptor(descriptor);

        let mut states = KeyStates::default();
        if !modifiers.is_empty() {
            for name in modifiers.split('+') {
                states.set(name)?;
            }
        }

        Ok(Self {
            sym: parse_sym(sym)?,
            states,
        })
    }

    /// The character this key produces, if it is a plain character key.
    pub fn as_char(&self) -> Option<char> {
        match self.sym {
            KeySym::Char(ch) => Some(ch),
            KeySym::Named(_) => None,
        }
    }
}

/// Split `"Mod+Mod+sym"` into modifiers and symbol.
///
/// A trailing `'+'` is the key itself (`"Control++"`).
fn split_descriptor(descriptor: &str) -> (&str, &str) {
    if let Some(stripped) = descriptor.strip_suffix('+') {
        if stripped.is_empty() {
            return ("", "+");
        }
        if let Some(modifiers) = stripped.strip_suffix('+') {
            return (modifiers, "+");
        }
    }
    match descriptor.rfind('+') {
        Some(i) => (&descriptor[..i], &descriptor[i + 1..]),
        None => ("", descriptor),
    }
}

fn parse_sym(sym: &str) -> Result<KeySym, KeyParseError> {
    if sym.is_empty() {
        return Err(KeyParseError::Empty);
    }

    let mut chars = sym.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return Ok(KeySym::Char(ch));
    }

    NAMED_KEYS
        .get(sym)
        .copied()
        .ok_or_else(|| KeyParseError::UnknownKey(sym.to_string()))
}

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::parse(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.states.ctrl {
            f.write_str("Control+")?;
        }
        if self.states.alt {
            f.write_str("Alt+")?;
        }
        if self.states.shift {
            f.write_str("Shift+")?;
        }
        if self.states.super_key {
            f.write_str("Super+")?;
        }
        match self.sym {
            KeySym::Char(' ') => f.write_str("space"),
            KeySym::Char(ch) => write!(f, "{}", ch),
            KeySym::Named(named) => f.write_str(named.name()),
        }
    }
}

/// The two forms a host may use to describe a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDescriptor {
    /// Symbolic name plus modifiers, e.g. `"Control+a"`.
    Named(String),
    /// A single character.
    Char(char),
}

impl KeyDescriptor {
    /// Resolve the descriptor into the engine's key representation.
    pub fn resolve(&self) -> Result<Key, KeyParseError> {
        match self {
            KeyDescriptor::Named(descriptor) => Key::parse(descriptor),
            KeyDescriptor::Char(ch) => Ok(Key::from_char(*ch)),
        }
    }
}

impl From<&str> for KeyDescriptor {
    fn from(s: &str) -> Self {
        KeyDescriptor::Named(s.to_string())
    }
}

impl From<String> for KeyDescriptor {
    fn from(s: String) -> Self {
        KeyDescriptor::Named(s)
    }
}

impl From<char> for KeyDescriptor {
    fn from(ch: char) -> Self {
        KeyDescriptor::Char(ch)
    }
}
