//! Keyboard chords for history navigation.

use smol_str::SmolStr;

/// A key press as reported by the platform.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyEvent {
    /// Logical key value, e.g. `"z"` or `"Z"` when shifted.
    pub key: SmolStr,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<SmolStr>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// A key plus the exact modifier set required to trigger it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyChord {
    pub key: SmolStr,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyChord {
    pub fn ctrl(key: impl Into<SmolStr>) -> Self {
        Self {
            key: key.into(),
            ctrl: true,
            shift: false,
            alt: false,
            meta: false,
        }
    }

    pub fn ctrl_shift(key: impl Into<SmolStr>) -> Self {
        Self {
            shift: true,
            ..Self::ctrl(key)
        }
    }

    /// Whether `event` triggers this chord.
    ///
    /// Keys compare case-insensitively: platforms report shifted letters
    /// in upper case, and caps lock flips the case of unshifted ones.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.ctrl == event.ctrl
            && self.shift == event.shift
            && self.alt == event.alt
            && self.meta == event.meta
            && self.key.eq_ignore_ascii_case(&event.key)
    }
}

/// History commands reachable from the keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryCommand {
    Undo,
    Redo,
}

/// Chord table consulted by the editor's key listener.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBindings {
    pub undo: Vec<KeyChord>,
    pub redo: Vec<KeyChord>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            undo: vec![KeyChord::ctrl("z")],
            redo: vec![KeyChord::ctrl_shift("z"), KeyChord::ctrl("y")],
        }
    }
}

impl KeyBindings {
    pub fn resolve(&self, event: &KeyEvent) -> Option<HistoryCommand> {
        if self.undo.iter().any(|c| c.matches(event)) {
            Some(HistoryCommand::Undo)
        } else if self.redo.iter().any(|c| c.matches(event)) {
            Some(HistoryCommand::Redo)
        } else {
            None
        }
    }
}
