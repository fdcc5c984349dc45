use serde::{Deserialize, Serialize};

/// Named scheduler toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Setting {
    /// A worker that finds the queue empty exits instead of idling.
    KillOnEmpty,
    /// Advisory only: recorded and reported, the scheduling loop ignores it.
    InOrder,
}

impl Setting {
    pub const KILL_ON_EMPTY: u16 = 1;
    pub const IN_ORDER: u16 = 1 << 1;

    pub const ALL: [Setting; 2] = [Setting::KillOnEmpty, Setting::InOrder];

    /// Bit this setting occupies in [`Settings::bits`].
    pub fn mask(self) -> u16 {
        match self {
            Setting::KillOnEmpty => Self::KILL_ON_EMPTY,
            Setting::InOrder => Self::IN_ORDER,
        }
    }
}

/// Current value of every [`Setting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub kill_on_empty: bool,
    pub in_order: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            kill_on_empty: false,
            in_order: true,
        }
    }
}

impl Settings {
    pub fn get(&self, setting: Setting) -> bool {
        match setting {
            Setting::KillOnEmpty => self.kill_on_empty,
            Setting::InOrder => self.in_order,
        }
    }

    /// Set one flag, leaving the others untouched.
    pub fn set(&mut self, setting: Setting, value: bool) {
        match setting {
            Setting::KillOnEmpty => self.kill_on_empty = value,
            Setting::InOrder => self.in_order = value,
        }
    }

    /// Packed bitmask form (`KILL_ON_EMPTY = 1`, `IN_ORDER = 2`).
    pub fn bits(&self) -> u16 {
        Setting::ALL
            .iter()
            .filter(|s| self.get(**s))
            .fold(0, |acc, s| acc | s.mask())
    }

    /// Unpack a bitmask. Unknown bits are ignored.
    pub fn from_bits(bits: u16) -> Self {
        Self {
            kill_on_empty: bits & Setting::KILL_ON_EMPTY != 0,
            in_order: bits & Setting::IN_ORDER != 0,
        }
    }
}
