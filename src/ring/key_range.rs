use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// Size of the key space. Keys and node ids live in `[0, HASH_SIZE)`.
pub const HASH_SIZE: u32 = 1024;

/// Key is a position in the ring's key space. Node ids are keys too: a node's id is the lowest key it
/// owns.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(u32);

/// Node ids share the key space.
pub type NodeId = Key;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum KeyError {
    #[error("{0} is not a number.")]
    NotANumber(String),
    #[error("key {0} is outside of [0, {}).", HASH_SIZE)]
    OutOfRange(u32),
}

impl Key {
    pub fn new(value: u32) -> Result<Self, KeyError> {
        if value < HASH_SIZE {
            Ok(Key(value))
        } else {
            Err(KeyError::OutOfRange(value))
        }
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub(crate) fn as_index(&self) -> usize {
        self.0 as usize
    }

    /// The next key clockwise, wrapping from `HASH_SIZE - 1` to `0`.
    pub fn next(&self) -> Key {
        Key((self.0 + 1) % HASH_SIZE)
    }

    /// The previous key counter-clockwise, wrapping from `0` to `HASH_SIZE - 1`.
    pub fn prev(&self) -> Key {
        Key((self.0 + HASH_SIZE - 1) % HASH_SIZE)
    }
}

impl TryFrom<u32> for Key {
    type Error = KeyError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Key::new(value)
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.parse::<u32>().map_err(|_| KeyError::NotANumber(s.to_string()))?;
        Key::new(value)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// KeyRange is the inclusive interval `[start, end]` walked clockwise. When `end < start` the range
/// crosses the `HASH_SIZE - 1 -> 0` seam. `[k, k - 1]` is the full ring.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct KeyRange {
    start: Key,
    end: Key,
}

impl KeyRange {
    pub fn new(start: Key, end: Key) -> Self {
        KeyRange { start, end }
    }

    /// The range a lone node starting at `start` owns: every key.
    pub fn full_ring_from(start: Key) -> Self {
        KeyRange {
            start,
            end: start.prev(),
        }
    }

    pub fn start(&self) -> Key {
        self.start
    }

    pub fn end(&self) -> Key {
        self.end
    }

    pub fn wraps(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, key: Key) -> bool {
        if self.wraps() {
            key >= self.start || key <= self.end
        } else {
            self.start <= key && key <= self.end
        }
    }

    pub fn len(&self) -> u32 {
        (self.end.0 + HASH_SIZE - self.start.0) % HASH_SIZE + 1
    }

    /// Splits at `at`, returning `(kept, handed_off)` where `kept = [start, at - 1]` and
    /// `handed_off = [at, end]`. Returns `None` unless `at` is inside the range and is not its start.
    pub fn split_at(&self, at: Key) -> Option<(KeyRange, KeyRange)> {
        if at == self.start || !self.contains(at) {
            return None;
        }

        Some((KeyRange::new(self.start, at.prev()), KeyRange::new(at, self.end)))
    }

    /// Iterates keys clockwise from `start` to `end` inclusive.
    pub fn keys(&self) -> impl Iterator<Item = Key> {
        let start = self.start.0;
        (0..self.len()).map(move |offset| Key((start + offset) % HASH_SIZE))
    }
}

impl fmt::Debug for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
