//! The 256-slot caches URP keeps for types, OIDs and TIDs.
//!
//! Both ends keep one table per kind and direction. The sender picks slots,
//! so the sending side needs to remember what it has placed where ([`Ring`]),
//! while the receiving side only stores what it is told ([`Slots`]).

use crate::error::{Result, UrpError};

pub const CACHE_SIZE: usize = 256;

/// Marker index meaning "not cached".
pub const NO_SLOT: u16 = 0xFFFF;

/// Sender-side cache with round-robin replacement.
#[derive(Debug)]
pub struct Ring<T> {
    entries: Vec<Option<T>>,
    next: usize,
}

impl<T: PartialEq> Ring<T> {
    pub fn new() -> Self {
        Self {
            entries: std::iter::repeat_with(|| None).take(CACHE_SIZE).collect(),
            next: 0,
        }
    }

    /// Slot already holding `value`, or a freshly claimed one.
    /// The flag is `true` when the peer has not seen the value yet.
    pub fn slot_for(&mut self, value: T) -> (u16, bool) {
        if let Some(i) = self
            .entries
            .iter()
            .position(|e| e.as_ref() == Some(&value))
        {
            return (i as u16, false);
        }
        let slot = self.next;
        self.entries[slot] = Some(value);
        self.next = (slot + 1) % CACHE_SIZE;
        (slot as u16, true)
    }
}

impl<T: PartialEq> Default for Ring<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver-side cache, filled at the indices the peer chooses.
#[derive(Debug)]
pub struct Slots<T> {
    entries: Vec<Option<T>>,
    kind: &'static str,
}

impl<T: Clone> Slots<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            entries: std::iter::repeat_with(|| None).take(CACHE_SIZE).collect(),
            kind,
        }
    }

    pub fn store(&mut self, index: u16, value: T) {
        if let Some(entry) = self.entries.get_mut(index as usize) {
            *entry = Some(value);
        }
    }

    pub fn fetch(&self, index: u16) -> Result<T> {
        self.entries
            .get(index as usize)
            .and_then(|e| e.clone())
            .ok_or_else(|| UrpError::Cache(format!("no {} in slot {index}", self.kind)))
    }
}
