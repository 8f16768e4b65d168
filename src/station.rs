use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::SumOverflow;

/// Station name stored inline, so it can be used as a map key by value.
#[derive(Clone, Copy)]
pub struct NameKey {
    len: u8,
    bytes: [u8; NameKey::CAPACITY],
}

impl NameKey {
    /// Longest name accepted, in bytes.
    pub const CAPACITY: usize = 100;

    /// Returns `None` when `name` does not fit.
    pub fn new(name: &[u8]) -> Option<Self> {
        if name.len() > Self::CAPACITY {
            return None;
        }
        let mut bytes = [0; Self::CAPACITY];
        bytes[..name.len()].copy_from_slice(name);
        Some(Self {
            len: name.len() as u8,
            bytes,
        })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl PartialEq for NameKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for NameKey {}

impl Hash for NameKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl PartialOrd for NameKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NameKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

// Lets tables be probed with raw name bytes. Hash, Eq and Ord above all go
// through `as_bytes`, which keeps them consistent with `[u8]`.
impl Borrow<[u8]> for NameKey {
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameKey({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

/// Running aggregate for one station. All values are in tenths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    sum: i64,
    count: u64,
    min: i64,
    max: i64,
}

impl Measurement {
    pub fn new(value: i64) -> Self {
        Self {
            sum: value,
            count: 1,
            min: value,
            max: value,
        }
    }

    /// Folds in one value. On overflow of the running sum the entry is left
    /// unchanged.
    #[inline]
    pub fn add(&mut self, value: i64) -> Result<(), SumOverflow> {
        self.sum = self.sum.checked_add(value).ok_or(SumOverflow)?;
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        Ok(())
    }

    #[inline]
    pub fn merge(&mut self, other: &Measurement) -> Result<(), SumOverflow> {
        self.sum = self.sum.checked_add(other.sum).ok_or(SumOverflow)?;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        Ok(())
    }

    pub fn sum(&self) -> i64 {
        self.sum
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    /// Mean in tenths, rounded half toward positive infinity.
    pub fn mean_tenths(&self) -> i64 {
        // count is at least 1: entries are only built by `new`
        let count = self.count as i128;
        let twice = 2 * self.sum as i128 + count;
        twice.div_euclid(2 * count) as i64
    }

    #[cfg(test)]
    pub(crate) fn parts(&self) -> (i64, u64, i64, i64) {
        (self.sum, self.count, self.min, self.max)
    }
}
