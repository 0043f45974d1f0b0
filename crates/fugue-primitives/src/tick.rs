//! Ledger tick counter

use std::fmt;
use std::ops::Add;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PrimitiveError;

/// The ledger's monotonic processing unit.
///
/// Wire values fit 32 bits, but the in-memory type is 64 bits wide so that
/// offset arithmetic cannot overflow. Archive responses may carry ticks as
/// JSON numbers or as decimal strings; deserialization accepts both.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(u64);

impl Tick {
    /// The zero tick
    pub const ZERO: Tick = Tick(0);

    /// Create a tick from a raw counter value
    pub const fn new(value: u64) -> Self {
        Tick(value)
    }

    /// The raw counter value
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Narrow to the 32-bit wire width, failing when the value does not fit
    pub fn to_u32(&self) -> Result<u32, PrimitiveError> {
        u32::try_from(self.0).map_err(|_| PrimitiveError::TickRange(self.0))
    }

    /// Checked addition of an offset
    pub fn checked_add(&self, offset: u64) -> Option<Tick> {
        self.0.checked_add(offset).map(Tick)
    }

    /// Saturating addition of an offset
    pub fn saturating_add(&self, offset: u64) -> Tick {
        Tick(self.0.saturating_add(offset))
    }
}

impl fmt::Debug for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tick({})", self.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Tick {
    fn from(value: u64) -> Self {
        Tick(value)
    }
}

impl From<u32> for Tick {
    fn from(value: u32) -> Self {
        Tick(value as u64)
    }
}

impl From<Tick> for u64 {
    fn from(tick: Tick) -> u64 {
        tick.0
    }
}

impl Add<u64> for Tick {
    type Output = Tick;

    fn add(self, offset: u64) -> Tick {
        Tick(self.0 + offset)
    }
}

impl Serialize for Tick {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

struct TickVisitor;

impl<'de> Visitor<'de> for TickVisitor {
    type Value = Tick;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a tick as an unsigned integer or decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Tick, E> {
        Ok(Tick(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Tick, E> {
        u64::try_from(v)
            .map(Tick)
            .map_err(|_| E::custom(format!("negative tick {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Tick, E> {
        v.parse::<u64>()
            .map(Tick)
            .map_err(|_| E::custom(format!("invalid tick string {v:?}")))
    }
}

impl<'de> Deserialize<'de> for Tick {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TickVisitor)
    }
}
