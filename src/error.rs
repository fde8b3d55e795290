//! Errors the table can report without treating them as the fatal
//! allocation failures spec.md §7.2 describes for the hot path.

use std::fmt;

pub type HtResult<T> = Result<T, HtError>;

#[derive(Debug)]
pub enum HtError {
    /// A capacity hint (at construction or via `try_reserve`) implied a slot
    /// count past the end of the prime ladder before any allocation was
    /// attempted.
    CapacityOverflow { requested: u64 },
    /// `try_reserve` was asked for more headroom than the table can ever
    /// grow into: the prime ladder is already climbed as far as it goes
    /// (spec.md §7.3) and the requested target still exceeds `max_elements`.
    /// Informational, not fatal — the table keeps accepting inserts with a
    /// degraded load factor either way; this is just `try_reserve` reporting
    /// that it could not pre-empt a growth storm the way the caller asked.
    LadderExhausted,
}

impl fmt::Display for HtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityOverflow { requested } => write!(
                f,
                "requested capacity {} exceeds the largest slot count this table can represent",
                requested
            ),
            Self::LadderExhausted => write!(
                f,
                "prime ladder exhausted; table cannot grow further to satisfy the requested reservation"
            ),
        }
    }
}

impl std::error::Error for HtError {}
