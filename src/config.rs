//! The construction-time configuration surface (SPEC_FULL.md §1.3): a small
//! builder over the flat argument list spec.md §4.9 describes for `init`,
//! mirroring the builder-of-small-setters shape the rest of this corpus uses
//! for its own construction-time configuration objects.

use crate::error::HtResult;
use crate::reduce::{DefaultReducer, Reduce};
use crate::table::{HtDivChn, MergeFn};

/// Default load-factor bound: `1 / 2^1` = one element per two slots.
const DEFAULT_ALPHA_NUM: u64 = 1;
const DEFAULT_ALPHA_LOG2_DEN: u32 = 1;
/// Default lock-array size: `2^4` = 16 bucket-group locks.
const DEFAULT_LOG2_LOCKS: u32 = 4;

/// Builds an [`HtDivChn`]. Every setter takes `self` by value and returns it,
/// so configuration reads as a chain ending in [`HtConfig::build`].
///
/// ```ignore
/// let table = HtConfig::new()
///     .with_capacity(10_000)
///     .with_alpha(1, 1)
///     .with_grow_workers(4)
///     .build::<u64, u64>()?;
/// ```
pub struct HtConfig<R = DefaultReducer> {
    capacity_hint: u64,
    alpha_num: u64,
    alpha_log2_den: u32,
    log2_locks: u32,
    grow_workers: usize,
    reducer: R,
}

impl HtConfig<DefaultReducer> {
    /// Starts a new configuration with the defaults this crate ships with:
    /// no pre-growth, load factor `1/2`, 16 bucket-group locks, and one
    /// growth worker per logical CPU (matching the reference
    /// implementation's own default parallelism for batch-style work).
    pub fn new() -> Self {
        Self {
            capacity_hint: 0,
            alpha_num: DEFAULT_ALPHA_NUM,
            alpha_log2_den: DEFAULT_ALPHA_LOG2_DEN,
            log2_locks: DEFAULT_LOG2_LOCKS,
            grow_workers: num_cpus::get().max(1),
            reducer: DefaultReducer,
        }
    }
}

impl Default for HtConfig<DefaultReducer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> HtConfig<R> {
    /// A reserve hint: `init` pre-grows so the first `capacity` insertions
    /// cause no further growth (spec.md §8 boundary behavior).
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity_hint = capacity;
        self
    }

    /// The load-factor upper bound, expressed exactly as `alpha_num /
    /// 2^alpha_log2_den` (spec.md §3) — no floating point, so the bound test
    /// is reproducible bit-for-bit across platforms.
    pub fn with_alpha(mut self, alpha_num: u64, alpha_log2_den: u32) -> Self {
        self.alpha_num = alpha_num;
        self.alpha_log2_den = alpha_log2_den;
        self
    }

    /// `2^log2_locks` bucket-group locks guard the slot array; a slot `i` is
    /// protected by `locks[i & locks_mask]` (spec.md C5).
    pub fn with_locks(mut self, log2_locks: u32) -> Self {
        self.log2_locks = log2_locks;
        self
    }

    /// Number of worker tasks the growth engine fans redistribution across
    /// (spec.md §4.6 step 3); the calling thread always runs one segment
    /// itself, so `grow_workers = 1` disables parallel redistribution.
    pub fn with_grow_workers(mut self, grow_workers: usize) -> Self {
        self.grow_workers = grow_workers;
        self
    }

    /// Overrides the default byte-accumulation reducer (spec.md §4.3) with a
    /// user-supplied one, for keys whose structure the default rule handles
    /// poorly (see spec.md §9's open question on zero-padded prefixes).
    pub fn with_reducer<K: ?Sized, R2: Reduce<K>>(self, reducer: R2) -> HtConfig<R2> {
        HtConfig {
            capacity_hint: self.capacity_hint,
            alpha_num: self.alpha_num,
            alpha_log2_den: self.alpha_log2_den,
            log2_locks: self.log2_locks,
            grow_workers: self.grow_workers,
            reducer,
        }
    }

    /// Builds the table. `merge` is the caller-supplied `elt_merge` (spec.md
    /// §4.7 "merge/update semantics"): when present, concurrent overlapping
    /// inserts on the same key converge deterministically as long as it is
    /// commutative and associative; when absent, inserts on an existing key
    /// replace its value, and the winner among racing insertions is
    /// unspecified (spec.md §4.7.3 rationale).
    pub fn build<K, V>(self) -> HtResult<HtDivChn<K, V, R>>
    where
        R: Reduce<K>,
    {
        self.build_with_merge(None)
    }

    /// Like [`HtConfig::build`], but installs an explicit `elt_merge`.
    pub fn build_with_merge<K, V>(
        self,
        merge: Option<MergeFn<V>>,
    ) -> HtResult<HtDivChn<K, V, R>>
    where
        R: Reduce<K>,
    {
        HtDivChn::new(
            self.capacity_hint,
            self.alpha_num,
            self.alpha_log2_den,
            self.log2_locks,
            self.grow_workers,
            self.reducer,
            merge,
        )
    }
}
