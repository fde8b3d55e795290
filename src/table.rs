//! The table handle: slot array (C4), lock array (C5) and the public
//! operation surface (C9 search, C10 the rest) that ties every other module
//! together.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::chain::{self, Chain};
use crate::error::{HtError, HtResult};
use crate::gate::Gate;
use crate::growth;
use crate::primes::{self, EXHAUSTED};
use crate::reduce::{DefaultReducer, Reduce};

pub(crate) type Slot<K, V> = UnsafeCell<Chain<K, V>>;
/// The caller-supplied `elt_merge` (spec.md §4.7): combines a racing insert's
/// new value into an existing one, in place.
pub type MergeFn<V> = Box<dyn Fn(&mut V, &V) + Send + Sync>;

/// Everything that changes shape during growth: the slot array itself, the
/// prime-ladder cursor, and the cached load-factor bound. Mutated only by
/// whichever thread currently holds exclusive grower status (see
/// [`crate::gate::Gate::try_begin_growth`]); read elsewhere under the
/// happens-before edge the gate's own mutex establishes between "the grower
/// published a new state" and "a later entrant observed it".
pub(crate) struct TableState<K, V> {
    pub(crate) slots: Box<[Slot<K, V>]>,
    pub(crate) count: u64,
    pub(crate) count_index: usize,
    pub(crate) max_elements: u64,
}

/// A batched, multi-reader/multi-writer hash table using the division method
/// for hashing with chained collision resolution and staged, single-writer
/// growth.
///
/// Construct one through [`crate::HtConfig`]; share it across threads behind
/// an `Arc`.
pub struct HtDivChn<K, V, R = DefaultReducer> {
    pub(crate) reducer: R,
    pub(crate) merge: Option<MergeFn<V>>,
    pub(crate) locks: Box<[Mutex<()>]>,
    pub(crate) locks_mask: usize,
    pub(crate) state: UnsafeCell<TableState<K, V>>,
    pub(crate) element_count: AtomicU64,
    pub(crate) alpha_num: u64,
    pub(crate) alpha_log2_den: u32,
    pub(crate) grow_workers: usize,
    pub(crate) gate: Gate,
}

// SAFETY: every field that is not itself `Sync` (`state`) is only ever
// mutated either (a) under the bucket lock that `locks_mask` maps its index
// to, by at most one thread at a time, or (b) by the single thread holding
// exclusive grower status per `Gate`'s contract. Neither case permits two
// threads to alias a mutation of the same memory.
unsafe impl<K: Send, V: Send, R: Send> Send for HtDivChn<K, V, R> {}
unsafe impl<K: Send + Sync, V: Send + Sync, R: Sync> Sync for HtDivChn<K, V, R> {}

impl<K, V, R> HtDivChn<K, V, R> {
    pub(crate) fn new(
        capacity_hint: u64,
        alpha_num: u64,
        alpha_log2_den: u32,
        log2_locks: u32,
        grow_workers: usize,
        reducer: R,
        merge: Option<MergeFn<V>>,
    ) -> HtResult<Self> {
        let count_index = index_for_reserve(capacity_hint, alpha_num, alpha_log2_den);
        if count_index == EXHAUSTED {
            return Err(HtError::CapacityOverflow {
                requested: capacity_hint,
            });
        }
        let count = primes::PRIMES[count_index];
        let max_elements = max_elements(count, alpha_num, alpha_log2_den);

        let slots = (0..count)
            .map(|_| UnsafeCell::new(None))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let lock_count = 1usize << log2_locks;
        let locks = (0..lock_count)
            .map(|_| Mutex::new(()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            reducer,
            merge,
            locks,
            locks_mask: lock_count - 1,
            state: UnsafeCell::new(TableState {
                slots,
                count,
                count_index,
                max_elements,
            }),
            element_count: AtomicU64::new(0),
            alpha_num,
            alpha_log2_den,
            grow_workers: grow_workers.max(1),
            gate: Gate::new(),
        })
    }

    /// Sets the value alignment recorded against this table. Per spec.md
    /// §4.9 this is only meaningful immediately after construction, which
    /// the `&mut self` receiver enforces: once a table is wrapped in an
    /// `Arc` for multi-threaded use there is no way to call this again.
    pub fn align_value(&mut self, _alignment: usize) {
        // Rust's allocator already honors `V`'s natural alignment for every
        // heap-allocated `Node<K, V>`; this is kept as a no-op entry point
        // so callers porting code that called the C original's
        // `ht_divchn_pthread_align` do not need a conditional.
    }

    /// Number of live key-value pairs.
    pub fn len(&self) -> u64 {
        self.element_count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current slot count (always a prime drawn from the ladder).
    pub fn count(&self) -> u64 {
        // SAFETY: see `TableState` doc comment; this is a plain read of a
        // grower-owned field with no concurrent grower (the caller's `&self`
        // borrow outlives any call they could have made into this table, and
        // growth only ever runs between a matched enter/exit pair it drove
        // itself).
        unsafe { (*self.state.get()).count }
    }

    /// `true` once the prime ladder has been climbed as far as it goes; the
    /// table keeps accepting inserts but chains may grow unbounded (spec.md
    /// §7.3).
    pub fn is_ladder_exhausted(&self) -> bool {
        unsafe { (*self.state.get()).count_index == EXHAUSTED }
    }

    /// The load-factor bound as the exact ratio `alpha_num / 2^alpha_log2_den`
    /// it was configured with.
    pub fn load_factor_bound(&self) -> (u64, u32) {
        (self.alpha_num, self.alpha_log2_den)
    }

    fn hash_and_lock(&self, key: &K) -> (usize, parking_lot::MutexGuard<'_, ()>)
    where
        R: Reduce<K>,
    {
        let count = self.count();
        let ix = (self.reducer.reduce(key) % count) as usize;
        let lock_ix = ix & self.locks_mask;
        (ix, self.locks[lock_ix].lock())
    }

    /// Lock-free point lookup (C9). Valid only when no mutator batch is
    /// currently in flight on this table — see spec.md §4.8 and the open
    /// question recorded in DESIGN.md.
    pub fn search(&self, key: &K) -> Option<&V>
    where
        K: Eq,
        R: Reduce<K>,
    {
        let count = self.count();
        let ix = (self.reducer.reduce(key) % count) as usize;
        // SAFETY: by the caller's contract (spec.md §4.8) no mutator is
        // in-flight, so no slot is being concurrently written.
        let chain: &Chain<K, V> = unsafe { &*self.slot(ix).get() };
        chain::search(chain, key).map(|node| &node.value)
    }

    pub(crate) fn slot(&self, ix: usize) -> &Slot<K, V> {
        // SAFETY: `ix` was computed modulo the current `count`, which matches
        // `slots.len()` for as long as the caller holds the bucket lock that
        // protects it (no grower can be running concurrently with a holder
        // of any bucket lock, by the gate's contract).
        unsafe { &(*self.state.get()).slots[ix] }
    }

    pub(crate) fn max_elements(&self) -> u64 {
        unsafe { (*self.state.get()).max_elements }
    }

    /// Batched insert (C7.1). Existing keys are merged via the configured
    /// merge function, or replaced if none was configured.
    pub fn insert_batch(&self, keys: &[K], values: &[V])
    where
        K: Eq + Clone,
        V: Clone,
        R: Reduce<K>,
    {
        crate::mutator::insert_batch(self, keys, values);
    }

    /// Batched remove (C7.2). Removed values are copied into `values_out` in
    /// the same order as `keys`; slots for keys that were not present are
    /// left untouched.
    pub fn remove_batch(&self, keys: &[K], values_out: &mut [Option<V>])
    where
        K: Eq,
        R: Reduce<K>,
    {
        crate::mutator::remove_batch(self, keys, values_out);
    }

    /// Batched delete (C7.3): like `remove_batch` but drops the removed
    /// values instead of returning them.
    pub fn delete_batch(&self, keys: &[K])
    where
        K: Eq,
        R: Reduce<K>,
    {
        crate::mutator::delete_batch(self, keys);
    }

    /// Forces growth, if needed, until the table can hold `additional` more
    /// elements than it currently does without growing again (spec.md §8
    /// boundary behavior: a reserve hint that pre-empts the first insert
    /// batch's growth).
    pub fn try_reserve(&self, additional: u64) -> HtResult<()>
    where
        R: Reduce<K> + Sync,
        K: Eq + Send,
        V: Send,
    {
        let target = self.len().saturating_add(additional);
        loop {
            if target <= self.max_elements() {
                return Ok(());
            }
            if self.is_ladder_exhausted() {
                return Err(HtError::LadderExhausted);
            }
            // Register as in-flight before attempting to become the grower,
            // matching the gate protocol every batched mutator follows
            // (spec.md §4.5): `try_begin_growth` waits for `in_flight` to
            // drop to exactly 1 (itself), and `finish_growth` decrements it
            // back down, so entry and the grow attempt must be paired.
            self.gate.enter();
            // `enter` may have blocked behind another thread's growth
            // episode; re-check now that we hold a slot past the gate so we
            // don't grow a rung further than this reservation needs.
            if target <= self.max_elements() {
                self.gate.exit();
                return Ok(());
            }
            if self.gate.try_begin_growth() {
                growth::grow(self);
                self.gate.finish_growth();
            } else {
                // another thread is already growing this table; wait for the
                // gate to cycle and re-check.
                self.gate.exit();
            }
        }
    }
}

impl<K, V, R> Drop for HtDivChn<K, V, R> {
    fn drop(&mut self) {
        // Explicit, iterative teardown (C1 `chain_free_all`) rather than the
        // default recursive `Drop` a `Box<Node<..>>` chain would otherwise
        // get: a degenerate chain (after ladder exhaustion) could otherwise
        // overflow the stack on drop.
        let state = self.state.get_mut();
        for slot in state.slots.iter_mut() {
            chain::free_all(slot.get_mut().take());
        }
    }
}

/// The smallest ladder index whose load-factor bound (not just its slot
/// count) covers `capacity_hint` elements, or `EXHAUSTED` if no rung does.
///
/// spec.md §8's boundary behavior ("a reserve hint that forces immediate
/// pre-growth to the target load factor must produce a handle whose first
/// insertion of that many elements causes no growth") means the hint is a
/// target *element* count, not a target *slot* count — picking the smallest
/// prime `>= capacity_hint` (as the ladder's own `index_for_capacity_hint`
/// does for a plain slot-count request) would still trigger growth on the
/// first insert whenever `alpha < 1`.
fn index_for_reserve(capacity_hint: u64, alpha_num: u64, alpha_log2_den: u32) -> usize {
    if capacity_hint <= 1 {
        return 0;
    }
    for (index, &count) in primes::PRIMES.iter().enumerate() {
        if max_elements(count, alpha_num, alpha_log2_den) >= capacity_hint {
            return index;
        }
    }
    EXHAUSTED
}

/// The load-factor bound (C4 support, spec.md §4.4): `floor(count *
/// alpha_num / 2^alpha_log2_den)`, saturating to `u64::MAX` on overflow.
/// Computed via `u128` widening rather than the original's manual
/// high/low-half bit-stitching, which was a 16-bit-portability technique
/// Rust's native 128-bit integer makes unnecessary (see DESIGN.md).
pub(crate) fn max_elements(count: u64, alpha_num: u64, alpha_log2_den: u32) -> u64 {
    let product = (count as u128) * (alpha_num as u128);
    let shifted = product >> alpha_log2_den;
    if shifted > u64::MAX as u128 {
        u64::MAX
    } else {
        shifted as u64
    }
}
