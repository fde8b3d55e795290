//! The growth engine (C8): advances the slot count to the next size that
//! relieves the load-factor bound, builds a fresh slot array, and
//! redistributes every chain across it in parallel.
//!
//! Runs only while the caller holds exclusive grower status from
//! [`crate::gate::Gate::try_begin_growth`] — at that point every other
//! mutator has drained and no reader is permitted to be active (spec.md
//! §4.9), so the slot array can be swapped out without any lock protecting
//! the swap itself. Redistribution still takes the bucket-group locks
//! because the `grow_workers` worker threads run concurrently *with each
//! other* and can target overlapping lock groups in the new array.

use std::ops::Range;

use crate::chain::Chain;
use crate::primes::{self, EXHAUSTED};
use crate::reduce::Reduce;
use crate::table::{max_elements, HtDivChn, Slot, TableState};

/// The next ladder rung past `start_index` whose `max_elements` bound covers
/// `live_elements`, or `None` if every remaining rung falls short (spec.md
/// §4.6 step 1). Pure and allocation-free so the exhaustion boundary (the
/// ladder's top rungs represent slot counts in the quintillions and cannot
/// actually be allocated) is unit-testable without driving a real growth
/// episode all the way to the end of the ladder.
fn next_relieving_index(
    start_index: usize,
    live_elements: u64,
    alpha_num: u64,
    alpha_log2_den: u32,
) -> Option<usize> {
    let mut candidate_index = start_index;
    loop {
        let next_index = primes::next(candidate_index)?;
        candidate_index = next_index;
        let candidate_count = primes::PRIMES[next_index];
        let candidate_max = max_elements(candidate_count, alpha_num, alpha_log2_den);
        if live_elements <= candidate_max {
            return Some(next_index);
        }
    }
}

/// Splits `0..n` into `workers` contiguous ranges, spreading any remainder
/// one slot at a time across the first ranges (spec.md §4.6 step 3).
fn partition(n: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let base = n / workers;
    let rem = n % workers;
    let mut out = Vec::with_capacity(workers);
    let mut start = 0;
    for w in 0..workers {
        let len = base + usize::from(w < rem);
        out.push(start..start + len);
        start += len;
    }
    out
}

/// `Slot<K, V>` is an `UnsafeCell`, so a bare `&[Slot<K, V>]` is neither
/// `Send` nor `Sync` as far as the compiler is concerned. This wrapper
/// asserts what the gate protocol actually guarantees: every access to the
/// slice it carries during a growth episode is mediated either by disjoint
/// old-range partitioning or by a bucket-group lock, so sharing the
/// reference across the worker threads spawned for redistribution is sound.
struct SlotSlice<'a, K, V>(&'a [Slot<K, V>]);

impl<'a, K, V> Clone for SlotSlice<'a, K, V> {
    fn clone(&self) -> Self {
        SlotSlice(self.0)
    }
}
impl<'a, K, V> Copy for SlotSlice<'a, K, V> {}
unsafe impl<'a, K, V> Send for SlotSlice<'a, K, V> {}
unsafe impl<'a, K, V> Sync for SlotSlice<'a, K, V> {}

fn redistribute_segment<K, V, R: Reduce<K>>(
    range: Range<usize>,
    old: &[Slot<K, V>],
    new: &[Slot<K, V>],
    locks: &[parking_lot::Mutex<()>],
    locks_mask: usize,
    new_count: u64,
    reducer: &R,
) {
    for i in range {
        // SAFETY: old-slot ranges are disjoint across workers and no other
        // mutator is in flight (the gate is closed), so this worker has
        // exclusive access to `old[i]`.
        let mut chain: Chain<K, V> = unsafe { &mut *old[i].get() }.take();
        while let Some(mut node) = chain {
            chain = node.next.take();
            let new_ix = (reducer.reduce(&node.key) % new_count) as usize;
            let lock_ix = new_ix & locks_mask;
            let _guard = locks[lock_ix].lock();
            // SAFETY: holding `locks[lock_ix]` grants exclusive access to
            // every new slot that maps to it, including `new[new_ix]`; no
            // other worker can be touching it without holding the same lock.
            let head = unsafe { &mut *new[new_ix].get() };
            node.next = head.take();
            *head = Some(node);
        }
    }
}

/// Runs the growth phase described in spec.md §4.6. The caller must already
/// hold exclusive grower status.
pub(crate) fn grow<K, V, R>(table: &HtDivChn<K, V, R>)
where
    R: Reduce<K> + Sync,
    K: Send,
    V: Send,
{
    // SAFETY: the caller holds exclusive grower status: every other mutator
    // has drained (gate closed, in_flight == 1) and no search is permitted to
    // be concurrently active, so nothing else observes `state` mid-mutation.
    let state: &mut TableState<K, V> = unsafe { &mut *table.state.get() };

    let live_elements = table.element_count.load(std::sync::atomic::Ordering::Acquire);
    let new_index = next_relieving_index(
        state.count_index,
        live_elements,
        table.alpha_num,
        table.alpha_log2_den,
    );

    let Some(new_index) = new_index else {
        log::debug!(
            "prime ladder exhausted at {} slots ({} elements live); growth disabled",
            state.count,
            live_elements
        );
        state.count_index = EXHAUSTED;
        return;
    };

    let new_count = primes::PRIMES[new_index];
    let new_max_elements = max_elements(new_count, table.alpha_num, table.alpha_log2_den);

    log::debug!(
        "growing table: {} -> {} slots ({} elements live)",
        state.count,
        new_count,
        live_elements
    );

    let new_slots: Box<[Slot<K, V>]> = (0..new_count)
        .map(|_| std::cell::UnsafeCell::new(None))
        .collect::<Vec<_>>()
        .into_boxed_slice();

    let old_slots = std::mem::replace(&mut state.slots, Box::new([]));
    let segments = partition(old_slots.len(), table.grow_workers);
    let locks_mask = table.locks_mask;
    let old_wrap = SlotSlice(&old_slots);
    let new_wrap = SlotSlice(&new_slots);

    std::thread::scope(|scope| {
        let mut iter = segments.into_iter();
        let first = iter.next();
        let mut handles = Vec::new();
        for seg in iter {
            let locks_ref = &table.locks;
            let reducer_ref = &table.reducer;
            handles.push(scope.spawn(move || {
                redistribute_segment(
                    seg,
                    old_wrap.0,
                    new_wrap.0,
                    locks_ref,
                    locks_mask,
                    new_count,
                    reducer_ref,
                )
            }));
        }
        if let Some(seg) = first {
            redistribute_segment(
                seg,
                old_wrap.0,
                new_wrap.0,
                &table.locks,
                locks_mask,
                new_count,
                &table.reducer,
            );
        }
        for h in handles {
            h.join().expect("growth worker thread panicked");
        }
    });

    state.slots = new_slots;
    state.count = new_count;
    state.count_index = new_index;
    state.max_elements = new_max_elements;
}
