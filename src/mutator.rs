//! The mutator engine (C7): batched insert/remove/delete, all sharing the
//! same gate entry/exit protocol and differing only in what they do to a
//! single bucket once they hold its lock.

use std::sync::atomic::Ordering;

use crate::chain;
use crate::growth;
use crate::reduce::Reduce;
use crate::table::HtDivChn;

/// Runs the gate's exit protocol for a mutator that may have just pushed
/// `element_count` past `max_elements`. Only insert can grow the table —
/// remove and delete only ever decrease `element_count` (spec.md §4.7.2,
/// §4.7.3) so they call [`crate::gate::Gate::exit`] directly instead.
fn finish_possibly_growing<K, V, R>(table: &HtDivChn<K, V, R>, local_inserted: u64)
where
    K: Send,
    V: Send,
    R: Reduce<K> + Sync,
{
    if local_inserted > 0 {
        table.element_count.fetch_add(local_inserted, Ordering::Relaxed);
    }
    let should_attempt_grow =
        local_inserted > 0 && !table.is_ladder_exhausted() && table.len() > table.max_elements();

    if should_attempt_grow && table.gate.try_begin_growth() {
        growth::grow(table);
        table.gate.finish_growth();
    } else {
        table.gate.exit();
    }
}

/// Batched insert (C7.1, spec.md §4.7.1).
pub(crate) fn insert_batch<K, V, R>(table: &HtDivChn<K, V, R>, keys: &[K], values: &[V])
where
    K: Eq + Clone + Send,
    V: Clone + Send,
    R: Reduce<K> + Sync,
{
    assert_eq!(
        keys.len(),
        values.len(),
        "insert_batch: keys and values must have the same length"
    );

    table.gate.enter();
    let count = table.count();
    let mut inserted: u64 = 0;

    for (key, value) in keys.iter().zip(values.iter()) {
        let ix = (table.reducer.reduce(key) % count) as usize;
        let lock_ix = ix & table.locks_mask;
        let _guard = table.locks[lock_ix].lock();
        // SAFETY: `_guard` holds the lock protecting every slot whose index
        // shares `lock_ix`, including `ix`; no other thread can be touching
        // it concurrently.
        let chain = unsafe { &mut *table.slot(ix).get() };
        match chain::search_value_mut(chain, key) {
            Some(existing) => match &table.merge {
                Some(merge) => merge(existing, value),
                None => *existing = value.clone(),
            },
            None => {
                chain::prepend(chain, key.clone(), value.clone());
                inserted += 1;
            }
        }
    }

    finish_possibly_growing(table, inserted);
}

/// Batched remove (C7.2, spec.md §4.7.2).
pub(crate) fn remove_batch<K, V, R>(
    table: &HtDivChn<K, V, R>,
    keys: &[K],
    values_out: &mut [Option<V>],
)
where
    K: Eq,
    R: Reduce<K>,
{
    assert_eq!(
        keys.len(),
        values_out.len(),
        "remove_batch: keys and values_out must have the same length"
    );

    table.gate.enter();
    let count = table.count();
    let mut removed: u64 = 0;

    for (key, out) in keys.iter().zip(values_out.iter_mut()) {
        let ix = (table.reducer.reduce(key) % count) as usize;
        let lock_ix = ix & table.locks_mask;
        let _guard = table.locks[lock_ix].lock();
        let chain = unsafe { &mut *table.slot(ix).get() };
        if let Some(node) = chain::detach(chain, key) {
            *out = Some(node.value);
            removed += 1;
        }
    }

    if removed > 0 {
        table.element_count.fetch_sub(removed, Ordering::Relaxed);
    }
    table.gate.exit();
}

/// Batched delete (C7.3, spec.md §4.7.3).
pub(crate) fn delete_batch<K, V, R>(table: &HtDivChn<K, V, R>, keys: &[K])
where
    K: Eq,
    R: Reduce<K>,
{
    table.gate.enter();
    let count = table.count();
    let mut deleted: u64 = 0;

    for key in keys {
        let ix = (table.reducer.reduce(key) % count) as usize;
        let lock_ix = ix & table.locks_mask;
        let _guard = table.locks[lock_ix].lock();
        let chain = unsafe { &mut *table.slot(ix).get() };
        if chain::detach(chain, key).is_some() {
            deleted += 1;
        }
        // the detached node (key + value) is dropped here
    }

    if deleted > 0 {
        table.element_count.fetch_sub(deleted, Ordering::Relaxed);
    }
    table.gate.exit();
}
