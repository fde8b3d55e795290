//! The prime ladder (C2): a compile-time table of slot counts.
//!
//! Each entry is prime and roughly doubles the previous one, which keeps the
//! division-method hash (`reduce(key) mod count`) well distributed across a
//! growth sequence without ever landing on a power of two or a power of ten.
//! The original design stored this as 16-bit "parts" so it would still fit on
//! hosts with a 16-bit native integer; on a target where `u64` is always
//! available that encoding buys nothing, so the ladder here is just a `const`
//! array (see DESIGN.md).

/// Slot counts a table can grow through, smallest first.
pub(crate) const PRIMES: &[u64] = &[
    13, 23, 43, 83, 163, 331, 641, 1277, 2521, 5009, 9967, 19841, 39499, 78539, 156269, 310987,
    618841, 1231487, 2450663, 4876799, 9704831, 19312609, 38432077, 76479811, 152194831, 302867683,
    602706691, 1199386327, 2386778819, 4749689699, 9451882511, 18809246171, 37430399887,
    74486495747, 148228126523, 294973971769, 586998203821, 1168126425619, 2324571586933,
    4625897458067, 9205535941387, 18319016523323, 36454842881441, 72545137334069, 144364823294719,
    287285998356403, 571699136729249, 1137681282091223, 2263985751361409, 4505331645209137,
    8965609973966203, 17841563848192753, 35504712057903467, 70654376995227887, 140602210220503547,
    279798398338802117, 556798812694215901, 1108029637261489571, 2204978978150364253,
    4387908166519224877, 8731937251373257769,
];

/// Sentinel index meaning "the ladder has been climbed as far as it goes".
pub(crate) const EXHAUSTED: usize = usize::MAX;

/// The smallest index whose prime is `>= hint`, or `EXHAUSTED` if every
/// prime in the ladder is smaller than `hint` (the caller asked for more
/// slots than this table can ever represent).
pub(crate) fn index_for_capacity_hint(hint: u64) -> usize {
    match PRIMES.iter().position(|&p| p >= hint.max(1)) {
        Some(ix) => ix,
        None => EXHAUSTED,
    }
}

/// The next rung on the ladder after `index`, or `None` if `index` is the
/// last rung (the caller must treat the ladder as exhausted).
pub(crate) fn next(index: usize) -> Option<usize> {
    if index == EXHAUSTED {
        return None;
    }
    let candidate = index + 1;
    if candidate < PRIMES.len() {
        Some(candidate)
    } else {
        None
    }
}
