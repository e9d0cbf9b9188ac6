//! Raw result maps and share-of-total conversion.

use std::hash::Hash;

use ahash::AHashMap;

/// Map from an entity or choice key to a vote count, seat count or share.
pub type ResultMap<K> = AHashMap<K, f64>;

/// Sum of every non-NaN value in the map.
#[must_use]
pub fn total<K>(map: &ResultMap<K>) -> f64 {
    map.values().filter(|v| !v.is_nan()).sum()
}

/// Convert counts to shares of the total.
///
/// A zero total yields `NaN` for every entry, which downstream builders
/// render as "awaiting data".
#[must_use]
pub fn shares<K: Clone + Eq + Hash>(map: &ResultMap<K>) -> ResultMap<K> {
    let total = total(map);
    map.iter()
        .map(|(key, value)| (key.clone(), value / total))
        .collect()
}
