use std::ops::{Deref, DerefMut};

use ahash::HashMap;

/// Capacity a freshly constructed [`Table`] is pre-sized to, chosen to avoid
/// rehashing during the common single-session-at-a-time test flows.
const DEFAULT_CAPACITY: usize = 64;

/// A thin wrapper around [`ahash::HashMap`] pre-sized on construction.
///
/// Mirrors the store's own key space one-to-one: every [`Table`] in this
/// crate is keyed by either an S11 local TEID or an EPS Bearer ID, never by
/// anything derived or composite.
pub struct Table<K, V>(HashMap<K, V>);

impl<K, V> Default for Table<K, V>
where
    K: std::hash::Hash + Eq,
{
    fn default() -> Self {
        Self(HashMap::with_capacity_and_hasher(
            DEFAULT_CAPACITY,
            Default::default(),
        ))
    }
}

impl<K, V> Table<K, V>
where
    K: std::hash::Hash + Eq,
{
    /// # Test
    ///
    /// ```
    /// use sgw_engine::model::BearerEntry;
    ///
    /// let mut bearers = sgw_engine::table::Table::with_capacity(4);
    /// bearers.insert(5u8, BearerEntry::new(5, sgw_engine::model::Qos {
    ///     qci: 9,
    ///     pci: false,
    ///     priority_level: 8,
    ///     pvi: false,
    ///     gbr_ul_bps: 0,
    ///     gbr_dl_bps: 0,
    ///     mbr_ul_bps: 0,
    ///     mbr_dl_bps: 0,
    /// }));
    /// assert!(bearers.contains_key(&5));
    /// assert!(!bearers.contains_key(&6));
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self(HashMap::with_capacity_and_hasher(
            capacity,
            Default::default(),
        ))
    }
}

impl<K, V> Deref for Table<K, V> {
    type Target = HashMap<K, V>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K, V> DerefMut for Table<K, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<K, V> AsRef<HashMap<K, V>> for Table<K, V> {
    fn as_ref(&self) -> &HashMap<K, V> {
        &self.0
    }
}
