use crate::Result;
use std::sync::Arc;

/// Memoizes derived coefficients by the full parameter tuple that produced them.
///
/// Entries are immutable once inserted and handed out as [`Arc`]s, so a set of
/// coefficients can be shared read-only across line workers while the owner
/// keeps using the cache. A changed parameter is simply a different key.
#[derive(Debug, Clone)]
pub struct CoefficientCache<K, V> {
    entries: Vec<(K, Arc<V>)>,
}

impl<K, V> Default for CoefficientCache<K, V> {
    fn default() -> Self {
        Self { entries: vec![] }
    }
}

impl<K: PartialEq, V> CoefficientCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// A failed computation leaves the cache unchanged.
    pub fn get_or_try_insert_with<F>(&mut self, key: K, compute: F) -> Result<Arc<V>>
    where
        F: FnOnce(&K) -> Result<V>,
    {
        if let Some((_, value)) = self.entries.iter().find(|(k, _)| *k == key) {
            return Ok(value.clone());
        }
        let value = Arc::new(compute(&key)?);
        self.entries.push((key, value.clone()));
        Ok(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
