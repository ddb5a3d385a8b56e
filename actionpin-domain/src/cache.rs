//! Run-scoped single-flight cache.
//!
//! Concurrent lookups of one key share a single fetch: the first caller
//! holds the key's in-flight lock while fetching, later callers block on it
//! and then read the stored value. Failed fetches are not stored.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

pub struct SingleFlight<K, V> {
    values: Mutex<HashMap<K, V>>,
    inflight: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Ord + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.values.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key_lock(&self, key: &K) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock();
        Arc::clone(
            inflight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    pub fn get_or_fetch<E>(&self, key: K, fetch: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }

        let lock = self.key_lock(&key);
        let _guard = lock.lock();
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }

        let value = fetch()?;
        self.values.lock().insert(key, value.clone());
        Ok(value)
    }

    /// Batch lookup. `fetch` receives only the keys nobody has stored yet.
    ///
    /// Key locks are taken in sorted order so overlapping batches cannot
    /// deadlock. Keys absent from the fetched map are left out of the result.
    pub fn get_or_fetch_many<E>(
        &self,
        keys: &[K],
        fetch: impl FnOnce(&[K]) -> Result<HashMap<K, V>, E>,
    ) -> Result<HashMap<K, V>, E> {
        let mut wanted: Vec<K> = keys.to_vec();
        wanted.sort();
        wanted.dedup();

        let mut out = HashMap::new();
        let mut missing = Vec::new();
        {
            let values = self.values.lock();
            for key in wanted {
                match values.get(&key) {
                    Some(v) => {
                        out.insert(key, v.clone());
                    }
                    None => missing.push(key),
                }
            }
        }
        if missing.is_empty() {
            return Ok(out);
        }

        let locks: Vec<Arc<Mutex<()>>> = missing.iter().map(|k| self.key_lock(k)).collect();
        let _guards: Vec<_> = locks.iter().map(|l| l.lock()).collect();

        let mut still_missing = Vec::new();
        {
            let values = self.values.lock();
            for key in missing {
                match values.get(&key) {
                    Some(v) => {
                        out.insert(key, v.clone());
                    }
                    None => still_missing.push(key),
                }
            }
        }
        if still_missing.is_empty() {
            return Ok(out);
        }

        let fetched = fetch(&still_missing)?;
        let mut values = self.values.lock();
        for key in still_missing {
            if let Some(v) = fetched.get(&key) {
                values.insert(key.clone(), v.clone());
                out.insert(key, v.clone());
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn concurrent_callers_share_one_fetch() {
        let cache: SingleFlight<String, u32> = SingleFlight::new();
        let fetches = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let v = cache
                        .get_or_fetch("actions/checkout@v4".to_string(), || {
                            fetches.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok::<_, ()>(42)
                        })
                        .expect("fetch");
                    assert_eq!(v, 42);
                });
            }
        });

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache: SingleFlight<u8, u8> = SingleFlight::new();
        assert_eq!(cache.get_or_fetch(1, || Err::<u8, _>("down")), Err("down"));
        assert_eq!(cache.get_or_fetch(1, || Ok::<_, &str>(5)), Ok(5));
        assert_eq!(cache.get(&1), Some(5));
    }

    #[test]
    fn batch_fetches_only_missing_keys() {
        let cache: SingleFlight<u8, u8> = SingleFlight::new();
        cache.get_or_fetch(1, || Ok::<_, ()>(10)).expect("seed");

        let mut asked = Vec::new();
        let got = cache
            .get_or_fetch_many(&[3, 1, 2, 3], |keys| {
                asked = keys.to_vec();
                Ok::<_, ()>(keys.iter().map(|k| (*k, k * 10)).collect())
            })
            .expect("batch");

        assert_eq!(asked, vec![2, 3]);
        assert_eq!(got.len(), 3);
        assert_eq!(got[&1], 10);
        assert_eq!(cache.len(), 3);
    }
}
