use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

/// Storage behind a loader's memoization.
///
/// A loader stores both values and per-key errors here, so `V` is the loader's full result type.
pub trait Cache {
    type K;
    type V;

    fn get(&self, key: &Self::K) -> Option<&Self::V>;

    fn contains(&self, key: &Self::K) -> bool {
        self.get(key).is_some()
    }

    fn insert(&mut self, key: Self::K, value: Self::V);
    fn insert_many<I: IntoIterator<Item = (Self::K, Self::V)>>(&mut self, key_vals: I) {
        for (key, value) in key_vals {
            self.insert(key, value);
        }
    }

    fn remove(&mut self, keys: &[Self::K]);
    fn flush(&mut self);
}

impl<K, V, S: BuildHasher> Cache for HashMap<K, V, S>
where
    K: Eq + Hash,
{
    type K = K;
    type V = V;

    fn get(&self, key: &Self::K) -> Option<&Self::V> {
        HashMap::get(self, key)
    }

    fn insert(&mut self, key: Self::K, value: Self::V) {
        HashMap::insert(self, key, value);
    }

    fn remove(&mut self, keys: &[Self::K]) {
        for key in keys {
            HashMap::remove(self, key);
        }
    }

    fn flush(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashmap_cache_round_trip() {
        let mut cache: HashMap<&str, Result<u32, String>> = HashMap::new();
        Cache::insert_many(&mut cache, [("a", Ok(1)), ("b", Err("missing".to_owned()))]);

        assert_eq!(Cache::get(&cache, &"b"), Some(&Err("missing".to_owned())));
        assert_eq!(Cache::get(&cache, &"c"), None);
        assert_eq!(Cache::get(&cache, &"a"), Some(&Ok(1)));

        Cache::remove(&mut cache, &["a"]);
        assert!(!Cache::contains(&cache, &"a"));
        assert!(Cache::contains(&cache, &"b"));

        Cache::flush(&mut cache);
        assert!(!Cache::contains(&cache, &"b"));
    }
}
