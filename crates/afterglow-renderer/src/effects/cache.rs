//! Per-effect cache of intermediate results.

/// Whether an effect's intermediates are reusable, and for which key.
///
/// Effects pick the key: `()` for results that only depend on parameters,
/// the temporal frame index for results that change every sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheState<K> {
    #[default]
    Dirty,
    Valid(K),
}

impl<K: PartialEq> CacheState<K> {
    pub fn is_valid_for(&self, key: &K) -> bool {
        matches!(self, CacheState::Valid(k) if k == key)
    }

    pub fn validate(&mut self, key: K) {
        *self = CacheState::Valid(key);
    }

    pub fn invalidate(&mut self) {
        *self = CacheState::Dirty;
    }
}
