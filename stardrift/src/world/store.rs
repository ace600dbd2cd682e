use std::collections::HashMap;

use stardrift_core::id::IdAllocator;

/// Typed per-map entity table with stable string ids. Iteration order
/// is not meaningful; systems that care collect and sort ids.
pub struct EntityStore<T> {
    entries: HashMap<String, T>,
    ids: IdAllocator,
}

impl<T> EntityStore<T> {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            entries: HashMap::new(),
            ids: IdAllocator::new(prefix),
        }
    }

    /// Mint an id and insert the entity built from it.
    pub fn spawn(&mut self, build: impl FnOnce(String) -> T) -> &T {
        let id = self.ids.next();
        self.entries.entry(id.clone()).or_insert_with(|| build(id))
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.entries.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut T)> {
        self.entries.iter_mut()
    }

    pub fn retain(&mut self, keep: impl FnMut(&String, &mut T) -> bool) {
        self.entries.retain(keep);
    }
}
