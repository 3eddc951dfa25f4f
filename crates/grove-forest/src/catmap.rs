//! Bidirectional mapping between category labels and dense integer codes.

use std::collections::HashMap;

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Inner {
    forward: HashMap<String, usize>,
    back: Vec<String>,
}

/// Thread-safe, append-only map from category labels to codes.
///
/// Codes are assigned in first-seen order starting at 0 with no gaps, and a
/// label keeps its code for the lifetime of the map. One mutex guards both
/// directions so a lookup never observes a half-inserted label.
#[derive(Debug, Default)]
pub struct CategoryMap {
    inner: Mutex<Inner>,
}

impl CategoryMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map whose codes follow the order of `labels`.
    ///
    /// Repeated labels keep the code of their first occurrence.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let map = Self::new();
        for label in labels {
            let label: String = label.into();
            map.code_of(&label);
        }
        map
    }

    /// Return the code for `label`, assigning the next free code if unseen.
    pub fn code_of(&self, label: &str) -> usize {
        let mut inner = self.inner.lock();
        if let Some(&code) = inner.forward.get(label) {
            return code;
        }
        let code = inner.back.len();
        inner.forward.insert(label.to_string(), code);
        inner.back.push(label.to_string());
        code
    }

    /// Return the code for `label` without inserting it.
    #[must_use]
    pub fn get_code(&self, label: &str) -> Option<usize> {
        self.inner.lock().forward.get(label).copied()
    }

    /// Return the label assigned to `code`.
    ///
    /// # Panics
    ///
    /// Panics if `code` was never returned by [`CategoryMap::code_of`].
    #[must_use]
    pub fn label_of(&self, code: usize) -> String {
        let inner = self.inner.lock();
        match inner.back.get(code) {
            Some(label) => label.clone(),
            None => panic!(
                "category code {code} out of range ({} categories)",
                inner.back.len()
            ),
        }
    }

    /// Return the label assigned to `code`, or `None` if out of range.
    #[must_use]
    pub fn get_label(&self, code: usize) -> Option<String> {
        self.inner.lock().back.get(code).cloned()
    }

    /// Return the number of distinct labels seen so far.
    #[must_use]
    pub fn n_categories(&self) -> usize {
        self.inner.lock().back.len()
    }

    /// Return a snapshot of all labels, indexed by code.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.inner.lock().back.clone()
    }
}

impl Clone for CategoryMap {
    fn clone(&self) -> Self {
        let inner = self.inner.lock();
        Self {
            inner: Mutex::new(Inner {
                forward: inner.forward.clone(),
                back: inner.back.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::CategoryMap;

    #[test]
    fn codes_assigned_in_first_seen_order() {
        let map = CategoryMap::new();
        assert_eq!(map.code_of("b"), 0);
        assert_eq!(map.code_of("a"), 1);
        assert_eq!(map.code_of("b"), 0);
        assert_eq!(map.code_of("c"), 2);
        assert_eq!(map.n_categories(), 3);
        assert_eq!(map.labels(), vec!["b", "a", "c"]);
    }

    #[test]
    fn empty_map_has_no_categories() {
        let map = CategoryMap::new();
        assert_eq!(map.n_categories(), 0);
        assert_eq!(map.get_label(0), None);
        assert_eq!(map.get_code("x"), None);
    }

    #[test]
    fn label_of_inverts_code_of() {
        let map = CategoryMap::from_labels(["low", "mid", "high", "mid"]);
        assert_eq!(map.n_categories(), 3);
        for label in ["low", "mid", "high"] {
            assert_eq!(map.label_of(map.code_of(label)), label);
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn label_of_out_of_range_panics() {
        let map = CategoryMap::from_labels(["only"]);
        let _ = map.label_of(1);
    }

    #[test]
    fn clone_is_independent() {
        let map = CategoryMap::from_labels(["a", "b"]);
        let copy = map.clone();
        map.code_of("c");
        copy.code_of("z");
        assert_eq!(map.labels(), vec!["a", "b", "c"]);
        assert_eq!(copy.labels(), vec!["a", "b", "z"]);
    }

    #[test]
    fn concurrent_inserts_have_no_gaps() {
        let map = Arc::new(CategoryMap::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for i in 0..100 {
                        map.code_of(&format!("label-{}", (i * 7 + t) % 50));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(map.n_categories(), 50);
        let labels = map.labels();
        for (code, label) in labels.iter().enumerate() {
            assert_eq!(map.code_of(label), code);
        }
    }
}
