//! Occurrence counting with deterministic ranking.

use std::collections::HashMap;
use std::hash::Hash;

/// Counts occurrences of keys, remembering the order keys first appeared.
#[derive(Debug, Clone)]
pub struct Tally<K> {
    counts: Vec<(K, usize)>,
    index: HashMap<K, usize>,
}

impl<K> Default for Tally<K> {
    fn default() -> Self {
        Self {
            counts: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> Tally<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more occurrence of `key`.
    pub fn add(&mut self, key: K) {
        match self.index.get(&key) {
            Some(&slot) => self.counts[slot].1 += 1,
            None => {
                self.index.insert(key.clone(), self.counts.len());
                self.counts.push((key, 1));
            }
        }
    }

    /// Number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The `n` most frequent keys, most frequent first. Equal counts keep the
    /// order in which the keys were first seen.
    pub fn most_common(&self, n: usize) -> Vec<(K, usize)> {
        let mut ranked = self.counts.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_common_ranks_by_count() {
        let mut tally = Tally::new();
        for key in ["Nf3", "Qh5", "Nf3", "Bxf7+", "Qh5", "Nf3"] {
            tally.add(key);
        }

        assert_eq!(tally.len(), 3);
        assert_eq!(
            tally.most_common(2),
            vec![("Nf3", 3), ("Qh5", 2)]
        );
    }

    #[test]
    fn test_ties_keep_first_encounter_order() {
        let mut tally = Tally::new();
        for key in ["c", "a", "b", "a", "c", "b"] {
            tally.add(key);
        }
        assert_eq!(tally.most_common(5), vec![("c", 2), ("a", 2), ("b", 2)]);
    }

    #[test]
    fn test_empty_tally() {
        let tally: Tally<String> = Tally::new();
        assert!(tally.is_empty());
        assert!(tally.most_common(5).is_empty());
    }
}
