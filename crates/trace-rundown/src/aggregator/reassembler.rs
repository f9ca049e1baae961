//! Reassembly of values split across several events.
//!
//! Producers cap the size of a single trace event, so a large script source
//! arrives as `splitCount` fragments tagged with a `splitIndex`. Fragments
//! may arrive in any order. Small values arrive whole in one event.
//!
//! A key is either in whole mode or in split mode, decided by the first
//! event that names it. The two are kept in separate maps and never mixed.

use log::debug;
use std::collections::HashMap;
use std::hash::Hash;

/// A value ready to be attached to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassembledValue {
    pub text: Option<String>,

    /// Length in UTF-16 code units, as reported or as measured
    pub length: Option<u64>,
}

/// Accumulates whole values and fragment arrays, keyed by `K`
#[derive(Debug, Clone)]
pub struct SplitValueReassembler<K> {
    whole: HashMap<K, ReassembledValue>,
    split: HashMap<K, Vec<String>>,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> SplitValueReassembler<K> {
    pub fn new() -> Self {
        Self {
            whole: HashMap::new(),
            split: HashMap::new(),
        }
    }

    /// Record one fragment of a split value
    ///
    /// The first sighting of `key` allocates `fragment_count` empty slots;
    /// every sighting writes its slot, replacing any earlier value there.
    ///
    /// # Returns
    /// `false` if the fragment was ignored (key in whole mode, or index
    /// outside the slots allocated on first sighting)
    pub fn begin_or_continue(
        &mut self,
        key: K,
        fragment_index: usize,
        fragment_count: usize,
        fragment_value: Option<String>,
    ) -> bool {
        if self.whole.contains_key(&key) {
            debug!("Ignoring fragment for {:?}: value already arrived whole", key);
            return false;
        }

        let slots = self
            .split
            .entry(key)
            .or_insert_with(|| vec![String::new(); fragment_count]);

        let allocated = slots.len();
        let Some(slot) = slots.get_mut(fragment_index) else {
            debug!(
                "Ignoring fragment {} of {}: only {} slots allocated",
                fragment_index, fragment_count, allocated
            );
            return false;
        };

        // An empty or null fragment leaves the slot as it was
        if let Some(value) = fragment_value.filter(|v| !v.is_empty()) {
            *slot = value;
        }

        true
    }

    /// Record a value that arrived in a single event
    ///
    /// An event with neither text nor a length records nothing, so it does
    /// not claim the key for whole mode.
    ///
    /// # Returns
    /// `false` if the key is already in split mode
    pub fn set_whole(&mut self, key: K, value: Option<String>, length: Option<u64>) -> bool {
        if self.split.contains_key(&key) {
            debug!("Ignoring whole value for {:?}: key is in split mode", key);
            return false;
        }

        let text = value.filter(|v| !v.is_empty());
        let length = length.filter(|l| *l > 0);
        if text.is_none() && length.is_none() {
            return true;
        }

        let entry = self.whole.entry(key).or_insert(ReassembledValue {
            text: None,
            length: None,
        });

        // Only non-empty values overwrite what an earlier event recorded
        if let Some(text) = text {
            entry.text = Some(text);
        }
        if let Some(length) = length {
            entry.length = Some(length);
        }

        true
    }

    /// Concatenate the fragments of a split value in index order
    ///
    /// Slots that never received a fragment contribute an empty string.
    pub fn finalize(&self, key: &K) -> Option<String> {
        self.split.get(key).map(|slots| slots.concat())
    }

    /// Resolve the final value for `key`, whole values first
    pub fn lookup(&self, key: &K) -> Option<ReassembledValue> {
        if let Some(value) = self.whole.get(key) {
            return Some(value.clone());
        }

        self.finalize(key).map(|text| {
            let length = utf16_len(&text);
            ReassembledValue {
                text: Some(text),
                length: Some(length),
            }
        })
    }

    pub fn len(&self) -> usize {
        self.whole.len() + self.split.len()
    }

    pub fn is_empty(&self) -> bool {
        self.whole.is_empty() && self.split.is_empty()
    }

    pub fn clear(&mut self) {
        self.whole.clear();
        self.split.clear();
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> Default for SplitValueReassembler<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Length of a string in UTF-16 code units
pub fn utf16_len(text: &str) -> u64 {
    text.encode_utf16().count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_fragment_order_does_not_matter() {
        let parts = ["a", "bb", "ccc", "dddd"];
        let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1], [1, 3, 0, 2]];

        for order in orders {
            let mut reassembler = SplitValueReassembler::new();
            for index in order {
                assert!(reassembler.begin_or_continue("k", index, 4, some(parts[index])));
            }
            assert_eq!(reassembler.finalize(&"k").as_deref(), Some("abbcccdddd"));
        }
    }

    #[test]
    fn test_missing_fragment_leaves_gap() {
        let mut reassembler = SplitValueReassembler::new();
        reassembler.begin_or_continue(1u32, 0, 3, some("head"));
        reassembler.begin_or_continue(1u32, 2, 3, some("tail"));

        assert_eq!(reassembler.finalize(&1).as_deref(), Some("headtail"));
        let value = reassembler.lookup(&1).unwrap();
        assert_eq!(value.length, Some(8));
    }

    #[test]
    fn test_later_fragment_overwrites_slot() {
        let mut reassembler = SplitValueReassembler::new();
        reassembler.begin_or_continue("k", 0, 2, some("old"));
        reassembler.begin_or_continue("k", 0, 2, some("new"));
        reassembler.begin_or_continue("k", 1, 2, some("!"));
        assert_eq!(reassembler.finalize(&"k").as_deref(), Some("new!"));
    }

    #[test]
    fn test_out_of_range_fragment_is_ignored() {
        let mut reassembler = SplitValueReassembler::new();
        reassembler.begin_or_continue("k", 0, 2, some("a"));
        // A later event claiming more fragments cannot grow the slots
        assert!(!reassembler.begin_or_continue("k", 4, 5, some("z")));
        assert_eq!(reassembler.finalize(&"k").as_deref(), Some("a"));
    }

    #[test]
    fn test_modes_do_not_mix() {
        let mut reassembler = SplitValueReassembler::new();
        assert!(reassembler.set_whole("w", some("whole"), Some(5)));
        assert!(!reassembler.begin_or_continue("w", 0, 2, some("frag")));

        assert!(reassembler.begin_or_continue("s", 0, 1, some("frag")));
        assert!(!reassembler.set_whole("s", some("whole"), Some(5)));

        assert_eq!(reassembler.lookup(&"w").unwrap().text.as_deref(), Some("whole"));
        assert_eq!(reassembler.lookup(&"s").unwrap().text.as_deref(), Some("frag"));
        assert!(reassembler.finalize(&"w").is_none());
    }

    #[test]
    fn test_empty_whole_value_does_not_claim_key() {
        let mut reassembler = SplitValueReassembler::new();
        assert!(reassembler.set_whole("k", some(""), None));
        assert!(reassembler.set_whole("k", None, Some(0)));
        assert!(reassembler.lookup(&"k").is_none());

        assert!(reassembler.begin_or_continue("k", 1, 2, some("b")));
        assert!(reassembler.begin_or_continue("k", 0, 2, some("a")));
        assert_eq!(reassembler.lookup(&"k").unwrap().text.as_deref(), Some("ab"));
    }

    #[test]
    fn test_whole_value_keeps_reported_length() {
        let mut reassembler = SplitValueReassembler::new();
        reassembler.set_whole("k", some("abc"), Some(40));
        assert_eq!(
            reassembler.lookup(&"k"),
            Some(ReassembledValue {
                text: some("abc"),
                length: Some(40),
            })
        );

        reassembler.set_whole("n", some("abc"), None);
        assert_eq!(reassembler.lookup(&"n").unwrap().length, None);
    }

    #[test]
    fn test_utf16_length() {
        assert_eq!(utf16_len("abc"), 3);
        assert_eq!(utf16_len("é"), 1);
        assert_eq!(utf16_len("😀"), 2);
    }

    #[test]
    fn test_clear() {
        let mut reassembler = SplitValueReassembler::new();
        reassembler.set_whole("a", some("x"), None);
        reassembler.begin_or_continue("b", 0, 1, some("y"));
        assert_eq!(reassembler.len(), 2);
        reassembler.clear();
        assert!(reassembler.is_empty());
        assert!(reassembler.lookup(&"a").is_none());
    }
}
