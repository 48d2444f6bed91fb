//! Key substitution table.
//!
//! The host looks up every local keystroke in a [`KeyTranslator`] and only
//! relays keys that have an entry.  Keys and values are single characters;
//! pairs that violate this are discarded rather than reported as errors.

pub mod batch;

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, warn};

pub use batch::parse_mapping_batch;

/// Error type for remap input that cannot be turned into a batch at all.
#[derive(Debug, Error, PartialEq)]
pub enum RemapError {
    #[error("no key mappings were given")]
    EmptyBatch,
}

/// Counts reported by [`KeyTranslator::remap`], used for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemapOutcome {
    /// Pairs written into the table.
    pub applied: usize,
    /// Pairs discarded because a side was not exactly one character.
    pub rejected: usize,
}

/// Mapping from an input character to the character sent in its place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTranslator {
    table: HashMap<char, char>,
}

impl KeyTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a batch of `(input, output)` pairs.
    ///
    /// Any pair where either side is not exactly one character is skipped;
    /// the rest are applied in order, so a later pair for the same input
    /// overwrites an earlier one.  Applying the same batch twice yields the
    /// same table.
    pub fn remap<I, K, V>(&mut self, batch: I) -> RemapOutcome
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut outcome = RemapOutcome::default();
        for (input, output) in batch {
            let (input, output) = (input.as_ref(), output.as_ref());
            match (single_char(input), single_char(output)) {
                (Some(from), Some(to)) => {
                    self.table.insert(from, to);
                    outcome.applied += 1;
                }
                _ => {
                    debug!("discarding key mapping {input:?} -> {output:?}");
                    outcome.rejected += 1;
                }
            }
        }
        outcome
    }

    /// Returns the mapped character for `key`, or `None` if it has no entry.
    pub fn translate(&self, key: char) -> Option<char> {
        self.table.get(&key).copied()
    }

    /// Rebuilds a table from its persisted string-keyed form.
    ///
    /// Entries that are not one character on both sides are skipped with a
    /// warning, since a hand-edited settings file may contain them.
    pub fn from_persisted<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut translator = Self::new();
        for (input, output) in entries {
            match (single_char(input), single_char(output)) {
                (Some(from), Some(to)) => {
                    translator.table.insert(from, to);
                }
                _ => warn!("skipping persisted key mapping {input:?} -> {output:?}"),
            }
        }
        translator
    }

    /// The persisted string-keyed form, sorted by input character.
    pub fn to_persisted(&self) -> BTreeMap<String, String> {
        self.table
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect()
    }

    /// Every mapping, sorted by input character.
    pub fn entries(&self) -> Vec<(char, char)> {
        let mut entries: Vec<_> = self.table.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_unstable();
        entries
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Returns the character if `s` is exactly one character long.
fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let first = chars.next()?;
    chars.next().is_none().then_some(first)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_translator_maps_nothing() {
        let translator = KeyTranslator::new();
        assert!(translator.is_empty());
        assert_eq!(translator.translate('a'), None);
    }

    #[test]
    fn test_remap_valid_pair_translates() {
        // Arrange
        let mut translator = KeyTranslator::new();

        // Act
        let outcome = translator.remap([("a", "z")]);

        // Assert
        assert_eq!(outcome, RemapOutcome { applied: 1, rejected: 0 });
        assert_eq!(translator.translate('a'), Some('z'));
    }

    #[test]
    fn test_remap_discards_multi_char_and_empty_sides() {
        // Arrange
        let mut translator = KeyTranslator::new();
        translator.remap([("b", "y")]);

        // Act
        let outcome = translator.remap([("ab", "c"), ("d", "ef"), ("", "x"), ("g", ""), ("h", "i")]);

        // Assert: only h=i applies, b=y untouched
        assert_eq!(outcome, RemapOutcome { applied: 1, rejected: 4 });
        assert_eq!(translator.translate('b'), Some('y'));
        assert_eq!(translator.translate('h'), Some('i'));
        assert_eq!(translator.translate('a'), None);
        assert_eq!(translator.translate('d'), None);
        assert_eq!(translator.len(), 2);
    }

    #[test]
    fn test_remap_later_pair_overwrites_earlier() {
        let mut translator = KeyTranslator::new();
        translator.remap([("a", "b"), ("a", "c")]);
        assert_eq!(translator.translate('a'), Some('c'));
        assert_eq!(translator.len(), 1);
    }

    #[test]
    fn test_remap_is_idempotent() {
        // Arrange
        let batch = [("a", "z"), ("x", "y"), ("bad", "q")];
        let mut once = KeyTranslator::new();
        once.remap(batch);

        // Act
        let mut twice = once.clone();
        twice.remap(batch);

        // Assert
        assert_eq!(once, twice);
    }

    #[test]
    fn test_remap_accepts_multibyte_single_chars() {
        let mut translator = KeyTranslator::new();
        translator.remap([("é", "€")]);
        assert_eq!(translator.translate('é'), Some('€'));
    }

    #[test]
    fn test_remap_accepts_owned_strings() {
        let mut translator = KeyTranslator::new();
        translator.remap(vec![("1".to_string(), "2".to_string())]);
        assert_eq!(translator.translate('1'), Some('2'));
    }

    #[test]
    fn test_persisted_round_trip_preserves_table() {
        // Arrange
        let mut translator = KeyTranslator::new();
        translator.remap([("a", "z"), ("q", "w"), ("ß", "s")]);

        // Act
        let persisted = translator.to_persisted();
        let restored = KeyTranslator::from_persisted(&persisted);

        // Assert
        assert_eq!(restored, translator);
        assert_eq!(persisted.get("a").map(String::as_str), Some("z"));
    }

    #[test]
    fn test_from_persisted_skips_invalid_entries() {
        // Arrange
        let mut persisted = BTreeMap::new();
        persisted.insert("a".to_string(), "b".to_string());
        persisted.insert("long".to_string(), "c".to_string());
        persisted.insert("d".to_string(), String::new());

        // Act
        let translator = KeyTranslator::from_persisted(&persisted);

        // Assert
        assert_eq!(translator.entries(), vec![('a', 'b')]);
    }

    #[test]
    fn test_entries_are_sorted_by_input() {
        let mut translator = KeyTranslator::new();
        translator.remap([("c", "1"), ("a", "2"), ("b", "3")]);
        assert_eq!(translator.entries(), vec![('a', '2'), ('b', '3'), ('c', '1')]);
    }
}
