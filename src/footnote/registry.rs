//! Per-page footnote numbering.
//!
//! Each identifier moves through a small state machine:
//!
//! ```text
//! (unregistered) ──register(deferred)──► Deferred
//!       │                                   │
//!       └──────register(normal)──────┬──────┘ register(normal)
//!                                    ▼
//!                       Assigned { number, was_deferred }
//! ```
//!
//! `Assigned` is terminal: any further registration returns the same number.
//! Numbers start at 1 and follow the order of normal registrations, so a
//! footnote declared early (e.g. in a page header) still gets the number of
//! its first appearance in the body.

use super::FootnoteError;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Number returned for a deferred footnote whose position is not known yet.
pub const PLACEHOLDER: u32 = 0;

/// Registration state of one identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FootnoteState {
    /// Declared ahead of the body; waiting for its first normal registration.
    Deferred,
    /// Numbered. `was_deferred` survives resolution for reporting.
    Assigned { number: u32, was_deferred: bool },
}

/// An identifier paired with its assigned number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FootnoteEntry {
    pub id: String,
    pub number: u32,
}

impl FootnoteEntry {
    fn new(id: &str, number: u32) -> Self {
        Self {
            id: id.to_owned(),
            number,
        }
    }
}

/// Assigns sequential numbers to footnote identifiers within one page.
///
/// Owned by the page orchestration and never shared between pages.
#[derive(Debug, Default)]
pub struct FootnoteRegistry {
    states: FxHashMap<String, FootnoteState>,
    /// Identifiers in assignment order.
    assigned: Vec<String>,
    /// Identifiers in the order they were first deferred.
    deferred: Vec<String>,
    counter: u32,
}

impl FootnoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a footnote reference and return its number.
    ///
    /// - Already numbered: returns the existing number, whatever `deferred` is.
    /// - `deferred == true`: withholds a number and returns [`PLACEHOLDER`].
    /// - Otherwise: assigns the next number, resolving a pending deferral.
    pub fn register(&mut self, id: &str, deferred: bool) -> u32 {
        let was_deferred = match self.states.get(id) {
            Some(FootnoteState::Assigned { number, .. }) => return *number,
            Some(FootnoteState::Deferred) if deferred => return PLACEHOLDER,
            Some(FootnoteState::Deferred) => true,
            None if deferred => {
                self.states.insert(id.to_owned(), FootnoteState::Deferred);
                self.deferred.push(id.to_owned());
                return PLACEHOLDER;
            }
            None => false,
        };

        self.counter += 1;
        let number = self.counter;
        self.states.insert(
            id.to_owned(),
            FootnoteState::Assigned {
                number,
                was_deferred,
            },
        );
        self.assigned.push(id.to_owned());
        number
    }

    /// Look up an assigned number without registering.
    pub fn get_number(&self, id: &str) -> Option<u32> {
        match self.states.get(id)? {
            FootnoteState::Assigned { number, .. } => Some(*number),
            FootnoteState::Deferred => None,
        }
    }

    /// All numbered footnotes, in assignment order.
    pub fn all_footnotes(&self) -> Vec<FootnoteEntry> {
        self.assigned
            .iter()
            .filter_map(|id| self.get_number(id).map(|n| FootnoteEntry::new(id, n)))
            .collect()
    }

    /// Footnotes that were declared deferred and have since been numbered.
    ///
    /// Still-pending deferrals are excluded.
    pub fn deferred_mappings(&self) -> Vec<FootnoteEntry> {
        self.assigned
            .iter()
            .filter_map(|id| match self.states.get(id) {
                Some(FootnoteState::Assigned {
                    number,
                    was_deferred: true,
                }) => Some(FootnoteEntry::new(id, *number)),
                _ => None,
            })
            .collect()
    }

    /// Identifiers still waiting for a number, in declaration order.
    pub fn deferred_footnotes(&self) -> Vec<String> {
        self.deferred
            .iter()
            .filter(|id| self.states.get(id.as_str()) == Some(&FootnoteState::Deferred))
            .cloned()
            .collect()
    }

    /// Fail if any deferred footnote was never referenced by the body.
    pub fn validate_no_deferred_footnotes(&self) -> Result<(), FootnoteError> {
        let pending = self.deferred_footnotes();
        if pending.is_empty() {
            Ok(())
        } else {
            Err(FootnoteError::DeferredNotResolved(pending.join(", ")))
        }
    }

    /// Clear every registration and restart numbering at 1.
    pub fn reset(&mut self) {
        self.states.clear();
        self.assigned.clear();
        self.deferred.clear();
        self.counter = 0;
    }

    /// Number of footnotes that have been assigned a number.
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, number: u32) -> FootnoteEntry {
        FootnoteEntry::new(id, number)
    }

    #[test]
    fn test_empty_registry() {
        let registry = FootnoteRegistry::new();
        assert!(registry.all_footnotes().is_empty());
        assert!(registry.deferred_footnotes().is_empty());
        assert!(registry.deferred_mappings().is_empty());
        assert!(registry.is_empty());
        assert!(registry.validate_no_deferred_footnotes().is_ok());
    }

    #[test]
    fn test_sequential_numbers() {
        let mut registry = FootnoteRegistry::new();
        let numbers: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| registry.register(id, false))
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_repeat_registration_is_idempotent() {
        let mut registry = FootnoteRegistry::new();
        assert_eq!(registry.register("a", false), 1);
        assert_eq!(registry.register("a", false), 1);
        // Counter did not move on the repeat
        assert_eq!(registry.register("b", false), 2);
        // Deferring an assigned id changes nothing
        assert_eq!(registry.register("a", true), 1);
        assert!(registry.deferred_footnotes().is_empty());
    }

    #[test]
    fn test_deferred_then_normal() {
        let mut registry = FootnoteRegistry::new();
        assert_eq!(registry.register("a", true), PLACEHOLDER);
        assert_eq!(registry.get_number("a"), None);

        let number = registry.register("a", false);
        assert!(number > 0);
        assert_eq!(registry.get_number("a"), Some(number));
    }

    #[test]
    fn test_deferred_does_not_advance_counter() {
        let mut registry = FootnoteRegistry::new();
        registry.register("x", true);
        registry.register("y", true);
        assert_eq!(registry.register("z", false), 1);
    }

    #[test]
    fn test_repeated_deferral_is_noop() {
        let mut registry = FootnoteRegistry::new();
        assert_eq!(registry.register("a", true), PLACEHOLDER);
        assert_eq!(registry.register("a", true), PLACEHOLDER);
        assert_eq!(registry.deferred_footnotes(), vec!["a".to_string()]);
    }

    #[test]
    fn test_deferred_scenario() {
        let mut registry = FootnoteRegistry::new();
        assert_eq!(registry.register("a", true), 0);
        assert_eq!(registry.register("b", false), 1);
        assert_eq!(registry.register("a", false), 2);
        assert_eq!(registry.get_number("a"), Some(2));
        assert_eq!(registry.deferred_mappings(), vec![entry("a", 2)]);
        assert_eq!(
            registry.all_footnotes(),
            vec![entry("b", 1), entry("a", 2)]
        );
    }

    #[test]
    fn test_deferred_footnotes_tracks_pending_only() {
        let mut registry = FootnoteRegistry::new();
        registry.register("p", true);
        registry.register("q", true);
        registry.register("r", true);
        registry.register("q", false);

        assert_eq!(
            registry.deferred_footnotes(),
            vec!["p".to_string(), "r".to_string()]
        );
        assert_eq!(registry.deferred_mappings(), vec![entry("q", 1)]);
    }

    #[test]
    fn test_validate_fails_iff_pending() {
        let mut registry = FootnoteRegistry::new();
        registry.register("x", true);
        registry.register("y", true);
        registry.register("x", false);

        let err = registry.validate_no_deferred_footnotes().unwrap_err();
        assert_eq!(err, FootnoteError::DeferredNotResolved("y".into()));
        assert!(format!("{err}").contains('y'));

        registry.register("y", false);
        assert!(registry.validate_no_deferred_footnotes().is_ok());
    }

    #[test]
    fn test_validate_joins_pending_ids() {
        let mut registry = FootnoteRegistry::new();
        registry.register("first", true);
        registry.register("second", true);

        let err = registry.validate_no_deferred_footnotes().unwrap_err();
        assert_eq!(
            err,
            FootnoteError::DeferredNotResolved("first, second".into())
        );
    }

    #[test]
    fn test_reset() {
        let mut registry = FootnoteRegistry::new();
        registry.register("a", false);
        registry.register("b", true);
        registry.reset();

        assert!(registry.all_footnotes().is_empty());
        assert!(registry.deferred_footnotes().is_empty());
        assert_eq!(registry.get_number("a"), None);
        assert_eq!(registry.register("c", false), 1);
    }

    #[test]
    fn test_ids_are_exact_strings() {
        let mut registry = FootnoteRegistry::new();
        assert_eq!(registry.register("Note", false), 1);
        assert_eq!(registry.register("note", false), 2);
        assert_eq!(registry.register("note ", false), 3);
    }
}
