//! The fixed catalog of example task definitions.
//!
//! Single submissions walk the catalog cyclically; the chain trigger uses
//! the middle three entries and the all/race triggers use every entry.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::TaskDefinition;

/// Names of the built-in example tasks, in catalog order (ids start at 1).
pub const EXAMPLE_TASK_NAMES: [&str; 5] = [
    "Ordering a Pizza",
    "Booking a Flight",
    "Downloading a File",
    "Sending an Email",
    "Getting a Loan Approval",
];

/// An ordered, non-empty list of task definitions with a cyclic cursor.
#[derive(Debug)]
pub struct Catalog {
    definitions: Vec<TaskDefinition>,
    cursor: AtomicUsize,
}

impl Catalog {
    /// Builds a catalog from explicit definitions.
    ///
    /// Returns `None` for an empty list, since a cyclic cursor over nothing
    /// has no next entry.
    pub fn new(definitions: Vec<TaskDefinition>) -> Option<Self> {
        if definitions.is_empty() {
            return None;
        }
        Some(Self {
            definitions,
            cursor: AtomicUsize::new(0),
        })
    }

    /// The built-in five-entry example catalog.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_sim::Catalog;
    ///
    /// let catalog = Catalog::examples();
    /// assert_eq!(catalog.len(), 5);
    /// assert_eq!(catalog.next_definition().name, "Ordering a Pizza");
    /// assert_eq!(catalog.next_definition().name, "Booking a Flight");
    /// ```
    pub fn examples() -> Self {
        let definitions = EXAMPLE_TASK_NAMES
            .iter()
            .zip(1u32..)
            .map(|(name, id)| TaskDefinition::new(id, *name))
            .collect();
        Self {
            definitions,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Returns the next definition, wrapping around at the end.
    pub fn next_definition(&self) -> TaskDefinition {
        let n = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.definitions[n % self.definitions.len()].clone()
    }

    /// The three definitions used by the chain trigger: catalog positions
    /// 1, 2 and 3 (zero-based), wrapping for catalogs shorter than four.
    pub fn chain_selection(&self) -> Vec<TaskDefinition> {
        (1..=3)
            .map(|i| self.definitions[i % self.definitions.len()].clone())
            .collect()
    }

    /// Every definition, in catalog order.
    pub fn all(&self) -> Vec<TaskDefinition> {
        self.definitions.clone()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Always `false`; catalogs are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::examples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "Ordering a Pizza")]
    #[case(4, "Getting a Loan Approval")]
    #[case(5, "Ordering a Pizza")]
    #[case(7, "Downloading a File")]
    fn cursor_cycles_through_catalog(#[case] skip: usize, #[case] expected: &str) {
        let catalog = Catalog::examples();
        for _ in 0..skip {
            catalog.next_definition();
        }
        assert_eq!(catalog.next_definition().name, expected);
    }

    #[test]
    fn example_ids_start_at_one() {
        let ids: Vec<u32> = Catalog::examples().all().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn chain_selection_uses_middle_entries() {
        let names: Vec<String> = Catalog::examples()
            .chain_selection()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec!["Booking a Flight", "Downloading a File", "Sending an Email"]
        );
    }

    #[test]
    fn chain_selection_wraps_on_short_catalog() {
        let catalog = Catalog::new(vec![
            TaskDefinition::new(1, "a"),
            TaskDefinition::new(2, "b"),
        ])
        .unwrap();
        let ids: Vec<u32> = catalog.chain_selection().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 1, 2]);
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(Catalog::new(Vec::new()).is_none());
    }
}
