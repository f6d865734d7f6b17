//! Combination expansion.
//!
//! Computes the cartesian product of the slots' word-list entries in
//! slot-index order: the last slot varies fastest. With zero slots the result
//! is exactly one empty combination, so an action without placeholders still
//! runs once.

use super::placeholder::PlaceholderSlot;
use super::{Combination, EngineError, WordlistStore};

/// Expand the slot table into every combination of entry values.
///
/// Entries are taken ordered, duplicates and empty lines preserved. A slot
/// whose word-list has zero entries zeroes the whole product.
pub fn expand_combinations(
    slots: &[PlaceholderSlot],
    store: &dyn WordlistStore,
) -> Result<Vec<Combination>, EngineError> {
    let mut combinations: Vec<Combination> = vec![Combination::new()];

    for slot in slots {
        let entries = store.entries(&slot.wordlist)?;
        let mut next = Vec::with_capacity(combinations.len() * entries.len());
        for prefix in &combinations {
            for entry in &entries {
                let mut combination = prefix.clone();
                combination.push(entry.clone());
                next.push(combination);
            }
        }
        combinations = next;
    }

    Ok(combinations)
}
