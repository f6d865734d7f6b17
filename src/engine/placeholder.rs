//! Placeholder resolution.
//!
//! Scans an action's step templates for `{name}` tokens and assigns each
//! occurrence a slot. The counter is shared across the whole action and every
//! occurrence consumes the next value, so two `{colors}` tokens are two
//! distinct slots each drawing independently from the same word-list. Callers
//! that want shared substitution across occurrences must alias manually.

use crate::config::models::{ModifiedProperty, PropertyDef, Step};
use crate::utils::templates::rewrite_tokens;

use super::{EngineError, WordlistStore};

/// A placeholder occurrence: its stable index and the word-list feeding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSlot {
    /// Dense index, assigned in first-occurrence order starting at 0.
    pub index: usize,
    /// Name of the word-list the slot draws from.
    pub wordlist: String,
}

/// An engine-facing step: templates rewritten to `{N}` index markers and the
/// draft case gone. This is the only step type the compiler accepts.
#[derive(Debug, Clone)]
pub enum EngineStep {
    Delay {
        amount_ms: u64,
    },
    ChangeProperty {
        element: String,
        property: PropertyDef,
        template: String,
    },
    DispatchEvent {
        element: String,
        event: String,
        properties: Vec<ModifiedProperty>,
    },
}

/// The resolver's output: rewritten steps plus the slot table.
#[derive(Debug, Clone)]
pub struct ResolvedAction {
    pub steps: Vec<EngineStep>,
    pub slots: Vec<PlaceholderSlot>,
}

impl ResolvedAction {
    /// Number of values every combination must carry.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

/// Resolve every placeholder occurrence across `steps`.
///
/// Each `{name}` match allocates the next slot and is rewritten to `{N}`.
/// Referencing an unknown word-list fails the whole resolution with
/// `UnknownWordlist` before any task is compiled; a draft step fails it with
/// `DraftStep`.
pub fn resolve_placeholders(
    steps: &[Step],
    store: &dyn WordlistStore,
) -> Result<ResolvedAction, EngineError> {
    let mut slots: Vec<PlaceholderSlot> = Vec::new();
    let mut out = Vec::with_capacity(steps.len());

    for step in steps {
        let rewritten = match step {
            Step::Delay { amount_ms } => EngineStep::Delay {
                amount_ms: *amount_ms,
            },

            Step::ChangeProperty {
                element,
                property,
                value,
            } => EngineStep::ChangeProperty {
                element: element.clone(),
                property: property.clone(),
                template: assign_slots(value, store, &mut slots)?,
            },

            Step::DispatchEvent {
                element,
                event,
                properties,
            } => EngineStep::DispatchEvent {
                element: element.clone(),
                event: event.clone(),
                properties: properties
                    .iter()
                    .map(|p| {
                        Ok(ModifiedProperty {
                            name: p.name.clone(),
                            kind: p.kind,
                            value: assign_slots(&p.value, store, &mut slots)?,
                        })
                    })
                    .collect::<Result<Vec<_>, EngineError>>()?,
            },

            Step::None => return Err(EngineError::DraftStep),
        };

        out.push(rewritten);
    }

    Ok(ResolvedAction { steps: out, slots })
}

/// Rewrite one template, allocating a slot per token occurrence.
fn assign_slots(
    template: &str,
    store: &dyn WordlistStore,
    slots: &mut Vec<PlaceholderSlot>,
) -> Result<String, EngineError> {
    rewrite_tokens(template, |name| {
        // Validates the name; the generator fetches entries again later.
        store.entries(name)?;

        let index = slots.len();
        slots.push(PlaceholderSlot {
            index,
            wordlist: name.to_owned(),
        });
        Ok(format!("{{{index}}}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::ValueKind;
    use std::collections::HashMap;

    struct FakeStore(HashMap<String, Vec<String>>);

    impl FakeStore {
        fn with(names: &[&str]) -> Self {
            Self(
                names
                    .iter()
                    .map(|n| ((*n).to_owned(), vec!["x".to_owned()]))
                    .collect(),
            )
        }
    }

    impl WordlistStore for FakeStore {
        fn entries(&self, name: &str) -> Result<Vec<String>, EngineError> {
            self.0
                .get(name)
                .cloned()
                .ok_or_else(|| EngineError::UnknownWordlist(name.to_owned()))
        }
    }

    fn change_property(value: &str) -> Step {
        Step::ChangeProperty {
            element: "e1".into(),
            property: PropertyDef {
                name: "value".into(),
                kind: ValueKind::String,
            },
            value: value.into(),
        }
    }

    #[test]
    fn assigns_one_slot_per_occurrence() {
        let store = FakeStore::with(&["colors"]);
        let steps = vec![
            change_property("{colors} vs {colors}"),
            change_property("{colors}"),
        ];

        let resolved = resolve_placeholders(&steps, &store).unwrap();
        assert_eq!(resolved.slot_count(), 3);
        assert!(resolved.slots.iter().all(|s| s.wordlist == "colors"));
        assert_eq!(
            resolved.slots.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        match &resolved.steps[0] {
            EngineStep::ChangeProperty { template, .. } => assert_eq!(template, "{0} vs {1}"),
            other => panic!("unexpected step: {other:?}"),
        }
        match &resolved.steps[1] {
            EngineStep::ChangeProperty { template, .. } => assert_eq!(template, "{2}"),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn counter_spans_dispatch_event_properties() {
        let store = FakeStore::with(&["colors", "keys"]);
        let steps = vec![
            change_property("{colors}"),
            Step::DispatchEvent {
                element: "e1".into(),
                event: "keydown".into(),
                properties: vec![ModifiedProperty {
                    name: "key".into(),
                    kind: ValueKind::String,
                    value: "{keys}".into(),
                }],
            },
        ];

        let resolved = resolve_placeholders(&steps, &store).unwrap();
        assert_eq!(resolved.slot_count(), 2);
        assert_eq!(resolved.slots[1].wordlist, "keys");

        match &resolved.steps[1] {
            EngineStep::DispatchEvent { properties, .. } => {
                assert_eq!(properties[0].value, "{1}");
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn unknown_wordlist_fails_whole_resolution() {
        let store = FakeStore::with(&["colors"]);
        let steps = vec![change_property("{colors} {missing}")];

        match resolve_placeholders(&steps, &store) {
            Err(EngineError::UnknownWordlist(name)) => assert_eq!(name, "missing"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn draft_step_is_rejected() {
        let store = FakeStore::with(&[]);
        let steps = vec![Step::None];
        assert!(matches!(
            resolve_placeholders(&steps, &store),
            Err(EngineError::DraftStep)
        ));
    }

    #[test]
    fn plain_templates_allocate_nothing() {
        let store = FakeStore::with(&[]);
        let steps = vec![change_property("literal"), Step::Delay { amount_ms: 5 }];
        let resolved = resolve_placeholders(&steps, &store).unwrap();
        assert_eq!(resolved.slot_count(), 0);
    }
}
