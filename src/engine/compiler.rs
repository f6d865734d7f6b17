//! Task compilation.
//!
//! For one (step, combination) pair the compiler substitutes slot values into
//! the rewritten templates, parses them according to the declared property
//! types, resolves element references, and constructs event objects. All of
//! that happens here, at compile time: a run fails fast before any task has a
//! side effect. What remains in a `CompiledTask` is pure execution.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::config::models::ValueKind;
use crate::utils::templates::rewrite_tokens;

use super::placeholder::EngineStep;
use super::{Combination, EngineError, EventFactory, EventObject, NodeHandle, NodeResolver, PropValue};

/// Shared observation state for one run: the last combination whose side
/// effect started, for post-hoc correlation with whatever the document did.
pub struct RunObserver {
    last: Arc<Mutex<Option<Arc<Combination>>>>,
    log_combinations: bool,
}

impl RunObserver {
    pub fn new(last: Arc<Mutex<Option<Arc<Combination>>>>, log_combinations: bool) -> Self {
        Self {
            last,
            log_combinations,
        }
    }

    fn record(&self, combination: &Arc<Combination>) {
        if self.log_combinations {
            debug!(
                target: "domfuzz::engine",
                combination = ?combination.as_slice(),
                "side effect"
            );
        }
        if let Ok(mut slot) = self.last.lock() {
            *slot = Some(combination.clone());
        }
    }
}

/// A zero-argument asynchronous unit of work, tagged with its owning
/// combination.
#[derive(Clone)]
pub struct CompiledTask {
    combination: Arc<Combination>,
    observer: Arc<RunObserver>,
    kind: TaskKind,
}

#[derive(Clone)]
enum TaskKind {
    Delay(Duration),
    SetProperty {
        node: Arc<dyn NodeHandle>,
        property: String,
        value: PropValue,
    },
    DispatchEvent {
        node: Arc<dyn NodeHandle>,
        event: Arc<dyn EventObject>,
    },
}

impl CompiledTask {
    /// The combination this task was compiled for.
    pub fn combination(&self) -> &Combination {
        &self.combination
    }

    /// Execute the task. Side-effect tasks record their combination into the
    /// observer first; delays do not.
    pub async fn run(self) -> Result<(), EngineError> {
        let CompiledTask {
            combination,
            observer,
            kind,
        } = self;

        match kind {
            TaskKind::Delay(duration) => {
                sleep(duration).await;
                Ok(())
            }
            TaskKind::SetProperty {
                node,
                property,
                value,
            } => {
                observer.record(&combination);
                node.set_property(&property, value)
                    .map_err(EngineError::Task)
            }
            TaskKind::DispatchEvent { node, event } => {
                observer.record(&combination);
                node.dispatch(event.as_ref()).map_err(EngineError::Task)
            }
        }
    }
}

/// Compile every step of an action for one combination, in step order.
pub fn compile_action(
    steps: &[EngineStep],
    combination: &Arc<Combination>,
    resolver: &dyn NodeResolver,
    events: &dyn EventFactory,
    observer: &Arc<RunObserver>,
) -> Result<Vec<CompiledTask>, EngineError> {
    steps
        .iter()
        .map(|step| {
            let kind = match step {
                EngineStep::Delay { amount_ms } => {
                    TaskKind::Delay(Duration::from_millis(*amount_ms))
                }

                EngineStep::ChangeProperty {
                    element,
                    property,
                    template,
                } => {
                    let substituted = substitute_markers(template, combination)?;
                    let node = resolver.resolve(element)?;
                    let value = parse_value(property.kind, &substituted)?;
                    TaskKind::SetProperty {
                        node,
                        property: property.name.clone(),
                        value,
                    }
                }

                EngineStep::DispatchEvent {
                    element,
                    event,
                    properties,
                } => {
                    let mut props = BTreeMap::new();
                    for p in properties {
                        let substituted = substitute_markers(&p.value, combination)?;
                        props.insert(p.name.clone(), parse_value(p.kind, &substituted)?);
                    }
                    let node = resolver.resolve(element)?;
                    let event = events.create(event, props)?;
                    TaskKind::DispatchEvent { node, event }
                }
            };

            Ok(CompiledTask {
                combination: combination.clone(),
                observer: observer.clone(),
                kind,
            })
        })
        .collect()
}

/// Replace every `{N}` marker with the Nth value of the combination.
fn substitute_markers(
    template: &str,
    combination: &Combination,
) -> Result<String, EngineError> {
    rewrite_tokens(template, |marker| {
        let index: usize = marker
            .parse()
            .map_err(|_| EngineError::BadMarker(marker.to_owned()))?;
        combination
            .get(index)
            .cloned()
            .ok_or_else(|| EngineError::BadMarker(marker.to_owned()))
    })
}

/// Parse a substituted string according to the declared value type.
pub(crate) fn parse_value(kind: ValueKind, raw: &str) -> Result<PropValue, EngineError> {
    match kind {
        ValueKind::String => Ok(PropValue::Str(raw.to_owned())),
        ValueKind::Number => parse_integer_prefix(raw)
            .map(PropValue::Num)
            .ok_or_else(|| EngineError::InvalidNumber(raw.to_owned())),
        ValueKind::Boolean => Ok(PropValue::Bool(raw == "1")),
    }
}

/// Integer-prefix parse: leading whitespace skipped, optional sign, then the
/// longest run of digits ("12px" -> 12). None if no digits are present.
fn parse_integer_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (sign, digits) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => (1, s),
    };

    let len = digits.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return None;
    }
    digits[..len].parse::<i64>().ok().map(|n| sign * n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::{ModifiedProperty, PropertyDef};

    struct RecordingNode {
        writes: Mutex<Vec<(String, PropValue)>>,
        dispatched: Mutex<Vec<String>>,
    }

    impl RecordingNode {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                writes: Mutex::new(Vec::new()),
                dispatched: Mutex::new(Vec::new()),
            })
        }
    }

    impl NodeHandle for RecordingNode {
        fn set_property(&self, name: &str, value: PropValue) -> anyhow::Result<()> {
            self.writes.lock().unwrap().push((name.to_owned(), value));
            Ok(())
        }

        fn dispatch(&self, event: &dyn EventObject) -> anyhow::Result<()> {
            self.dispatched
                .lock()
                .unwrap()
                .push(event.event_type().to_owned());
            Ok(())
        }
    }

    struct SingleNodeResolver {
        id: String,
        node: Arc<RecordingNode>,
    }

    impl NodeResolver for SingleNodeResolver {
        fn resolve(&self, element_ref: &str) -> Result<Arc<dyn NodeHandle>, EngineError> {
            if element_ref == self.id {
                Ok(self.node.clone())
            } else {
                Err(EngineError::UnresolvableElement(element_ref.to_owned()))
            }
        }
    }

    #[derive(Debug)]
    struct FakeEvent {
        event_type: String,
        props: BTreeMap<String, PropValue>,
    }

    impl EventObject for FakeEvent {
        fn event_type(&self) -> &str {
            &self.event_type
        }
    }

    struct ClickOnlyFactory;

    impl EventFactory for ClickOnlyFactory {
        fn create(
            &self,
            event_type: &str,
            props: BTreeMap<String, PropValue>,
        ) -> Result<Arc<dyn EventObject>, EngineError> {
            if event_type == "click" {
                Ok(Arc::new(FakeEvent {
                    event_type: event_type.to_owned(),
                    props,
                }))
            } else {
                Err(EngineError::UnknownEventType(event_type.to_owned()))
            }
        }
    }

    fn observer() -> (Arc<RunObserver>, Arc<Mutex<Option<Arc<Combination>>>>) {
        let last = Arc::new(Mutex::new(None));
        (Arc::new(RunObserver::new(last.clone(), false)), last)
    }

    fn string_prop(name: &str) -> PropertyDef {
        PropertyDef {
            name: name.into(),
            kind: ValueKind::String,
        }
    }

    #[test]
    fn substitutes_markers_positionally() {
        let comb: Combination = vec!["red".into(), "S".into()];
        assert_eq!(substitute_markers("{0}-{1}-{0}", &comb).unwrap(), "red-S-red");
    }

    #[test]
    fn bad_marker_is_rejected() {
        let comb: Combination = vec!["red".into()];
        assert!(matches!(
            substitute_markers("{9}", &comb),
            Err(EngineError::BadMarker(_))
        ));
        assert!(matches!(
            substitute_markers("{nope}", &comb),
            Err(EngineError::BadMarker(_))
        ));
    }

    #[test]
    fn parses_declared_types() {
        assert_eq!(
            parse_value(ValueKind::String, "12px").unwrap(),
            PropValue::Str("12px".into())
        );
        assert_eq!(
            parse_value(ValueKind::Number, "12px").unwrap(),
            PropValue::Num(12)
        );
        assert_eq!(
            parse_value(ValueKind::Number, "  -7").unwrap(),
            PropValue::Num(-7)
        );
        assert!(matches!(
            parse_value(ValueKind::Number, "px"),
            Err(EngineError::InvalidNumber(_))
        ));
        assert_eq!(
            parse_value(ValueKind::Boolean, "1").unwrap(),
            PropValue::Bool(true)
        );
        assert_eq!(
            parse_value(ValueKind::Boolean, "true").unwrap(),
            PropValue::Bool(false)
        );
    }

    #[tokio::test]
    async fn change_property_task_writes_substituted_value() {
        let node = RecordingNode::new();
        let resolver = SingleNodeResolver {
            id: "e1".into(),
            node: node.clone(),
        };
        let (obs, last) = observer();
        let comb = Arc::new(vec!["red".to_owned()]);

        let steps = vec![EngineStep::ChangeProperty {
            element: "e1".into(),
            property: string_prop("value"),
            template: "{0}".into(),
        }];

        let tasks = compile_action(&steps, &comb, &resolver, &ClickOnlyFactory, &obs).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].combination(), &vec!["red".to_owned()]);

        for task in tasks {
            task.run().await.unwrap();
        }

        assert_eq!(
            node.writes.lock().unwrap().as_slice(),
            &[("value".to_owned(), PropValue::Str("red".into()))]
        );
        assert_eq!(
            last.lock().unwrap().as_deref(),
            Some(&vec!["red".to_owned()])
        );
    }

    #[tokio::test]
    async fn dispatch_event_task_builds_event_at_compile_time() {
        let node = RecordingNode::new();
        let resolver = SingleNodeResolver {
            id: "e1".into(),
            node: node.clone(),
        };
        let (obs, _last) = observer();
        let comb = Arc::new(Combination::new());

        let steps = vec![EngineStep::DispatchEvent {
            element: "e1".into(),
            event: "click".into(),
            properties: vec![ModifiedProperty {
                name: "detail".into(),
                kind: ValueKind::Number,
                value: "2".into(),
            }],
        }];

        let tasks = compile_action(&steps, &comb, &resolver, &ClickOnlyFactory, &obs).unwrap();
        for task in tasks {
            task.run().await.unwrap();
        }
        assert_eq!(node.dispatched.lock().unwrap().as_slice(), &["click"]);
    }

    #[test]
    fn unresolvable_element_fails_compilation() {
        let node = RecordingNode::new();
        let resolver = SingleNodeResolver {
            id: "e1".into(),
            node,
        };
        let (obs, _) = observer();
        let comb = Arc::new(Combination::new());

        let steps = vec![EngineStep::ChangeProperty {
            element: "gone".into(),
            property: string_prop("value"),
            template: "x".into(),
        }];

        assert!(matches!(
            compile_action(&steps, &comb, &resolver, &ClickOnlyFactory, &obs),
            Err(EngineError::UnresolvableElement(_))
        ));
    }

    #[test]
    fn unknown_event_type_fails_compilation() {
        let node = RecordingNode::new();
        let resolver = SingleNodeResolver {
            id: "e1".into(),
            node,
        };
        let (obs, _) = observer();
        let comb = Arc::new(Combination::new());

        let steps = vec![EngineStep::DispatchEvent {
            element: "e1".into(),
            event: "made-up".into(),
            properties: vec![],
        }];

        assert!(matches!(
            compile_action(&steps, &comb, &resolver, &ClickOnlyFactory, &obs),
            Err(EngineError::UnknownEventType(_))
        ));
    }

    #[tokio::test]
    async fn delay_task_does_not_record_a_combination() {
        let (obs, last) = observer();
        let comb = Arc::new(vec!["red".to_owned()]);
        let steps = vec![EngineStep::Delay { amount_ms: 1 }];

        let node = RecordingNode::new();
        let resolver = SingleNodeResolver {
            id: "e1".into(),
            node,
        };
        let tasks = compile_action(&steps, &comb, &resolver, &ClickOnlyFactory, &obs).unwrap();
        for task in tasks {
            task.run().await.unwrap();
        }
        assert!(last.lock().unwrap().is_none());
    }
}
