//! Simulated document backend.
//!
//! The CLI has no live browser document to mutate, so the default backend
//! records what the engine would have done: `SimNode`s log property writes and
//! dispatched events and count side effects. The same types double as the
//! hermetic collaborators the engine tests run against. Elements can be
//! detached to exercise resolution failures.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use tracing::debug;

use crate::config::models::{ElementDef, Wordlist};
use crate::engine::{
    EngineError, EventFactory, EventObject, NodeHandle, NodeResolver, PropValue, WordlistStore,
};

use super::events::family_for_event;

/// In-memory word-list store built from config models.
#[derive(Default)]
pub struct MemoryWordlists {
    lists: HashMap<String, Vec<String>>,
}

impl MemoryWordlists {
    pub fn new(wordlists: &[Wordlist]) -> Self {
        Self {
            lists: wordlists
                .iter()
                .map(|wl| (wl.name.clone(), wl.entries()))
                .collect(),
        }
    }

    /// Insert or replace a list directly (handy for tests and embedding).
    pub fn insert(&mut self, name: impl Into<String>, entries: Vec<String>) {
        self.lists.insert(name.into(), entries);
    }
}

impl WordlistStore for MemoryWordlists {
    fn entries(&self, name: &str) -> Result<Vec<String>, EngineError> {
        self.lists
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownWordlist(name.to_owned()))
    }
}

/// A simulated document: resolves element references against the registry and
/// hands out recording nodes.
pub struct SimDocument {
    nodes: HashMap<String, Arc<SimNode>>,
    detached: Mutex<HashSet<String>>,
    effects: Arc<AtomicUsize>,
}

impl SimDocument {
    pub fn new(elements: &[ElementDef]) -> Self {
        let effects = Arc::new(AtomicUsize::new(0));
        let nodes = elements
            .iter()
            .map(|e| {
                (
                    e.id.clone(),
                    Arc::new(SimNode {
                        name: e.name.clone(),
                        xpath: e.xpath.clone(),
                        effects: effects.clone(),
                        poisoned: AtomicBool::new(false),
                        writes: Mutex::new(Vec::new()),
                        dispatched: Mutex::new(Vec::new()),
                    }),
                )
            })
            .collect();

        Self {
            nodes,
            detached: Mutex::new(HashSet::new()),
            effects,
        }
    }

    /// Total property writes + dispatches across all nodes.
    pub fn side_effect_count(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Direct access to a node for inspection.
    pub fn node(&self, element_id: &str) -> Option<Arc<SimNode>> {
        self.nodes.get(element_id).cloned()
    }

    /// Simulate the element's node disappearing from the document: it stays
    /// registered but no longer resolves.
    pub fn detach(&self, element_id: &str) {
        if let Ok(mut detached) = self.detached.lock() {
            detached.insert(element_id.to_owned());
        }
    }

    /// Make every future side effect on the element's node fail.
    pub fn poison(&self, element_id: &str) {
        if let Some(node) = self.nodes.get(element_id) {
            node.poisoned.store(true, Ordering::SeqCst);
        }
    }
}

impl NodeResolver for SimDocument {
    fn resolve(&self, element_ref: &str) -> Result<Arc<dyn NodeHandle>, EngineError> {
        let node = self
            .nodes
            .get(element_ref)
            .ok_or_else(|| EngineError::UnresolvableElement(element_ref.to_owned()))?;

        let gone = self
            .detached
            .lock()
            .map(|d| d.contains(element_ref))
            .unwrap_or(false);
        if gone {
            return Err(EngineError::UnresolvableElement(element_ref.to_owned()));
        }

        Ok(node.clone())
    }
}

/// A recording stand-in for a live document node.
pub struct SimNode {
    name: String,
    xpath: String,
    effects: Arc<AtomicUsize>,
    poisoned: AtomicBool,
    writes: Mutex<Vec<(String, PropValue)>>,
    dispatched: Mutex<Vec<String>>,
}

impl SimNode {
    /// Every property write in arrival order.
    pub fn writes(&self) -> Vec<(String, PropValue)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Last value written to the named property.
    pub fn property(&self, name: &str) -> Option<PropValue> {
        self.writes
            .lock()
            .ok()?
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    /// Event types dispatched on this node, in arrival order.
    pub fn dispatched(&self) -> Vec<String> {
        self.dispatched
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

impl NodeHandle for SimNode {
    fn set_property(&self, name: &str, value: PropValue) -> anyhow::Result<()> {
        if self.poisoned.load(Ordering::SeqCst) {
            bail!("node '{}' rejected property write", self.name);
        }

        self.effects.fetch_add(1, Ordering::SeqCst);
        debug!(
            target: "domfuzz::dom",
            node = %self.name,
            xpath = %self.xpath,
            property = name,
            value = %value,
            "set property"
        );
        if let Ok(mut writes) = self.writes.lock() {
            writes.push((name.to_owned(), value));
        }
        Ok(())
    }

    fn dispatch(&self, event: &dyn EventObject) -> anyhow::Result<()> {
        if self.poisoned.load(Ordering::SeqCst) {
            bail!("node '{}' rejected event dispatch", self.name);
        }

        self.effects.fetch_add(1, Ordering::SeqCst);
        debug!(
            target: "domfuzz::dom",
            node = %self.name,
            xpath = %self.xpath,
            event = event.event_type(),
            "dispatch event"
        );
        if let Ok(mut dispatched) = self.dispatched.lock() {
            dispatched.push(event.event_type().to_owned());
        }
        Ok(())
    }
}

/// Event factory backed by the constructor-family table.
pub struct FamilyEventFactory;

impl EventFactory for FamilyEventFactory {
    fn create(
        &self,
        event_type: &str,
        props: BTreeMap<String, PropValue>,
    ) -> Result<Arc<dyn EventObject>, EngineError> {
        let family = family_for_event(event_type)
            .ok_or_else(|| EngineError::UnknownEventType(event_type.to_owned()))?;

        Ok(Arc::new(SimEvent {
            family,
            event_type: event_type.to_owned(),
            props,
        }))
    }
}

/// An event as the simulated backend constructs it.
#[derive(Debug)]
pub struct SimEvent {
    family: &'static str,
    event_type: String,
    props: BTreeMap<String, PropValue>,
}

impl SimEvent {
    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn props(&self) -> &BTreeMap<String, PropValue> {
        &self.props
    }
}

impl EventObject for SimEvent {
    fn event_type(&self) -> &str {
        &self.event_type
    }
}
