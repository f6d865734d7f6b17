use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;

/// Root configuration for Domfuzz.
///
/// This structure is intended to be deserialized from a JSON configuration file.
/// It captures all the building blocks the engine needs:
/// - control request `sources` (stdin, tcp, file)
/// - the `elements` registry (named references into the target document)
/// - `wordlists` feeding placeholder expansion
/// - recorded `actions` (step sequences with repetition/concurrency settings)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate, Default)]
pub struct Config {
    /// Control request input sources (file, tcp, stdin).
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Element registry: abstract references resolvable to live document nodes.
    #[serde(default)]
    #[validate]
    pub elements: Vec<ElementDef>,

    /// Word-lists available to `{name}` placeholders in step templates.
    #[serde(default)]
    #[validate]
    pub wordlists: Vec<Wordlist>,

    /// Recorded actions, runnable by id or name.
    #[serde(default)]
    #[validate]
    pub actions: Vec<Action>,
}

impl Config {
    /// Look up an action by id, falling back to its name.
    pub fn action(&self, key: &str) -> Option<&Action> {
        self.actions
            .iter()
            .find(|a| a.id == key)
            .or_else(|| self.actions.iter().find(|a| a.name == key))
    }

    /// Look up an element definition by id.
    pub fn element(&self, id: &str) -> Option<&ElementDef> {
        self.elements.iter().find(|e| e.id == id)
    }
}

/// Control request source configuration.
/// Use `type` to select a variant:
/// - "file": poll a single file for JSON control requests
/// - "tcp": listen on a TCP socket for newline-delimited JSON requests
/// - "stdin": read newline-delimited JSON from standard input
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Poll a single file for JSON control requests.
    File {
        /// Absolute or relative path to the file.
        path: String,
        /// Poll interval in milliseconds (default: 100).
        #[serde(default)]
        poll_ms: Option<u64>,
        /// Delete the file after a successful read/parse (default: false).
        #[serde(default)]
        delete_on_success: Option<bool>,
    },

    /// Listen on a TCP address (e.g., "127.0.0.1:5000") for control requests.
    Tcp {
        /// Bind address and port.
        bind: String,
        /// Whether to send an ACK ("OK"/"ERROR") after processing (default: true).
        #[serde(default)]
        ack: Option<bool>,
    },

    /// Read control requests from standard input (newline-delimited).
    Stdin,
}

/// A property exposed by a document node, with its declared value type.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PropertyDef {
    /// Property name as it appears on the node (e.g., "value", "checked").
    pub name: String,
    /// Declared value type; substituted strings are parsed according to it.
    #[serde(rename = "type")]
    pub kind: ValueKind,
}

/// Value types a node property can carry.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Passed through as-is after substitution.
    String,
    /// Parsed with integer-prefix semantics ("12px" -> 12).
    Number,
    /// `"1"` parses to true, anything else to false.
    Boolean,
}

/// An element registered for automation: a stable id plus the xpath used to
/// resolve it to a live node, and the properties it is known to expose.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ElementDef {
    /// Stable reference id used by steps.
    #[validate(min_length = 1)]
    pub id: String,

    /// Human-readable name (e.g., "new input").
    #[validate(min_length = 1)]
    pub name: String,

    /// XPath locating the element in the target document.
    #[validate(min_length = 1)]
    pub xpath: String,

    /// Properties the element exposes, with their declared types.
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

/// A named word-list. `content` holds one entry per line; interior empty
/// lines and duplicates are preserved when entries are read, unless the
/// normalization options below say otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct Wordlist {
    /// Stable id.
    #[validate(min_length = 1)]
    pub id: String,

    /// Name referenced by `{name}` placeholders. Must be unique.
    #[validate(min_length = 1)]
    pub name: String,

    /// Newline-separated entries.
    pub content: String,

    /// Drop lines starting with this prefix (e.g., "#" for comments).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_prefix: Option<String>,

    /// Remove duplicate lines, keeping the first occurrence.
    #[serde(default)]
    pub dedup: bool,
}

impl Wordlist {
    /// Ordered entries after normalization. With the default options this is
    /// the trimmed content split on newlines, duplicates and interior empty
    /// lines preserved.
    pub fn entries(&self) -> Vec<String> {
        let content = super::loader::normalize_wordlist_content(
            &self.content,
            self.ignore_prefix.as_deref(),
            self.dedup,
        );
        content.split('\n').map(str::to_owned).collect()
    }
}

/// A recorded action: an ordered step sequence plus repetition settings.
///
/// The engine receives an immutable snapshot of this at run start and never
/// mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct Action {
    /// Stable id.
    #[validate(min_length = 1)]
    pub id: String,

    /// Human-readable name.
    #[validate(min_length = 1)]
    pub name: String,

    /// Ordered steps executed for every combination.
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Number of repetitions of the full task set. 0 means run once.
    #[serde(default)]
    pub repeat: u32,

    /// Interval between repetitions in milliseconds. Authoring metadata:
    /// validated (must be >= 1 when `repeat` > 0) but not consumed by the
    /// scheduler.
    #[serde(default)]
    pub repeat_interval_ms: u64,

    /// Concurrency limit for the batch scheduler. Floored to 1 at run time.
    #[serde(default)]
    pub repeat_concurrency: u32,
}

/// A single recorded step.
///
/// The `none` case is a draft placeholder from the authoring flow; it must
/// never reach the engine. Loading a config containing one fails validation,
/// and the engine-facing step type has no such variant.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Suspend for a fixed duration.
    Delay {
        /// Delay in milliseconds (must be >= 1).
        amount_ms: u64,
    },

    /// Write a parsed value onto a resolved node's named property.
    ChangeProperty {
        /// Element reference (an `ElementDef` id).
        element: String,
        /// Target property with its declared type.
        property: PropertyDef,
        /// Value template; `{wordlist}` placeholders are expanded.
        value: String,
    },

    /// Construct a synthetic event and dispatch it on a resolved node.
    DispatchEvent {
        /// Element reference (an `ElementDef` id).
        element: String,
        /// Event type (e.g., "click", "keydown").
        event: String,
        /// Event constructor properties; templates are expanded and parsed.
        #[serde(default)]
        properties: Vec<ModifiedProperty>,
    },

    /// Draft placeholder. Rejected at load time and by the engine.
    None,
}

/// An event constructor property with its declared type and value template.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ModifiedProperty {
    /// Property name on the event object (e.g., "key", "bubbles").
    pub name: String,
    /// Declared value type.
    #[serde(rename = "type")]
    pub kind: ValueKind,
    /// Value template; `{wordlist}` placeholders are expanded.
    pub value: String,
}
