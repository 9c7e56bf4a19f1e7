//! Rule definitions and the resolved, fingerprinted rule set.
//!
//! A [`ResolvedRuleSet`] is immutable once built. Its canonical bytes (and
//! therefore its fingerprint) depend only on the rules it contains, never on
//! where they came from.

use crate::fingerprint::RuleSetFingerprint;
use crate::types::Priority;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A rule as declared by a catalog set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefinition {
    id: String,
    priority: Priority,
    description: String,
    message: Option<String>,
    properties: BTreeMap<String, String>,
}

impl RuleDefinition {
    /// Creates a rule definition with no properties.
    #[must_use]
    pub fn new(id: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: id.into(),
            priority,
            description: String::new(),
            message: None,
            properties: BTreeMap::new(),
        }
    }

    /// Sets the description shown by `list-rule-sets`.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the message reported for violations of this rule.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets a default property value.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Rule identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Default priority.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Default properties.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

/// A named collection of rule definitions in the built-in catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetDefinition {
    name: String,
    description: String,
    rules: Vec<RuleDefinition>,
}

impl RuleSetDefinition {
    /// Creates a rule set.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        rules: Vec<RuleDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            rules,
        }
    }

    /// Set name (e.g., "errorprone").
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    /// Finds a rule by identifier.
    #[must_use]
    pub fn rule(&self, id: &str) -> Option<&RuleDefinition> {
        self.rules.iter().find(|r| r.id == id)
    }
}

/// How to pick between two definitions of the same rule identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the most severe (lowest numbered) definition; first wins on ties.
    #[default]
    HighestSeverity,
    /// Keep the definition from the latest source.
    LastDefinition,
}

/// One rule of a resolved rule set, as handed to the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRule {
    /// Rule identifier.
    pub id: String,
    /// Effective priority.
    pub priority: Priority,
    /// Effective properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    /// Message override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&RuleDefinition> for ResolvedRule {
    fn from(def: &RuleDefinition) -> Self {
        Self {
            id: def.id.clone(),
            priority: def.priority,
            properties: def.properties.clone(),
            message: def.message.clone(),
        }
    }
}

/// The concrete rule set for one invocation, sorted by rule identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRuleSet {
    rules: Vec<ResolvedRule>,
    fingerprint: RuleSetFingerprint,
}

impl ResolvedRuleSet {
    /// Builds a rule set; rules are sorted by identifier.
    ///
    /// Callers are expected to have de-duplicated identifiers already; if not,
    /// the first occurrence after sorting is kept.
    #[must_use]
    pub fn new(mut rules: Vec<ResolvedRule>) -> Self {
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        rules.dedup_by(|later, earlier| later.id == earlier.id);
        let fingerprint = RuleSetFingerprint::of_bytes(&canonical_bytes(&rules));
        Self { rules, fingerprint }
    }

    /// Rules in identifier order.
    #[must_use]
    pub fn rules(&self) -> &[ResolvedRule] {
        &self.rules
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Finds a rule by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResolvedRule> {
        self.rules
            .binary_search_by(|r| r.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.rules[i])
    }

    /// Machine-independent serialization, one line per rule:
    /// `id|priority|key=value;key=value|message`.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_bytes(&self.rules)
    }

    /// Digest of [`Self::canonical_bytes`].
    #[must_use]
    pub fn fingerprint(&self) -> &RuleSetFingerprint {
        &self.fingerprint
    }
}

fn canonical_bytes(rules: &[ResolvedRule]) -> Vec<u8> {
    let mut out = String::new();
    for rule in rules {
        let properties = rule
            .properties
            .iter()
            .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
            .collect::<Vec<_>>()
            .join(";");
        out.push_str(&escape(&rule.id));
        out.push('|');
        out.push_str(&rule.priority.to_string());
        out.push('|');
        out.push_str(&properties);
        out.push('|');
        out.push_str(&escape(rule.message.as_deref().unwrap_or_default()));
        out.push('\n');
    }
    out.into_bytes()
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' | '|' | ';' | '=' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}
