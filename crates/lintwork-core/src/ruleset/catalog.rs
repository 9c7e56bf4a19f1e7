//! Catalog of built-in rule sets and packaged rule-set resources.

use super::model::RuleSetDefinition;
use std::collections::BTreeMap;

/// Source of named rule sets and packaged rule-set documents.
///
/// The resolver only talks to this trait, so the set of built-in rules is
/// supplied by whoever constructs the engine.
pub trait RuleSetCatalog: Send + Sync {
    /// Looks up a named rule set (or one of its aliases).
    fn rule_set(&self, name: &str) -> Option<&RuleSetDefinition>;

    /// Returns the XML content of a packaged resource, if present.
    fn resource(&self, name: &str) -> Option<&str>;

    /// All rule sets, ordered by name.
    fn rule_sets(&self) -> Vec<&RuleSetDefinition>;

    /// All packaged resource names, ordered.
    fn resource_names(&self) -> Vec<&str>;
}

/// In-memory catalog assembled at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    sets: BTreeMap<String, RuleSetDefinition>,
    aliases: BTreeMap<String, String>,
    resources: BTreeMap<String, String>,
}

impl StaticCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule set, replacing any set with the same name.
    #[must_use]
    pub fn with_set(mut self, set: RuleSetDefinition) -> Self {
        self.sets.insert(set.name().to_string(), set);
        self
    }

    /// Registers an alternative name for a set.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), target.into());
        self
    }

    /// Adds a packaged rule-set document.
    #[must_use]
    pub fn with_resource(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.resources.insert(name.into(), content.into());
        self
    }
}

impl RuleSetCatalog for StaticCatalog {
    fn rule_set(&self, name: &str) -> Option<&RuleSetDefinition> {
        self.sets.get(name).or_else(|| {
            self.aliases
                .get(name)
                .and_then(|target| self.sets.get(target))
        })
    }

    fn resource(&self, name: &str) -> Option<&str> {
        self.resources.get(name).map(String::as_str)
    }

    fn rule_sets(&self) -> Vec<&RuleSetDefinition> {
        self.sets.values().collect()
    }

    fn resource_names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::model::RuleDefinition;
    use crate::types::Priority;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_set(RuleSetDefinition::new(
                "errorprone",
                "Error-prone constructs",
                vec![RuleDefinition::new("EmptyCatchBlock", Priority::MEDIUM)],
            ))
            .with_alias("category/java/errorprone.xml", "errorprone")
            .with_resource("rulesets/mine.xml", "<ruleset/>")
    }

    #[test]
    fn looks_up_by_name_and_alias() {
        let c = catalog();
        assert!(c.rule_set("errorprone").is_some());
        assert_eq!(
            c.rule_set("category/java/errorprone.xml").map(RuleSetDefinition::name),
            Some("errorprone")
        );
        assert!(c.rule_set("nope").is_none());
    }

    #[test]
    fn serves_resources() {
        let c = catalog();
        assert_eq!(c.resource("rulesets/mine.xml"), Some("<ruleset/>"));
        assert_eq!(c.resource_names(), vec!["rulesets/mine.xml"]);
    }
}
