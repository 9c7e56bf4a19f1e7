//! Rule configuration → [`ResolvedRuleSet`].

use super::catalog::RuleSetCatalog;
use super::model::{DuplicatePolicy, ResolvedRule, ResolvedRuleSet, RuleSetDefinition};
use super::xml::{self, RuleEntry, RuleOverrides};
use super::RuleSetError;
use crate::types::Priority;

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Prefix selecting a packaged rule-set resource instead of a local file.
pub const RESOURCE_PREFIX: &str = "resource:";

const INLINE_ORIGIN: &str = "inline configuration";

/// Where a rule-set document comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleSetSource {
    /// A local file.
    File(PathBuf),
    /// A packaged resource served by the catalog.
    Resource(String),
}

impl RuleSetSource {
    /// Interprets a configured reference: `resource:NAME` or a path.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        match reference.strip_prefix(RESOURCE_PREFIX) {
            Some(name) => Self::Resource(name.to_string()),
            None => Self::File(PathBuf::from(reference)),
        }
    }

    fn origin(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Resource(name) => format!("{RESOURCE_PREFIX}{name}"),
        }
    }
}

/// Declarative rule configuration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleConfig {
    /// Built-in set names, in order.
    pub rule_sets: Vec<String>,
    /// Rule-set documents, in order.
    pub rule_set_files: Vec<RuleSetSource>,
    /// Inline rule-set document content.
    pub inline: Option<String>,
    /// Rules less severe than this are dropped.
    pub threshold: Priority,
    /// Which definition wins when an identifier appears more than once.
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            rule_sets: Vec::new(),
            rule_set_files: Vec::new(),
            inline: None,
            threshold: Priority::LOWEST,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

/// Resolves [`RuleConfig`] against a catalog.
pub struct RuleSetResolver<'a> {
    catalog: &'a dyn RuleSetCatalog,
}

impl<'a> RuleSetResolver<'a> {
    /// Creates a resolver.
    #[must_use]
    pub fn new(catalog: &'a dyn RuleSetCatalog) -> Self {
        Self { catalog }
    }

    /// Resolves the configuration into one sorted rule set.
    ///
    /// Sources are read in order: named sets, rule-set files, inline
    /// configuration. The first error aborts resolution.
    ///
    /// # Errors
    ///
    /// Returns [`RuleSetError::UnknownRuleSet`] for names missing from the
    /// catalog, [`RuleSetError::InvalidRuleSetFormat`] for malformed documents
    /// and [`RuleSetError::Io`] for unreadable files.
    pub fn resolve(&self, config: &RuleConfig) -> Result<ResolvedRuleSet, RuleSetError> {
        let mut candidates: Vec<ResolvedRule> = Vec::new();

        for name in &config.rule_sets {
            let set = self.lookup_set(name)?;
            candidates.extend(set.rules().iter().map(ResolvedRule::from));
        }

        for source in &config.rule_set_files {
            let content = self.load(source)?;
            self.expand(&content, &source.origin(), &mut candidates)?;
        }

        if let Some(inline) = &config.inline {
            self.expand(inline, INLINE_ORIGIN, &mut candidates)?;
        }

        let total = candidates.len();
        let merged = deduplicate(candidates, config.duplicate_policy);
        let unique = merged.len();
        let kept: Vec<ResolvedRule> = merged
            .into_iter()
            .filter(|r| r.priority.is_within(config.threshold))
            .collect();

        debug!(
            "Resolved {} rule definition(s) into {} unique rule(s), {} within priority {}",
            total,
            unique,
            kept.len(),
            config.threshold
        );

        if kept.is_empty() {
            warn!("Resolved rule set is empty; no violations can be reported");
        }

        Ok(ResolvedRuleSet::new(kept))
    }

    fn lookup_set(&self, name: &str) -> Result<&'a RuleSetDefinition, RuleSetError> {
        self.catalog
            .rule_set(name)
            .ok_or_else(|| RuleSetError::UnknownRuleSet {
                name: name.to_string(),
            })
    }

    fn load(&self, source: &RuleSetSource) -> Result<String, RuleSetError> {
        match source {
            RuleSetSource::File(path) => {
                std::fs::read_to_string(path).map_err(|e| RuleSetError::Io {
                    path: path.clone(),
                    source: e,
                })
            }
            RuleSetSource::Resource(name) => self
                .catalog
                .resource(name)
                .map(str::to_string)
                .ok_or_else(|| RuleSetError::UnknownRuleSet {
                    name: source.origin(),
                }),
        }
    }

    fn expand(
        &self,
        content: &str,
        origin: &str,
        out: &mut Vec<ResolvedRule>,
    ) -> Result<(), RuleSetError> {
        let document = xml::parse(content, origin)?;

        for entry in document.entries {
            match entry {
                RuleEntry::SetReference { set, excludes } => {
                    let definition = self.lookup_set(&set)?;
                    for excluded in &excludes {
                        if definition.rule(excluded).is_none() {
                            warn!(
                                "{}: excluded rule `{}` is not part of set `{}`",
                                origin, excluded, set
                            );
                        }
                    }
                    out.extend(
                        definition
                            .rules()
                            .iter()
                            .filter(|r| !excludes.iter().any(|e| e == r.id()))
                            .map(ResolvedRule::from),
                    );
                }
                RuleEntry::RuleReference {
                    set,
                    rule,
                    overrides,
                } => {
                    let definition = self.lookup_set(&set)?;
                    let base = definition.rule(&rule).ok_or_else(|| {
                        RuleSetError::InvalidRuleSetFormat {
                            origin: origin.to_string(),
                            message: format!("rule `{rule}` not found in set `{set}`"),
                        }
                    })?;
                    out.push(apply_overrides(ResolvedRule::from(base), overrides));
                }
                RuleEntry::Custom { name, overrides } => {
                    let base = ResolvedRule {
                        id: name,
                        priority: Priority::MEDIUM,
                        properties: BTreeMap::new(),
                        message: None,
                    };
                    out.push(apply_overrides(base, overrides));
                }
            }
        }

        Ok(())
    }
}

fn apply_overrides(mut rule: ResolvedRule, overrides: RuleOverrides) -> ResolvedRule {
    if let Some(priority) = overrides.priority {
        rule.priority = priority;
    }
    if overrides.message.is_some() {
        rule.message = overrides.message;
    }
    rule.properties.extend(overrides.properties);
    rule
}

fn deduplicate(candidates: Vec<ResolvedRule>, policy: DuplicatePolicy) -> Vec<ResolvedRule> {
    let mut by_id: BTreeMap<String, ResolvedRule> = BTreeMap::new();

    for candidate in candidates {
        match by_id.entry(candidate.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                let replace = match policy {
                    DuplicatePolicy::HighestSeverity => candidate.priority < slot.get().priority,
                    DuplicatePolicy::LastDefinition => true,
                };
                if replace {
                    slot.insert(candidate);
                }
            }
        }
    }

    by_id.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::catalog::StaticCatalog;
    use crate::ruleset::model::RuleDefinition;
    use std::io::Write;

    fn p(value: i64) -> Priority {
        Priority::new(value).unwrap()
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_set(RuleSetDefinition::new(
                "errorprone",
                "",
                vec![
                    RuleDefinition::new("EmptyCatchBlock", p(3)),
                    RuleDefinition::new("AvoidCatchingThrowable", p(1)),
                    RuleDefinition::new("CloseResource", p(3)).with_property("types", "Connection"),
                ],
            ))
            .with_set(RuleSetDefinition::new(
                "codestyle",
                "",
                vec![
                    RuleDefinition::new("ShortVariable", p(4)),
                    RuleDefinition::new("EmptyCatchBlock", p(5)),
                ],
            ))
            .with_alias("category/java/errorprone.xml", "errorprone")
            .with_resource(
                "rulesets/quick.xml",
                r#"<ruleset><rule ref="codestyle/ShortVariable"><priority>2</priority></rule></ruleset>"#,
            )
    }

    fn config(names: &[&str]) -> RuleConfig {
        RuleConfig {
            rule_sets: names.iter().map(|s| (*s).to_string()).collect(),
            ..RuleConfig::default()
        }
    }

    fn ids(set: &ResolvedRuleSet) -> Vec<&str> {
        set.rules().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn resolves_named_sets_sorted_by_id() {
        let catalog = catalog();
        let set = RuleSetResolver::new(&catalog)
            .resolve(&config(&["errorprone"]))
            .unwrap();
        assert_eq!(
            ids(&set),
            vec!["AvoidCatchingThrowable", "CloseResource", "EmptyCatchBlock"]
        );
    }

    #[test]
    fn unknown_named_set_fails() {
        let catalog = catalog();
        let err = RuleSetResolver::new(&catalog)
            .resolve(&config(&["errorprone", "nope"]))
            .unwrap_err();
        assert!(matches!(err, RuleSetError::UnknownRuleSet { name } if name == "nope"));
    }

    #[test]
    fn aliases_resolve_to_the_same_rules() {
        let catalog = catalog();
        let resolver = RuleSetResolver::new(&catalog);
        let short = resolver.resolve(&config(&["errorprone"])).unwrap();
        let long = resolver
            .resolve(&config(&["category/java/errorprone.xml"]))
            .unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn duplicates_keep_highest_severity() {
        let catalog = catalog();
        let set = RuleSetResolver::new(&catalog)
            .resolve(&config(&["codestyle", "errorprone"]))
            .unwrap();
        assert_eq!(set.get("EmptyCatchBlock").map(|r| r.priority), Some(p(3)));
    }

    #[test]
    fn last_definition_policy_keeps_later_source() {
        let catalog = catalog();
        let mut cfg = config(&["errorprone", "codestyle"]);
        cfg.duplicate_policy = DuplicatePolicy::LastDefinition;
        let set = RuleSetResolver::new(&catalog).resolve(&cfg).unwrap();
        assert_eq!(set.get("EmptyCatchBlock").map(|r| r.priority), Some(p(5)));
    }

    #[test]
    fn threshold_drops_less_severe_rules() {
        let catalog = catalog();
        let mut cfg = config(&["errorprone", "codestyle"]);
        cfg.threshold = p(3);
        let set = RuleSetResolver::new(&catalog).resolve(&cfg).unwrap();
        assert!(set.get("ShortVariable").is_none());
        assert!(set.get("EmptyCatchBlock").is_some());
    }

    #[test]
    fn threshold_change_changes_fingerprint() {
        let catalog = catalog();
        let resolver = RuleSetResolver::new(&catalog);
        let mut cfg = config(&["errorprone", "codestyle"]);
        let all = resolver.resolve(&cfg).unwrap();
        cfg.threshold = p(3);
        let severe = resolver.resolve(&cfg).unwrap();
        assert_ne!(all.fingerprint(), severe.fingerprint());
    }

    #[test]
    fn resolution_is_deterministic() {
        let catalog = catalog();
        let resolver = RuleSetResolver::new(&catalog);
        let mut cfg = config(&["codestyle", "errorprone"]);
        cfg.inline = Some(
            r#"<ruleset><rule name="NoSystemOut"><priority>2</priority></rule></ruleset>"#
                .to_string(),
        );
        let first = resolver.resolve(&cfg).unwrap();
        let second = resolver.resolve(&cfg).unwrap();
        assert_eq!(first.canonical_bytes(), second.canonical_bytes());
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn inline_config_overrides_and_excludes() {
        let catalog = catalog();
        let mut cfg = RuleConfig::default();
        cfg.inline = Some(
            r#"<ruleset>
  <rule ref="errorprone"><exclude name="EmptyCatchBlock"/></rule>
  <rule ref="errorprone/CloseResource" message="close it">
    <properties><property name="allowedResourceTypes" value="Stream"/></properties>
  </rule>
</ruleset>"#
                .to_string(),
        );
        let set = RuleSetResolver::new(&catalog).resolve(&cfg).unwrap();
        assert_eq!(ids(&set), vec!["AvoidCatchingThrowable", "CloseResource"]);

        let close = set.get("CloseResource").unwrap();
        assert_eq!(close.message.as_deref(), Some("close it"));
        assert_eq!(close.properties.len(), 2);
    }

    #[test]
    fn rule_reference_to_missing_rule_is_invalid() {
        let catalog = catalog();
        let mut cfg = RuleConfig::default();
        cfg.inline = Some(r#"<ruleset><rule ref="errorprone/Nope"/></ruleset>"#.to_string());
        let err = RuleSetResolver::new(&catalog).resolve(&cfg).unwrap_err();
        assert!(matches!(err, RuleSetError::InvalidRuleSetFormat { .. }));
    }

    #[test]
    fn reads_rule_set_files_and_resources() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"<ruleset><rule ref="errorprone/EmptyCatchBlock"><priority>1</priority></rule></ruleset>"#
        )
        .unwrap();

        let catalog = catalog();
        let cfg = RuleConfig {
            rule_set_files: vec![
                RuleSetSource::File(file.path().to_path_buf()),
                RuleSetSource::parse("resource:rulesets/quick.xml"),
            ],
            ..RuleConfig::default()
        };
        let set = RuleSetResolver::new(&catalog).resolve(&cfg).unwrap();
        assert_eq!(ids(&set), vec!["EmptyCatchBlock", "ShortVariable"]);
        assert_eq!(set.get("EmptyCatchBlock").map(|r| r.priority), Some(p(1)));
        assert_eq!(set.get("ShortVariable").map(|r| r.priority), Some(p(2)));
    }

    #[test]
    fn malformed_file_aborts_resolution() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<ruleset><rule ref=").unwrap();

        let catalog = catalog();
        let cfg = RuleConfig {
            rule_sets: vec!["errorprone".to_string()],
            rule_set_files: vec![RuleSetSource::File(file.path().to_path_buf())],
            ..RuleConfig::default()
        };
        let err = RuleSetResolver::new(&catalog).resolve(&cfg).unwrap_err();
        assert!(matches!(err, RuleSetError::InvalidRuleSetFormat { .. }));
    }

    #[test]
    fn missing_resource_is_unknown() {
        let catalog = catalog();
        let cfg = RuleConfig {
            rule_set_files: vec![RuleSetSource::parse("resource:rulesets/none.xml")],
            ..RuleConfig::default()
        };
        let err = RuleSetResolver::new(&catalog).resolve(&cfg).unwrap_err();
        assert!(
            matches!(err, RuleSetError::UnknownRuleSet { name } if name == "resource:rulesets/none.xml")
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let catalog = catalog();
        let cfg = RuleConfig {
            rule_set_files: vec![RuleSetSource::File(PathBuf::from(
                "/nonexistent/lintwork/ruleset.xml",
            ))],
            ..RuleConfig::default()
        };
        let err = RuleSetResolver::new(&catalog).resolve(&cfg).unwrap_err();
        assert!(matches!(err, RuleSetError::Io { .. }));
    }
}
