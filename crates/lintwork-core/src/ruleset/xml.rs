//! Rule-set XML documents (DTO layer).
//!
//! These types only describe what a document says. Catalog lookups and
//! de-duplication happen in the resolver.

use super::RuleSetError;
use crate::types::Priority;
use roxmltree::{Document, Node};
use std::collections::BTreeMap;

/// A parsed `<ruleset>` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSetDocument {
    /// Value of the `name` attribute.
    pub name: Option<String>,
    /// Text of `<description>`.
    pub description: Option<String>,
    /// `<rule>` entries in document order.
    pub entries: Vec<RuleEntry>,
}

/// One `<rule>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleEntry {
    /// `<rule ref="set">`: every rule of a catalog set, minus exclusions.
    SetReference {
        /// Referenced set name.
        set: String,
        /// Rule identifiers from `<exclude name="..."/>`.
        excludes: Vec<String>,
    },
    /// `<rule ref="set/Rule">`: one catalog rule with optional overrides.
    RuleReference {
        /// Referenced set name.
        set: String,
        /// Rule identifier within the set.
        rule: String,
        /// Overrides applied on top of the catalog definition.
        overrides: RuleOverrides,
    },
    /// `<rule name="Rule">`: a rule defined by the document itself.
    Custom {
        /// Rule identifier.
        name: String,
        /// Declared values; priority defaults to medium.
        overrides: RuleOverrides,
    },
}

/// Optional per-rule settings found inside a `<rule>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOverrides {
    /// From `<priority>`.
    pub priority: Option<Priority>,
    /// From the `message` attribute.
    pub message: Option<String>,
    /// From `<properties><property name value/></properties>`.
    pub properties: BTreeMap<String, String>,
}

const ALLOWED_TOP_LEVEL: &[&str] = &["description", "rule", "exclude-pattern", "include-pattern"];

/// Parses a rule-set document.
///
/// `origin` names the document in error messages (a path, a resource name or
/// "inline configuration").
///
/// # Errors
///
/// Returns [`RuleSetError::InvalidRuleSetFormat`] if the text is not
/// well-formed XML or does not follow the rule-set structure.
pub fn parse(content: &str, origin: &str) -> Result<RuleSetDocument, RuleSetError> {
    let invalid = |message: String| RuleSetError::InvalidRuleSetFormat {
        origin: origin.to_string(),
        message,
    };

    let doc = Document::parse(content).map_err(|e| invalid(e.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "ruleset" {
        return Err(invalid(format!(
            "root element must be <ruleset>, found <{}>",
            root.tag_name().name()
        )));
    }

    let mut document = RuleSetDocument {
        name: root.attribute("name").map(str::to_string),
        ..RuleSetDocument::default()
    };

    for child in root.children().filter(Node::is_element) {
        let tag = child.tag_name().name();
        match tag {
            "description" => document.description = Some(element_text(child)),
            "rule" => document.entries.push(parse_rule(child).map_err(invalid)?),
            _ if ALLOWED_TOP_LEVEL.contains(&tag) => {}
            other => return Err(invalid(format!("unexpected element <{other}>"))),
        }
    }

    Ok(document)
}

fn parse_rule(node: Node<'_, '_>) -> Result<RuleEntry, String> {
    let line = node.document().text_pos_at(node.range().start).row;

    match (node.attribute("ref"), node.attribute("name")) {
        (Some(reference), None) => {
            let reference = reference.trim();
            if reference.is_empty() {
                return Err(format!("line {line}: empty `ref` attribute"));
            }
            let overrides = parse_overrides(node, line)?;
            match split_reference(reference) {
                (set, Some(rule)) => Ok(RuleEntry::RuleReference {
                    set,
                    rule,
                    overrides,
                }),
                (set, None) => {
                    let excludes = node
                        .children()
                        .filter(|c| c.has_tag_name("exclude"))
                        .map(|c| {
                            c.attribute("name").map(str::to_string).ok_or_else(|| {
                                format!("line {line}: <exclude> without `name` attribute")
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(RuleEntry::SetReference { set, excludes })
                }
            }
        }
        (None, Some(name)) => {
            let name = name.trim();
            if name.is_empty() {
                return Err(format!("line {line}: empty `name` attribute"));
            }
            Ok(RuleEntry::Custom {
                name: name.to_string(),
                overrides: parse_overrides(node, line)?,
            })
        }
        (Some(_), Some(_)) => Err(format!(
            "line {line}: <rule> must not have both `ref` and `name`"
        )),
        (None, None) => Err(format!("line {line}: <rule> needs a `ref` or `name` attribute")),
    }
}

fn parse_overrides(node: Node<'_, '_>, line: u32) -> Result<RuleOverrides, String> {
    let mut overrides = RuleOverrides {
        message: node.attribute("message").map(str::to_string),
        ..RuleOverrides::default()
    };

    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "priority" => {
                let text = element_text(child);
                let priority = text
                    .parse::<Priority>()
                    .map_err(|e| format!("line {line}: {e}"))?;
                overrides.priority = Some(priority);
            }
            "properties" => {
                for property in child.children().filter(|c| c.has_tag_name("property")) {
                    let name = property
                        .attribute("name")
                        .ok_or_else(|| format!("line {line}: <property> without `name`"))?;
                    let value = property.attribute("value").map_or_else(
                        || {
                            property
                                .children()
                                .find(|c| c.has_tag_name("value"))
                                .map(element_text)
                                .unwrap_or_default()
                        },
                        str::to_string,
                    );
                    overrides.properties.insert(name.to_string(), value);
                }
            }
            _ => {}
        }
    }

    Ok(overrides)
}

/// Splits `set/Rule`, `category/java/set.xml/Rule` or a bare set reference.
fn split_reference(reference: &str) -> (String, Option<String>) {
    if reference.ends_with(".xml") {
        return (reference.to_string(), None);
    }
    if let Some((set, rule)) = reference.split_once(".xml/") {
        return (format!("{set}.xml"), Some(rule.to_string()));
    }
    match reference.rsplit_once('/') {
        Some((set, rule)) => (set.to_string(), Some(rule.to_string())),
        None => (reference.to_string(), None),
    }
}

fn element_text(node: Node<'_, '_>) -> String {
    node.text().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(xml: &str) -> RuleSetDocument {
        parse(xml, "test.xml").unwrap()
    }

    fn parse_err(xml: &str) -> String {
        match parse(xml, "test.xml") {
            Err(RuleSetError::InvalidRuleSetFormat { message, .. }) => message,
            other => panic!("expected InvalidRuleSetFormat, got {other:?}"),
        }
    }

    #[test]
    fn parses_all_entry_kinds() {
        let doc = parse_ok(
            r#"<?xml version="1.0"?>
<ruleset name="custom" xmlns="http://pmd.sourceforge.net/ruleset/2.0.0">
  <description>Project rules</description>
  <rule ref="errorprone">
    <exclude name="EmptyCatchBlock"/>
  </rule>
  <rule ref="bestpractices/UnusedLocalVariable">
    <priority>2</priority>
    <properties>
      <property name="checkAll" value="true"/>
      <property name="xpath"><value>//Foo</value></property>
    </properties>
  </rule>
  <rule name="NoSystemOut" message="Use a logger"/>
</ruleset>"#,
        );

        assert_eq!(doc.name.as_deref(), Some("custom"));
        assert_eq!(doc.description.as_deref(), Some("Project rules"));
        assert_eq!(doc.entries.len(), 3);

        assert_eq!(
            doc.entries[0],
            RuleEntry::SetReference {
                set: "errorprone".to_string(),
                excludes: vec!["EmptyCatchBlock".to_string()],
            }
        );

        let RuleEntry::RuleReference {
            set,
            rule,
            overrides,
        } = &doc.entries[1]
        else {
            panic!("expected rule reference");
        };
        assert_eq!(set, "bestpractices");
        assert_eq!(rule, "UnusedLocalVariable");
        assert_eq!(overrides.priority.map(Priority::get), Some(2));
        assert_eq!(overrides.properties.get("checkAll").map(String::as_str), Some("true"));
        assert_eq!(overrides.properties.get("xpath").map(String::as_str), Some("//Foo"));

        let RuleEntry::Custom { name, overrides } = &doc.entries[2] else {
            panic!("expected custom rule");
        };
        assert_eq!(name, "NoSystemOut");
        assert_eq!(overrides.message.as_deref(), Some("Use a logger"));
        assert!(overrides.priority.is_none());
    }

    #[test]
    fn splits_long_form_references() {
        assert_eq!(
            split_reference("category/java/errorprone.xml"),
            ("category/java/errorprone.xml".to_string(), None)
        );
        assert_eq!(
            split_reference("category/java/errorprone.xml/EmptyCatchBlock"),
            (
                "category/java/errorprone.xml".to_string(),
                Some("EmptyCatchBlock".to_string())
            )
        );
        assert_eq!(split_reference("design"), ("design".to_string(), None));
    }

    #[test]
    fn rejects_malformed_xml() {
        let message = parse_err("<ruleset><rule ref=\"x\"></ruleset>");
        assert!(!message.is_empty());
    }

    #[test]
    fn rejects_wrong_root() {
        let message = parse_err("<rules/>");
        assert!(message.contains("<ruleset>"));
    }

    #[test]
    fn rejects_unknown_top_level_element() {
        let message = parse_err("<ruleset><banana/></ruleset>");
        assert!(message.contains("banana"));
    }

    #[test]
    fn rejects_rule_with_ref_and_name() {
        let message = parse_err(r#"<ruleset><rule ref="a" name="b"/></ruleset>"#);
        assert!(message.contains("both"));
    }

    #[test]
    fn rejects_rule_without_ref_or_name() {
        parse_err("<ruleset><rule/></ruleset>");
    }

    #[test]
    fn rejects_bad_priority() {
        let message =
            parse_err(r#"<ruleset><rule name="X"><priority>9</priority></rule></ruleset>"#);
        assert!(message.contains("out of range"));
    }

    #[test]
    fn accepts_pattern_elements() {
        let doc = parse_ok(
            r#"<ruleset><exclude-pattern>.*/generated/.*</exclude-pattern></ruleset>"#,
        );
        assert!(doc.entries.is_empty());
    }
}
