//! List rule sets command implementation.

use lintwork::rulesets::builtin_catalog;
use lintwork::RuleSetCatalog;
use std::fmt::Write;

/// Runs the list-rule-sets command.
pub fn run(with_rules: bool) {
    print!("{}", render(with_rules));
}

fn render(with_rules: bool) -> String {
    let catalog = builtin_catalog();
    let mut out = String::new();

    let _ = writeln!(out, "Available rule sets:\n");
    let _ = writeln!(out, "{:<16} {:<6} Description", "Name", "Rules");
    let _ = writeln!(out, "{}", "-".repeat(72));

    for set in catalog.rule_sets() {
        let _ = writeln!(
            out,
            "{:<16} {:<6} {}",
            set.name(),
            set.rules().len(),
            set.description()
        );
        if with_rules {
            for rule in set.rules() {
                let _ = writeln!(
                    out,
                    "    P{} {:<40} {}",
                    rule.priority(),
                    rule.id(),
                    rule.description()
                );
            }
        }
    }

    let _ = writeln!(out, "\nPackaged rule-set files:");
    for name in catalog.resource_names() {
        let _ = writeln!(out, "  resource:{name}");
    }

    let _ = writeln!(out, "\nSets can also be named as category/java/<name>.xml, e.g.:");
    let _ = writeln!(out, "  lintwork check --rule-sets errorprone,bestpractices");
    out
}
