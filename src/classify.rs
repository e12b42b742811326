//! Alert classification: a pure reduction from findings, rule catalog and
//! policy to verdict groups and a run summary.
//!
//! Classification never talks to the engine and never fails: an empty
//! catalog simply yields zero PASS entries, and resolution falls back to
//! the run default wherever the policy is silent.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::engine::{Finding, Rule};
use crate::policy::{Action, PolicySet};

/// Rule ids that are never evaluated: the engine's internal/example rules
/// known to produce noise rather than signal.
pub const EXCLUDED_RULES: &[&str] = &["-1", "50003", "60000", "60001"];

static EXCLUDED: Lazy<HashSet<&'static str>> =
    Lazy::new(|| EXCLUDED_RULES.iter().copied().collect());

pub fn is_excluded(rule_id: &str) -> bool {
    EXCLUDED.contains(rule_id)
}

/// All findings for one rule id, with the resolved action.
#[derive(Debug, Clone, Serialize)]
pub struct VerdictGroup {
    pub rule_id: String,
    /// Title of the representative (first) finding in the group.
    pub title: String,
    pub action: Action,
    /// Number of finding instances for this rule.
    pub count: usize,
    /// Up to five target URLs for display.
    pub example_urls: Vec<String>,
}

/// Aggregate per-rule counts for one run.
///
/// Each counter is incremented once per distinct rule id, not once per
/// finding instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub pass: usize,
    pub warn: usize,
    pub fail: usize,
    pub info: usize,
    pub ignore: usize,
    /// Distinct target resources the engine visited.
    pub urls_visited: usize,
}

impl RunSummary {
    /// Map the summary onto the process exit outcome. Highest priority
    /// first: any FAIL, then any WARN, then success if anything passed,
    /// otherwise nothing was evaluated at all.
    pub fn exit_code(&self) -> i32 {
        if self.fail > 0 {
            1
        } else if self.warn > 0 {
            2
        } else if self.pass > 0 {
            0
        } else {
            3
        }
    }
}

/// Result of classifying one run.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    /// One group per rule id with findings, sorted by rule id.
    pub groups: Vec<VerdictGroup>,
    /// Catalog rules with no findings, sorted by rule id.
    pub passes: Vec<Rule>,
    pub summary: RunSummary,
}

const MAX_EXAMPLE_URLS: usize = 5;

/// Classify a run's findings against the rule catalog and user policy.
///
/// Deterministic and order-independent: groups are keyed and sorted by
/// rule id, so the engine's nondeterministic finding order never leaks
/// into the output. An explicit policy entry always wins over
/// `default_action`; FAIL is only reachable through explicit policy.
pub fn classify(
    findings: &[Finding],
    rules: &[Rule],
    policy: &PolicySet,
    default_action: Action,
) -> Classification {
    let mut by_rule: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
    for finding in findings {
        if is_excluded(&finding.rule_id) {
            continue;
        }
        by_rule.entry(&finding.rule_id).or_default().push(finding);
    }
    // The engine returns findings in nondeterministic order; sort each
    // group so the representative title and example URLs are stable.
    for instances in by_rule.values_mut() {
        instances.sort_by(|a, b| {
            a.target_url
                .cmp(&b.target_url)
                .then_with(|| a.title.cmp(&b.title))
        });
    }

    let mut catalog: BTreeMap<&str, &str> = BTreeMap::new();
    for rule in rules {
        if is_excluded(&rule.rule_id) {
            continue;
        }
        catalog.insert(&rule.rule_id, &rule.display_name);
    }

    let passes: Vec<Rule> = catalog
        .iter()
        .filter(|(id, _)| !by_rule.contains_key(*id))
        .map(|(id, name)| Rule {
            rule_id: (*id).to_string(),
            display_name: (*name).to_string(),
        })
        .collect();

    let mut summary = RunSummary {
        pass: passes.len(),
        ..RunSummary::default()
    };

    let groups: Vec<VerdictGroup> = by_rule
        .iter()
        .map(|(rule_id, instances)| {
            let action = policy
                .get(rule_id)
                .map(|entry| entry.action)
                .unwrap_or(default_action);
            match action {
                Action::Ignore => summary.ignore += 1,
                Action::Info => summary.info += 1,
                Action::Warn => summary.warn += 1,
                Action::Fail => summary.fail += 1,
            }
            VerdictGroup {
                rule_id: (*rule_id).to_string(),
                title: instances[0].title.clone(),
                action,
                count: instances.len(),
                example_urls: instances
                    .iter()
                    .take(MAX_EXAMPLE_URLS)
                    .map(|f| f.target_url.clone())
                    .collect(),
            }
        })
        .collect();

    Classification {
        groups,
        passes,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicySet;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn finding(rule_id: &str, url: &str) -> Finding {
        Finding {
            rule_id: rule_id.into(),
            title: format!("Alert {}", rule_id),
            target_url: url.into(),
            raw: serde_json::Value::Null,
        }
    }

    fn rule(rule_id: &str, name: &str) -> Rule {
        Rule {
            rule_id: rule_id.into(),
            display_name: name.into(),
        }
    }

    #[test]
    fn explicit_fail_dominates() {
        let findings = vec![
            finding("A", "http://t/1"),
            finding("A", "http://t/2"),
            finding("B", "http://t/3"),
        ];
        let rules = vec![rule("A", "Rule A"), rule("B", "Rule B"), rule("C", "Rule C")];
        let policy = PolicySet::parse("A\tFAIL\t(Rule A)\n");

        let c = classify(&findings, &rules, &policy, Action::Warn);

        assert_eq!(c.groups.len(), 2);
        assert_eq!(c.groups[0].rule_id, "A");
        assert_eq!(c.groups[0].action, Action::Fail);
        assert_eq!(c.groups[0].count, 2);
        assert_eq!(c.groups[1].rule_id, "B");
        assert_eq!(c.groups[1].action, Action::Warn);
        assert_eq!(c.groups[1].count, 1);
        assert_eq!(c.passes.len(), 1);
        assert_eq!(c.passes[0].rule_id, "C");
        assert_eq!(
            c.summary,
            RunSummary {
                pass: 1,
                warn: 1,
                fail: 1,
                info: 0,
                ignore: 0,
                urls_visited: 0,
            }
        );
        assert_eq!(c.summary.exit_code(), 1);
    }

    #[test]
    fn warn_without_fail_exits_2() {
        let findings = vec![finding("B", "http://t/1")];
        let rules = vec![rule("B", "Rule B")];
        let c = classify(&findings, &rules, &PolicySet::default(), Action::Warn);
        assert_eq!(c.summary.exit_code(), 2);
    }

    #[test]
    fn nothing_evaluated_exits_3() {
        let c = classify(&[], &[], &PolicySet::default(), Action::Warn);
        assert!(c.groups.is_empty());
        assert!(c.passes.is_empty());
        assert_eq!(c.summary.exit_code(), 3);
    }

    #[test]
    fn all_pass_exits_0() {
        let rules = vec![rule("A", "Rule A")];
        let c = classify(&[], &rules, &PolicySet::default(), Action::Warn);
        assert_eq!(c.summary.pass, 1);
        assert_eq!(c.summary.exit_code(), 0);
    }

    #[test]
    fn excluded_rules_never_surface() {
        let findings = vec![finding("60001", "http://t/1"), finding("50003", "http://t/2")];
        let rules = vec![rule("60000", "Example Rule"), rule("-1", "Internal")];
        let c = classify(&findings, &rules, &PolicySet::default(), Action::Warn);
        assert!(c.groups.is_empty());
        assert!(c.passes.is_empty());
        assert_eq!(c.summary.exit_code(), 3);
    }

    #[test]
    fn non_excluded_ignore_increments_only_ignore() {
        let findings = vec![finding("10099", "http://t/1")];
        let rules = vec![rule("10099", "Rule"), rule("10100", "Other")];
        let policy = PolicySet::parse("10099\tIGNORE\t(Rule)\tknown noise\n");
        let c = classify(&findings, &rules, &policy, Action::Warn);
        assert_eq!(c.summary.ignore, 1);
        assert_eq!(c.summary.warn, 0);
        assert_eq!(c.summary.fail, 0);
        assert_eq!(c.summary.info, 0);
        // Ignored rules still had findings, so they are not PASSes.
        assert_eq!(c.summary.pass, 1);
        assert_eq!(c.passes[0].rule_id, "10100");
    }

    #[test]
    fn unknown_rule_with_info_default_resolves_info() {
        let findings = vec![finding("99999", "http://t/1")];
        let c = classify(&findings, &[], &PolicySet::default(), Action::Info);
        assert_eq!(c.groups[0].action, Action::Info);
        assert_eq!(c.summary.info, 1);
        // Empty catalog: nothing passed, so the run still reports 3.
        assert_eq!(c.summary.exit_code(), 3);
    }

    #[test]
    fn unknown_rule_with_info_default_and_a_pass_exits_0() {
        let findings = vec![finding("99999", "http://t/1")];
        let rules = vec![rule("10010", "Rule")];
        let c = classify(&findings, &rules, &PolicySet::default(), Action::Info);
        assert_eq!(c.summary.info, 1);
        assert_eq!(c.summary.pass, 1);
        assert_eq!(c.summary.exit_code(), 0);
    }

    #[test]
    fn group_content_independent_of_finding_order() {
        let forward = vec![finding("A", "http://t/1"), finding("A", "http://t/2")];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = classify(&forward, &[], &PolicySet::default(), Action::Warn);
        let b = classify(&reversed, &[], &PolicySet::default(), Action::Warn);

        assert_eq!(a.groups[0].title, b.groups[0].title);
        assert_eq!(a.groups[0].example_urls, b.groups[0].example_urls);
        assert_eq!(
            a.groups[0].example_urls,
            vec!["http://t/1".to_string(), "http://t/2".to_string()]
        );
    }

    #[test]
    fn example_urls_capped_at_five() {
        let findings: Vec<Finding> = (0..8)
            .map(|i| finding("A", &format!("http://t/{}", i)))
            .collect();
        let c = classify(&findings, &[], &PolicySet::default(), Action::Warn);
        assert_eq!(c.groups[0].count, 8);
        assert_eq!(c.groups[0].example_urls.len(), 5);
    }

    proptest! {
        /// Classification is independent of the engine's finding order,
        /// including each group's representative title and example URLs.
        #[test]
        fn order_independent(indices in proptest::collection::vec(0usize..6, 0..24)) {
            // Three rules, two distinct instances each, so reordering
            // actually shuffles instances within a group.
            let pool: Vec<Finding> = (0..6)
                .map(|i| Finding {
                    rule_id: format!("1001{}", i % 3),
                    title: format!("Alert {}", i),
                    target_url: format!("http://t/{}", i),
                    raw: serde_json::Value::Null,
                })
                .collect();
            let findings: Vec<Finding> =
                indices.iter().map(|&i| pool[i].clone()).collect();
            let mut reversed = findings.clone();
            reversed.reverse();

            let rules = vec![rule("10010", "R0"), rule("10015", "R5")];
            let policy = PolicySet::parse("10011\tFAIL\t(x)\n10012\tIGNORE\t(x)\n");

            let a = classify(&findings, &rules, &policy, Action::Warn);
            let b = classify(&reversed, &rules, &policy, Action::Warn);

            prop_assert_eq!(a.summary, b.summary);
            let groups_a: Vec<_> = a.groups.iter()
                .map(|g| (g.rule_id.clone(), g.action, g.count, g.title.clone(), g.example_urls.clone()))
                .collect();
            let groups_b: Vec<_> = b.groups.iter()
                .map(|g| (g.rule_id.clone(), g.action, g.count, g.title.clone(), g.example_urls.clone()))
                .collect();
            prop_assert_eq!(groups_a, groups_b);
        }
    }
}
