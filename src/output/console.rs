use crate::classify::Classification;

/// Render the run verdict as line-oriented console output.
///
/// `detailed` controls the optional parts: the URL total, the per-rule PASS
/// lines and the example URLs under each group. The summary line is always
/// present.
pub fn render(classification: &Classification, detailed: bool) -> String {
    let mut out = String::new();
    let summary = &classification.summary;

    if detailed {
        out.push_str(&format!("Total of {} URLs\n", summary.urls_visited));
        for rule in &classification.passes {
            out.push_str(&format!("PASS: {} [{}]\n", rule.display_name, rule.rule_id));
        }
    }

    for group in &classification.groups {
        out.push_str(&format!(
            "{}: {} [{}] x {}\n",
            group.action, group.title, group.rule_id, group.count
        ));
        if detailed {
            for url in &group.example_urls {
                out.push_str(&format!("\t{}\n", url));
            }
        }
    }

    out.push_str(&format!(
        "FAIL: {}\tWARN: {}\tINFO: {}\tIGNORE: {}\tPASS: {}\n",
        summary.fail, summary.warn, summary.info, summary.ignore, summary.pass
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::engine::{Finding, Rule};
    use crate::policy::{Action, PolicySet};
    use pretty_assertions::assert_eq;

    fn sample() -> Classification {
        let findings = vec![
            Finding {
                rule_id: "10010".into(),
                title: "Cookie No HttpOnly Flag".into(),
                target_url: "http://t/login".into(),
                raw: serde_json::Value::Null,
            },
            Finding {
                rule_id: "10010".into(),
                title: "Cookie No HttpOnly Flag".into(),
                target_url: "http://t/admin".into(),
                raw: serde_json::Value::Null,
            },
        ];
        let rules = vec![
            Rule {
                rule_id: "10010".into(),
                display_name: "Cookie No HttpOnly Flag".into(),
            },
            Rule {
                rule_id: "10020".into(),
                display_name: "X-Frame-Options Header Not Set".into(),
            },
        ];
        let policy = PolicySet::parse("10010\tFAIL\t(x)\n");
        let mut c = classify(&findings, &rules, &policy, Action::Warn);
        c.summary.urls_visited = 4;
        c
    }

    #[test]
    fn detailed_output_lists_passes_and_urls() {
        let text = render(&sample(), true);
        assert_eq!(
            text,
            "Total of 4 URLs\n\
             PASS: X-Frame-Options Header Not Set [10020]\n\
             FAIL: Cookie No HttpOnly Flag [10010] x 2\n\
             \thttp://t/admin\n\
             \thttp://t/login\n\
             FAIL: 1\tWARN: 0\tINFO: 0\tIGNORE: 0\tPASS: 1\n"
        );
    }

    #[test]
    fn short_output_suppresses_passes_and_urls() {
        let text = render(&sample(), false);
        assert_eq!(
            text,
            "FAIL: Cookie No HttpOnly Flag [10010] x 2\n\
             FAIL: 1\tWARN: 0\tINFO: 0\tIGNORE: 0\tPASS: 1\n"
        );
    }
}
