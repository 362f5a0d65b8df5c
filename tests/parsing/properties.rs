#[cfg(test)]
mod properties {
    use hedcheck::checking::duplicates;
    use hedcheck::language::Form;
    use hedcheck::parsing::{parse, ParseOptions};
    use hedcheck::problem::{has_errors, IssueKind};
    use hedcheck::schema::{canonicalize, Lookup};

    use super::super::schema;

    #[test]
    fn short_and_long_forms_round_trip() {
        let schema = schema();
        let mut checked = 0;
        let mut qualified = 0;

        for entry in schema.entries() {
            if entry
                .attributes
                .require_child
            {
                continue;
            }
            let (long, issues) = canonicalize(&entry.short_name, schema, Form::Long);
            assert!(!has_errors(&issues), "{}: {:?}", entry.short_name, issues);
            assert_eq!(long, entry.long_name);
            let (short, _) = canonicalize(&long, schema, Form::Short);
            assert_eq!(short, entry.short_name);
            if !matches!(schema.lookup(&entry.name), Lookup::Unique(_)) {
                qualified += 1;
            }

            checked += 1;
        }

        assert!(checked > 20);
        assert_eq!(qualified, 2);
    }

    #[test]
    fn canonicalizing_is_idempotent() {
        let schema = schema();
        let samples = [
            "Event/Sensory-event, (Red, Circle)",
            "Sensory-property/Color/Red, Object/Geometric-object/2D-shape/Circle/Oval",
            "(Speed/5 mph, (Label/one, Blue))",
            "Def/MyColor, (Def-expand/MyColor, (Green))",
        ];

        for sample in samples {
            for form in [Form::Short, Form::Long] {
                let (once, issues) = canonicalize(sample, schema, form);
                assert!(
                    issues
                        .iter()
                        .all(|issue| !issue.is_error()),
                    "unexpected issues for {}: {:?}",
                    sample,
                    issues
                );
                let (twice, _) = canonicalize(&once, schema, form);
                assert_eq!(once, twice);
            }
        }
    }

    fn permutations(items: &[&str]) -> Vec<Vec<String>> {
        if items.len() <= 1 {
            return vec![items
                .iter()
                .map(|item| item.to_string())
                .collect()];
        }

        let mut result = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let first = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, first.to_string());
                result.push(tail);
            }
        }
        result
    }

    #[test]
    fn duplicates_ignore_order() {
        let schema = schema();
        let children = ["Red", "(Blue, Circle)", "Sensory-event", "((Green), Device)"];
        let options = ParseOptions {
            check_duplicates: false,
            ..ParseOptions::default()
        };

        let groups: Vec<String> = permutations(&children)
            .into_iter()
            .map(|order| format!("({})", order.join(", ")))
            .collect();
        assert_eq!(groups.len(), 24);

        let original = &groups[0];
        for other in &groups {
            let text = format!("{}, {}", original, other);
            let result = parse(&text, schema, &options);
            let parsed = result
                .parsed
                .unwrap();

            let issues = duplicates::check(&parsed);
            assert_eq!(issues.len(), 1, "for {}", text);
            assert_eq!(issues[0].kind, IssueKind::DuplicateGroup);
        }
    }

    #[test]
    fn nested_order_is_irrelevant() {
        let schema = schema();
        let forms = [
            "(Red, (Blue, Circle))",
            "(Red, (Circle, Blue))",
            "((Blue, Circle), Red)",
        ];

        let normalized: Vec<String> = forms
            .iter()
            .map(|form| {
                parse(form, schema, &ParseOptions::default())
                    .parsed
                    .unwrap()
                    .normalized()
            })
            .collect();

        assert_eq!(normalized[0], normalized[1]);
        assert_eq!(normalized[1], normalized[2]);
    }
}
