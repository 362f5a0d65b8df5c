#[cfg(test)]
mod sidecars {
    use hedcheck::problem::IssueKind;
    use hedcheck::tabular::{validate_sidecar, Sidecar};
    use hedcheck::validator::FileValidator;

    use super::super::{expect_clean, expect_issue, kinds, schema};

    #[test]
    fn value_column_needs_placeholder() {
        let sidecar = Sidecar::from_json(r#"{ "speed": "Blue,Speed" }"#).unwrap();
        let (_, issues) = validate_sidecar(&sidecar, schema());

        let issue = expect_issue(&issues, IssueKind::MissingPlaceholder);
        assert_eq!(
            issue
                .parameters
                .sidecar_key
                .as_deref(),
            Some("speed")
        );
        assert_eq!(
            issue
                .parameters
                .string
                .as_deref(),
            Some("Blue,Speed")
        );
    }

    #[test]
    fn problems_name_their_column() {
        let sidecar = Sidecar::from_json(
            r#"{
                "color": { "red": "Red", "odd": "Blah" },
                "size": "Speed/# furlongs"
            }"#,
        )
        .unwrap();
        let (_, issues) = validate_sidecar(&sidecar, schema());

        assert_eq!(kinds(&issues), vec![IssueKind::InvalidTag, IssueKind::InvalidUnit]);
        let keys: Vec<_> = issues
            .iter()
            .map(|issue| {
                issue
                    .parameters
                    .sidecar_key
                    .as_deref()
            })
            .collect();
        assert_eq!(keys, vec![Some("color"), Some("size")]);
    }

    #[test]
    fn conflicting_sidecar_definitions() {
        let sidecar = Sidecar::from_json(
            r#"{
                "defs": {
                    "a": "(Definition/MyColor, (Red))",
                    "b": "(Definition/MyColor, (Blue))"
                }
            }"#,
        )
        .unwrap();
        let (_, issues) = FileValidator::new(schema(), sidecar);
        expect_issue(&issues, IssueKind::ConflictingDefinitions);
    }

    #[test]
    fn equivalent_sidecar_definitions() {
        let sidecar = Sidecar::from_json(
            r#"{
                "defs": {
                    "a": "(Definition/MyColor, (Red, Blue))",
                    "b": "(Definition/mycolor, (Blue, Red))"
                }
            }"#,
        )
        .unwrap();
        let (validator, issues) = FileValidator::new(schema(), sidecar);
        expect_clean(&issues);
        assert_eq!(
            validator
                .definitions()
                .len(),
            1
        );
    }
}
