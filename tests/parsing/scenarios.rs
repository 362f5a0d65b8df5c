#[cfg(test)]
mod scenarios {
    use hedcheck::definitions::DefinitionManager;
    use hedcheck::language::Form;
    use hedcheck::parsing::{parse, ParseOptions};
    use hedcheck::problem::{Issue, IssueKind};
    use hedcheck::schema::canonicalize;

    use super::super::schema;

    fn kinds(issues: &[Issue]) -> Vec<IssueKind> {
        issues
            .iter()
            .map(|issue| issue.kind)
            .collect()
    }

    #[test]
    fn short_form_of_child() {
        let (converted, issues) = canonicalize("Event/Sensory-event", schema(), Form::Short);
        assert_eq!(converted, "Sensory-event");
        assert!(issues.is_empty());
    }

    #[test]
    fn repeated_parent_path() {
        let text = "Item/Object/Geometric-object/Item/Object/Geometric-object";
        let result = parse(text, schema(), &ParseOptions::default());
        assert!(result
            .parsed
            .is_none());
        assert_eq!(kinds(&result.errors), vec![IssueKind::InvalidParentNode]);
        assert_eq!(
            result.errors[0]
                .parameters
                .string
                .as_deref(),
            Some(text)
        );
    }

    #[test]
    fn definition_expansion() {
        let schema = schema();
        let (definitions, issues) = DefinitionManager::create_definitions(
            &["(Definition/Acc/#, (Acceleration/# m-per-s^2, Red))"],
            schema,
        );
        assert!(issues.is_empty());

        let mut manager = DefinitionManager::new();
        assert!(manager
            .add_definitions(definitions)
            .is_empty());

        let result = parse("Def/Acc/5.4", schema, &ParseOptions::default());
        let parsed = result
            .parsed
            .unwrap();
        let tag = parsed
            .tags()
            .next()
            .unwrap();
        let expansion = manager
            .evaluate_tag(tag, schema, false)
            .unwrap();
        assert_eq!(expansion.render(Form::Short), "Acceleration/5.4 m-per-s^2,Red");
        assert!(manager
            .validate_defs(&parsed, schema, false)
            .is_empty());

        let result = parse("Def/Acc", schema, &ParseOptions::default());
        let parsed = result
            .parsed
            .unwrap();
        assert_eq!(
            kinds(&manager.validate_defs(&parsed, schema, false)),
            vec![IssueKind::MissingDefinitionForDef]
        );
    }

    #[test]
    fn errors_keep_original_offsets() {
        let text = "  Red,   Blah";
        let result = parse(text, schema(), &ParseOptions::default());
        assert_eq!(kinds(&result.errors), vec![IssueKind::InvalidTag]);

        let [start, end] = result.errors[0]
            .parameters
            .bounds
            .unwrap();
        assert_eq!(&text[start..end], "Blah");
    }

    #[test]
    fn wire_format() {
        let result = parse("Red, Blah", schema(), &ParseOptions::default());
        let record = result.errors[0].to_record();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["internalCode"], "invalidTag");
        assert_eq!(json["hedCode"], "TAG_INVALID");
        assert_eq!(json["level"], "error");
        assert_eq!(json["parameters"]["tag"], "Blah");
        assert_eq!(json["parameters"]["bounds"], serde_json::json!([5, 9]));
        assert!(json["parameters"]
            .get("sidecarKey")
            .is_none());
    }
}
