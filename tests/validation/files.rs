#[cfg(test)]
mod files {
    use hedcheck::problem::IssueKind;
    use hedcheck::tabular::{Sidecar, TabularFile};
    use hedcheck::validator::FileValidator;

    use super::super::{expect_clean, expect_issue, kinds, schema};

    fn sidecar() -> Sidecar {
        Sidecar::from_json(
            r#"{
                "trial_type": {
                    "start": "Sensory-event, (Onset, Def/MyColor)",
                    "end": "Sensory-event, (Offset, Def/MyColor)",
                    "response": "Agent-action, (Human-agent, Device)"
                },
                "definitions": {
                    "color": "(Definition/MyColor, (Red))",
                    "acc": "(Definition/Acc/#, (Acceleration/# m-per-s^2, Red))"
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn simultaneous_onsets() {
        let (validator, issues) = FileValidator::new(schema(), sidecar());
        expect_clean(&issues);

        let file = TabularFile::from_tsv(
            "onset\tduration\tHED\n\
             4.5\tn/a\t(Onset, Def/MyColor, (Red))\n\
             4.5\tn/a\t(Onset, Def/MyColor, (Blue))\n",
        );
        let issues = validator.validate(&file);

        let issue = expect_issue(&issues, IssueKind::SimultaneousDuplicateEvents);
        assert_eq!(
            issue
                .parameters
                .tsv_line
                .as_deref(),
            Some("2, 3")
        );
    }

    #[test]
    fn paired_intervals() {
        let (validator, _) = FileValidator::new(schema(), sidecar());
        let file = TabularFile::from_tsv(
            "onset\ttrial_type\tHED\n\
             1.0\tstart\tn/a\n\
             1.5\tresponse\tDef/Acc/3\n\
             2.0\tend\tn/a\n",
        );
        expect_clean(&validator.validate(&file));
    }

    #[test]
    fn swapped_intervals() {
        let (validator, _) = FileValidator::new(schema(), sidecar());
        let file = TabularFile::from_tsv(
            "onset\ttrial_type\n\
             1.0\tend\n\
             2.0\tstart\n",
        );
        let issues = validator.validate(&file);
        let issue = expect_issue(&issues, IssueKind::InactiveOnset);
        assert_eq!(
            issue
                .parameters
                .tsv_line
                .as_deref(),
            Some("2")
        );
    }

    #[test]
    fn unreadable_onset() {
        let (validator, _) = FileValidator::new(schema(), sidecar());
        let file = TabularFile::from_tsv(
            "onset\ttrial_type\n\
             soon\tresponse\n",
        );
        let issues = validator.validate(&file);
        expect_issue(&issues, IssueKind::InvalidOnset);
    }

    #[test]
    fn missing_categories() {
        let (validator, _) = FileValidator::new(schema(), sidecar());
        let file = TabularFile::from_tsv(
            "onset\ttrial_type\n\
             1.0\tpause\n",
        );
        let issues = validator.validate(&file);
        let issue = expect_issue(&issues, IssueKind::SidecarKeyMissing);
        assert!(!issue.is_error());
        assert_eq!(
            issue
                .parameters
                .detail
                .as_deref(),
            Some("pause")
        );
    }

    #[test]
    fn temporal_tags_need_onsets() {
        let (validator, _) = FileValidator::new(schema(), sidecar());
        let file = TabularFile::from_tsv(
            "trial_type\n\
             start\n\
             response\n",
        );
        let issues = validator.validate(&file);
        expect_issue(&issues, IssueKind::TemporalTagInNonTemporalContext);
    }

    #[test]
    fn definitions_outside_sidecar_are_unknown() {
        let (validator, _) = FileValidator::new(schema(), sidecar());
        let file = TabularFile::from_tsv(
            "onset\tHED\n\
             1.0\tDef/Other\n\
             2.0\t(Def-expand/Acc/3, (Acceleration/4 m-per-s^2, Red))\n",
        );
        let issues = validator.validate(&file);
        assert_eq!(
            kinds(&issues),
            vec![
                IssueKind::MissingDefinitionForDef,
                IssueKind::DefExpandContentsInvalid
            ]
        );
    }

    #[test]
    fn definitions_are_not_allowed_in_rows() {
        let (validator, _) = FileValidator::new(schema(), sidecar());
        let file = TabularFile::from_tsv(
            "onset\tHED\n\
             1.0\t(Definition/Extra, (Blue))\n",
        );
        let issues = validator.validate(&file);
        expect_issue(&issues, IssueKind::IllegalDefinitionContext);
    }
}
