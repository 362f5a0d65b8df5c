#[cfg(test)]
mod samples {
    use std::fs;
    use std::path::Path;

    use hedcheck::parsing::ParseOptions;
    use hedcheck::problem::has_errors;
    use hedcheck::validator::validate_string;

    fn lines(filename: &str) -> Vec<String> {
        let path = Path::new("tests/samples/").join(filename);
        let content = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read samples {:?}: {:?}", path, e));

        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("//"))
            .map(String::from)
            .collect()
    }

    fn options() -> ParseOptions {
        ParseOptions {
            allow_definitions: true,
            ..ParseOptions::default()
        }
    }

    #[test]
    fn ensure_valid_samples_pass() {
        let samples = lines("valid.txt");
        assert!(!samples.is_empty(), "No valid samples found");

        let mut failures = Vec::new();

        for sample in &samples {
            let issues = validate_string(sample, super::super::schema(), &options());
            if has_errors(&issues) {
                failures.push((sample.clone(), issues));
            }
        }

        if !failures.is_empty() {
            for (sample, issues) in &failures {
                println!("\"{}\":", sample);
                for issue in issues {
                    println!("    {}", issue);
                }
            }
            panic!(
                "{} of {} valid samples reported errors",
                failures.len(),
                samples.len()
            );
        }
    }

    #[test]
    fn ensure_invalid_samples_fail() {
        let samples = lines("invalid.txt");
        assert!(!samples.is_empty(), "No invalid samples found");

        let mut unexpected = Vec::new();

        for sample in &samples {
            let issues = validate_string(sample, super::super::schema(), &options());
            if !has_errors(&issues) {
                unexpected.push(sample.clone());
            }
        }

        assert!(
            unexpected.is_empty(),
            "invalid samples accepted: {:?}",
            unexpected
        );
    }
}
