use clap::{Arg, ArgAction, ArgMatches, Command};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::Path;
use tracing::{debug, Level};

use hedcheck::formatting::{format_with_renderer, render, Identity, Render, Terminal};
use hedcheck::language::Form;
use hedcheck::parsing::{self, parse, ParseOptions};
use hedcheck::problem::{concise_issue, full_issue, has_errors, Issue};
use hedcheck::schema::{canonicalize, Schema};
use hedcheck::tabular::{Sidecar, TabularFile};
use hedcheck::validator::{validate_string, FileValidator};

fn main() {
    const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

    let schema = Arg::new("schema")
        .long("schema")
        .short('s')
        .required(true)
        .help("The JSON file describing the schema to validate against.");

    let json = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print issues as JSON records rather than for a human reader.");

    let concise = Arg::new("concise")
        .long("concise")
        .action(ArgAction::SetTrue)
        .help("Print each issue on a single line.");

    let raw = Arg::new("raw-control-chars")
        .short('R')
        .long("raw-control-chars")
        .action(ArgAction::SetTrue)
        .help("Emit ANSI escape codes for highlighting even if output is redirected to a pipe or file.");

    let matches = Command::new("hedcheck")
        .version(VERSION)
        .propagate_version(true)
        .author("Andrew Cowie")
        .about("Validate HED event annotations.")
        .disable_help_subcommand(true)
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log the progress of validation to stderr."),
        )
        .subcommand(
            Command::new("check")
                .about("Validate a single annotation string")
                .arg(schema.clone())
                .arg(json.clone())
                .arg(concise.clone())
                .arg(raw.clone())
                .arg(
                    Arg::new("annotation")
                        .required(true)
                        .help("The annotation to check, for example \"Sensory-event, (Red, Circle)\"."),
                ),
        )
        .subcommand(
            Command::new("convert")
                .about("Rewrite the tags of an annotation in short or long form")
                .arg(schema.clone())
                .arg(
                    Arg::new("long")
                        .long("long")
                        .action(ArgAction::SetTrue)
                        .help("Write every tag with its full path from the schema root."),
                )
                .arg(json.clone())
                .arg(raw.clone())
                .arg(
                    Arg::new("annotation")
                        .required(true)
                        .help("The annotation to convert."),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a tab-separated events file and its sidecar")
                .arg(schema)
                .arg(
                    Arg::new("sidecar")
                        .long("sidecar")
                        .help("The merged JSON sidecar annotating the file's columns."),
                )
                .arg(json)
                .arg(concise)
                .arg(raw)
                .arg(
                    Arg::new("filename")
                        .required(true)
                        .help("The tab-separated file of events to validate."),
                ),
        )
        .get_matches();

    let level = if matches.get_flag("debug") {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    debug!("hedcheck {}", VERSION);

    match matches.subcommand() {
        Some(("check", submatches)) => {
            let schema = load_schema(submatches);
            let annotation = argument(submatches, "annotation");
            let options = ParseOptions {
                allow_definitions: true,
                ..ParseOptions::default()
            };

            let issues = validate_string(annotation, &schema, &options);
            let failed = report(&issues, "input", submatches);

            if !failed && !submatches.get_flag("json") {
                let result = parse(annotation, &schema, &options);
                if let Some(parsed) = result.parsed {
                    let renderer = renderer(submatches);
                    println!(
                        "{}",
                        render(renderer, format_with_renderer(&parsed, Form::Short))
                    );
                }
            }

            if failed {
                std::process::exit(1);
            }
        }
        Some(("convert", submatches)) => {
            let schema = load_schema(submatches);
            let annotation = argument(submatches, "annotation");
            let form = if submatches.get_flag("long") {
                Form::Long
            } else {
                Form::Short
            };

            let (converted, issues) = canonicalize(annotation, &schema, form);
            let failed = report(&issues, "input", submatches);
            if failed {
                std::process::exit(1);
            }
            println!("{}", converted);
        }
        Some(("validate", submatches)) => {
            let schema = load_schema(submatches);
            let filename = Path::new(argument(submatches, "filename"));

            let sidecar = match submatches.get_one::<String>("sidecar") {
                Some(path) => {
                    let path = Path::new(path);
                    let content = load(path);
                    match Sidecar::from_json(&content) {
                        Ok(sidecar) => sidecar,
                        Err(error) => {
                            eprintln!(
                                "{}: Unable to read sidecar {}: {}",
                                "error".bright_red(),
                                path.display(),
                                error
                            );
                            std::process::exit(1);
                        }
                    }
                }
                None => Sidecar::default(),
            };

            let content = load(filename);
            let file = TabularFile::from_tsv(&content);

            let (validator, issues) = FileValidator::new(&schema, sidecar);
            let mut failed = report(&issues, "sidecar", submatches);

            let issues = validator.validate(&file);
            let origin = filename
                .display()
                .to_string();
            failed |= report(&issues, &origin, submatches);

            if failed {
                std::process::exit(1);
            }
        }
        Some(_) => {
            println!("No valid subcommand was used")
        }
        None => {
            println!("usage: hedcheck [COMMAND] ...");
            println!("Try '--help' for more information.");
        }
    }
}

fn argument<'a>(submatches: &'a ArgMatches, name: &str) -> &'a str {
    submatches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

fn load(filename: &Path) -> String {
    match parsing::load(filename) {
        Ok(content) => content,
        Err(error) => {
            eprintln!("{}: {}", "error".bright_red(), error);
            std::process::exit(1);
        }
    }
}

fn load_schema(submatches: &ArgMatches) -> Schema {
    let filename = Path::new(argument(submatches, "schema"));
    let content = load(filename);

    match Schema::from_json(&content) {
        Ok(schema) => {
            debug!("loaded schema {}", schema.version());
            schema
        }
        Err(error) => {
            eprintln!(
                "{}: Unable to read schema {}: {}",
                "error".bright_red(),
                filename.display(),
                error
            );
            std::process::exit(1);
        }
    }
}

fn renderer(submatches: &ArgMatches) -> &'static dyn Render {
    let raw = submatches
        .try_get_one::<bool>("raw-control-chars")
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false);

    if raw || std::io::stdout().is_terminal() {
        &Terminal
    } else {
        &Identity
    }
}

/// Print the issues in the requested presentation, returning whether any of
/// them were errors.
fn report(issues: &[Issue], origin: &str, submatches: &ArgMatches) -> bool {
    if submatches.get_flag("json") {
        let records: Vec<_> = issues
            .iter()
            .map(Issue::to_record)
            .collect();
        match serde_json::to_string_pretty(&records) {
            Ok(text) => println!("{}", text),
            Err(error) => eprintln!("{}: {}", "error".bright_red(), error),
        }
    } else {
        let renderer = renderer(submatches);
        let concise = submatches
            .try_get_one::<bool>("concise")
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false);

        for issue in issues {
            if concise {
                println!("{}", concise_issue(issue, origin, renderer));
            } else {
                println!("{}\n", full_issue(issue, origin, renderer));
            }
        }
    }

    has_errors(issues)
}
