//! Minimal CLI: schema + documents → verdicts
use std::io::Read as _;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;

use json_cast::document::{self, Schema};
use json_cast::report;
use json_cast::{Cast, Value};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// cast JSON/NDJSON documents against a schema document and report every reading or every failure
#[derive(Parser, Debug)]
#[command(version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// cast every input document against the schema root
    Check(CheckOut),
    /// print the closed root descriptor and every definition
    Describe(DescribeOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
enum ReportFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// schema document (.json)
    #[arg(long, short)]
    schema: PathBuf,

    /// verdict format
    #[arg(long, value_enum, default_value_t)]
    report: ReportFormat,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct DescribeOut {
    /// schema document (.json)
    #[arg(long, short)]
    schema: PathBuf,
}

/// Process-level verdict, mapped to the exit code by `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
}

/// One input document, labelled by where it came from.
#[derive(Debug)]
struct Document {
    source: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for source_path in resolve_file_path_patterns(&self.input)? {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = read_source(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;

            let parsed: Vec<(String, serde_json::Value)> = if self.ndjson {
                source
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(ix, line)| {
                        let label = format!("{source_path_str}:{}", ix + 1);
                        serde_json::from_str::<serde_json::Value>(line)
                            .with_context(|| format!("failed to parse NDJSON line ({label})"))
                            .map(|value| (label, value))
                    })
                    .collect::<Result<_>>()?
            } else {
                let value = serde_json::from_str::<serde_json::Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                vec![(source_path_str, value)]
            };

            for (label, value) in parsed {
                self.select(label, value, &mut documents)?;
            }
        }
        tracing::debug!(documents = documents.len(), "loaded inputs");
        Ok(documents)
    }

    /// Apply `--json-pointer` then `--jq-expr` to one parsed document.
    fn select(&self, label: String, value: serde_json::Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {pointer} selects nothing in ({label})"))?,
        };
        match self.jq_expr.as_ref() {
            None => out.push(Document { source: label, value: Value::from(value) }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to ({label})"))?;
                let fan_out = results.len() > 1;
                for (ix, value) in results.into_iter().enumerate() {
                    let source = if fan_out { format!("{label}#{ix}") } else { label.clone() };
                    out.push(Document { source, value: Value::from(value) });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<Outcome> {
        match &self.cmd {
            Command::Check(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(Outcome::Passed);
                }
                let schema = load_schema(&target.schema)?;
                let documents = target.input_settings.load()?;
                let verdicts = check(&schema, &documents);

                let failed = verdicts.iter().filter(|(_, cast)| !cast.is_success()).count();
                let rendered = match target.report {
                    ReportFormat::Pretty => render_pretty(&verdicts),
                    ReportFormat::Json => serde_json::to_string_pretty(&render_json(&verdicts))?,
                };
                emit(target.out.as_deref(), &rendered)?;
                eprintln!(
                    "{} of {} documents passed",
                    verdicts.len() - failed,
                    verdicts.len()
                );
                Ok(if failed == 0 { Outcome::Passed } else { Outcome::Failed })
            }
            Command::Describe(target) => {
                let schema = load_schema(&target.schema)?;
                println!("{} {}", "root:".bold(), schema.root);
                for (name, ty) in &schema.definitions {
                    println!("{} ({} binders): {ty}", name.bold(), ty.binders());
                }
                Ok(Outcome::Passed)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_schema(path: &Path) -> Result<Schema> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read schema file ({})", path.display()))?;
    document::load_slice(&bytes)
        .with_context(|| format!("invalid schema document ({})", path.display()))
}

fn check<'d>(schema: &Schema, documents: &'d [Document]) -> Vec<(&'d Document, Cast<'d>)> {
    documents
        .par_iter()
        .map(|doc| (doc, schema.root.cast(&doc.value)))
        .collect()
}

fn render_pretty(verdicts: &[(&Document, Cast<'_>)]) -> String {
    let mut out = String::new();
    for (doc, cast) in verdicts {
        match cast.values() {
            Some(values) => {
                out.push_str(&format!("✅ {} ({} candidates)\n", doc.source, values.len()));
            }
            None => {
                out.push_str(&format!("❌ {}\n", doc.source.red()));
                for line in report::render(cast).lines() {
                    out.push_str(&format!("    {line}\n"));
                }
            }
        }
    }
    out
}

fn render_json(verdicts: &[(&Document, Cast<'_>)]) -> serde_json::Value {
    verdicts
        .iter()
        .map(|(doc, cast)| {
            serde_json::json!({
                "source": doc.source,
                "result": cast.to_json(),
                "issues": report::issues(cast),
            })
        })
        .collect()
}

fn emit(out: Option<&Path>, rendered: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, rendered)
                .with_context(|| format!("failed to write ({})", out.display()))
        }
        None => {
            print!("{rendered}");
            Ok(())
        }
    }
}

fn read_source(path: &Path) -> std::io::Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        std::fs::read_to_string(path)
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let before = out.len();
        for entry in glob::glob(pattern)? {
            out.push(entry?);
        }
        if out.len() == before {
            bail!("glob pattern matched no files: {pattern}");
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn settings(json_pointer: Option<&str>, jq_expr: Option<&str>) -> InputSettings {
        InputSettings {
            ndjson: false,
            json_pointer: json_pointer.map(str::to_owned),
            jq_expr: jq_expr.map(str::to_owned),
            input: vec![],
        }
    }

    #[test]
    fn pointer_then_jq_selects_documents() {
        let mut out = Vec::new();
        settings(Some("/data"), Some(".[]"))
            .select("in.json".into(), json!({"data": [1, 2]}), &mut out)
            .unwrap();
        let got: Vec<_> = out.iter().map(|d| (d.source.as_str(), d.value.to_json())).collect();
        assert_eq!(got, vec![("in.json#0", json!(1)), ("in.json#1", json!(2))]);

        let err = settings(Some("/missing"), None).select("in.json".into(), json!({}), &mut out);
        assert!(err.is_err());
    }

    #[test]
    fn verdicts_cover_every_document() {
        let schema = document::load(r#"{"root": {"array": "number"}}"#).unwrap();
        let documents = vec![
            Document { source: "a".into(), value: Value::from(json!([1, 2])) },
            Document { source: "b".into(), value: Value::from(json!([1, "x"])) },
        ];
        let verdicts = check(&schema, &documents);
        assert_eq!(verdicts.iter().map(|(_, c)| c.is_success()).collect::<Vec<_>>(), [true, false]);

        let report = render_json(&verdicts);
        assert_eq!(report[1]["issues"], json!([{"path": "$[1]", "expected": "number", "actual": "x"}]));
    }

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["a.json", "-"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.json"), PathBuf::from("-")]);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        CommandLineInterface::command().debug_assert();
    }
}
