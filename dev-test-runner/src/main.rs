//! Runs every `fixtures/<case>/schema.json` against its `valid/` and
//! `invalid/` documents. Valid documents must cast; invalid ones must not.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use json_cast::{document, report, Value};

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures");

fn main() -> ExitCode {
    match run() {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            eprintln!("{}", format!("{failures} fixture(s) failed").red());
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<usize> {
    let mut failures = 0;
    for schema_path in glob::glob(&format!("{FIXTURES}/*/schema.json"))? {
        let schema_path = schema_path?;
        let case = schema_path.parent().context("schema.json has a parent directory")?;
        let source = std::fs::read_to_string(&schema_path)
            .with_context(|| format!("failed to read {}", schema_path.display()))?;
        let schema = document::load(&source)
            .with_context(|| format!("invalid schema document {}", schema_path.display()))?;

        eprintln!("—— {} ——", case.display());
        for (expect_success, dir) in [(true, "valid"), (false, "invalid")] {
            for path in documents(case, dir)? {
                let text = std::fs::read_to_string(&path)?;
                let json: serde_json::Value = serde_json::from_str(&text)
                    .with_context(|| format!("failed to parse {}", path.display()))?;
                let input = Value::from(json);
                let cast = schema.root.cast(&input);
                let name = path.file_name().unwrap_or_default().to_string_lossy();
                if cast.is_success() == expect_success {
                    eprintln!("✅ {dir}/{name}");
                } else {
                    failures += 1;
                    eprintln!("❌ {dir}/{name}");
                    eprint!("{}", report::render(&cast));
                }
            }
        }
    }
    Ok(failures)
}

fn documents(case: &Path, dir: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/{dir}/*.json", case.display());
    Ok(glob::glob(&pattern)?.collect::<Result<Vec<_>, _>>()?)
}
