//! Human-facing views of a `Cast`.
//!
//! [`issues`] flattens a failure tree into leaf problems with a path from the
//! root (`$.tail.head`, `$[2]`, `$ <variant 1>`); [`render`] draws the same
//! tree indented, for terminals.
use std::fmt::Write as _;

use colored::Colorize;
use serde::Serialize;

use crate::cast::{Cast, Failure};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub path: String,
    pub expected: String,
    #[serde(serialize_with = "actual_json")]
    pub actual: Option<Value>,
}

fn actual_json<S: serde::Serializer>(actual: &Option<Value>, s: S) -> Result<S::Ok, S::Error> {
    actual.as_ref().map(Value::to_json).serialize(s)
}

/// Leaf problems of a cast, in tree order. Empty on success.
pub fn issues(cast: &Cast<'_>) -> Vec<Issue> {
    let mut out = Vec::new();
    collect(cast, &mut String::from("$"), &mut out);
    out
}

fn collect(cast: &Cast<'_>, path: &mut String, out: &mut Vec<Issue>) {
    let failure = match cast {
        Cast::Success { .. } => return,
        Cast::Unbound { symbol } => {
            out.push(Issue {
                path: path.clone(),
                expected: format!("binding for `{}`", symbol.description()),
                actual: None,
            });
            return;
        }
        Cast::Failure(failure) => failure,
    };

    let before = out.len();
    match failure {
        Failure::Array { items: Some(items), .. } | Failure::Tuple { items: Some(items), .. } => {
            for (i, item) in items.iter().enumerate() {
                descend(item, path, &format!("[{i}]"), out);
            }
        }
        Failure::Record { properties: Some(properties), .. }
        | Failure::Object { properties: Some(properties), .. } => {
            for (key, property) in properties {
                descend(property, path, &format!(".{key}"), out);
            }
        }
        Failure::Union { variants, .. } => {
            for (i, variant) in variants.iter().enumerate() {
                descend(variant, path, &format!(" <variant {i}>"), out);
            }
        }
        Failure::Intersection { results, .. } => {
            for (i, result) in results.iter().enumerate() {
                descend(result, path, &format!(" <member {i}>"), out);
            }
        }
        _ => {}
    }

    // a shape failure with no failing children is its own leaf
    if out.len() == before {
        out.push(Issue {
            path: path.clone(),
            expected: expectation(failure),
            actual: Some(failure.actual().clone()),
        });
    }
}

fn descend(cast: &Cast<'_>, path: &mut String, step: &str, out: &mut Vec<Issue>) {
    let len = path.len();
    path.push_str(step);
    ensure_sufficient_stack(|| collect(cast, path, out));
    path.truncate(len);
}

fn expectation(failure: &Failure<'_>) -> String {
    match failure {
        Failure::Tuple { length, items: None, .. } => format!("tuple of length {length}"),
        Failure::Enumeration { values, .. } => {
            let values: Vec<String> = values.iter().map(ToString::to_string).collect();
            format!("one of {}", values.join(", "))
        }
        other => other.expected().to_owned(),
    }
}

/// Indented, colored tree of a cast result.
pub fn render(cast: &Cast<'_>) -> String {
    let mut out = String::new();
    draw(cast, "", 0, &mut out);
    out
}

fn draw(cast: &Cast<'_>, label: &str, depth: usize, out: &mut String) {
    ensure_sufficient_stack(|| {
        let indent = "  ".repeat(depth);
        let _ = match cast {
            Cast::Success { values } => {
                let noun = if values.len() == 1 { "candidate" } else { "candidates" };
                writeln!(out, "{indent}{label}{} ({} {noun})", "ok".green(), values.len())
            }
            Cast::Unbound { symbol } => {
                writeln!(out, "{indent}{label}{} `{}`", "unbound".yellow(), symbol.description())
            }
            Cast::Failure(failure) => writeln!(
                out,
                "{indent}{label}{} {} {}",
                "expected".red(),
                expectation(failure).as_str().bold(),
                format!("got {}", failure.actual()).as_str().dimmed(),
            ),
        };

        let Cast::Failure(failure) = cast else { return };
        match failure {
            Failure::Array { items: Some(items), .. } | Failure::Tuple { items: Some(items), .. } => {
                for (i, item) in items.iter().enumerate().filter(|(_, c)| !c.is_success()) {
                    draw(item, &format!("[{i}]: "), depth + 1, out);
                }
            }
            Failure::Record { properties: Some(properties), .. }
            | Failure::Object { properties: Some(properties), .. } => {
                for (key, property) in properties.iter().filter(|(_, c)| !c.is_success()) {
                    draw(property, &format!(".{key}: "), depth + 1, out);
                }
            }
            Failure::Union { variants, .. } => {
                for (i, variant) in variants.iter().enumerate() {
                    draw(variant, &format!("<variant {i}>: "), depth + 1, out);
                }
            }
            Failure::Intersection { results, .. } => {
                for (i, result) in results.iter().enumerate().filter(|(_, c)| !c.is_success()) {
                    draw(result, &format!("<member {i}>: "), depth + 1, out);
                }
            }
            _ => {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::fix_one;
    use crate::types::*;
    use crate::value::Symbol;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn issue(path: &str, expected: &str, actual: serde_json::Value) -> Issue {
        Issue { path: path.into(), expected: expected.into(), actual: Some(Value::from(actual)) }
    }

    #[test]
    fn success_has_no_issues() {
        assert!(issues(&string().cast(&Value::from("a"))).is_empty());
    }

    #[test]
    fn paths_follow_indices_and_keys() {
        let ty = object([("name", string()), ("tags", array(string()))]);
        let input = Value::from(json!({"name": 1, "tags": ["a", 2, "c", false]}));
        let cast = ty.cast(&input);
        assert_eq!(
            issues(&cast),
            vec![
                issue("$.name", "string", json!(1)),
                issue("$.tags[1]", "string", json!(2)),
                issue("$.tags[3]", "string", json!(false)),
            ]
        );
    }

    #[test]
    fn union_variants_are_all_listed() {
        let list = fix_one("list", |me| nullable(object([("head", number()), ("tail", me)]))).unwrap();
        let input = Value::from(json!({"head": "x", "tail": null}));
        let cast = list.cast(&input);
        assert_eq!(
            issues(&cast),
            vec![
                issue("$ <variant 0>.head", "number", json!("x")),
                issue("$ <variant 1>", "null", json!({"head": "x", "tail": null})),
            ]
        );
    }

    #[test]
    fn shape_failures_are_leaves() {
        let input = Value::from(json!(["a"]));
        let cast = tuple([string(), number()]).cast(&input);
        assert_eq!(issues(&cast), vec![issue("$", "tuple of length 2", json!(["a"]))]);

        let input = Value::from("c");
        let cast = enumeration(["a", "b"]).cast(&input);
        assert_eq!(issues(&cast), vec![issue("$", r#"one of "a", "b""#, json!("c"))]);
    }

    #[test]
    fn intersection_members_and_unbound_references() {
        let stray = Symbol::new("stray");
        let ty = intersection([object([("a", number())]), reference(stray)]);
        let input = Value::from(json!({"a": 1}));
        let cast = ty.cast(&input);
        assert_eq!(
            issues(&cast),
            vec![Issue { path: "$ <member 1>".into(), expected: "binding for `stray`".into(), actual: None }]
        );
    }

    #[test]
    fn issues_serialize_with_json_actuals() {
        let input = Value::Undefined;
        let cast = number().cast(&input);
        let json = serde_json::to_value(issues(&cast)).unwrap();
        assert_eq!(json, json!([{"path": "$", "expected": "number", "actual": null}]));
    }

    #[test]
    fn render_indents_failing_children_only() {
        colored::control::set_override(false);
        let ty = object([("a", number()), ("b", array(string()))]);
        let text = render(&ty.cast(&Value::from(json!({"a": 1, "b": ["x", 2]}))));
        assert_eq!(
            text,
            concat!(
                "expected object got {\"a\": 1, \"b\": [\"x\", 2]}\n",
                "  .b: expected array got [\"x\", 2]\n",
                "    [1]: expected string got 2\n",
            )
        );
        assert_eq!(render(&number().cast(&Value::from(1))), "ok (1 candidate)\n");
    }
}
