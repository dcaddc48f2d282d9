use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// `{{ env.NAME }}` with an optional `| default("value")` suffix
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{\s*(?P<scope>[A-Za-z0-9_]+)\.(?P<name>[A-Za-z0-9_]+)\s*(?:\|\s*default\("(?P<default>[^"]*)"\))?\s*\}\}"#)
        .expect("placeholder pattern is valid")
});

/// Failure while substituting placeholders in the config text
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    #[error("line {line}: environment variable `{name}` is not set")]
    MissingVariable { line: usize, name: String },

    #[error("line {line}: unsupported placeholder scope `{scope}`, only `env` is available")]
    UnsupportedScope { line: usize, scope: String },
}

/// Substitute environment placeholders in raw TOML before parsing
///
/// Comment lines are left as written, so a commented-out key may reference
/// a variable that is not set.
pub fn expand_env(input: &str) -> Result<String, ExpandError> {
    let mut expanded: Vec<String> = Vec::new();

    for (index, line) in input.lines().enumerate() {
        if line.trim_start().starts_with('#') {
            expanded.push(line.to_owned());
        } else {
            expanded.push(expand_line(line, index + 1)?);
        }
    }

    let mut output = expanded.join("\n");
    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

fn expand_line(line: &str, line_number: usize) -> Result<String, ExpandError> {
    let mut failure = None;

    let replaced = PLACEHOLDER.replace_all(line, |caps: &Captures<'_>| {
        match resolve(caps, line_number) {
            Ok(value) => value,
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(replaced.into_owned()),
    }
}

fn resolve(caps: &Captures<'_>, line: usize) -> Result<String, ExpandError> {
    let scope = &caps["scope"];
    if scope != "env" {
        return Err(ExpandError::UnsupportedScope {
            line,
            scope: scope.to_owned(),
        });
    }

    let name = &caps["name"];
    std::env::var(name)
        .ok()
        .or_else(|| caps.name("default").map(|m| m.as_str().to_owned()))
        .ok_or_else(|| ExpandError::MissingVariable {
            line,
            name: name.to_owned(),
        })
}
