use crate::registry::ClassRegistry;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Command;

/// `    <name>    REG_SZ    <data>`
static VALUE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+(.*?)\s+REG_SZ\s+(.*)$").expect("value line pattern"));

/// [`ClassRegistry`] backed by the `reg query` command line tool.
///
/// Every lookup spawns the tool; a key that can't be queried reads as absent.
#[derive(Debug, Clone)]
pub struct RegQueryRegistry {
    program: String,
}

impl RegQueryRegistry {
    pub fn new() -> Self {
        Self {
            program: "reg".to_owned(),
        }
    }

    /// Use `program` instead of `reg`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn query(&self, key: &str) -> Option<String> {
        let output = match Command::new(&self.program).args(["query", key]).output() {
            Ok(output) => output,
            Err(e) => {
                log::debug!("running '{} query {key}' failed: {e}", self.program);
                return None;
            }
        };

        // A non-zero exit usually means the key does not exist.
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for RegQueryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry for RegQueryRegistry {
    fn default_value(&self, key: &str) -> Option<String> {
        parse_value(&self.query(key)?, key, None)
    }

    fn subkeys(&self, key: &str) -> Option<Vec<String>> {
        Some(parse_subkeys(&self.query(key)?, key))
    }
}

/// Find a value of `key` in `reg query` output.
///
/// With `value_name == None` the default value is returned. Its name is
/// printed as `<NO NAME>` on older systems and as a localized, parenthesised
/// word such as `(Default)` or `(Standard)` on newer ones.
pub(crate) fn parse_value(output: &str, key: &str, value_name: Option<&str>) -> Option<String> {
    let start = output
        .lines()
        .position(|line| line.trim_end().eq_ignore_ascii_case(key))?;

    for line in output.lines().skip(start + 1) {
        let captures = VALUE_LINE.captures(line)?;
        let name = captures[1].trim();
        let matches = match value_name {
            Some(wanted) => name == wanted,
            None => name == "<NO NAME>" || name.starts_with('('),
        };
        if matches {
            return Some(captures[2].trim_end().to_owned());
        }
    }

    None
}

/// Names of the direct subkeys of `key` listed in `reg query` output.
pub(crate) fn parse_subkeys(output: &str, key: &str) -> Vec<String> {
    let prefix = format!("{}\\", key.to_ascii_lowercase());

    output
        .lines()
        .map(str::trim_end)
        .filter(|line| line.to_ascii_lowercase().starts_with(&prefix))
        .map(|line| line[prefix.len()..].to_owned())
        .filter(|child| !child.is_empty() && !child.contains('\\'))
        .collect()
}
