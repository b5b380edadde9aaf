//! Placeholder substitution for configuration strings and path lists
//!
//! `${name}` and `${env:name}` / `${env.name}` are looked up in the supplied environment.
//! A name bound to a list expands to its entries joined with `;`, which list-typed callers
//! split back apart with [`resolve_and_split`]. `${default}` is never looked up: list callers
//! splice in their default sequence at that position, scalar callers treat the whole value as
//! "use the default". Anything that cannot be resolved is left exactly as written.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reserved token meaning "substitute the settings-level default here"
pub const DEFAULT_TOKEN: &str = "${default}";

/// Upper bound on substitution passes for self-referencing variables
const MAX_PASSES: usize = 32;

/// Substitution stops before a pass would grow the value past this many bytes
const MAX_RESOLVED_LEN: usize = 16 * 1024;

static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{(?:(env|config|workspaceFolder)[.:])?(.*?)\}")
        .expect("variable pattern is a valid regex")
});

/// An environment value: either a single string or an ordered list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Single(String),
    List(Vec<String>),
}

impl EnvValue {
    /// Flattened form used for substitution
    pub fn joined(&self) -> String {
        match self {
            Self::Single(value) => value.clone(),
            Self::List(values) => values.join(";"),
        }
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<String>> for EnvValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

/// Insertion-ordered variable environment
pub type Environment = IndexMap<String, EnvValue>;

fn lookup(env: &Environment, name: &str) -> Option<String> {
    if name == "default" {
        return None;
    }
    env.get(name)
        .map(EnvValue::joined)
        .filter(|value| !value.is_empty())
}

fn substitute_once(input: &str, env: &Environment) -> String {
    VARIABLE_PATTERN
        .replace_all(input, |caps: &Captures| {
            let whole = caps[0].to_string();
            let name = caps.get(2).map_or("", |m| m.as_str());
            match caps.get(1).map(|m| m.as_str()) {
                None | Some("env") => lookup(env, name).unwrap_or(whole),
                // config and workspaceFolder:<name> lookups are not available here
                _ => whole,
            }
        })
        .into_owned()
}

fn expand_home(input: String, env: &Environment) -> String {
    match input.strip_prefix('~') {
        Some(rest) => match lookup(env, "HOME") {
            Some(home) => format!("{home}{rest}"),
            None => input,
        },
        None => input,
    }
}

/// Substitute every resolvable placeholder in `input`.
///
/// Substitution repeats until the string stops changing, a previous form reappears, or the
/// pass limit is hit. A pass that would exceed `MAX_RESOLVED_LEN` bytes is discarded and the
/// remaining placeholders are left verbatim.
pub fn resolve_variables(input: &str, env: &Environment) -> String {
    if input.is_empty() {
        return String::new();
    }

    let mut seen = HashSet::new();
    let mut current = input.to_string();
    let mut passes = 0;
    while passes < MAX_PASSES && seen.insert(current.clone()) {
        let next = substitute_once(&current, env);
        if next.len() > MAX_RESOLVED_LEN {
            break;
        }
        current = next;
        passes += 1;
    }

    expand_home(current, env)
}

/// Replace each `${default}` entry with the default sequence, or drop it when there is none
pub fn expand_default_token(entries: &[String], default: Option<&[String]>) -> Vec<String> {
    let mut result = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry == DEFAULT_TOKEN {
            if let Some(default) = default {
                result.extend(default.iter().cloned());
            }
        } else {
            result.push(entry.clone());
        }
    }
    result
}

/// Expand `${default}`, resolve each entry, and split `;`-joined results into separate entries
pub fn resolve_and_split(
    entries: &[String],
    default: Option<&[String]>,
    env: &Environment,
) -> Vec<String> {
    expand_default_token(entries, default)
        .iter()
        .flat_map(|entry| {
            resolve_variables(entry, env)
                .split(';')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}
