//! `${name}` expansion over an ordered string map.
//!
//! Build variants carry an expansion map that is grown while matrix axis
//! values merge in; tags, distro lists, and display names are interpolated
//! against it. Lookups are strict: an unknown name or an unclosed `${` is
//! an error rather than an empty substitution.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("unknown expansion '${{{0}}}'")]
    UnknownKey(String),
    #[error("unclosed expansion in '{0}'")]
    Unclosed(String),
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]*)\}").unwrap())
}

/// An ordered string-to-string substitution map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expansions(IndexMap<String, String>);

impl Expansions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge another map in; colliding keys take the incoming value.
    pub fn update(&mut self, other: Expansions) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Substitute every `${name}` placeholder in `input`.
    pub fn expand(&self, input: &str) -> Result<String, ExpansionError> {
        let mut out = String::with_capacity(input.len());
        let mut last = 0;
        for captures in placeholder_re().captures_iter(input) {
            let placeholder = match captures.get(0) {
                Some(m) => m,
                None => continue,
            };
            let name = &captures[1];
            if name.contains("${") {
                return Err(ExpansionError::Unclosed(input.to_string()));
            }
            let gap = &input[last..placeholder.start()];
            if gap.contains("${") {
                return Err(ExpansionError::Unclosed(input.to_string()));
            }
            out.push_str(gap);
            match self.0.get(name) {
                Some(value) => out.push_str(value),
                None => return Err(ExpansionError::UnknownKey(name.to_string())),
            }
            last = placeholder.end();
        }
        let tail = &input[last..];
        if tail.contains("${") {
            return Err(ExpansionError::Unclosed(input.to_string()));
        }
        out.push_str(tail);
        Ok(out)
    }

    /// Expand every element of a string slice.
    pub fn expand_all(&self, values: &[String]) -> Result<Vec<String>, ExpansionError> {
        values.iter().map(|v| self.expand(v)).collect()
    }

    /// Expand both the keys and the values of another map.
    pub fn expanded_map(&self, other: &Expansions) -> Result<Expansions, ExpansionError> {
        let mut out = Expansions::new();
        for (key, value) in other.iter() {
            out.put(self.expand(key)?, self.expand(value)?);
        }
        Ok(out)
    }
}

impl FromIterator<(String, String)> for Expansions {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Expansions(iter.into_iter().collect())
    }
}
