// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered `KEY=VALUE` environment lists.
//!
//! Job and event environments preserve insertion order (children see
//! variables in the order their sources supplied them) while keeping keys
//! unique: setting an existing key replaces its value in place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from environment handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("invalid variable name: {0:?}")]
    InvalidName(String),

    #[error("missing '=' in entry: {0:?}")]
    MissingSeparator(String),

    #[error("unknown variable referenced: ${0}")]
    UnknownReference(String),

    #[error("unterminated ${{...}} reference in {0:?}")]
    UnterminatedReference(String),
}

/// An ordered list of `KEY=VALUE` strings with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvList {
    entries: Vec<String>,
}

/// Check a variable name: `[A-Za-z_][A-Za-z0-9_]*`.
fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl EnvList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `KEY=VALUE` entries, validating each.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, EnvError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut env = Self::new();
        for entry in entries {
            let entry = entry.as_ref();
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| EnvError::MissingSeparator(entry.to_string()))?;
            env.set(key, value)?;
        }
        Ok(env)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Raw `KEY=VALUE` entries in order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Iterate `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|e| e.split_once('='))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Value of the entry at position `index`, if any.
    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.entries.get(index).and_then(|e| e.split_once('=')).map(|(_, v)| v)
    }

    /// Set a key, replacing in place if it already exists.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), EnvError> {
        if !valid_name(key) {
            return Err(EnvError::InvalidName(key.to_string()));
        }
        let entry = format!("{key}={value}");
        for existing in &mut self.entries {
            if existing.split_once('=').map(|(k, _)| k) == Some(key) {
                *existing = entry;
                return Ok(());
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Set a raw `KEY=VALUE` entry.
    pub fn set_entry(&mut self, entry: &str) -> Result<(), EnvError> {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| EnvError::MissingSeparator(entry.to_string()))?;
        self.set(key, value)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| e.split_once('=').map(|(k, _)| k) != Some(key));
        before != self.entries.len()
    }

    /// Overlay every entry of `other` onto this list.
    pub fn merge(&mut self, other: &EnvList) {
        for (key, value) in other.iter() {
            // Keys in an EnvList are already validated.
            let _ = self.set(key, value);
        }
    }

    /// Expand `$VAR` and `${VAR}` references in `template` against this list.
    ///
    /// `$$` escapes a literal dollar. Unknown references are an error so a
    /// bad instance template fails loudly instead of collapsing instances.
    pub fn expand(&self, template: &str) -> Result<String, EnvError> {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    out.push('$');
                }
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => {
                                return Err(EnvError::UnterminatedReference(
                                    template.to_string(),
                                ))
                            }
                        }
                    }
                    out.push_str(self.lookup_ref(&name, template)?);
                }
                _ => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    out.push_str(self.lookup_ref(&name, template)?);
                }
            }
        }
        Ok(out)
    }

    fn lookup_ref<'a>(&'a self, name: &str, template: &str) -> Result<&'a str, EnvError> {
        if name.is_empty() || !valid_name(name) {
            return Err(EnvError::InvalidName(format!("${name} in {template:?}")));
        }
        self.get(name)
            .ok_or_else(|| EnvError::UnknownReference(name.to_string()))
    }
}

impl<'a> IntoIterator for &'a EnvList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
