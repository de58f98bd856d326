use std::collections::BTreeMap;

use crate::domain::TargetId;
use crate::error::{Error, Result};

/// Catalog prefixes whose numeric part is zero-padded.
pub const CATALOG_PREFIXES: &[&str] = &["hd"];

/// Identifiers that are rewritten verbatim after lowercasing and padding.
pub const BUILTIN_RENAMES: &[(&str, &str)] = &[("bd+631964", "bd+63d1964")];

/// A literal exception applied to an exact identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// Replace the whole identifier.
    Rename(String),
    /// Append a disambiguating suffix.
    Suffix(String),
}

/// Canonicalizes raw target names into archive identifiers.
#[derive(Debug, Clone)]
pub struct Normalizer {
    prefixes: Vec<String>,
    /// Canonical identifier -> canonical replacement. No replacement is
    /// itself a key, which keeps `normalize` idempotent.
    rules: BTreeMap<String, String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            prefixes: CATALOG_PREFIXES.iter().map(|p| p.to_string()).collect(),
            rules: BUILTIN_RENAMES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

impl Normalizer {
    /// Add or replace an exception rule. Both sides are brought into
    /// canonical form first, so `HD12345` and `hd012345` name the same rule.
    ///
    /// Rules may not chain: a replacement that is itself rewritten by another
    /// rule is rejected.
    pub fn with_rule(mut self, from: &str, rewrite: Rewrite) -> Result<Self> {
        let key = self.canonical(from);
        let target = match rewrite {
            Rewrite::Rename(to) => self.canonical(&to),
            Rewrite::Suffix(suffix) => self.canonical(&format!("{key}{suffix}")),
        };
        if key.is_empty() || target.is_empty() {
            return Err(invalid_rule(from, "identifiers must not be empty".to_string()));
        }
        if target != key {
            if self.rules.get(&target).is_some_and(|t| *t != target) {
                return Err(invalid_rule(
                    from,
                    format!("replacement {target} is itself rewritten"),
                ));
            }
            if let Some(other) = self
                .rules
                .iter()
                .find(|(k, t)| **t == key && **k != key)
                .map(|(k, _)| k)
            {
                return Err(invalid_rule(
                    from,
                    format!("{other} is already rewritten to {key}"),
                ));
            }
        }
        self.rules.insert(key, target);
        Ok(self)
    }

    /// Replace the set of zero-padded catalog prefixes. Existing rules are
    /// re-keyed under the new padding.
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.prefixes = prefixes
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        let rules: BTreeMap<String, String> = self
            .rules
            .iter()
            .map(|(k, t)| (self.canonical(k), self.canonical(t)))
            .collect();
        self.rules = rules;
        self
    }

    pub fn normalize(&self, raw: &str) -> TargetId {
        let id = self.canonical(raw);
        match self.rules.get(&id) {
            Some(target) => TargetId::new(target.clone()),
            None => TargetId::new(id),
        }
    }

    /// Lowercase and catalog padding, without exception rules.
    fn canonical(&self, raw: &str) -> String {
        let lowered = raw.to_lowercase();
        self.pad_catalog_number(&lowered).unwrap_or(lowered)
    }

    /// `hd12345` -> `hd012345`, `hd123456` -> `hd0123456`. Numbers already
    /// starting with `0` are left alone.
    fn pad_catalog_number(&self, id: &str) -> Option<String> {
        let prefix = self.prefixes.iter().find(|p| id.starts_with(p.as_str()))?;
        let digits = &id[prefix.len()..];
        let all_digits = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
        if !all_digits || digits.starts_with('0') {
            return None;
        }
        match id.len() {
            7 | 8 => Some(format!("{prefix}0{digits}")),
            _ => None,
        }
    }
}

fn invalid_rule(from: &str, message: String) -> Error {
    Error::InvalidNameRule {
        from: from.to_string(),
        message,
    }
}

/// Normalize with the built-in rules only.
pub fn normalize(raw: &str) -> TargetId {
    Normalizer::default().normalize(raw)
}
