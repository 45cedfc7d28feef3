//! Field name mapping and the field allow-list

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{FilterError, FilterResult};

/// External → internal field names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: BTreeMap<String, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, external: &str) -> bool {
        self.entries.contains_key(external)
    }

    pub fn get(&self, external: &str) -> Option<&str> {
        self.entries.get(external).map(String::as_str)
    }

    pub fn set(mut self, external: impl Into<String>, internal: impl Into<String>) -> Self {
        self.entries.insert(external.into(), internal.into());
        self
    }

    pub fn merge(mut self, other: &FieldMap) -> Self {
        self.entries
            .extend(other.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn all(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Mapped name, or the input unchanged. Never fails.
    pub fn map(&self, external: &str) -> String {
        self.get(external).unwrap_or(external).to_string()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Fields a run may filter on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    fields: BTreeSet<String>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn set(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into());
        self
    }

    pub fn merge(mut self, other: &AllowList) -> Self {
        self.fields.extend(other.fields.iter().cloned());
        self
    }

    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// `Ok(true)` when allowed. Otherwise `Ok(false)` in permissive mode
    /// (silent skip signal) or `FieldNotAllowed` in strict mode.
    pub fn validate(&self, field: &str, strict: bool) -> FilterResult<bool> {
        if self.has(field) {
            return Ok(true);
        }
        if strict {
            return Err(FilterError::field_not_allowed(field));
        }
        Ok(false)
    }
}

impl<S: Into<String>> FromIterator<S> for AllowList {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_falls_back_to_identity() {
        let map = FieldMap::new().set("created", "created_at");
        assert_eq!(map.map("created"), "created_at");
        assert_eq!(map.map("status"), "status");
        assert!(map.has("created"));
    }

    #[test]
    fn test_merge_overrides() {
        let base = FieldMap::new().set("a", "x").set("b", "y");
        let extra = FieldMap::new().set("b", "z");
        let merged = base.merge(&extra);
        assert_eq!(merged.get("a"), Some("x"));
        assert_eq!(merged.get("b"), Some("z"));
        assert_eq!(merged.all().count(), 2);
    }

    #[test]
    fn test_validate() {
        let allowed: AllowList = ["status", "price"].into_iter().collect();
        assert!(allowed.validate("status", false).unwrap());
        assert!(!allowed.validate("secret", false).unwrap());
        assert_eq!(
            allowed.validate("secret", true).unwrap_err(),
            FilterError::field_not_allowed("secret")
        );
    }
}
