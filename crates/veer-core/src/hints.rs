//! String-keyed request hints, mirroring the host router's parameter bag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HintValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Ordered map of request hints.
///
/// Getters are typed and fall back to the caller's default on a missing key
/// or a type mismatch, matching how the host router reads its bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HintMap {
    values: BTreeMap<String, HintValue>,
}

impl HintMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(HintValue::Bool(value)) => *value,
            _ => default,
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            Some(HintValue::Int(value)) => *value,
            _ => default,
        }
    }

    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        match self.values.get(key) {
            Some(HintValue::Float(value)) => *value,
            Some(HintValue::Int(value)) => *value as f64,
            _ => default,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(HintValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.values.insert(key.into(), HintValue::Bool(value));
        self
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.values.insert(key.into(), HintValue::Int(value));
        self
    }

    pub fn put_float(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.values.insert(key.into(), HintValue::Float(value));
        self
    }

    pub fn put_str(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), HintValue::Str(value.into()));
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HintValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getters_fall_back_on_missing_keys() {
        let hints = HintMap::new();
        assert!(hints.get_bool("traffic_aware", true));
        assert_eq!(hints.get_int("car_type_id", 0), 0);
    }

    #[test]
    fn getters_fall_back_on_type_mismatch() {
        let mut hints = HintMap::new();
        hints.put_str("avoid_eds_roads", "yes");
        assert!(!hints.get_bool("avoid_eds_roads", false));
    }

    #[test]
    fn int_is_readable_as_float() {
        let mut hints = HintMap::new();
        hints.put_int("alternative_route.max_paths", 3);
        assert_eq!(hints.get_float("alternative_route.max_paths", 0.0), 3.0);
    }

    #[test]
    fn puts_overwrite() {
        let mut hints = HintMap::new();
        hints.put_bool("ch.disable", false);
        hints.put_bool("ch.disable", true);
        assert!(hints.get_bool("ch.disable", false));
        assert_eq!(hints.len(), 1);
    }
}
