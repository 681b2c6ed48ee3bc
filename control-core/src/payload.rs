//! Canonical, order-independent payload map.
//!
//! Journal `data` fields and Simulator state hashing both need a representation that is
//! independent of insertion order and host-language map iteration order (see spec 4.5.4 and
//! 9). [`CanonicalValue`] is a small self-describing value tree; [`CanonicalMap`] is a
//! `BTreeMap` wrapper so that key order is always lexicographic, both in memory and when
//! serialised.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A self-describing value used for dynamic packet/journal payloads.
///
/// Decimals are carried as their own variant (never `f64`) and are encoded, for hashing
/// purposes, as their canonical decimal string via [`crate::decimal::canonical_string`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CanonicalValue {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    String(String),
    Array(Vec<CanonicalValue>),
    Map(CanonicalMap),
}

impl From<bool> for CanonicalValue {
    fn from(value: bool) -> Self {
        CanonicalValue::Bool(value)
    }
}

impl From<i64> for CanonicalValue {
    fn from(value: i64) -> Self {
        CanonicalValue::Int(value)
    }
}

impl From<Decimal> for CanonicalValue {
    fn from(value: Decimal) -> Self {
        CanonicalValue::Decimal(value)
    }
}

impl From<String> for CanonicalValue {
    fn from(value: String) -> Self {
        CanonicalValue::String(value)
    }
}

impl From<&str> for CanonicalValue {
    fn from(value: &str) -> Self {
        CanonicalValue::String(value.to_owned())
    }
}

/// Order-independent string-keyed map. Key order is always lexicographic (`BTreeMap`), so
/// two maps built with different insertion orders serialise identically.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CanonicalMap(pub BTreeMap<String, CanonicalValue>);

impl CanonicalMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CanonicalValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&CanonicalValue> {
        self.0.get(key)
    }
}

impl FromIterator<(String, CanonicalValue)> for CanonicalMap {
    fn from_iter<Iter: IntoIterator<Item = (String, CanonicalValue)>>(iter: Iter) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn insertion_order_does_not_affect_serialisation() {
        let mut a = CanonicalMap::new();
        a.insert("b", 2i64).insert("a", 1i64);

        let mut b = CanonicalMap::new();
        b.insert("a", 1i64).insert("b", 2i64);

        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn decimal_is_carried_exactly() {
        let mut map = CanonicalMap::new();
        map.insert("qty", dec!(1.50));
        assert_eq!(map.get("qty"), Some(&CanonicalValue::Decimal(dec!(1.50))));
    }
}
