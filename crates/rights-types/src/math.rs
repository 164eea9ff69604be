//! Math helpers: the pluggable extent arithmetic behind AmountMath
//!
//! A brand picks one strategy when its issuer is created and keeps it for
//! life. Operands handed to the arithmetic methods have already passed
//! [`MathHelpers::coerce`]; a shape that slips through anyway is reported
//! as [`RightsError::InvalidExtent`], never panicked on.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Extent, Result, RightsError};

/// Name of a math helpers strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MathHelpersName {
    /// Natural-number arithmetic for fungible value
    #[default]
    Nat,
    /// Sets of u64 token ids
    Set,
    /// Sets of strings
    StrSet,
}

impl MathHelpersName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MathHelpersName::Nat => "nat",
            MathHelpersName::Set => "set",
            MathHelpersName::StrSet => "strSet",
        }
    }

    /// Instantiate the strategy this name selects
    pub fn helpers(&self) -> Arc<dyn MathHelpers> {
        match self {
            MathHelpersName::Nat => Arc::new(NatMathHelpers),
            MathHelpersName::Set => Arc::new(SetMathHelpers),
            MathHelpersName::StrSet => Arc::new(StrSetMathHelpers),
        }
    }
}

impl fmt::Display for MathHelpersName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extent arithmetic for one brand
pub trait MathHelpers: Send + Sync + fmt::Debug {
    fn name(&self) -> MathHelpersName;

    /// Check that an extent has the shape this strategy accepts
    fn coerce(&self, extent: &Extent) -> Result<Extent>;

    /// Parse an untrusted raw value into an extent
    fn from_raw(&self, raw: &Value) -> Result<Extent>;

    /// The additive identity
    fn empty(&self) -> Extent;

    fn is_empty(&self, extent: &Extent) -> bool {
        *extent == self.empty()
    }

    fn is_gte(&self, left: &Extent, right: &Extent) -> bool;

    fn is_equal(&self, left: &Extent, right: &Extent) -> bool {
        left == right
    }

    fn add(&self, left: &Extent, right: &Extent) -> Result<Extent>;

    /// `left - right`; fails unless `right <= left`
    fn subtract(&self, left: &Extent, right: &Extent) -> Result<Extent>;
}

fn invalid(name: MathHelpersName, message: impl Into<String>) -> RightsError {
    RightsError::InvalidExtent {
        math_helpers: name.to_string(),
        message: message.into(),
    }
}

fn wrong_shape(name: MathHelpersName, extent: &Extent) -> RightsError {
    invalid(name, format!("expected a {} extent, got {}", name, extent.shape()))
}

fn insufficient(left: &Extent, right: &Extent) -> RightsError {
    RightsError::InsufficientExtent {
        available: left.to_string(),
        required: right.to_string(),
    }
}

/// Natural-number arithmetic
#[derive(Debug, Clone, Copy, Default)]
pub struct NatMathHelpers;

impl NatMathHelpers {
    fn nat(&self, extent: &Extent) -> Result<u64> {
        extent
            .as_nat()
            .ok_or_else(|| wrong_shape(MathHelpersName::Nat, extent))
    }
}

impl MathHelpers for NatMathHelpers {
    fn name(&self) -> MathHelpersName {
        MathHelpersName::Nat
    }

    fn coerce(&self, extent: &Extent) -> Result<Extent> {
        self.nat(extent).map(Extent::Nat)
    }

    fn from_raw(&self, raw: &Value) -> Result<Extent> {
        match raw {
            Value::Number(n) => n.as_u64().map(Extent::Nat).ok_or_else(|| {
                invalid(
                    MathHelpersName::Nat,
                    format!("{} is not a non-negative integer", n),
                )
            }),
            other => Err(invalid(
                MathHelpersName::Nat,
                format!("{} is not a number", other),
            )),
        }
    }

    fn empty(&self) -> Extent {
        Extent::Nat(0)
    }

    fn is_gte(&self, left: &Extent, right: &Extent) -> bool {
        match (left, right) {
            (Extent::Nat(l), Extent::Nat(r)) => l >= r,
            _ => false,
        }
    }

    fn add(&self, left: &Extent, right: &Extent) -> Result<Extent> {
        let (l, r) = (self.nat(left)?, self.nat(right)?);
        l.checked_add(r)
            .map(Extent::Nat)
            .ok_or_else(|| invalid(MathHelpersName::Nat, "nat overflow"))
    }

    fn subtract(&self, left: &Extent, right: &Extent) -> Result<Extent> {
        let (l, r) = (self.nat(left)?, self.nat(right)?);
        l.checked_sub(r)
            .map(Extent::Nat)
            .ok_or_else(|| insufficient(left, right))
    }
}

fn union<T: Ord + Clone>(
    name: MathHelpersName,
    left: &BTreeSet<T>,
    right: &BTreeSet<T>,
) -> Result<BTreeSet<T>> {
    if !left.is_disjoint(right) {
        return Err(invalid(name, "sets must not share elements"));
    }
    Ok(left.union(right).cloned().collect())
}

fn difference<T: Ord + Clone>(left: &BTreeSet<T>, right: &BTreeSet<T>) -> Option<BTreeSet<T>> {
    if right.is_subset(left) {
        Some(left.difference(right).cloned().collect())
    } else {
        None
    }
}

fn raw_items(name: MathHelpersName, raw: &Value) -> Result<&Vec<Value>> {
    raw.as_array()
        .ok_or_else(|| invalid(name, format!("{} is not an array", raw)))
}

/// Sets of u64 token ids
#[derive(Debug, Clone, Copy, Default)]
pub struct SetMathHelpers;

impl MathHelpers for SetMathHelpers {
    fn name(&self) -> MathHelpersName {
        MathHelpersName::Set
    }

    fn coerce(&self, extent: &Extent) -> Result<Extent> {
        match extent {
            Extent::Set(_) => Ok(extent.clone()),
            other => Err(wrong_shape(MathHelpersName::Set, other)),
        }
    }

    fn from_raw(&self, raw: &Value) -> Result<Extent> {
        let items = raw_items(MathHelpersName::Set, raw)?;
        let mut ids = BTreeSet::new();
        for item in items {
            let id = item.as_u64().ok_or_else(|| {
                invalid(MathHelpersName::Set, format!("{} is not a token id", item))
            })?;
            if !ids.insert(id) {
                return Err(invalid(MathHelpersName::Set, format!("duplicate token id {}", id)));
            }
        }
        Ok(Extent::Set(ids))
    }

    fn empty(&self) -> Extent {
        Extent::Set(BTreeSet::new())
    }

    fn is_gte(&self, left: &Extent, right: &Extent) -> bool {
        match (left, right) {
            (Extent::Set(l), Extent::Set(r)) => r.is_subset(l),
            _ => false,
        }
    }

    fn add(&self, left: &Extent, right: &Extent) -> Result<Extent> {
        match (left, right) {
            (Extent::Set(l), Extent::Set(r)) => union(self.name(), l, r).map(Extent::Set),
            (Extent::Set(_), other) | (other, _) => Err(wrong_shape(self.name(), other)),
        }
    }

    fn subtract(&self, left: &Extent, right: &Extent) -> Result<Extent> {
        match (left, right) {
            (Extent::Set(l), Extent::Set(r)) => difference(l, r)
                .map(Extent::Set)
                .ok_or_else(|| insufficient(left, right)),
            (Extent::Set(_), other) | (other, _) => Err(wrong_shape(self.name(), other)),
        }
    }
}

/// Sets of strings
#[derive(Debug, Clone, Copy, Default)]
pub struct StrSetMathHelpers;

impl MathHelpers for StrSetMathHelpers {
    fn name(&self) -> MathHelpersName {
        MathHelpersName::StrSet
    }

    fn coerce(&self, extent: &Extent) -> Result<Extent> {
        match extent {
            Extent::StrSet(_) => Ok(extent.clone()),
            other => Err(wrong_shape(MathHelpersName::StrSet, other)),
        }
    }

    fn from_raw(&self, raw: &Value) -> Result<Extent> {
        let items = raw_items(MathHelpersName::StrSet, raw)?;
        let mut names = BTreeSet::new();
        for item in items {
            let name = item.as_str().ok_or_else(|| {
                invalid(MathHelpersName::StrSet, format!("{} is not a string", item))
            })?;
            if !names.insert(name.to_string()) {
                return Err(invalid(MathHelpersName::StrSet, format!("duplicate entry {}", name)));
            }
        }
        Ok(Extent::StrSet(names))
    }

    fn empty(&self) -> Extent {
        Extent::StrSet(BTreeSet::new())
    }

    fn is_gte(&self, left: &Extent, right: &Extent) -> bool {
        match (left, right) {
            (Extent::StrSet(l), Extent::StrSet(r)) => r.is_subset(l),
            _ => false,
        }
    }

    fn add(&self, left: &Extent, right: &Extent) -> Result<Extent> {
        match (left, right) {
            (Extent::StrSet(l), Extent::StrSet(r)) => union(self.name(), l, r).map(Extent::StrSet),
            (Extent::StrSet(_), other) | (other, _) => Err(wrong_shape(self.name(), other)),
        }
    }

    fn subtract(&self, left: &Extent, right: &Extent) -> Result<Extent> {
        match (left, right) {
            (Extent::StrSet(l), Extent::StrSet(r)) => difference(l, r)
                .map(Extent::StrSet)
                .ok_or_else(|| insufficient(left, right)),
            (Extent::StrSet(_), other) | (other, _) => Err(wrong_shape(self.name(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nat_rejects_negative_and_fractional() {
        let nat = NatMathHelpers;
        assert_eq!(nat.from_raw(&json!(7)).unwrap(), Extent::Nat(7));
        assert!(matches!(
            nat.from_raw(&json!(-1)),
            Err(RightsError::InvalidExtent { .. })
        ));
        assert!(matches!(
            nat.from_raw(&json!(1.5)),
            Err(RightsError::InvalidExtent { .. })
        ));
        assert!(matches!(
            nat.from_raw(&json!("3")),
            Err(RightsError::InvalidExtent { .. })
        ));
    }

    #[test]
    fn test_nat_subtract_underflow() {
        let nat = NatMathHelpers;
        let result = nat.subtract(&Extent::Nat(3), &Extent::Nat(4));
        assert!(matches!(result, Err(RightsError::InsufficientExtent { .. })));
    }

    #[test]
    fn test_set_superset_ordering() {
        let set = SetMathHelpers;
        let big = Extent::set([1, 2, 3]);
        let small = Extent::set([2]);
        let other = Extent::set([4]);

        assert!(set.is_gte(&big, &small));
        assert!(!set.is_gte(&small, &big));
        assert!(!set.is_gte(&big, &other));
        assert!(!set.is_gte(&other, &big));
    }

    #[test]
    fn test_set_add_requires_disjoint() {
        let set = SetMathHelpers;
        let sum = set.add(&Extent::set([1]), &Extent::set([2])).unwrap();
        assert_eq!(sum, Extent::set([1, 2]));

        let overlap = set.add(&Extent::set([1, 2]), &Extent::set([2]));
        assert!(matches!(overlap, Err(RightsError::InvalidExtent { .. })));
    }

    #[test]
    fn test_str_set_subtract() {
        let str_set = StrSetMathHelpers;
        let all = Extent::str_set(["seat-1", "seat-2"]);

        let rest = str_set.subtract(&all, &Extent::str_set(["seat-1"])).unwrap();
        assert_eq!(rest, Extent::str_set(["seat-2"]));

        let missing = str_set.subtract(&all, &Extent::str_set(["seat-9"]));
        assert!(matches!(missing, Err(RightsError::InsufficientExtent { .. })));
    }

    #[test]
    fn test_str_set_raw_duplicates() {
        let str_set = StrSetMathHelpers;
        let result = str_set.from_raw(&json!(["a", "a"]));
        assert!(matches!(result, Err(RightsError::InvalidExtent { .. })));
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(NatMathHelpers.coerce(&Extent::set([1])).is_err());
        assert!(SetMathHelpers.coerce(&Extent::Nat(1)).is_err());
        assert_eq!(MathHelpersName::StrSet.to_string(), "strSet");
    }
}
