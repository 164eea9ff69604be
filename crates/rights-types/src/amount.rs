//! Amounts and the brand-bound AmountMath algebra
//!
//! An [`Amount`] is an immutable `{brand, extent}` value. [`AmountMath`]
//! binds one brand to its math helpers and refuses to touch amounts of any
//! other brand.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::{Brand, Extent, MathHelpers, MathHelpersName, Result, RightsError};

/// Immutable description of value under one brand
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Amount {
    brand: Brand,
    extent: Extent,
}

impl Amount {
    pub fn brand(&self) -> &Brand {
        &self.brand
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.extent, self.brand)
    }
}

/// Brand-bound algebra over Amounts
///
/// Every operation first coerces its operands, so an Amount of a foreign
/// brand fails with [`RightsError::BrandMismatch`] instead of being
/// silently compared.
#[derive(Clone)]
pub struct AmountMath {
    brand: Brand,
    helpers: Arc<dyn MathHelpers>,
}

impl AmountMath {
    pub fn new(brand: Brand, math_helpers: MathHelpersName) -> Self {
        Self {
            brand,
            helpers: math_helpers.helpers(),
        }
    }

    pub fn get_brand(&self) -> &Brand {
        &self.brand
    }

    pub fn get_math_helpers_name(&self) -> MathHelpersName {
        self.helpers.name()
    }

    /// Wrap an extent under the bound brand
    pub fn make(&self, extent: impl Into<Extent>) -> Result<Amount> {
        let extent = self.helpers.coerce(&extent.into())?;
        Ok(self.wrap(extent))
    }

    /// Wrap an untrusted raw value, validated by the math helpers
    pub fn make_raw(&self, raw: &Value) -> Result<Amount> {
        let extent = self.helpers.from_raw(raw)?;
        Ok(self.wrap(extent))
    }

    pub fn get_empty(&self) -> Amount {
        self.wrap(self.helpers.empty())
    }

    /// Check an alleged amount's brand and extent shape
    pub fn coerce(&self, alleged: &Amount) -> Result<Amount> {
        if alleged.brand != self.brand {
            return Err(RightsError::BrandMismatch {
                expected: self.brand.get_alleged_name().to_string(),
                actual: alleged.brand.get_alleged_name().to_string(),
            });
        }
        self.make(alleged.extent.clone())
    }

    pub fn get_extent(&self, amount: &Amount) -> Result<Extent> {
        Ok(self.coerce(amount)?.extent)
    }

    pub fn is_empty(&self, amount: &Amount) -> Result<bool> {
        let amount = self.coerce(amount)?;
        Ok(self.helpers.is_empty(&amount.extent))
    }

    pub fn is_equal(&self, left: &Amount, right: &Amount) -> Result<bool> {
        let (left, right) = (self.coerce(left)?, self.coerce(right)?);
        Ok(self.helpers.is_equal(&left.extent, &right.extent))
    }

    /// `left >= right` under the helpers' partial order
    pub fn is_gte(&self, left: &Amount, right: &Amount) -> Result<bool> {
        let (left, right) = (self.coerce(left)?, self.coerce(right)?);
        Ok(self.helpers.is_gte(&left.extent, &right.extent))
    }

    pub fn add(&self, left: &Amount, right: &Amount) -> Result<Amount> {
        let (left, right) = (self.coerce(left)?, self.coerce(right)?);
        let extent = self.helpers.add(&left.extent, &right.extent)?;
        Ok(self.wrap(extent))
    }

    /// `left - right`; fails with `InsufficientExtent` unless `right <= left`
    pub fn subtract(&self, left: &Amount, right: &Amount) -> Result<Amount> {
        let (left, right) = (self.coerce(left)?, self.coerce(right)?);
        let extent = self.helpers.subtract(&left.extent, &right.extent)?;
        Ok(self.wrap(extent))
    }

    /// Brand-respecting sum of any number of amounts
    pub fn sum<'a>(&self, amounts: impl IntoIterator<Item = &'a Amount>) -> Result<Amount> {
        amounts
            .into_iter()
            .try_fold(self.get_empty(), |total, amount| self.add(&total, amount))
    }

    fn wrap(&self, extent: Extent) -> Amount {
        Amount {
            brand: self.brand.clone(),
            extent,
        }
    }
}

impl fmt::Debug for AmountMath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmountMath")
            .field("brand", &self.brand)
            .field("math_helpers", &self.helpers.name())
            .finish()
    }
}
