//! Rights Types - Brand identity and the Amount algebra
//!
//! This crate holds the value-description layer of the rights ledger with
//! zero dependencies on other workspace crates:
//!
//! - Brand: unforgeable identity tag for one asset type
//! - Extent: the quantity/description of value (count, token ids, names)
//! - MathHelpers: pluggable extent arithmetic (nat, set, strSet)
//! - Amount: immutable `{brand, extent}` pair
//! - AmountMath: brand-bound algebra over Amounts
//! - RightsError: the failure taxonomy shared by every layer above
//!
//! # Invariants
//!
//! 1. Two Amounts are only comparable or combinable under the same Brand
//! 2. Brand mismatches are always surfaced, never coerced
//! 3. Amounts are values: nothing mutates them after construction

pub mod amount;
pub mod brand;
pub mod error;
pub mod extent;
pub mod math;

pub use amount::*;
pub use brand::*;
pub use error::*;
pub use extent::*;
pub use math::*;
