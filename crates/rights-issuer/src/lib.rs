//! Rights Issuer - Issuer, Mint and Purse for one brand
//!
//! This crate turns the synchronous [`rights_ledger::Ledger`] into the
//! capability surface parties use across asynchronous boundaries:
//!
//! 1. The Mint is the only source of new value for its brand
//! 2. A payment is consumed at most once; every alias after the first fails
//! 3. Split, combine and claim conserve value exactly
//! 4. Purses accept only settled payments
//!
//! # Usage
//!
//! [`produce_issuer`] creates a brand together with its issuer, mint and
//! amount math. Issuers and purses run as tokio tasks, so they must be
//! created inside a runtime. Every operation returns an [`Eventual`] that
//! resolves once the owning actor has applied it.

pub mod config;
pub mod eventual;
pub mod issuer;
pub mod payment;
pub mod purse;

pub use config::IssuerConfig;
pub use eventual::{Eventual, PaymentP};
pub use issuer::{Issuer, Mint};
pub use payment::Payment;
pub use purse::Purse;

pub use rights_ledger::{EntryReason, JournalEntry, PaymentId, SupplySnapshot};
pub use rights_types::{Amount, AmountMath, Brand, Extent, MathHelpersName, RightsError};

/// The inseparable issuer/mint/brand triple plus its amount math
#[derive(Debug, Clone)]
pub struct IssuerKit {
    pub issuer: Issuer,
    pub mint: Mint,
    pub amount_math: AmountMath,
    pub brand: Brand,
}

/// Create a fresh brand with its issuer and mint
pub fn produce_issuer(alleged_name: &str, math_helpers: MathHelpersName) -> IssuerKit {
    let (issuer, mint) = issuer::spawn_issuer(alleged_name, math_helpers);
    IssuerKit {
        amount_math: issuer.get_amount_math().clone(),
        brand: issuer.get_brand().clone(),
        issuer,
        mint,
    }
}

pub fn produce_issuer_with(config: &IssuerConfig) -> IssuerKit {
    produce_issuer(&config.alleged_name, config.math_helpers)
}

/// Whether `issuer` is the authority for `brand`
pub trait BrandExt {
    fn is_my_issuer(&self, issuer: &Issuer) -> bool;
}

impl BrandExt for Brand {
    fn is_my_issuer(&self, issuer: &Issuer) -> bool {
        issuer.get_brand() == self
    }
}
