//! Rights Escrow - payout finalization over brand-scoped escrow purses
//!
//! An [`EscrowBook`] holds one escrow purse per brand. Parties escrow the
//! payments named by their proposal's `give`, a contract reallocates the
//! escrowed value between offers, and each party is paid out its final
//! allocation. A reallocation is committed only if it conserves every
//! brand's total and is offer safe for every offer it touches.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use rights_issuer::Payment;
use rights_offer_safety::{AmountKeywordRecord, Keyword, Proposal};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod book;
pub mod error;

pub use book::EscrowBook;
pub use error::{EscrowError, Result};

/// Handle to one escrowed offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferHandle(pub Uuid);

impl OfferHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OfferHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OfferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offer_{}", self.0)
    }
}

/// Escrow surface consumed by exchange contracts
#[async_trait]
pub trait OfferBook: Send + Sync {
    /// Deposit the give payments and record the offer
    async fn escrow(
        &self,
        proposal: Proposal,
        payments: BTreeMap<Keyword, Payment>,
    ) -> Result<OfferHandle>;

    /// Current allocation of an offer
    async fn get_current_allocation(&self, handle: OfferHandle) -> Result<AmountKeywordRecord>;

    /// Replace the allocations of several offers at once
    async fn reallocate(&self, reallocations: &[(OfferHandle, AmountKeywordRecord)]) -> Result<()>;

    /// Withdraw an offer's allocation as payments and close the offer
    async fn payout(&self, handle: OfferHandle) -> Result<BTreeMap<Keyword, Payment>>;
}
