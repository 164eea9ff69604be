//! Escrow errors

use std::collections::BTreeMap;

use rights_issuer::Payment;
use rights_offer_safety::Keyword;
use rights_types::RightsError;
use thiserror::Error;

use crate::OfferHandle;

pub type Result<T> = std::result::Result<T, EscrowError>;

#[derive(Debug, Error)]
pub enum EscrowError {
    #[error(transparent)]
    Rights(#[from] RightsError),

    #[error("offer not found: {handle}")]
    OfferNotFound { handle: OfferHandle },

    #[error("offer {handle} appears more than once in one reallocation")]
    DuplicateOffer { handle: OfferHandle },

    #[error("reallocation is not offer safe for {handle}")]
    OfferUnsafe { handle: OfferHandle },

    #[error("no payment for give keyword {keyword}")]
    MissingPayment { keyword: Keyword },

    #[error("payment for {keyword} is not part of the give")]
    UnexpectedPayment { keyword: Keyword },

    #[error("keyword {keyword} appears in both give and want")]
    KeywordConflict { keyword: Keyword },

    #[error("offer {handle} has no keyword {keyword}")]
    UnknownKeyword { handle: OfferHandle, keyword: Keyword },

    #[error("no escrow purse for brand {brand} (keyword {keyword})")]
    UnknownBrand { keyword: Keyword, brand: String },

    /// A withdrawal failed; the offer and its escrowed value are unchanged
    #[error("payout of {handle} failed, offer kept in escrow: {source}")]
    PayoutFailed {
        handle: OfferHandle,
        source: RightsError,
    },

    /// Escrow failed part-way; earlier deposits come back as fresh payments
    #[error("offer rejected, escrowed payments refunded: {source}")]
    Rejected {
        refund: BTreeMap<Keyword, Payment>,
        source: RightsError,
    },
}
