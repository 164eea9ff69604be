//! Rights Offer Safety - gate for escrow payouts
//!
//! A payout is offer-safe for a party when the reallocation either refunds
//! everything the party gave or delivers everything the party wanted. Each
//! side is judged as a whole: a reallocation that refunds one keyword and
//! pays winnings on another is rejected. Satisfying both sides at once is
//! allowed.
//!
//! Everything here is pure. Nothing touches a ledger.

use std::collections::BTreeMap;
use std::fmt;

use rights_types::{Amount, AmountMath};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of one slot in a proposal
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Keyword(pub String);

impl Keyword {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl From<&str> for Keyword {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Amounts keyed by keyword
pub type AmountKeywordRecord = BTreeMap<Keyword, Amount>;

/// AmountMath keyed by keyword
pub type AmountMathKeywordRecord = BTreeMap<Keyword, AmountMath>;

/// How a party may leave an offer
///
/// Recorded with the proposal for the contract host, which decides when a
/// party may exit. Offer safety and escrow payout do not consult it: a
/// payout is only ever issued by the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExitRule {
    /// Leave whenever the party asks
    #[default]
    OnDemand,
    /// The party gives up the right to leave
    Waived,
    /// Leave automatically once the deadline passes
    AfterDeadline { deadline: u64 },
}

/// What a party escrows and what it expects back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Proposal {
    pub give: AmountKeywordRecord,
    pub want: AmountKeywordRecord,
    pub exit: ExitRule,
}

impl Proposal {
    pub fn new(give: AmountKeywordRecord, want: AmountKeywordRecord, exit: ExitRule) -> Self {
        Self { give, want, exit }
    }

    /// Every keyword named on either side
    pub fn keywords(&self) -> impl Iterator<Item = &Keyword> {
        self.give.keys().chain(self.want.keys())
    }
}

/// Whether `reallocation[keyword] >= threshold` for every entry of `side`.
///
/// A keyword missing from the reallocation holds that keyword's empty
/// amount. A keyword with no AmountMath, or amounts of a foreign brand,
/// fails the side.
fn side_satisfied(
    amount_maths: &AmountMathKeywordRecord,
    side: &AmountKeywordRecord,
    reallocation: &AmountKeywordRecord,
) -> bool {
    side.iter().all(|(keyword, threshold)| {
        let Some(math) = amount_maths.get(keyword) else {
            debug!(%keyword, "no amount math for keyword");
            return false;
        };
        let allocated = reallocation
            .get(keyword)
            .cloned()
            .unwrap_or_else(|| math.get_empty());
        match math.is_gte(&allocated, threshold) {
            Ok(satisfied) => satisfied,
            Err(error) => {
                debug!(%keyword, %error, "keyword not comparable");
                false
            }
        }
    })
}

/// Check offer safety for a single offer.
///
/// True when the reallocation refunds all of `give` or fulfils all of
/// `want`, judged per side rather than per keyword.
pub fn is_offer_safe_for_offer(
    amount_maths: &AmountMathKeywordRecord,
    proposal: &Proposal,
    reallocation: &AmountKeywordRecord,
) -> bool {
    let refund_ok = side_satisfied(amount_maths, &proposal.give, reallocation);
    let winnings_ok = side_satisfied(amount_maths, &proposal.want, reallocation);
    refund_ok || winnings_ok
}

/// Check offer safety for several offers at once; every one must pass.
///
/// The three slices are parallel. Mismatched lengths are never safe.
pub fn is_offer_safe_for_all(
    amount_maths: &[AmountMathKeywordRecord],
    proposals: &[Proposal],
    reallocations: &[AmountKeywordRecord],
) -> bool {
    if amount_maths.len() != proposals.len() || proposals.len() != reallocations.len() {
        return false;
    }
    amount_maths
        .iter()
        .zip(proposals)
        .zip(reallocations)
        .all(|((maths, proposal), reallocation)| {
            is_offer_safe_for_offer(maths, proposal, reallocation)
        })
}
