//! Escrow book
//!
//! Offers live in a single table guarded by one lock, so a reallocation
//! sees and replaces every allocation it touches in one step. Value only
//! enters or leaves the escrow purses through `escrow` and `payout`.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use rights_issuer::{Issuer, Payment, Purse};
use rights_offer_safety::{
    is_offer_safe_for_offer, AmountKeywordRecord, AmountMathKeywordRecord, Keyword, Proposal,
};
use rights_types::{Amount, AmountMath, Brand, RightsError};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{EscrowError, OfferBook, OfferHandle, Result};

struct OfferRecord {
    proposal: Proposal,
    amount_maths: AmountMathKeywordRecord,
    allocation: AmountKeywordRecord,
}

/// Per-brand running totals for a reallocation
struct BrandTotals {
    math: AmountMath,
    before: Vec<Amount>,
    after: Vec<Amount>,
}

pub struct EscrowBook {
    purses: HashMap<Brand, Purse>,
    offers: Mutex<HashMap<OfferHandle, OfferRecord>>,
}

impl EscrowBook {
    /// Create a book with one empty escrow purse per issuer
    pub fn new<'a>(issuers: impl IntoIterator<Item = &'a Issuer>) -> Self {
        let purses = issuers
            .into_iter()
            .map(|issuer| (issuer.get_brand().clone(), issuer.make_empty_purse()))
            .collect();
        Self {
            purses,
            offers: Mutex::new(HashMap::new()),
        }
    }

    /// Total `brand` value currently held in escrow
    pub fn escrow_balance(&self, brand: &Brand) -> Option<Amount> {
        self.purses.get(brand).map(Purse::get_current_amount)
    }

    pub async fn open_offers(&self) -> usize {
        self.offers.lock().await.len()
    }

    fn purse_for(&self, keyword: &Keyword, brand: &Brand) -> Result<&Purse> {
        self.purses
            .get(brand)
            .ok_or_else(|| EscrowError::UnknownBrand {
                keyword: keyword.clone(),
                brand: brand.to_string(),
            })
    }

    fn amount_math_for(&self, keyword: &Keyword, amount: &Amount) -> Result<AmountMath> {
        let math = self
            .purse_for(keyword, amount.brand())?
            .get_issuer()
            .get_amount_math()
            .clone();
        math.coerce(amount)?;
        Ok(math)
    }

    async fn refund(&self, deposited: Vec<(Keyword, Amount)>) -> BTreeMap<Keyword, Payment> {
        let mut refund = BTreeMap::new();
        for (keyword, amount) in deposited {
            let Some(purse) = self.purses.get(amount.brand()) else {
                continue;
            };
            match purse.withdraw(amount).await {
                Ok(payment) => {
                    refund.insert(keyword, payment);
                }
                Err(error) => error!(%keyword, %error, "refund withdrawal failed"),
            }
        }
        refund
    }

    /// Put payments withdrawn by an unfinished payout back into escrow
    async fn restore(&self, withdrawn: Vec<(Keyword, Payment)>) {
        for (keyword, payment) in withdrawn {
            let Some(purse) = self.purses.get(payment.get_alleged_brand()) else {
                continue;
            };
            if let Err(error) = purse.deposit(payment, None).await {
                error!(%keyword, %error, "payout restore failed");
            }
        }
    }
}

#[async_trait]
impl OfferBook for EscrowBook {
    async fn escrow(
        &self,
        proposal: Proposal,
        payments: BTreeMap<Keyword, Payment>,
    ) -> Result<OfferHandle> {
        let mut amount_maths = BTreeMap::new();
        for (keyword, amount) in proposal.give.iter().chain(proposal.want.iter()) {
            if amount_maths.contains_key(keyword) {
                return Err(EscrowError::KeywordConflict {
                    keyword: keyword.clone(),
                });
            }
            amount_maths.insert(keyword.clone(), self.amount_math_for(keyword, amount)?);
        }
        if let Some(keyword) = payments.keys().find(|k| !proposal.give.contains_key(*k)) {
            return Err(EscrowError::UnexpectedPayment {
                keyword: keyword.clone(),
            });
        }
        if let Some(keyword) = proposal.give.keys().find(|k| !payments.contains_key(*k)) {
            return Err(EscrowError::MissingPayment {
                keyword: keyword.clone(),
            });
        }

        let mut deposited = Vec::with_capacity(payments.len());
        for (keyword, payment) in payments {
            let Some(amount) = proposal.give.get(&keyword) else {
                continue;
            };
            let purse = self.purse_for(&keyword, amount.brand())?;
            match purse.deposit(payment, Some(amount.clone())).await {
                Ok(_) => deposited.push((keyword, amount.clone())),
                Err(source) => {
                    warn!(%keyword, %source, "escrow deposit failed, refunding");
                    let refund = self.refund(deposited).await;
                    return Err(EscrowError::Rejected { refund, source });
                }
            }
        }

        let mut allocation = proposal.give.clone();
        for (keyword, math) in &amount_maths {
            allocation
                .entry(keyword.clone())
                .or_insert_with(|| math.get_empty());
        }

        let handle = OfferHandle::new();
        self.offers.lock().await.insert(
            handle,
            OfferRecord {
                proposal,
                amount_maths,
                allocation,
            },
        );
        info!(%handle, "offer escrowed");
        Ok(handle)
    }

    async fn get_current_allocation(&self, handle: OfferHandle) -> Result<AmountKeywordRecord> {
        self.offers
            .lock()
            .await
            .get(&handle)
            .map(|record| record.allocation.clone())
            .ok_or(EscrowError::OfferNotFound { handle })
    }

    async fn reallocate(&self, reallocations: &[(OfferHandle, AmountKeywordRecord)]) -> Result<()> {
        let mut offers = self.offers.lock().await;

        let mut seen = HashSet::new();
        let mut totals: HashMap<Brand, BrandTotals> = HashMap::new();
        let mut staged = Vec::with_capacity(reallocations.len());

        for (handle, proposed) in reallocations {
            let handle = *handle;
            if !seen.insert(handle) {
                return Err(EscrowError::DuplicateOffer { handle });
            }
            let record = offers
                .get(&handle)
                .ok_or(EscrowError::OfferNotFound { handle })?;
            if let Some(keyword) = proposed
                .keys()
                .find(|k| !record.amount_maths.contains_key(*k))
            {
                return Err(EscrowError::UnknownKeyword {
                    handle,
                    keyword: keyword.clone(),
                });
            }

            let mut next = BTreeMap::new();
            for (keyword, math) in &record.amount_maths {
                let current = record
                    .allocation
                    .get(keyword)
                    .cloned()
                    .unwrap_or_else(|| math.get_empty());
                let amount = match proposed.get(keyword) {
                    Some(amount) => math.coerce(amount)?,
                    None => math.get_empty(),
                };
                let entry = totals
                    .entry(math.get_brand().clone())
                    .or_insert_with(|| BrandTotals {
                        math: math.clone(),
                        before: Vec::new(),
                        after: Vec::new(),
                    });
                entry.before.push(current);
                entry.after.push(amount.clone());
                next.insert(keyword.clone(), amount);
            }
            staged.push((handle, next));
        }

        for totals in totals.values() {
            let before = totals.math.sum(&totals.before)?;
            let after = totals.math.sum(&totals.after)?;
            if !totals.math.is_equal(&before, &after)? {
                return Err(RightsError::RightsNotConserved {
                    available: before.to_string(),
                    proposed: after.to_string(),
                }
                .into());
            }
        }

        for (handle, next) in &staged {
            if let Some(record) = offers.get(handle) {
                if !is_offer_safe_for_offer(&record.amount_maths, &record.proposal, next) {
                    return Err(EscrowError::OfferUnsafe { handle: *handle });
                }
            }
        }

        for (handle, next) in staged {
            if let Some(record) = offers.get_mut(&handle) {
                record.allocation = next;
            }
        }
        debug!(offers = reallocations.len(), "reallocation committed");
        Ok(())
    }

    async fn payout(&self, handle: OfferHandle) -> Result<BTreeMap<Keyword, Payment>> {
        let mut offers = self.offers.lock().await;
        let record = offers
            .get(&handle)
            .ok_or(EscrowError::OfferNotFound { handle })?;
        let withdrawals = record
            .allocation
            .iter()
            .map(|(keyword, amount)| {
                let purse = self.purse_for(keyword, amount.brand())?;
                Ok((keyword.clone(), amount.clone(), purse))
            })
            .collect::<Result<Vec<_>>>()?;

        // The offer stays recorded until every withdrawal has succeeded.
        let mut withdrawn = Vec::with_capacity(withdrawals.len());
        for (keyword, amount, purse) in withdrawals {
            match purse.withdraw(amount).await {
                Ok(payment) => withdrawn.push((keyword, payment)),
                Err(source) => {
                    warn!(%handle, %keyword, %source, "payout failed, restoring escrow");
                    self.restore(withdrawn).await;
                    return Err(EscrowError::PayoutFailed { handle, source });
                }
            }
        }

        offers.remove(&handle);
        info!(%handle, keywords = withdrawn.len(), "offer paid out");
        Ok(withdrawn.into_iter().collect())
    }
}
