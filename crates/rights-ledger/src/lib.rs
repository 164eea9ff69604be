//! Rights Ledger - the live-payment table behind one issuer
//!
//! The ledger is:
//! - Brand-scoped (one ledger per issuer, one brand per ledger)
//! - Keyed by monotonically issued payment ids
//! - Conserving (no transaction creates or destroys value except mint/burn)
//! - Journaled (every transaction appends an entry)
//!
//! # Invariants
//!
//! 1. `live payments + held in purses == outstanding`, where every mint
//!    adds to `outstanding` and every burn subtracts from it
//! 2. A payment id is consumed at most once and never reissued
//! 3. A transaction validates every input before touching any state
//!
//! The ledger is synchronous and single-owner: its issuer actor applies
//! one transaction at a time, which is what makes each one atomic.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use rights_types::{Amount, AmountMath, Brand, Result, RightsError};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

/// Handle of a payment inside one ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PaymentId(pub u64);

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payment_{}", self.0)
    }
}

/// Unique identifier for a journal entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new() -> Self {
        Self(format!("entry_{}", Uuid::new_v4()))
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a ledger transaction happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryReason {
    Mint,
    Burn,
    Claim,
    Split,
    SplitMany,
    Combine,
    /// Payment extinguished into a purse balance
    Deposit,
    /// Payment created out of a purse balance
    Withdraw,
}

/// One committed ledger transaction
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub entry_id: EntryId,
    pub reason: EntryReason,
    pub consumed: Vec<PaymentId>,
    pub created: Vec<PaymentId>,
    /// Total value moved by the transaction
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

/// Supply totals of one brand
///
/// `outstanding` grows with every mint and shrinks with every burn; it
/// always equals `live_payments + held_in_purses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplySnapshot {
    pub outstanding: Amount,
    pub mint_count: u64,
    pub burn_count: u64,
    pub live_payments: Amount,
    pub held_in_purses: Amount,
    pub live_count: usize,
}

/// The payment ledger of one issuer
#[derive(Debug)]
pub struct Ledger {
    math: AmountMath,
    live: HashMap<PaymentId, Amount>,
    next_id: u64,
    outstanding: Amount,
    mint_count: u64,
    burn_count: u64,
    held_in_purses: Amount,
    journal: Vec<JournalEntry>,
}

impl Ledger {
    pub fn new(math: AmountMath) -> Self {
        let empty = math.get_empty();
        Self {
            math,
            live: HashMap::new(),
            next_id: 0,
            outstanding: empty.clone(),
            mint_count: 0,
            burn_count: 0,
            held_in_purses: empty,
            journal: Vec::new(),
        }
    }

    pub fn brand(&self) -> &Brand {
        self.math.get_brand()
    }

    pub fn is_live(&self, id: PaymentId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn amount_of(&self, id: PaymentId) -> Result<Amount> {
        self.live
            .get(&id)
            .cloned()
            .ok_or_else(|| RightsError::payment_not_found(self.brand()))
    }

    /// Create a live payment backed by no prior value.
    ///
    /// Only value currently in existence constrains a mint: a burned set
    /// element can be minted again, an outstanding one cannot.
    pub fn mint(&mut self, amount: &Amount) -> Result<PaymentId> {
        let amount = self.math.coerce(amount)?;
        let outstanding = self.math.add(&self.outstanding, &amount)?;

        let id = self.issue(amount.clone());
        self.outstanding = outstanding;
        self.mint_count += 1;
        self.record(EntryReason::Mint, vec![], vec![id], amount.clone());
        info!(brand = %self.brand(), payment = %id, extent = %amount.extent(), "minted payment");
        Ok(id)
    }

    /// Extinguish a payment and remove its value from supply
    pub fn burn(&mut self, id: PaymentId, expected: Option<&Amount>) -> Result<Amount> {
        let amount = self.amount_of(id)?;
        self.check_expected(&amount, expected)?;
        let outstanding = self.math.subtract(&self.outstanding, &amount)?;

        self.live.remove(&id);
        self.outstanding = outstanding;
        self.burn_count += 1;
        self.record(EntryReason::Burn, vec![id], vec![], amount.clone());
        info!(brand = %self.brand(), payment = %id, extent = %amount.extent(), "burned payment");
        Ok(amount)
    }

    /// Replace a payment with a fresh one of the same amount
    pub fn claim(&mut self, id: PaymentId, expected: Option<&Amount>) -> Result<PaymentId> {
        let amount = self.amount_of(id)?;
        self.check_expected(&amount, expected)?;
        let created = self.reissue(&[id], vec![amount], EntryReason::Claim)?;
        Ok(created[0])
    }

    /// Split off `amount_a`; the second payment carries the remainder
    pub fn split(&mut self, id: PaymentId, amount_a: &Amount) -> Result<(PaymentId, PaymentId)> {
        let original = self.amount_of(id)?;
        let amount_a = self.math.coerce(amount_a)?;
        let amount_b = self.math.subtract(&original, &amount_a)?;

        let created = self.reissue(&[id], vec![amount_a, amount_b], EntryReason::Split)?;
        Ok((created[0], created[1]))
    }

    /// Split into exactly the given amounts, which must sum to the original
    pub fn split_many(&mut self, id: PaymentId, amounts: &[Amount]) -> Result<Vec<PaymentId>> {
        self.amount_of(id)?;
        let amounts = amounts
            .iter()
            .map(|amount| self.math.coerce(amount))
            .collect::<Result<Vec<_>>>()?;
        self.reissue(&[id], amounts, EntryReason::SplitMany)
    }

    /// Merge payments into one carrying their sum
    pub fn combine(&mut self, ids: &[PaymentId]) -> Result<PaymentId> {
        let total = self.total_of(ids)?;
        let created = self.reissue(ids, vec![total], EntryReason::Combine)?;
        Ok(created[0])
    }

    /// Extinguish a payment into purse custody.
    ///
    /// `into` is the receiving purse's balance; the new balance is
    /// returned and nothing is committed if it cannot be formed.
    pub fn deposit(
        &mut self,
        id: PaymentId,
        expected: Option<&Amount>,
        into: &Amount,
    ) -> Result<Amount> {
        let amount = self.amount_of(id)?;
        self.check_expected(&amount, expected)?;
        let balance = self.math.add(into, &amount)?;
        let held = self.math.add(&self.held_in_purses, &amount)?;

        self.live.remove(&id);
        self.held_in_purses = held;
        self.record(EntryReason::Deposit, vec![id], vec![], amount.clone());
        debug!(
            brand = %self.brand(),
            payment = %id,
            extent = %amount.extent(),
            "deposited payment"
        );
        Ok(balance)
    }

    /// Turn purse custody back into a live payment
    pub fn withdraw(&mut self, amount: &Amount) -> Result<PaymentId> {
        let amount = self.math.coerce(amount)?;
        let held = self.math.subtract(&self.held_in_purses, &amount)?;

        let id = self.issue(amount.clone());
        self.held_in_purses = held;
        self.record(EntryReason::Withdraw, vec![], vec![id], amount.clone());
        debug!(brand = %self.brand(), payment = %id, extent = %amount.extent(), "withdrew payment");
        Ok(id)
    }

    pub fn supply(&self) -> Result<SupplySnapshot> {
        Ok(SupplySnapshot {
            outstanding: self.outstanding.clone(),
            mint_count: self.mint_count,
            burn_count: self.burn_count,
            live_payments: self.math.sum(self.live.values())?,
            held_in_purses: self.held_in_purses.clone(),
            live_count: self.live.len(),
        })
    }

    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// Consume `inputs` and create `outputs` in one step.
    ///
    /// Inputs must be distinct and live, and the outputs must sum exactly
    /// to the inputs. Nothing is mutated unless every check passes.
    fn reissue(
        &mut self,
        inputs: &[PaymentId],
        outputs: Vec<Amount>,
        reason: EntryReason,
    ) -> Result<Vec<PaymentId>> {
        let available = self.total_of(inputs)?;
        let proposed = self.math.sum(&outputs)?;
        if !self.math.is_equal(&available, &proposed)? {
            return Err(RightsError::RightsNotConserved {
                available: available.to_string(),
                proposed: proposed.to_string(),
            });
        }

        for id in inputs {
            self.live.remove(id);
        }
        let created: Vec<PaymentId> = outputs.into_iter().map(|a| self.issue(a)).collect();
        self.record(reason, inputs.to_vec(), created.clone(), available);
        debug!(
            brand = %self.brand(),
            reason = ?reason,
            consumed = inputs.len(),
            created = created.len(),
            "ledger transaction committed"
        );
        Ok(created)
    }

    fn total_of(&self, ids: &[PaymentId]) -> Result<Amount> {
        let mut seen = HashSet::with_capacity(ids.len());
        let mut total = self.math.get_empty();
        for id in ids {
            if !seen.insert(*id) {
                return Err(RightsError::payment_not_found(self.brand()));
            }
            total = self.math.add(&total, &self.amount_of(*id)?)?;
        }
        Ok(total)
    }

    fn check_expected(&self, actual: &Amount, expected: Option<&Amount>) -> Result<()> {
        if let Some(expected) = expected {
            if !self.math.is_equal(actual, expected)? {
                return Err(RightsError::AmountMismatch {
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }
        Ok(())
    }

    fn issue(&mut self, amount: Amount) -> PaymentId {
        let id = PaymentId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, amount);
        id
    }

    fn record(
        &mut self,
        reason: EntryReason,
        consumed: Vec<PaymentId>,
        created: Vec<PaymentId>,
        amount: Amount,
    ) {
        self.journal.push(JournalEntry {
            entry_id: EntryId::new(),
            reason,
            consumed,
            created,
            amount,
            created_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rights_types::{Extent, MathHelpersName};

    fn create_test_ledger() -> (Ledger, AmountMath) {
        let math = AmountMath::new(Brand::new("fungible"), MathHelpersName::Nat);
        (Ledger::new(math.clone()), math)
    }

    fn assert_conserved(ledger: &Ledger, math: &AmountMath) {
        let supply = ledger.supply().unwrap();
        let accounted = math
            .add(&supply.live_payments, &supply.held_in_purses)
            .unwrap();
        assert_eq!(supply.outstanding, accounted);
    }

    #[test]
    fn test_mint_and_amount_of() {
        let (mut ledger, math) = create_test_ledger();
        let id = ledger.mint(&math.make(837u64).unwrap()).unwrap();

        assert_eq!(ledger.amount_of(id).unwrap(), math.make(837u64).unwrap());
        assert_conserved(&ledger, &math);
    }

    #[test]
    fn test_claim_kills_original() {
        let (mut ledger, math) = create_test_ledger();
        let id = ledger.mint(&math.make(2u64).unwrap()).unwrap();

        let fresh = ledger.claim(id, Some(&math.make(2u64).unwrap())).unwrap();

        assert_ne!(fresh, id);
        assert!(matches!(
            ledger.amount_of(id),
            Err(RightsError::PaymentNotFound { .. })
        ));
        assert_eq!(ledger.amount_of(fresh).unwrap(), math.make(2u64).unwrap());
    }

    #[test]
    fn test_claim_amount_mismatch_leaves_payment_live() {
        let (mut ledger, math) = create_test_ledger();
        let id = ledger.mint(&math.make(2u64).unwrap()).unwrap();

        let result = ledger.claim(id, Some(&math.make(3u64).unwrap()));

        assert!(matches!(result, Err(RightsError::AmountMismatch { .. })));
        assert!(ledger.is_live(id));
    }

    #[test]
    fn test_split_and_combine_round_trip() {
        let (mut ledger, math) = create_test_ledger();
        let id = ledger.mint(&math.make(837u64).unwrap()).unwrap();

        let (a, b) = ledger.split(id, &math.make(100u64).unwrap()).unwrap();
        assert_eq!(ledger.amount_of(b).unwrap(), math.make(737u64).unwrap());

        let combined = ledger.combine(&[a, b]).unwrap();
        assert_eq!(
            ledger.amount_of(combined).unwrap(),
            math.make(837u64).unwrap()
        );
        assert!(!ledger.is_live(a));
        assert!(!ledger.is_live(b));
        assert_conserved(&ledger, &math);
    }

    #[test]
    fn test_split_many_requires_exact_sum() {
        let (mut ledger, math) = create_test_ledger();
        let id = ledger.mint(&math.make(1000u64).unwrap()).unwrap();
        let ten = math.make(10u64).unwrap();

        let result = ledger.split_many(id, &[ten.clone(), ten.clone()]);
        assert!(matches!(
            result,
            Err(RightsError::RightsNotConserved { .. })
        ));
        assert!(ledger.is_live(id));

        let too_much = vec![math.make(600u64).unwrap(), math.make(600u64).unwrap()];
        assert!(matches!(
            ledger.split_many(id, &too_much),
            Err(RightsError::RightsNotConserved { .. })
        ));

        let exact = vec![math.make(250u64).unwrap(), math.make(750u64).unwrap()];
        let parts = ledger.split_many(id, &exact).unwrap();
        assert_eq!(parts.len(), 2);
        assert!(!ledger.is_live(id));
    }

    #[test]
    fn test_split_more_than_held() {
        let (mut ledger, math) = create_test_ledger();
        let id = ledger.mint(&math.make(5u64).unwrap()).unwrap();

        let result = ledger.split(id, &math.make(6u64).unwrap());
        assert!(matches!(
            result,
            Err(RightsError::InsufficientExtent { .. })
        ));
        assert!(ledger.is_live(id));
    }

    #[test]
    fn test_combine_is_all_or_nothing() {
        let (mut ledger, math) = create_test_ledger();
        let a = ledger.mint(&math.make(1u64).unwrap()).unwrap();
        let b = ledger.mint(&math.make(1u64).unwrap()).unwrap();
        let dead = ledger.mint(&math.make(1u64).unwrap()).unwrap();
        ledger.burn(dead, None).unwrap();

        let result = ledger.combine(&[a, b, dead]);

        assert!(matches!(result, Err(RightsError::PaymentNotFound { .. })));
        assert!(ledger.is_live(a));
        assert!(ledger.is_live(b));
        assert_conserved(&ledger, &math);
    }

    #[test]
    fn test_combine_rejects_duplicate_alias() {
        let (mut ledger, math) = create_test_ledger();
        let a = ledger.mint(&math.make(5u64).unwrap()).unwrap();

        let result = ledger.combine(&[a, a]);

        assert!(matches!(result, Err(RightsError::PaymentNotFound { .. })));
        assert_eq!(ledger.amount_of(a).unwrap(), math.make(5u64).unwrap());
    }

    #[test]
    fn test_deposit_withdraw_custody() {
        let (mut ledger, math) = create_test_ledger();
        let id = ledger.mint(&math.make(25u64).unwrap()).unwrap();

        let balance = ledger
            .deposit(id, Some(&math.make(25u64).unwrap()), &math.make(5u64).unwrap())
            .unwrap();
        assert_eq!(balance, math.make(30u64).unwrap());
        assert_conserved(&ledger, &math);

        let out = ledger.withdraw(&math.make(10u64).unwrap()).unwrap();
        assert_eq!(ledger.amount_of(out).unwrap(), math.make(10u64).unwrap());
        assert_eq!(
            ledger.supply().unwrap().held_in_purses,
            math.make(15u64).unwrap()
        );
        assert_conserved(&ledger, &math);

        assert!(matches!(
            ledger.withdraw(&math.make(16u64).unwrap()),
            Err(RightsError::InsufficientExtent { .. })
        ));
    }

    #[test]
    fn test_burn_reduces_supply() {
        let (mut ledger, math) = create_test_ledger();
        let id = ledger.mint(&math.make(837u64).unwrap()).unwrap();

        let burned = ledger.burn(id, Some(&math.make(837u64).unwrap())).unwrap();

        assert_eq!(burned.extent(), &Extent::Nat(837));
        let supply = ledger.supply().unwrap();
        assert!(math.is_empty(&supply.outstanding).unwrap());
        assert_eq!(supply.burn_count, 1);
        assert_eq!(supply.live_count, 0);
        assert!(matches!(
            ledger.burn(id, None),
            Err(RightsError::PaymentNotFound { .. })
        ));
    }

    #[test]
    fn test_burned_token_can_be_minted_again() {
        let math = AmountMath::new(Brand::new("tickets"), MathHelpersName::Set);
        let mut ledger = Ledger::new(math.clone());
        let seat = math.make(Extent::set([1])).unwrap();

        for _ in 0..3 {
            let id = ledger.mint(&seat).unwrap();
            ledger.burn(id, Some(&seat)).unwrap();
        }

        let id = ledger.mint(&seat).unwrap();
        assert!(matches!(
            ledger.mint(&seat),
            Err(RightsError::InvalidExtent { .. })
        ));
        assert!(ledger.is_live(id));
        let supply = ledger.supply().unwrap();
        assert_eq!(supply.mint_count, 4);
        assert_eq!(supply.burn_count, 3);
        assert_conserved(&ledger, &math);
    }

    #[test]
    fn test_mint_after_burning_max_supply() {
        let (mut ledger, math) = create_test_ledger();
        let max = math.make(u64::MAX).unwrap();

        let id = ledger.mint(&max).unwrap();
        ledger.burn(id, None).unwrap();
        let one = ledger.mint(&math.make(1u64).unwrap()).unwrap();

        assert_eq!(ledger.amount_of(one).unwrap(), math.make(1u64).unwrap());
        assert!(matches!(
            ledger.mint(&max),
            Err(RightsError::InvalidExtent { .. })
        ));
        assert_conserved(&ledger, &math);
    }

    #[test]
    fn test_journal_tracking() {
        let (mut ledger, math) = create_test_ledger();
        let id = ledger.mint(&math.make(20u64).unwrap()).unwrap();
        let (a, _) = ledger.split(id, &math.make(10u64).unwrap()).unwrap();
        ledger.claim(a, None).unwrap();

        let reasons: Vec<EntryReason> = ledger.journal().iter().map(|e| e.reason).collect();
        assert_eq!(
            reasons,
            vec![EntryReason::Mint, EntryReason::Split, EntryReason::Claim]
        );
        assert_eq!(ledger.journal()[1].consumed, vec![id]);
    }
}
