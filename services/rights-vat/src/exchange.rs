//! Barter exchange
//!
//! Alice escrows moola and wants simoleans, Bob escrows simoleans and wants
//! moola. Alice receives exactly what she asked for and Bob receives what
//! he asked for plus whatever simoleans Alice did not need. Alice keeps any
//! moola Bob did not ask for.

use std::collections::BTreeMap;

use anyhow::Context;
use rights_escrow::{EscrowBook, OfferBook, OfferHandle};
use rights_issuer::{produce_issuer_with, Amount, IssuerKit, Payment, Purse};
use rights_offer_safety::{AmountKeywordRecord, ExitRule, Keyword, Proposal};
use tracing::{info, instrument};

use crate::config::BarterConfig;

/// Final purse balances of both parties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarterOutcome {
    pub alice_moola: Amount,
    pub alice_simoleans: Amount,
    pub bob_moola: Amount,
    pub bob_simoleans: Amount,
}

struct Party {
    name: &'static str,
    moola: Purse,
    simoleans: Purse,
}

impl Party {
    fn purse_for(&self, payment: &Payment) -> &Purse {
        if payment.get_alleged_brand() == self.moola.get_alleged_brand() {
            &self.moola
        } else {
            &self.simoleans
        }
    }

    async fn collect(&self, payout: BTreeMap<Keyword, Payment>) -> anyhow::Result<()> {
        for (keyword, payment) in payout {
            let balance = self
                .purse_for(&payment)
                .deposit(payment, None)
                .await
                .with_context(|| format!("{} could not deposit {keyword}", self.name))?;
            info!(party = self.name, %keyword, %balance, "payout deposited");
        }
        Ok(())
    }
}

fn record(entries: [(&str, Amount); 2]) -> AmountKeywordRecord {
    entries
        .into_iter()
        .map(|(keyword, amount)| (Keyword::from(keyword), amount))
        .collect()
}

async fn funded_purse(kit: &IssuerKit, extent: u64) -> anyhow::Result<Purse> {
    let purse = kit.issuer.make_empty_purse();
    let payment = kit.mint.mint_payment(kit.amount_math.make(extent)?).await?;
    purse.deposit(payment, None).await?;
    Ok(purse)
}

async fn escrow_offer(
    book: &EscrowBook,
    purse: &Purse,
    give: (&str, Amount),
    want: (&str, Amount),
) -> anyhow::Result<OfferHandle> {
    let payment = purse.withdraw(give.1.clone()).await?;
    let proposal = Proposal::new(
        BTreeMap::from([(Keyword::from(give.0), give.1)]),
        BTreeMap::from([(Keyword::from(want.0), want.1)]),
        ExitRule::OnDemand,
    );
    let handle = book
        .escrow(proposal, BTreeMap::from([(Keyword::from(give.0), payment)]))
        .await?;
    Ok(handle)
}

#[instrument(skip_all, fields(alice_gives = config.alice_gives, bob_gives = config.bob_gives))]
pub async fn run_barter(config: &BarterConfig) -> anyhow::Result<BarterOutcome> {
    let moola = produce_issuer_with(&config.moola);
    let simoleans = produce_issuer_with(&config.simoleans);
    let book = EscrowBook::new([&moola.issuer, &simoleans.issuer]);

    let alice = Party {
        name: "alice",
        moola: funded_purse(&moola, config.alice_gives).await?,
        simoleans: simoleans.issuer.make_empty_purse(),
    };
    let bob = Party {
        name: "bob",
        moola: moola.issuer.make_empty_purse(),
        simoleans: funded_purse(&simoleans, config.bob_gives).await?,
    };

    let alice_gives = moola.amount_math.make(config.alice_gives)?;
    let alice_wants = simoleans.amount_math.make(config.alice_wants)?;
    let bob_gives = simoleans.amount_math.make(config.bob_gives)?;
    let bob_wants = moola.amount_math.make(config.bob_wants)?;

    let alice_offer = escrow_offer(
        &book,
        &alice.moola,
        ("A", alice_gives.clone()),
        ("P", alice_wants.clone()),
    )
    .await
    .context("alice's offer was not escrowed")?;
    let bob_offer = escrow_offer(
        &book,
        &bob.simoleans,
        ("Pay", bob_gives.clone()),
        ("Goods", bob_wants.clone()),
    )
    .await
    .context("bob's offer was not escrowed")?;

    let alice_keeps = moola
        .amount_math
        .subtract(&alice_gives, &bob_wants)
        .context("alice does not give enough moola")?;
    let bob_keeps = simoleans
        .amount_math
        .subtract(&bob_gives, &alice_wants)
        .context("bob does not give enough simoleans")?;

    book.reallocate(&[
        (alice_offer, record([("A", alice_keeps), ("P", alice_wants)])),
        (bob_offer, record([("Goods", bob_wants), ("Pay", bob_keeps)])),
    ])
    .await
    .context("barter reallocation rejected")?;
    info!("offers matched");

    alice.collect(book.payout(alice_offer).await?).await?;
    bob.collect(book.payout(bob_offer).await?).await?;

    Ok(BarterOutcome {
        alice_moola: alice.moola.get_current_amount(),
        alice_simoleans: alice.simoleans.get_current_amount(),
        bob_moola: bob.moola.get_current_amount(),
        bob_simoleans: bob.simoleans.get_current_amount(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rights_issuer::Extent;

    #[tokio::test]
    async fn test_default_barter() {
        let outcome = run_barter(&BarterConfig::default()).await.unwrap();

        assert_eq!(outcome.alice_moola.extent(), &Extent::Nat(0));
        assert_eq!(outcome.alice_simoleans.extent(), &Extent::Nat(4));
        assert_eq!(outcome.bob_moola.extent(), &Extent::Nat(3));
        assert_eq!(outcome.bob_simoleans.extent(), &Extent::Nat(3));
    }

    #[tokio::test]
    async fn test_alice_keeps_unasked_moola() {
        let config = BarterConfig {
            alice_gives: 5,
            ..BarterConfig::default()
        };
        let outcome = run_barter(&config).await.unwrap();

        assert_eq!(outcome.alice_moola.extent(), &Extent::Nat(2));
        assert_eq!(outcome.bob_moola.extent(), &Extent::Nat(3));
    }

    #[tokio::test]
    async fn test_unmatched_offers_fail() {
        let config = BarterConfig {
            alice_wants: 8,
            ..BarterConfig::default()
        };
        assert!(run_barter(&config).await.is_err());
    }
}
