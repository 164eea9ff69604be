//! Barter exchange driven through the escrow book

use std::collections::BTreeMap;

use rights_escrow::{EscrowBook, OfferBook};
use rights_issuer::{produce_issuer, Amount, Extent, IssuerKit, MathHelpersName, Payment, Purse};
use rights_offer_safety::{AmountKeywordRecord, ExitRule, Keyword, Proposal};

async fn funded_purse(kit: &IssuerKit, extent: u64) -> Purse {
    let purse = kit.issuer.make_empty_purse();
    let payment = kit
        .mint
        .mint_payment(kit.amount_math.make(extent).unwrap())
        .await
        .unwrap();
    purse.deposit(payment, None).await.unwrap();
    purse
}

fn record(entries: Vec<(&str, Amount)>) -> AmountKeywordRecord {
    entries
        .into_iter()
        .map(|(keyword, amount)| (Keyword::from(keyword), amount))
        .collect()
}

async fn deposit_all(purses: &[(&str, &Purse)], payout: BTreeMap<Keyword, Payment>) {
    for (keyword, payment) in payout {
        let (_, purse) = purses
            .iter()
            .find(|(name, _)| Keyword::from(*name) == keyword)
            .unwrap();
        purse.deposit(payment, None).await.unwrap();
    }
}

#[tokio::test]
async fn test_barter_exchange() {
    let moola = produce_issuer("moola", MathHelpersName::Nat);
    let simoleans = produce_issuer("simoleans", MathHelpersName::Nat);
    let book = EscrowBook::new([&moola.issuer, &simoleans.issuer]);

    let alice_moola = funded_purse(&moola, 3).await;
    let alice_simoleans = simoleans.issuer.make_empty_purse();
    let bob_moola = moola.issuer.make_empty_purse();
    let bob_simoleans = funded_purse(&simoleans, 7).await;

    // Alice gives 3 moola and wants at least 4 simoleans
    let alice_give = moola.amount_math.make(3u64).unwrap();
    let alice_offer = book
        .escrow(
            Proposal::new(
                record(vec![("A", alice_give.clone())]),
                record(vec![("P", simoleans.amount_math.make(4u64).unwrap())]),
                ExitRule::OnDemand,
            ),
            BTreeMap::from([(
                Keyword::from("A"),
                alice_moola.withdraw(alice_give).await.unwrap(),
            )]),
        )
        .await
        .unwrap();

    // Bob gives 7 simoleans and wants 3 moola
    let bob_give = simoleans.amount_math.make(7u64).unwrap();
    let bob_offer = book
        .escrow(
            Proposal::new(
                record(vec![("Pay", bob_give.clone())]),
                record(vec![("Goods", moola.amount_math.make(3u64).unwrap())]),
                ExitRule::OnDemand,
            ),
            BTreeMap::from([(
                Keyword::from("Pay"),
                bob_simoleans.withdraw(bob_give).await.unwrap(),
            )]),
        )
        .await
        .unwrap();

    book.reallocate(&[
        (
            alice_offer,
            record(vec![
                ("A", moola.amount_math.make(0u64).unwrap()),
                ("P", simoleans.amount_math.make(4u64).unwrap()),
            ]),
        ),
        (
            bob_offer,
            record(vec![
                ("Goods", moola.amount_math.make(3u64).unwrap()),
                ("Pay", simoleans.amount_math.make(3u64).unwrap()),
            ]),
        ),
    ])
    .await
    .unwrap();

    let alice_payout = book.payout(alice_offer).await.unwrap();
    let bob_payout = book.payout(bob_offer).await.unwrap();
    deposit_all(&[("A", &alice_moola), ("P", &alice_simoleans)], alice_payout).await;
    deposit_all(&[("Goods", &bob_moola), ("Pay", &bob_simoleans)], bob_payout).await;

    assert_eq!(alice_moola.get_current_amount(), moola.amount_math.make(0u64).unwrap());
    assert_eq!(alice_simoleans.get_current_amount(), simoleans.amount_math.make(4u64).unwrap());
    assert_eq!(bob_moola.get_current_amount(), moola.amount_math.make(3u64).unwrap());
    assert_eq!(bob_simoleans.get_current_amount(), simoleans.amount_math.make(3u64).unwrap());

    // escrow purses drained, supply untouched
    for kit in [&moola, &simoleans] {
        let escrowed = book.escrow_balance(kit.issuer.get_brand()).unwrap();
        assert!(kit.amount_math.is_empty(&escrowed).unwrap());
        let supply = kit.issuer.supply().await.unwrap();
        assert_eq!(supply.live_count, 0);
        assert_eq!(supply.burn_count, 0);
    }
    assert_eq!(book.open_offers().await, 0);
}

#[tokio::test]
async fn test_refund_on_exit_without_trade() {
    let moola = produce_issuer("moola", MathHelpersName::Nat);
    let simoleans = produce_issuer("simoleans", MathHelpersName::Nat);
    let book = EscrowBook::new([&moola.issuer, &simoleans.issuer]);

    let give = moola.amount_math.make(10u64).unwrap();
    let payment = moola.mint.mint_payment(give.clone()).await.unwrap();
    let offer = book
        .escrow(
            Proposal::new(
                record(vec![("A", give.clone())]),
                record(vec![("P", simoleans.amount_math.make(1u64).unwrap())]),
                ExitRule::OnDemand,
            ),
            BTreeMap::from([(Keyword::from("A"), payment)]),
        )
        .await
        .unwrap();

    let payout = book.payout(offer).await.unwrap();
    let refund = payout[&Keyword::from("A")].clone();
    assert_eq!(moola.issuer.get_amount_of(refund).await.unwrap(), give);
}

#[tokio::test]
async fn test_swap_non_fungible_tickets() {
    let tickets = produce_issuer("tickets", MathHelpersName::Set);
    let moola = produce_issuer("moola", MathHelpersName::Nat);
    let book = EscrowBook::new([&tickets.issuer, &moola.issuer]);

    let seats = tickets.amount_math.make(Extent::set([1, 2])).unwrap();
    let price = moola.amount_math.make(50u64).unwrap();

    let seller = book
        .escrow(
            Proposal::new(
                record(vec![("Seats", seats.clone())]),
                record(vec![("Price", price.clone())]),
                ExitRule::Waived,
            ),
            BTreeMap::from([(
                Keyword::from("Seats"),
                tickets.mint.mint_payment(seats.clone()).await.unwrap(),
            )]),
        )
        .await
        .unwrap();
    let buyer = book
        .escrow(
            Proposal::new(
                record(vec![("Money", price.clone())]),
                record(vec![("Tickets", seats.clone())]),
                ExitRule::OnDemand,
            ),
            BTreeMap::from([(
                Keyword::from("Money"),
                moola.mint.mint_payment(price.clone()).await.unwrap(),
            )]),
        )
        .await
        .unwrap();

    book.reallocate(&[
        (
            seller,
            record(vec![
                ("Seats", tickets.amount_math.get_empty()),
                ("Price", price.clone()),
            ]),
        ),
        (
            buyer,
            record(vec![
                ("Money", moola.amount_math.get_empty()),
                ("Tickets", seats.clone()),
            ]),
        ),
    ])
    .await
    .unwrap();

    let bought = book.payout(buyer).await.unwrap();
    assert_eq!(
        tickets
            .issuer
            .get_amount_of(bought[&Keyword::from("Tickets")].clone())
            .await
            .unwrap(),
        seats
    );
    let sold = book.payout(seller).await.unwrap();
    assert_eq!(
        moola
            .issuer
            .get_amount_of(sold[&Keyword::from("Price")].clone())
            .await
            .unwrap(),
        price
    );
}
