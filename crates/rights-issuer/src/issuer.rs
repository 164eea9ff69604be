//! Issuer and Mint
//!
//! One actor task per brand owns the [`Ledger`]. [`Issuer`] and [`Mint`]
//! are handles onto its mailbox: every call enqueues a command at call time
//! and returns an [`Eventual`], so calls from one sender are applied in the
//! order they were made. The actor applies each command to completion
//! before looking at the next, which makes every ledger transaction atomic
//! without locks.

use futures::future::try_join_all;
use rights_ledger::{JournalEntry, Ledger, PaymentId, SupplySnapshot};
use rights_types::{Amount, AmountMath, Brand, MathHelpersName, Result, RightsError};
use tokio::sync::mpsc;
use tracing::{debug, warn, Instrument};

use crate::eventual::Reply;
use crate::{Eventual, Payment, PaymentP, Purse};

const ISSUER: &str = "issuer";

pub(crate) enum IssuerCommand {
    GetAmountOf {
        payment: PaymentId,
        reply: Reply<Amount>,
    },
    Mint {
        amount: Amount,
        reply: Reply<Payment>,
    },
    Burn {
        payment: PaymentId,
        expected: Option<Amount>,
        reply: Reply<Amount>,
    },
    Claim {
        payment: PaymentId,
        expected: Option<Amount>,
        reply: Reply<Payment>,
    },
    Split {
        payment: PaymentId,
        amount_a: Amount,
        reply: Reply<[Payment; 2]>,
    },
    SplitMany {
        payment: PaymentId,
        amounts: Vec<Amount>,
        reply: Reply<Vec<Payment>>,
    },
    Combine {
        payments: Vec<PaymentId>,
        reply: Reply<Payment>,
    },
    Deposit {
        payment: PaymentId,
        expected: Option<Amount>,
        balance: Amount,
        reply: Reply<Amount>,
    },
    Withdraw {
        amount: Amount,
        reply: Reply<Payment>,
    },
    Supply {
        reply: Reply<SupplySnapshot>,
    },
    Journal {
        reply: Reply<Vec<JournalEntry>>,
    },
}

impl IssuerCommand {
    fn name(&self) -> &'static str {
        match self {
            IssuerCommand::GetAmountOf { .. } => "getAmountOf",
            IssuerCommand::Mint { .. } => "mintPayment",
            IssuerCommand::Burn { .. } => "burn",
            IssuerCommand::Claim { .. } => "claim",
            IssuerCommand::Split { .. } => "split",
            IssuerCommand::SplitMany { .. } => "splitMany",
            IssuerCommand::Combine { .. } => "combine",
            IssuerCommand::Deposit { .. } => "deposit",
            IssuerCommand::Withdraw { .. } => "withdraw",
            IssuerCommand::Supply { .. } => "supply",
            IssuerCommand::Journal { .. } => "journal",
        }
    }
}

/// Send `result` back, logging rejections
fn respond<T>(command: &'static str, reply: Reply<T>, result: Result<T>) {
    if let Err(error) = &result {
        warn!(command, %error, "issuer rejected command");
    }
    let _ = reply.send(result);
}

struct IssuerActor {
    ledger: Ledger,
    brand: Brand,
}

impl IssuerActor {
    fn payment(&self, id: PaymentId) -> Payment {
        Payment::new(id, self.brand.clone())
    }

    fn handle(&mut self, command: IssuerCommand) {
        let name = command.name();
        debug!(command = name, "issuer applying command");
        match command {
            IssuerCommand::GetAmountOf { payment, reply } => {
                respond(name, reply, self.ledger.amount_of(payment));
            }
            IssuerCommand::Mint { amount, reply } => {
                let result = self.ledger.mint(&amount).map(|id| self.payment(id));
                respond(name, reply, result);
            }
            IssuerCommand::Burn {
                payment,
                expected,
                reply,
            } => {
                respond(name, reply, self.ledger.burn(payment, expected.as_ref()));
            }
            IssuerCommand::Claim {
                payment,
                expected,
                reply,
            } => {
                let result = self
                    .ledger
                    .claim(payment, expected.as_ref())
                    .map(|id| self.payment(id));
                respond(name, reply, result);
            }
            IssuerCommand::Split {
                payment,
                amount_a,
                reply,
            } => {
                let result = self
                    .ledger
                    .split(payment, &amount_a)
                    .map(|(a, b)| [self.payment(a), self.payment(b)]);
                respond(name, reply, result);
            }
            IssuerCommand::SplitMany {
                payment,
                amounts,
                reply,
            } => {
                let result = self
                    .ledger
                    .split_many(payment, &amounts)
                    .map(|ids| ids.into_iter().map(|id| self.payment(id)).collect());
                respond(name, reply, result);
            }
            IssuerCommand::Combine { payments, reply } => {
                let result = self.ledger.combine(&payments).map(|id| self.payment(id));
                respond(name, reply, result);
            }
            IssuerCommand::Deposit {
                payment,
                expected,
                balance,
                reply,
            } => {
                let result = self.ledger.deposit(payment, expected.as_ref(), &balance);
                respond(name, reply, result);
            }
            IssuerCommand::Withdraw { amount, reply } => {
                let result = self.ledger.withdraw(&amount).map(|id| self.payment(id));
                respond(name, reply, result);
            }
            IssuerCommand::Supply { reply } => {
                respond(name, reply, self.ledger.supply());
            }
            IssuerCommand::Journal { reply } => {
                let _ = reply.send(Ok(self.ledger.journal().to_vec()));
            }
        }
    }

    async fn run(mut self, mut mailbox: mpsc::UnboundedReceiver<IssuerCommand>) {
        while let Some(command) = mailbox.recv().await {
            self.handle(command);
        }
        debug!("issuer mailbox closed");
    }
}

/// Spawn the ledger actor for a fresh brand and return its two facets
pub(crate) fn spawn_issuer(alleged_name: &str, math_helpers: MathHelpersName) -> (Issuer, Mint) {
    let brand = Brand::new(alleged_name);
    let amount_math = AmountMath::new(brand.clone(), math_helpers);
    let (sender, mailbox) = mpsc::unbounded_channel();

    let actor = IssuerActor {
        ledger: Ledger::new(amount_math.clone()),
        brand: brand.clone(),
    };
    let span = tracing::debug_span!("issuer", brand = %brand, math_helpers = %math_helpers);
    tokio::spawn(actor.run(mailbox).instrument(span));

    let issuer = Issuer {
        brand,
        amount_math,
        sender,
    };
    let mint = Mint {
        issuer: issuer.clone(),
    };
    (issuer, mint)
}

/// Public authority for one brand
///
/// Verifies, claims, splits, combines and burns payments. Consuming
/// operations accept a settled payment or a promise for one; promises are
/// awaited before the command is delivered, and liveness is always checked
/// again by the ledger at the moment of consumption.
#[derive(Clone)]
pub struct Issuer {
    brand: Brand,
    amount_math: AmountMath,
    sender: mpsc::UnboundedSender<IssuerCommand>,
}

impl Issuer {
    pub fn get_brand(&self) -> &Brand {
        &self.brand
    }

    pub fn get_alleged_name(&self) -> &str {
        self.brand.get_alleged_name()
    }

    pub fn get_amount_math(&self) -> &AmountMath {
        &self.amount_math
    }

    pub fn get_math_helpers_name(&self) -> MathHelpersName {
        self.amount_math.get_math_helpers_name()
    }

    pub fn get_amount_of(&self, payment: impl Into<PaymentP>) -> Eventual<Amount> {
        self.dispatch(vec![payment.into()], |mut ids, reply| {
            IssuerCommand::GetAmountOf {
                payment: ids.remove(0),
                reply,
            }
        })
    }

    /// Create an empty purse for this brand
    ///
    /// Spawns the purse actor, so this must run inside a tokio runtime.
    pub fn make_empty_purse(&self) -> Purse {
        Purse::spawn(self.clone())
    }

    /// Destroy a payment and return its amount
    pub fn burn(&self, payment: impl Into<PaymentP>, expected: Option<Amount>) -> Eventual<Amount> {
        self.dispatch(vec![payment.into()], move |mut ids, reply| IssuerCommand::Burn {
            payment: ids.remove(0),
            expected,
            reply,
        })
    }

    /// Exchange a payment for a fresh one of the same amount, cutting off
    /// every other reference to the original
    pub fn claim(
        &self,
        payment: impl Into<PaymentP>,
        expected: Option<Amount>,
    ) -> Eventual<Payment> {
        self.dispatch(vec![payment.into()], move |mut ids, reply| IssuerCommand::Claim {
            payment: ids.remove(0),
            expected,
            reply,
        })
    }

    /// Split off `amount_a`; the second payment holds the remainder
    pub fn split(&self, payment: impl Into<PaymentP>, amount_a: Amount) -> Eventual<[Payment; 2]> {
        self.dispatch(vec![payment.into()], move |mut ids, reply| IssuerCommand::Split {
            payment: ids.remove(0),
            amount_a,
            reply,
        })
    }

    /// Split into exactly `amounts`, which must sum to the payment's amount
    pub fn split_many(
        &self,
        payment: impl Into<PaymentP>,
        amounts: Vec<Amount>,
    ) -> Eventual<Vec<Payment>> {
        self.dispatch(vec![payment.into()], move |mut ids, reply| {
            IssuerCommand::SplitMany {
                payment: ids.remove(0),
                amounts,
                reply,
            }
        })
    }

    /// Merge payments into one; all inputs are consumed or none are
    pub fn combine<I, P>(&self, payments: I) -> Eventual<Payment>
    where
        I: IntoIterator<Item = P>,
        P: Into<PaymentP>,
    {
        let payments = payments.into_iter().map(Into::into).collect();
        self.dispatch(payments, |ids, reply| IssuerCommand::Combine {
            payments: ids,
            reply,
        })
    }

    /// Cumulative supply totals of this brand
    pub fn supply(&self) -> Eventual<SupplySnapshot> {
        self.send(|reply| IssuerCommand::Supply { reply })
    }

    /// Committed ledger transactions, oldest first
    pub fn journal(&self) -> Eventual<Vec<JournalEntry>> {
        self.send(|reply| IssuerCommand::Journal { reply })
    }

    pub(crate) fn deposit_into_purse(
        &self,
        payment: &Payment,
        expected: Option<Amount>,
        balance: Amount,
    ) -> Eventual<Amount> {
        self.dispatch(vec![payment.into()], move |mut ids, reply| IssuerCommand::Deposit {
            payment: ids.remove(0),
            expected,
            balance,
            reply,
        })
    }

    pub(crate) fn withdraw_from_purse(&self, amount: Amount) -> Eventual<Payment> {
        self.send(|reply| IssuerCommand::Withdraw { amount, reply })
    }

    fn send<T>(&self, build: impl FnOnce(Reply<T>) -> IssuerCommand) -> Eventual<T> {
        let (reply, receiver) = tokio::sync::oneshot::channel();
        if self.sender.send(build(reply)).is_err() {
            return Eventual::rejected(ISSUER, RightsError::unavailable(ISSUER));
        }
        Eventual::waiting(ISSUER, receiver)
    }

    /// Deliver a payment-consuming command.
    ///
    /// Settled inputs are delivered right away, preserving send order.
    /// If any input is still a promise, delivery waits for all of them on
    /// a separate task; the ledger itself never waits.
    fn dispatch<T, F>(&self, payments: Vec<PaymentP>, build: F) -> Eventual<T>
    where
        T: Send + 'static,
        F: FnOnce(Vec<PaymentId>, Reply<T>) -> IssuerCommand + Send + 'static,
    {
        if payments.iter().all(PaymentP::is_settled) {
            let settled = payments
                .into_iter()
                .filter_map(|payment| match payment {
                    PaymentP::Settled(payment) => Some(payment),
                    PaymentP::Pending(_) => None,
                })
                .collect();
            return self.deliver(settled, build);
        }

        let issuer = self.clone();
        Eventual::spawn(ISSUER, async move {
            let settled = try_join_all(payments.into_iter().map(PaymentP::settle)).await?;
            issuer.deliver(settled, build).await
        })
    }

    fn deliver<T, F>(&self, payments: Vec<Payment>, build: F) -> Eventual<T>
    where
        F: FnOnce(Vec<PaymentId>, Reply<T>) -> IssuerCommand,
    {
        let mut ids = Vec::with_capacity(payments.len());
        for payment in &payments {
            // A payment of another brand can never be live in this ledger
            if payment.get_alleged_brand() != &self.brand {
                return Eventual::rejected(ISSUER, RightsError::payment_not_found(&self.brand));
            }
            ids.push(payment.id());
        }
        self.send(|reply| build(ids, reply))
    }
}

impl std::fmt::Debug for Issuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Issuer({:?})", self.brand)
    }
}

/// Sole authority to create new value for a brand
#[derive(Clone)]
pub struct Mint {
    issuer: Issuer,
}

impl Mint {
    pub fn get_issuer(&self) -> &Issuer {
        &self.issuer
    }

    /// Create a live payment backed by no prior value
    pub fn mint_payment(&self, amount: Amount) -> Eventual<Payment> {
        self.issuer.send(|reply| IssuerCommand::Mint { amount, reply })
    }
}

impl std::fmt::Debug for Mint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mint({:?})", self.issuer.brand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::produce_issuer;

    #[tokio::test]
    async fn test_foreign_payment_not_found() {
        let moola = produce_issuer("moola", MathHelpersName::Nat);
        let simoleans = produce_issuer("simoleans", MathHelpersName::Nat);
        let payment = simoleans
            .mint
            .mint_payment(simoleans.amount_math.make(10u64).unwrap())
            .await
            .unwrap();

        let result = moola.issuer.get_amount_of(&payment).await;
        assert!(matches!(result, Err(RightsError::PaymentNotFound { .. })));
        assert!(simoleans.issuer.get_amount_of(&payment).await.is_ok());
    }

    #[tokio::test]
    async fn test_mint_rejects_foreign_amount() {
        let moola = produce_issuer("moola", MathHelpersName::Nat);
        let simoleans = produce_issuer("simoleans", MathHelpersName::Nat);

        let result = moola
            .mint
            .mint_payment(simoleans.amount_math.make(10u64).unwrap())
            .await;
        assert!(matches!(result, Err(RightsError::BrandMismatch { .. })));
    }

    #[tokio::test]
    async fn test_same_sender_order_preserved() {
        let kit = produce_issuer("fungible", MathHelpersName::Nat);
        let payment = kit
            .mint
            .mint_payment(kit.amount_math.make(5u64).unwrap())
            .await
            .unwrap();

        // Both sent before either is awaited: the claim lands first.
        let claimed = kit.issuer.claim(&payment, None);
        let looked_up = kit.issuer.get_amount_of(&payment);

        assert!(claimed.await.is_ok());
        assert!(matches!(
            looked_up.await,
            Err(RightsError::PaymentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_journal_records_mint() {
        let kit = produce_issuer("fungible", MathHelpersName::Nat);
        kit.mint
            .mint_payment(kit.amount_math.make(1u64).unwrap())
            .await
            .unwrap();

        let journal = kit.issuer.journal().await.unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].reason, rights_ledger::EntryReason::Mint);
    }
}
