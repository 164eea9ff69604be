//! Purse: a brand-scoped balance held by its own actor
//!
//! The actor handles one deposit or withdrawal at a time, so balance
//! updates to a purse never interleave. The balance is published on a
//! watch channel after every change, which keeps
//! [`Purse::get_current_amount`] synchronous and lets observers follow it.

use rights_types::{Amount, Brand, Result, RightsError};
use tokio::sync::{mpsc, watch};
use tracing::{info, Instrument};

use crate::eventual::Reply;
use crate::{Eventual, Issuer, Payment, PaymentP};

const PURSE: &str = "purse";

enum PurseCommand {
    Deposit {
        payment: Payment,
        expected: Option<Amount>,
        reply: Reply<Amount>,
    },
    Withdraw {
        amount: Amount,
        reply: Reply<Payment>,
    },
}

struct PurseActor {
    issuer: Issuer,
    balance: watch::Sender<Amount>,
}

impl PurseActor {
    async fn deposit(&self, payment: Payment, expected: Option<Amount>) -> Result<Amount> {
        let current = self.balance.borrow().clone();
        let balance = self
            .issuer
            .deposit_into_purse(&payment, expected, current)
            .await?;
        self.balance.send_replace(balance.clone());
        info!(payment = ?payment.id(), balance = %balance, "deposit accepted");
        Ok(balance)
    }

    async fn withdraw(&self, amount: Amount) -> Result<Payment> {
        let current = self.balance.borrow().clone();
        let remaining = self.issuer.get_amount_math().subtract(&current, &amount)?;
        let payment = self.issuer.withdraw_from_purse(amount).await?;
        self.balance.send_replace(remaining.clone());
        info!(payment = ?payment.id(), balance = %remaining, "withdrawal issued");
        Ok(payment)
    }

    async fn run(self, mut mailbox: mpsc::UnboundedReceiver<PurseCommand>) {
        while let Some(command) = mailbox.recv().await {
            match command {
                PurseCommand::Deposit {
                    payment,
                    expected,
                    reply,
                } => {
                    let _ = reply.send(self.deposit(payment, expected).await);
                }
                PurseCommand::Withdraw { amount, reply } => {
                    let _ = reply.send(self.withdraw(amount).await);
                }
            }
        }
    }
}

/// Mutable container of value for one brand
///
/// Handles are cheap to clone and all refer to the same balance. Unlike a
/// payment, a purse is never transferred between parties.
#[derive(Clone)]
pub struct Purse {
    issuer: Issuer,
    sender: mpsc::UnboundedSender<PurseCommand>,
    balance: watch::Receiver<Amount>,
}

impl Purse {
    pub(crate) fn spawn(issuer: Issuer) -> Self {
        let (balance_tx, balance) = watch::channel(issuer.get_amount_math().get_empty());
        let (sender, mailbox) = mpsc::unbounded_channel();

        let span = tracing::debug_span!("purse", brand = %issuer.get_brand());
        let actor = PurseActor {
            issuer: issuer.clone(),
            balance: balance_tx,
        };
        tokio::spawn(actor.run(mailbox).instrument(span));

        Self {
            issuer,
            sender,
            balance,
        }
    }

    pub fn get_current_amount(&self) -> Amount {
        self.balance.borrow().clone()
    }

    pub fn get_alleged_brand(&self) -> &Brand {
        self.issuer.get_brand()
    }

    pub fn get_issuer(&self) -> &Issuer {
        &self.issuer
    }

    /// Follow the balance; the receiver sees every value published after
    /// a deposit or withdrawal
    pub fn subscribe(&self) -> watch::Receiver<Amount> {
        self.balance.clone()
    }

    /// Move a payment's value into this purse and return the new balance
    ///
    /// Only settled payments are accepted. Awaiting a promise here would let
    /// its sender redirect the same promise elsewhere in the meantime.
    pub fn deposit(
        &self,
        payment: impl Into<PaymentP>,
        expected: Option<Amount>,
    ) -> Eventual<Amount> {
        let payment = match payment.into() {
            PaymentP::Settled(payment) => payment,
            PaymentP::Pending(_) => return Eventual::rejected(PURSE, RightsError::PromiseDeposit),
        };
        if payment.get_alleged_brand() != self.get_alleged_brand() {
            return Eventual::rejected(
                PURSE,
                RightsError::payment_not_found(self.get_alleged_brand()),
            );
        }
        self.send(|reply| PurseCommand::Deposit {
            payment,
            expected,
            reply,
        })
    }

    /// Take `amount` out of the balance as a fresh payment
    pub fn withdraw(&self, amount: Amount) -> Eventual<Payment> {
        self.send(|reply| PurseCommand::Withdraw { amount, reply })
    }

    fn send<T>(&self, build: impl FnOnce(Reply<T>) -> PurseCommand) -> Eventual<T> {
        let (reply, receiver) = tokio::sync::oneshot::channel();
        if self.sender.send(build(reply)).is_err() {
            return Eventual::rejected(PURSE, RightsError::unavailable(PURSE));
        }
        Eventual::waiting(PURSE, receiver)
    }
}

impl std::fmt::Debug for Purse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Purse({})", self.get_current_amount())
    }
}
