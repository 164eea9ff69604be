//! Eventual results of messages sent to an actor
//!
//! Sending a message enqueues it immediately and hands back an
//! [`Eventual`]. Awaiting it yields the actor's reply. A dropped reply
//! channel means the actor is gone and surfaces as
//! [`RightsError::Unavailable`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use rights_types::{Result, RightsError};
use tokio::sync::oneshot;

use crate::Payment;

pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

enum State<T> {
    Waiting(oneshot::Receiver<Result<T>>),
    Settled(Option<Result<T>>),
}

/// Promise for the result of an eventual send
#[must_use = "an eventual does nothing observable unless awaited"]
pub struct Eventual<T> {
    target: &'static str,
    state: State<T>,
}

// Never pin-projected; the receiver is Unpin and the settled slot is moved out.
impl<T> Unpin for Eventual<T> {}

impl<T> Eventual<T> {
    pub(crate) fn waiting(target: &'static str, receiver: oneshot::Receiver<Result<T>>) -> Self {
        Self {
            target,
            state: State::Waiting(receiver),
        }
    }

    pub fn resolved(target: &'static str, value: T) -> Self {
        Self {
            target,
            state: State::Settled(Some(Ok(value))),
        }
    }

    pub fn rejected(target: &'static str, error: RightsError) -> Self {
        Self {
            target,
            state: State::Settled(Some(Err(error))),
        }
    }

    /// Run `work` on its own task and resolve with its output
    pub(crate) fn spawn<F>(target: &'static str, work: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, receiver) = oneshot::channel();
        tokio::spawn(async move {
            let _ = reply.send(work.await);
        });
        Self::waiting(target, receiver)
    }
}

impl<T> Future for Eventual<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let target = this.target;
        match &mut this.state {
            State::Settled(slot) => Poll::Ready(
                slot.take()
                    .unwrap_or_else(|| Err(RightsError::unavailable(target))),
            ),
            State::Waiting(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(_)) => Poll::Ready(Err(RightsError::unavailable(target))),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

impl<T> fmt::Debug for Eventual<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Waiting(_) => "waiting",
            State::Settled(_) => "settled",
        };
        write!(f, "Eventual({} {})", self.target, state)
    }
}

/// A payment, or a promise for one
#[derive(Debug)]
pub enum PaymentP {
    Settled(Payment),
    Pending(Eventual<Payment>),
}

impl PaymentP {
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentP::Settled(_))
    }

    /// Wait for the payment this refers to
    pub async fn settle(self) -> Result<Payment> {
        match self {
            PaymentP::Settled(payment) => Ok(payment),
            PaymentP::Pending(eventual) => eventual.await,
        }
    }
}

impl From<Payment> for PaymentP {
    fn from(payment: Payment) -> Self {
        PaymentP::Settled(payment)
    }
}

impl From<&Payment> for PaymentP {
    fn from(payment: &Payment) -> Self {
        PaymentP::Settled(payment.clone())
    }
}

impl From<Eventual<Payment>> for PaymentP {
    fn from(eventual: Eventual<Payment>) -> Self {
        PaymentP::Pending(eventual)
    }
}
