//! Payment capability

use std::fmt;

use rights_ledger::PaymentId;
use rights_types::Brand;

/// Bearer capability for a live claim in one issuer's ledger
///
/// Cloning yields another reference to the same capability, not a second
/// claim: only the first consuming operation on any alias succeeds.
/// Obtain an exclusive payment from an untrusted sender via
/// [`Issuer::claim`](crate::Issuer::claim).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Payment {
    id: PaymentId,
    brand: Brand,
}

impl Payment {
    pub(crate) fn new(id: PaymentId, brand: Brand) -> Self {
        Self { id, brand }
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn get_alleged_brand(&self) -> &Brand {
        &self.brand
    }
}

impl fmt::Debug for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payment({} {})", self.brand.get_alleged_name(), self.id)
    }
}
