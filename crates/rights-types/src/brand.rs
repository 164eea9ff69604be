//! Brand identity
//!
//! A Brand is compared by identity only. The alleged name is carried for
//! diagnostics and never participates in equality.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identity of a Brand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BrandId(pub Uuid);

impl BrandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BrandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BrandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "brand_{}", self.0)
    }
}

/// Unforgeable identity tag for one value type
///
/// Cloning a Brand yields the same identity. Only [`Brand::new`] mints a
/// fresh one, and it is called exactly once per issuer. Brands serialize
/// for diagnostics but cannot be deserialized back into an identity.
#[derive(Clone, Serialize)]
pub struct Brand {
    id: BrandId,
    alleged_name: String,
}

impl Brand {
    /// Create a brand with a fresh identity
    pub fn new(alleged_name: impl Into<String>) -> Self {
        Self {
            id: BrandId::new(),
            alleged_name: alleged_name.into(),
        }
    }

    pub fn id(&self) -> BrandId {
        self.id
    }

    /// Display name, for diagnostics only
    pub fn get_alleged_name(&self) -> &str {
        &self.alleged_name
    }
}

impl PartialEq for Brand {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Brand {}

impl Hash for Brand {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Brand({} {})", self.alleged_name, self.id)
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.alleged_name)
    }
}
