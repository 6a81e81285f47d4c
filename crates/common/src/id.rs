//! Opaque identifier minting.
//!
//! Entity ids are database auto-increment integers; the generator here only
//! mints opaque strings for things that never touch a sequence, currently
//! session tokens.

use uuid::Uuid;

/// Generator for opaque identifiers.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// The generator is stateless; construction never fails.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate an opaque session token.
    ///
    /// UUID v4, so the token carries no time component.
    #[must_use]
    pub fn generate_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}
