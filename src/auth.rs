//! App identity, signed assertions, and installation access token issuance.

pub mod assertion;
pub mod authenticator;
pub mod id;
pub mod secret;

pub use assertion::*;
pub use authenticator::*;
pub use id::*;
pub use secret::*;
