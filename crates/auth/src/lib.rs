//! Upstream credential lifecycle.
//!
//! [`oauth`] speaks the identity endpoint's token protocol; the
//! [`CredentialProvider`] owns the single process-wide credential and
//! coordinates refreshes across concurrent requests.

pub mod manager;
pub mod oauth;

pub use manager::CredentialProvider;
