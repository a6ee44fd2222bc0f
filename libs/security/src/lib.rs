//! Security helpers for pushnote ingress.
//!
//! Inbound GitHub webhooks carry an `X-Hub-Signature-256` header holding an
//! HMAC-SHA256 of the raw request body keyed with the shared webhook secret.

pub mod signature;

pub use signature::{EVENT_HEADER, SIGNATURE_HEADER, sign, verify_signature};
