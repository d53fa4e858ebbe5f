//! Application layer containing the two phases of the payment workflow.
//!
//! `PurchaseInitiator` registers an attempt and hands the payer to the gateway.
//! `PaymentVerifier` settles the attempt when the gateway calls back. Both
//! receive their collaborators as shared ports.

pub mod purchase;
pub mod verify;

pub use purchase::PurchaseInitiator;
pub use verify::{PaymentVerifier, ResultStatus, VerificationResult};
