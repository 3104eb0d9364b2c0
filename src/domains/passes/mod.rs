//! The pass domain: record model, issuance validation, signed QR payloads
//! and the redemption store.

pub mod models;
pub mod store;
pub mod token;
pub mod validation;
