//! Reconciliation and synchronization logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage is reached only through the collaborator traits declared here and
//! implemented by the db crate.
//!
//! # Modules
//!
//! - `balance` - Project remaining-amount reconciliation
//! - `relation` - Many-to-many membership synchronization
//! - `store` - Errors shared by the storage collaborator traits

pub mod balance;
pub mod relation;
pub mod store;
