//! The sync engine substrate: run ledger, tenant context, the generic
//! reconciliation primitive, and the dependency-ordered roster processor.

pub mod context;
pub mod ledger;
pub mod reconcile;
pub mod roster;
