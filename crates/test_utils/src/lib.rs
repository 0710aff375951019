//! Shared test helpers
//!
//! Builders and a ready-made in-memory fixture used by the crate-level test
//! suites. Not part of the public API surface of the workspace.

pub mod builders;
pub mod fixtures;

pub use builders::{
    AdvanceBuilder, CreditBuilder, PayableBuilder, ReceivableBuilder,
};
pub use fixtures::{brl, usd, LedgerFixture};
