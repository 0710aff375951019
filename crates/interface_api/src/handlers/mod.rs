//! Request handlers

pub mod advances;
pub mod credits;
pub mod health;
pub mod payables;
pub mod receivables;
pub mod utilizations;
