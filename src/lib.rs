//! A synthetic single-stock market for studying trading agents.
//!
//! [`SimpleStock`](gym::stock::env::SimpleStock) simulates a price driven by a
//! hidden Markov indicator, keeps the trader's open lots and books every
//! transaction. Traders implement [`Trader`](agent::Trader); a uniform random
//! baseline and a tabular Q-learner ship with the crate.

pub mod agent;
pub mod error;
pub mod gym;
mod macros;
pub mod prelude;
pub mod report;
