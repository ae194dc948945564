use crate::{
    error::StockGymResult,
    gym::{
        Reward, StepOutcome,
        stock::{domain::Transaction, observation::StockState},
    },
};

pub mod action;
pub mod config;
pub mod domain;
pub mod env;
pub mod history;
pub mod ledger;
pub mod observation;
pub mod transition;

pub trait Env {
    fn reset(&mut self) -> StockGymResult<(StockState, Reward, StepOutcome)>;
    fn step(&mut self, transaction: Transaction) -> StockGymResult<(StockState, Reward, StepOutcome)>;
}
