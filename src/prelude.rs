// 1. Traits
pub use crate::agent::Trader;
pub use crate::gym::stock::Env;
pub use crate::report::io::{FileExtension, Report, ReportName, ToCsv, ToJson, ToSchema};

// 2. The Core "Loop" Types
pub use crate::agent::{AgentIdentifier, Experience};
pub use crate::gym::stock::{
    action::ActionSpace,
    config::{StockConfig, StockPreset},
    env::{DaySummary, SimpleStock, TransactionOutcome},
    history::HistoryLog,
    ledger::Portfolio,
    observation::{StateSpace, StockState},
    transition::{MarkovModel, StochasticMatrix},
};
pub use crate::gym::{EnvStatus, Reward, StepOutcome};

// 3. Market Domain Types
pub use crate::gym::stock::domain::{
    Cashflow, Direction, Growth, Indicator, Lot, Position, Price, Transaction,
};

// 4. Traders
pub use crate::agent::{
    q_learning::{QLearningConfig, QLearningTrader, stable_softmax},
    random::RandomTrader,
};

// 5. Reports
pub use crate::report::{
    journal::{Journal, JournalCol},
    training::{TrainingCol, TrainingReport},
};

// 6. Errors
pub use crate::error::{
    AgentError, DataError, EnvError, IoError, StockGymError, StockGymResult, SystemError,
};
