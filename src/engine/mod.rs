//! Client-side dashboard engine: rolling price history, chart projection,
//! the poll cycle, alert crossing evaluation and store reconciliation.

pub mod evaluator;
pub mod poller;
pub mod price_history;
pub mod reconciler;
pub mod session;
pub mod timeframe;

#[cfg(test)]
pub(crate) mod testing;

pub use evaluator::{has_crossed, AlertEvaluator, EvaluationReport};
pub use poller::{CycleReport, PollCycleController};
pub use price_history::PriceHistoryStore;
pub use reconciler::AlertReconciler;
pub use session::{CardState, DashboardSession};
pub use timeframe::{Timeframe, TimeframeProjector, TimeframeView};
