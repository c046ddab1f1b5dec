//! Pro-forma simulation: property assumptions plus financing terms in,
//! period-by-period cash flows out.

pub mod scenario;
pub mod simulator;

pub use scenario::{OperatingExpenses, PropertyScenario};
pub use simulator::{check_period_alignment, simulate, CashFlowTrajectory, PeriodCashFlow};
