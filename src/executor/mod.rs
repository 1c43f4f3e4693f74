//! Order executor: admission gates, position sizing, and the broker-facing
//! placement loop.

pub mod admission;
pub mod executor;
pub mod portfolio_guard;
pub mod position_sizer;

pub use executor::Executor;
pub use portfolio_guard::PortfolioGuard;
