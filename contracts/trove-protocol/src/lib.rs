#![no_std]

mod borrower_operations;
mod collateral_surplus;
mod error;
mod fees;
mod governance;
mod index_types;
mod interest_rate_manager;
mod liquidation;
mod math;
mod price;
mod protocol;
mod redemption;
mod sorted_troves;
mod stability_pool;
mod storage;
mod token;
mod trove_manager;

pub use error::Error;
pub use governance::{GovernedParam, ParamState, PendingChange};
pub use interest_rate_manager::InterestRateBucket;
pub use liquidation::LiquidationTotals;
pub use price::{Asset, PriceData};
pub use protocol::{TroveProtocol, TroveProtocolClient};
pub use redemption::RedemptionTotals;
pub use sorted_troves::{Node, SortedTrovesState};
pub use stability_pool::{PoolState, StabilityDeposit};
pub use storage::{ProtocolConfig, ProtocolStorage};
pub use trove_manager::{
    EntireDebtAndColl, PendingRewards, SystemState, SystemTotals, Trove, TroveStatus,
};

mod test;
