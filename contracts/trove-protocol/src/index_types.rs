use soroban_sdk::{Address, contractevent};

use crate::{governance::GovernedParam, trove_manager::TroveStatus};

#[contractevent(topics = ["trove"])]
pub struct TroveUpdated {
    #[topic]
    pub borrower: Address,
    pub principal: i128,
    pub interest_owed: i128,
    pub collateral: i128,
    pub stake: i128,
    pub interest_rate: u32,
    pub status: TroveStatus,
    pub ledger: u32,
    pub timestamp: u64,
}

#[contractevent(topics = ["trove_liquidated"])]
pub struct TroveLiquidated {
    #[topic]
    pub borrower: Address,
    pub debt: i128,
    pub collateral: i128,
    pub recovery_mode: bool,
}

#[contractevent(topics = ["liquidation"])]
pub struct Liquidation {
    #[topic]
    pub liquidator: Address,
    pub troves_liquidated: u32,
    pub liquidated_debt: i128,
    pub liquidated_collateral: i128,
    pub coll_gas_compensation: i128,
    pub debt_gas_compensation: i128,
    pub debt_offset: i128,
    pub debt_redistributed: i128,
    pub coll_surplus: i128,
    pub price: i128,
    pub timestamp: u64,
}

#[contractevent(topics = ["redistribution"])]
pub struct Redistribution {
    pub l_collateral: i128,
    pub l_principal: i128,
    pub total_stakes: i128,
}

#[contractevent(topics = ["redemption"])]
pub struct Redemption {
    #[topic]
    pub redeemer: Address,
    pub attempted: i128,
    pub actual: i128,
    pub collateral_sent: i128,
    pub collateral_fee: i128,
}

#[contractevent(topics = ["sp_deposit"])]
pub struct DepositUpdated {
    #[topic]
    pub depositor: Address,
    pub deposit: i128,
    pub p: i128,
    pub s: i128,
    pub scale: u64,
    pub epoch: u64,
}

#[contractevent(topics = ["sp_gain"])]
pub struct CollateralGainWithdrawn {
    #[topic]
    pub depositor: Address,
    pub collateral: i128,
    pub deposit_loss: i128,
}

#[contractevent(topics = ["sp_offset"])]
pub struct Offset {
    pub debt_offset: i128,
    pub collateral_added: i128,
    pub p: i128,
    pub scale: u64,
    pub epoch: u64,
}

#[contractevent(topics = ["base_rate"])]
pub struct BaseRateUpdated {
    pub base_rate: i128,
    pub last_fee_operation_time: u64,
}

#[contractevent(topics = ["surplus"])]
pub struct SurplusUpdated {
    #[topic]
    pub owner: Address,
    pub amount: i128,
}

#[contractevent(topics = ["param_proposed"])]
pub struct ParameterProposed {
    #[topic]
    pub param: GovernedParam,
    pub value: i128,
    pub proposed_at: u64,
}

#[contractevent(topics = ["param_approved"])]
pub struct ParameterApproved {
    #[topic]
    pub param: GovernedParam,
    pub value: i128,
}

#[contractevent(topics = ["mint"], data_format = "single-value")]
pub struct Mint {
    #[topic]
    pub to: Address,
    pub amount: i128,
}

#[contractevent(topics = ["burn"], data_format = "single-value")]
pub struct Burn {
    #[topic]
    pub from: Address,
    pub amount: i128,
}
