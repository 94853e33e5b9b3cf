use soroban_sdk::{Address, Env, contracttype, log};

use crate::{
    Error,
    index_types::{ParameterApproved, ParameterProposed},
    math::{DECIMAL_PRECISION, MAX_INTEREST_RATE},
    storage::{self, DataKey},
};

/// Minimum time between proposing and approving a parameter change
pub const GOVERNANCE_TIME_DELAY: u64 = 7 * 24 * 60 * 60;

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GovernedParam {
    /// Share of the borrowing fee charged on refinance, 0..=100
    RefinancingFeePercentage,
    /// Smallest debt a trove may carry, excluding gas compensation
    MinNetDebt,
    /// Borrowing fee floor, 1e18-scaled
    BorrowingRate,
    /// Redemption fee floor, 1e18-scaled
    RedemptionRate,
    /// Rate for new troves and refinancing, in basis points
    InterestRate,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingChange {
    /// Value readers keep seeing until the change is approved
    pub active: Option<i128>,
    pub value: i128,
    pub proposed_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParamState {
    Unset,
    Active(i128),
    Proposed(PendingChange),
}

pub trait IsGovernance {
    /// Propose a new value for `param`. Admin only.
    fn propose_parameter(
        env: &Env,
        caller: Address,
        param: GovernedParam,
        value: i128,
    ) -> Result<(), Error>;

    /// Approve the pending value once the delay has elapsed. Admin only.
    fn approve_parameter(env: &Env, caller: Address, param: GovernedParam) -> Result<i128, Error>;

    /// Drop a pending proposal, keeping the active value. Admin only.
    fn cancel_proposal(env: &Env, caller: Address, param: GovernedParam) -> Result<(), Error>;

    /// Currently approved value
    fn get_parameter(env: &Env, param: GovernedParam) -> Result<i128, Error>;

    fn get_parameter_state(env: &Env, param: GovernedParam) -> ParamState;

    /// Change where fees and paid interest are sent. Admin only.
    fn set_fee_recipient(env: &Env, caller: Address, to: Address) -> Result<(), Error>;
}

pub fn get_param_state(env: &Env, param: GovernedParam) -> ParamState {
    storage::get_persistent(env, &DataKey::Parameter(param)).unwrap_or(ParamState::Unset)
}

fn set_param_state(env: &Env, param: GovernedParam, state: &ParamState) {
    storage::set_persistent(env, &DataKey::Parameter(param), state);
}

fn active_value(state: &ParamState) -> Option<i128> {
    match state {
        ParamState::Unset => None,
        ParamState::Active(value) => Some(*value),
        ParamState::Proposed(pending) => pending.active,
    }
}

pub fn get_parameter(env: &Env, param: GovernedParam) -> Result<i128, Error> {
    active_value(&get_param_state(env, param)).ok_or(Error::ParameterNotSet)
}

pub fn validate(param: GovernedParam, value: i128) -> Result<(), Error> {
    let valid = match param {
        GovernedParam::RefinancingFeePercentage => (0..=100).contains(&value),
        GovernedParam::MinNetDebt => value > 0,
        GovernedParam::BorrowingRate | GovernedParam::RedemptionRate => {
            (0..=DECIMAL_PRECISION).contains(&value)
        }
        GovernedParam::InterestRate => (0..=i128::from(MAX_INTEREST_RATE)).contains(&value),
    };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidParameter)
    }
}

/// Seed a parameter at deployment, skipping the delay.
pub fn initialize(env: &Env, param: GovernedParam, value: i128) -> Result<(), Error> {
    validate(param, value)?;
    set_param_state(env, param, &ParamState::Active(value));
    Ok(())
}

pub fn propose(env: &Env, param: GovernedParam, value: i128) -> Result<(), Error> {
    validate(param, value)?;
    let proposed_at = env.ledger().timestamp();
    let active = active_value(&get_param_state(env, param));
    set_param_state(
        env,
        param,
        &ParamState::Proposed(PendingChange {
            active,
            value,
            proposed_at,
        }),
    );
    ParameterProposed {
        param,
        value,
        proposed_at,
    }
    .publish(env);
    Ok(())
}

pub fn approve(env: &Env, param: GovernedParam) -> Result<i128, Error> {
    let ParamState::Proposed(pending) = get_param_state(env, param) else {
        return Err(Error::NoPendingProposal);
    };
    let ready_at = pending
        .proposed_at
        .checked_add(GOVERNANCE_TIME_DELAY)
        .ok_or(Error::ArithmeticError)?;
    if env.ledger().timestamp() < ready_at {
        return Err(Error::GovernanceDelayNotElapsed);
    }
    set_param_state(env, param, &ParamState::Active(pending.value));
    ParameterApproved {
        param,
        value: pending.value,
    }
    .publish(env);
    log!(env, "governed parameter approved: {}", pending.value);
    Ok(pending.value)
}

pub fn cancel(env: &Env, param: GovernedParam) -> Result<(), Error> {
    let ParamState::Proposed(pending) = get_param_state(env, param) else {
        return Err(Error::NoPendingProposal);
    };
    let restored = match pending.active {
        Some(value) => ParamState::Active(value),
        None => ParamState::Unset,
    };
    set_param_state(env, param, &restored);
    Ok(())
}

pub fn interest_rate(env: &Env) -> Result<u32, Error> {
    u32::try_from(get_parameter(env, GovernedParam::InterestRate)?)
        .map_err(|_| Error::InvalidParameter)
}

pub fn min_net_debt(env: &Env) -> Result<i128, Error> {
    get_parameter(env, GovernedParam::MinNetDebt)
}

pub fn borrowing_rate_floor(env: &Env) -> Result<i128, Error> {
    get_parameter(env, GovernedParam::BorrowingRate)
}

pub fn redemption_rate_floor(env: &Env) -> Result<i128, Error> {
    get_parameter(env, GovernedParam::RedemptionRate)
}

pub fn refinancing_fee_percentage(env: &Env) -> Result<i128, Error> {
    get_parameter(env, GovernedParam::RefinancingFeePercentage)
}
