use soroban_sdk::{Env, contracttype, log};

use crate::{
    Error,
    governance,
    index_types::BaseRateUpdated,
    math::{
        self, BETA, DECIMAL_PRECISION, MAX_BORROWING_FEE, MAX_DECAY_MINUTES, MINUTE_DECAY_FACTOR,
        SECONDS_IN_ONE_MINUTE,
    },
    storage::FEES,
};

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FeeState {
    /// Shared borrowing and redemption surcharge, 1e18-scaled
    pub base_rate: i128,
    pub last_fee_operation_time: u64,
}

impl FeeState {
    pub fn get_state(env: &Env) -> FeeState {
        env.storage().instance().get(&FEES).unwrap_or_default()
    }

    pub fn set_state(env: &Env, state: &FeeState) {
        env.storage().instance().set(&FEES, state);
    }
}

fn minutes_passed_since_last_fee_op(env: &Env, state: &FeeState) -> u64 {
    env.ledger()
        .timestamp()
        .saturating_sub(state.last_fee_operation_time)
        / SECONDS_IN_ONE_MINUTE
}

/// Base rate after decaying for every whole minute since the last fee operation.
pub fn decayed_base_rate(env: &Env) -> Result<i128, Error> {
    let state = FeeState::get_state(env);
    let minutes = minutes_passed_since_last_fee_op(env, &state).min(MAX_DECAY_MINUTES);
    let decay_factor = math::dec_pow(MINUTE_DECAY_FACTOR, minutes)?;
    math::mul_div(env, state.base_rate, decay_factor, DECIMAL_PRECISION)
}

// Only whole minutes move the clock so frequent operations cannot freeze the decay
fn update_last_fee_op_time(env: &Env, state: &mut FeeState) {
    let elapsed = env
        .ledger()
        .timestamp()
        .saturating_sub(state.last_fee_operation_time);
    if elapsed >= SECONDS_IN_ONE_MINUTE {
        state.last_fee_operation_time = env.ledger().timestamp();
    }
}

fn set_base_rate(env: &Env, base_rate: i128) {
    let mut state = FeeState::get_state(env);
    state.base_rate = base_rate;
    update_last_fee_op_time(env, &mut state);
    FeeState::set_state(env, &state);
    BaseRateUpdated {
        base_rate,
        last_fee_operation_time: state.last_fee_operation_time,
    }
    .publish(env);
}

fn borrowing_rate_for(env: &Env, base_rate: i128) -> Result<i128, Error> {
    let floor = governance::borrowing_rate_floor(env)?;
    Ok(math::add(floor, base_rate)?.min(MAX_BORROWING_FEE))
}

fn redemption_rate_for(env: &Env, base_rate: i128) -> Result<i128, Error> {
    let floor = governance::redemption_rate_floor(env)?;
    Ok(math::add(floor, base_rate)?.min(DECIMAL_PRECISION))
}

pub fn borrowing_rate_with_decay(env: &Env) -> Result<i128, Error> {
    borrowing_rate_for(env, decayed_base_rate(env)?)
}

fn redemption_rate(env: &Env) -> Result<i128, Error> {
    redemption_rate_for(env, FeeState::get_state(env).base_rate)
}

pub fn redemption_rate_with_decay(env: &Env) -> Result<i128, Error> {
    redemption_rate_for(env, decayed_base_rate(env)?)
}

/// Fee a borrow of `amount` would pay right now.
pub fn borrowing_fee(env: &Env, amount: i128) -> Result<i128, Error> {
    math::mul_div(env, borrowing_rate_with_decay(env)?, amount, DECIMAL_PRECISION)
}

pub fn require_user_accepts_fee(
    env: &Env,
    fee: i128,
    amount: i128,
    max_fee_percentage: i128,
) -> Result<(), Error> {
    if amount == 0 {
        return Ok(());
    }
    let fee_percentage = math::mul_div(env, fee, DECIMAL_PRECISION, amount)?;
    if fee_percentage > max_fee_percentage {
        return Err(Error::FeeExceedsMaximum);
    }
    Ok(())
}

/// Normal mode caps at 100% and floors at the borrowing floor. Recovery mode only caps.
pub fn require_valid_max_fee_percentage(
    env: &Env,
    max_fee_percentage: i128,
    recovery_mode: bool,
) -> Result<(), Error> {
    let valid = if recovery_mode {
        (0..=DECIMAL_PRECISION).contains(&max_fee_percentage)
    } else {
        let floor = governance::borrowing_rate_floor(env)?;
        (floor..=DECIMAL_PRECISION).contains(&max_fee_percentage)
    };
    if !valid {
        return Err(Error::MaxFeePercentageOutOfBounds);
    }
    Ok(())
}

fn bump_base_rate_for_issuance(
    env: &Env,
    decayed: i128,
    issued: i128,
    system_debt: i128,
) -> Result<(), Error> {
    let new_total = math::add(system_debt, issued)?;
    let issued_fraction = math::mul_div(env, issued, DECIMAL_PRECISION, new_total)?;
    let new_base_rate = math::add(decayed, issued_fraction / BETA)?.min(DECIMAL_PRECISION);
    set_base_rate(env, new_base_rate);
    Ok(())
}

/// Charge the borrowing fee on a new draw of `amount` and push the base rate up
/// by the drawn share of system debt.
pub fn trigger_borrowing_fee(
    env: &Env,
    amount: i128,
    system_debt: i128,
    max_fee_percentage: i128,
) -> Result<i128, Error> {
    if amount == 0 {
        return Ok(0);
    }
    let decayed = decayed_base_rate(env)?;
    let fee = math::mul_div(env, borrowing_rate_for(env, decayed)?, amount, DECIMAL_PRECISION)?;
    require_user_accepts_fee(env, fee, amount, max_fee_percentage)?;
    bump_base_rate_for_issuance(env, decayed, amount, system_debt)?;
    log!(env, "borrowing fee {} on {}", fee, amount);
    Ok(fee)
}

/// Refinancing pays `percentage` of the borrowing fee on the whole principal.
/// The fee is new debt and moves the base rate like any other issuance.
pub fn trigger_refinancing_fee(
    env: &Env,
    principal: i128,
    percentage: i128,
    system_debt: i128,
    max_fee_percentage: i128,
) -> Result<i128, Error> {
    let decayed = decayed_base_rate(env)?;
    let full_fee = math::mul_div(env, borrowing_rate_for(env, decayed)?, principal, DECIMAL_PRECISION)?;
    let fee = math::mul_div(env, full_fee, percentage, 100)?;
    if fee == 0 {
        return Ok(0);
    }
    require_user_accepts_fee(env, fee, principal, max_fee_percentage)?;
    bump_base_rate_for_issuance(env, decayed, fee, system_debt)?;
    log!(env, "refinancing fee {} on principal {}", fee, principal);
    Ok(fee)
}

/// Push the base rate up by the redeemed share of supply. Returns the new base rate.
pub fn update_base_rate_from_redemption(
    env: &Env,
    collateral_drawn: i128,
    price: i128,
    total_supply: i128,
) -> Result<i128, Error> {
    let decayed = decayed_base_rate(env)?;
    let redeemed_value = math::mul_div(env, collateral_drawn, price, DECIMAL_PRECISION)?;
    let redeemed_fraction = math::mul_div(env, redeemed_value, DECIMAL_PRECISION, total_supply)?;
    let new_base_rate = math::add(decayed, redeemed_fraction / BETA)?.min(DECIMAL_PRECISION);
    if new_base_rate <= 0 {
        return Err(Error::ArithmeticError);
    }
    set_base_rate(env, new_base_rate);
    Ok(new_base_rate)
}

/// Redemption fee on `collateral_drawn` at the current (already bumped) base rate.
pub fn redemption_fee(env: &Env, collateral_drawn: i128) -> Result<i128, Error> {
    let fee = math::mul_div(env, redemption_rate(env)?, collateral_drawn, DECIMAL_PRECISION)?;
    if fee >= collateral_drawn {
        return Err(Error::FeeExceedsMaximum);
    }
    Ok(fee)
}
