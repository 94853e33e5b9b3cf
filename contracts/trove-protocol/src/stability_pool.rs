use soroban_sdk::{Address, Env, contracttype, log};

use crate::{
    Error,
    index_types::{CollateralGainWithdrawn, DepositUpdated, Offset},
    math::{self, DECIMAL_PRECISION, SCALE_FACTOR},
    price, sorted_troves,
    storage::{self, DataKey, EpochScale, POOL, ProtocolStorage},
    token, trove_manager,
};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolState {
    /// Stable held for offsets, net of every loss applied so far
    pub total_deposits: i128,
    /// Collateral gained from offsets and not yet paid out
    pub collateral: i128,
    /// Running product of surviving deposit fractions, 1e18-scaled
    pub p: i128,
    pub current_scale: u64,
    pub current_epoch: u64,
    pub last_collateral_error_offset: i128,
    pub last_debt_loss_error_offset: i128,
}

impl Default for PoolState {
    fn default() -> Self {
        PoolState {
            total_deposits: 0,
            collateral: 0,
            p: DECIMAL_PRECISION,
            current_scale: 0,
            current_epoch: 0,
            last_collateral_error_offset: 0,
            last_debt_loss_error_offset: 0,
        }
    }
}

impl PoolState {
    pub fn get_state(env: &Env) -> PoolState {
        env.storage().instance().get(&POOL).unwrap_or_default()
    }

    pub fn set_state(env: &Env, state: &PoolState) {
        env.storage().instance().set(&POOL, state);
    }
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StabilityDeposit {
    pub initial_deposit: i128,
    pub snapshot_p: i128,
    pub snapshot_s: i128,
    pub snapshot_scale: u64,
    pub snapshot_epoch: u64,
}

pub trait IsStabilityPool {
    /// Deposit stable into the pool, paying out any collateral gain so far
    fn provide_to_sp(env: &Env, depositor: Address, amount: i128) -> Result<(), Error>;

    /// Withdraw up to the compounded deposit, paying out any collateral gain.
    /// An amount of zero only claims the gain.
    fn withdraw_from_sp(env: &Env, depositor: Address, amount: i128) -> Result<(), Error>;

    /// Withdraw the whole compounded deposit and the collateral gain
    fn withdraw_all_from_sp(env: &Env, depositor: Address) -> Result<i128, Error>;

    /// Move the depositor's collateral gain into their own active trove
    fn withdraw_gain_to_trove(
        env: &Env,
        depositor: Address,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<i128, Error>;

    fn get_compounded_deposit(env: &Env, depositor: Address) -> Result<i128, Error>;
    fn get_depositor_collateral_gain(env: &Env, depositor: Address) -> Result<i128, Error>;
    fn get_deposit(env: &Env, depositor: Address) -> StabilityDeposit;
    fn get_pool_state(env: &Env) -> PoolState;
    fn get_epoch_scale_sum(env: &Env, epoch: u64, scale: u64) -> i128;
}

pub fn get_deposit(env: &Env, depositor: &Address) -> StabilityDeposit {
    storage::get_persistent(env, &DataKey::Deposit(depositor.clone())).unwrap_or_default()
}

pub fn epoch_scale_sum(env: &Env, epoch: u64, scale: u64) -> i128 {
    storage::get_persistent(env, &DataKey::EpochScaleSum(EpochScale(epoch, scale))).unwrap_or(0)
}

fn set_epoch_scale_sum(env: &Env, epoch: u64, scale: u64, sum: i128) {
    storage::set_persistent(env, &DataKey::EpochScaleSum(EpochScale(epoch, scale)), &sum);
}

pub fn compounded_deposit(env: &Env, deposit: &StabilityDeposit) -> Result<i128, Error> {
    if deposit.initial_deposit == 0 {
        return Ok(0);
    }
    let pool = PoolState::get_state(env);
    // The pool was emptied at least once since the snapshot
    if deposit.snapshot_epoch < pool.current_epoch {
        return Ok(0);
    }
    let compounded = match pool.current_scale - deposit.snapshot_scale {
        0 => math::mul_div(env, deposit.initial_deposit, pool.p, deposit.snapshot_p)?,
        1 => math::mul_div(env, deposit.initial_deposit, pool.p, deposit.snapshot_p)? / SCALE_FACTOR,
        _ => 0,
    };
    // Below this the value is indistinguishable from rounding error
    if compounded < deposit.initial_deposit / SCALE_FACTOR {
        return Ok(0);
    }
    Ok(compounded)
}

pub fn collateral_gain(env: &Env, deposit: &StabilityDeposit) -> Result<i128, Error> {
    if deposit.initial_deposit == 0 {
        return Ok(0);
    }
    let epoch = deposit.snapshot_epoch;
    let scale = deposit.snapshot_scale;
    let first_portion = math::sub(epoch_scale_sum(env, epoch, scale), deposit.snapshot_s)?;
    let second_portion = epoch_scale_sum(env, epoch, scale + 1) / SCALE_FACTOR;
    let gain = math::mul_div(
        env,
        deposit.initial_deposit,
        math::add(first_portion, second_portion)?,
        deposit.snapshot_p,
    )?;
    Ok(gain / DECIMAL_PRECISION)
}

fn update_deposit_and_snapshots(env: &Env, depositor: &Address, new_deposit: i128) {
    let key = DataKey::Deposit(depositor.clone());
    let pool = PoolState::get_state(env);
    let deposit = if new_deposit == 0 {
        storage::remove_persistent(env, &key);
        StabilityDeposit::default()
    } else {
        let deposit = StabilityDeposit {
            initial_deposit: new_deposit,
            snapshot_p: pool.p,
            snapshot_s: epoch_scale_sum(env, pool.current_epoch, pool.current_scale),
            snapshot_scale: pool.current_scale,
            snapshot_epoch: pool.current_epoch,
        };
        storage::set_persistent(env, &key, &deposit);
        deposit
    };
    DepositUpdated {
        depositor: depositor.clone(),
        deposit: new_deposit,
        p: deposit.snapshot_p,
        s: deposit.snapshot_s,
        scale: deposit.snapshot_scale,
        epoch: deposit.snapshot_epoch,
    }
    .publish(env);
}

/// Settle a depositor's position: returns (compounded deposit, collateral gain) and
/// takes the gain out of the pool's collateral balance.
fn settle_depositor(env: &Env, depositor: &Address) -> Result<(i128, i128), Error> {
    let deposit = get_deposit(env, depositor);
    let compounded = compounded_deposit(env, &deposit)?;
    let gain = collateral_gain(env, &deposit)?;
    if gain > 0 {
        let mut pool = PoolState::get_state(env);
        pool.collateral = math::sub(pool.collateral, gain)?;
        PoolState::set_state(env, &pool);
    }
    let deposit_loss = math::sub(deposit.initial_deposit, compounded)?;
    if gain > 0 || deposit_loss > 0 {
        CollateralGainWithdrawn {
            depositor: depositor.clone(),
            collateral: gain,
            deposit_loss,
        }
        .publish(env);
    }
    Ok((compounded, gain))
}

fn require_no_undercollateralized_troves(env: &Env) -> Result<(), Error> {
    let Some(lowest) = sorted_troves::last(env) else {
        return Ok(());
    };
    let price = price::fetch_price(env)?;
    let mcr = ProtocolStorage::get_state(env).mcr;
    if trove_manager::current_icr(env, &lowest, price)? < mcr {
        return Err(Error::UndercollateralizedTroves);
    }
    Ok(())
}

pub fn provide(env: &Env, depositor: &Address, amount: i128) -> Result<(), Error> {
    if amount <= 0 {
        return Err(Error::ValueNotPositive);
    }
    let (compounded, gain) = settle_depositor(env, depositor)?;

    token::transfer(env, depositor, &env.current_contract_address(), amount)?;
    let mut pool = PoolState::get_state(env);
    pool.total_deposits = math::add(pool.total_deposits, amount)?;
    PoolState::set_state(env, &pool);

    update_deposit_and_snapshots(env, depositor, math::add(compounded, amount)?);
    token::send_collateral(env, depositor, gain)?;
    log!(env, "sp deposit {} gain {}", amount, gain);
    Ok(())
}

pub fn withdraw(env: &Env, depositor: &Address, amount: Option<i128>) -> Result<i128, Error> {
    if get_deposit(env, depositor).initial_deposit == 0 {
        return Err(Error::NoStabilityDeposit);
    }
    require_no_undercollateralized_troves(env)?;

    let (compounded, gain) = settle_depositor(env, depositor)?;
    let amount = amount.unwrap_or(compounded);
    if amount < 0 {
        return Err(Error::ValueNotPositive);
    }
    if amount > compounded {
        return Err(Error::InsufficientDeposit);
    }

    let mut pool = PoolState::get_state(env);
    pool.total_deposits = math::sub(pool.total_deposits, amount)?;
    PoolState::set_state(env, &pool);
    token::transfer(env, &env.current_contract_address(), depositor, amount)?;

    update_deposit_and_snapshots(env, depositor, compounded - amount);
    token::send_collateral(env, depositor, gain)?;
    log!(env, "sp withdrawal {} gain {}", amount, gain);
    Ok(amount)
}

pub fn withdraw_gain_to_trove(
    env: &Env,
    depositor: &Address,
    upper_hint: Option<Address>,
    lower_hint: Option<Address>,
) -> Result<i128, Error> {
    if get_deposit(env, depositor).initial_deposit == 0 {
        return Err(Error::NoStabilityDeposit);
    }
    trove_manager::require_active(env, depositor)?;

    let (compounded, gain) = settle_depositor(env, depositor)?;
    if gain == 0 {
        return Err(Error::NoCollateralGain);
    }
    update_deposit_and_snapshots(env, depositor, compounded);

    let price = price::fetch_price(env)?;
    let mut trove = trove_manager::sync_trove(env, depositor)?;
    trove.collateral = math::add(trove.collateral, gain)?;
    trove_manager::add_active_collateral(env, gain)?;
    trove_manager::update_stake_and_total_stakes(env, &mut trove)?;
    trove_manager::refresh_max_borrowing_capacity(env, &mut trove, price)?;
    trove_manager::reposition(env, depositor, &trove, upper_hint, lower_hint)?;
    trove_manager::set_trove(env, depositor, &trove);
    log!(env, "sp gain {} moved to trove", gain);
    Ok(gain)
}

/// Cancel `debt` against pool deposits and hand the pool `collateral`.
///
/// Collateral gain per unit is rounded down and loss per unit is rounded up,
/// each carrying its truncation error into the next offset.
pub fn offset(env: &Env, debt: i128, collateral: i128) -> Result<(), Error> {
    let mut pool = PoolState::get_state(env);
    if pool.total_deposits == 0 || debt == 0 {
        return Ok(());
    }

    let (gain_per_unit, collateral_error) = math::div_with_carry(
        env,
        collateral,
        pool.last_collateral_error_offset,
        pool.total_deposits,
    )?;
    pool.last_collateral_error_offset = collateral_error;

    let loss_per_unit = if debt == pool.total_deposits {
        pool.last_debt_loss_error_offset = 0;
        DECIMAL_PRECISION
    } else {
        let (quotient, remainder) = math::div_with_carry(
            env,
            debt,
            -pool.last_debt_loss_error_offset,
            pool.total_deposits,
        )?;
        pool.last_debt_loss_error_offset = pool.total_deposits - remainder;
        quotient + 1
    };
    if loss_per_unit > DECIMAL_PRECISION {
        return Err(Error::ArithmeticError);
    }

    let marginal_gain = math::mul(gain_per_unit, pool.p)?;
    let sum = epoch_scale_sum(env, pool.current_epoch, pool.current_scale);
    set_epoch_scale_sum(
        env,
        pool.current_epoch,
        pool.current_scale,
        math::add(sum, marginal_gain)?,
    );

    let product_factor = DECIMAL_PRECISION - loss_per_unit;
    if product_factor == 0 {
        pool.current_epoch += 1;
        pool.current_scale = 0;
        pool.p = DECIMAL_PRECISION;
    } else {
        let next_p = math::mul_div(env, pool.p, product_factor, DECIMAL_PRECISION)?;
        if next_p < SCALE_FACTOR {
            pool.p = math::mul_div(
                env,
                pool.p,
                math::mul(product_factor, SCALE_FACTOR)?,
                DECIMAL_PRECISION,
            )?;
            pool.current_scale += 1;
        } else {
            pool.p = next_p;
        }
    }
    if pool.p <= 0 {
        return Err(Error::ArithmeticError);
    }

    pool.total_deposits = math::sub(pool.total_deposits, debt)?;
    pool.collateral = math::add(pool.collateral, collateral)?;
    PoolState::set_state(env, &pool);
    token::burn(env, &env.current_contract_address(), debt)?;

    Offset {
        debt_offset: debt,
        collateral_added: collateral,
        p: pool.p,
        scale: pool.current_scale,
        epoch: pool.current_epoch,
    }
    .publish(env);
    log!(
        env,
        "offset debt {} collateral {} epoch {} scale {}",
        debt,
        collateral,
        pool.current_epoch,
        pool.current_scale
    );
    Ok(())
}
