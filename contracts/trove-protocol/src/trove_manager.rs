use soroban_sdk::{Address, Env, Vec, contracttype, log};

use crate::{
    Error,
    index_types::{Redistribution, TroveUpdated},
    interest_rate_manager,
    liquidation::LiquidationTotals,
    math::{self, DECIMAL_PRECISION},
    redemption::RedemptionTotals,
    sorted_troves,
    storage::{self, DataKey, ProtocolStorage, SYSTEM},
};

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TroveStatus {
    Nonexistent,
    Active,
    ClosedByOwner,
    ClosedByLiquidation,
    ClosedByRedemption,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Trove {
    pub status: TroveStatus,
    /// Debt excluding accrued interest, gas compensation included
    pub principal: i128,
    /// Interest settled into the record and not yet repaid
    pub interest_owed: i128,
    pub collateral: i128,
    /// Share of redistribution rewards
    pub stake: i128,
    /// Bucket id in basis points, fixed between opens and refinances
    pub interest_rate: u32,
    pub last_interest_update_time: u64,
    /// Sub-unit interest carried between settlements, in units of `1 / (SECONDS_PER_YEAR * BASIS_POINTS)`
    pub interest_remainder: i128,
    /// `collateral * price / MCR` at the last collateral or rate change
    pub max_borrowing_capacity: i128,
    pub reward_snapshot_collateral: i128,
    pub reward_snapshot_principal: i128,
}

impl Default for Trove {
    fn default() -> Self {
        Trove::closed(TroveStatus::Nonexistent)
    }
}

impl Trove {
    pub fn closed(status: TroveStatus) -> Self {
        Trove {
            status,
            principal: 0,
            interest_owed: 0,
            collateral: 0,
            stake: 0,
            interest_rate: 0,
            last_interest_update_time: 0,
            interest_remainder: 0,
            max_borrowing_capacity: 0,
            reward_snapshot_collateral: 0,
            reward_snapshot_principal: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TroveStatus::Active
    }

    pub fn debt(&self) -> Result<i128, Error> {
        math::add(self.principal, self.interest_owed)
    }
}

/// System-wide trove accounting.
///
/// Active collateral sits in open troves. Redistributed collateral and
/// principal wait in the default pool until each trove picks up its share.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SystemState {
    pub active_collateral: i128,
    pub default_collateral: i128,
    pub default_principal: i128,
    pub total_stakes: i128,
    pub total_stakes_snapshot: i128,
    pub total_collateral_snapshot: i128,
    /// Redistributed collateral per unit of stake, 1e18-scaled
    pub l_collateral: i128,
    /// Redistributed principal per unit of stake, 1e18-scaled
    pub l_principal: i128,
    pub last_coll_error_redist: i128,
    pub last_debt_error_redist: i128,
    /// Collateral owed to owners of closed troves
    pub surplus_collateral: i128,
    /// Stable held back for liquidators
    pub gas_pool: i128,
}

impl SystemState {
    pub fn get_state(env: &Env) -> SystemState {
        env.storage().instance().get(&SYSTEM).unwrap_or_default()
    }

    pub fn set_state(env: &Env, state: &SystemState) {
        env.storage().instance().set(&SYSTEM, state);
    }
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PendingRewards {
    pub collateral: i128,
    pub principal: i128,
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EntireDebtAndColl {
    pub debt: i128,
    pub collateral: i128,
    pub principal: i128,
    pub interest: i128,
    pub pending_principal: i128,
    pub pending_collateral: i128,
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SystemTotals {
    pub entire_collateral: i128,
    pub entire_debt: i128,
    pub state: SystemState,
    pub trove_count: u32,
}

pub trait IsTroveManager {
    /// Liquidate a single trove
    fn liquidate(env: &Env, liquidator: Address, borrower: Address)
    -> Result<LiquidationTotals, Error>;

    /// Liquidate up to `n` troves starting from the lowest collateral ratio
    fn liquidate_troves(env: &Env, liquidator: Address, n: u32)
    -> Result<LiquidationTotals, Error>;

    /// Liquidate every eligible trove in `borrowers`
    fn batch_liquidate_troves(
        env: &Env,
        liquidator: Address,
        borrowers: Vec<Address>,
    ) -> Result<LiquidationTotals, Error>;

    /// Swap `amount` stable for collateral from the riskiest troves
    fn redeem_collateral(
        env: &Env,
        redeemer: Address,
        amount: i128,
        max_iterations: u32,
        max_fee_percentage: i128,
    ) -> Result<RedemptionTotals, Error>;

    fn get_trove(env: &Env, borrower: Address) -> Trove;
    fn get_trove_status(env: &Env, borrower: Address) -> TroveStatus;
    /// Debt and collateral including accrued interest and pending redistribution rewards
    fn get_entire_debt_and_coll(env: &Env, borrower: Address) -> Result<EntireDebtAndColl, Error>;
    fn get_pending_rewards(env: &Env, borrower: Address) -> Result<PendingRewards, Error>;
    fn get_nominal_icr(env: &Env, borrower: Address) -> Result<i128, Error>;
    fn get_current_icr(env: &Env, borrower: Address, price: i128) -> Result<i128, Error>;
    fn get_tcr(env: &Env, price: i128) -> Result<i128, Error>;
    fn check_recovery_mode(env: &Env, price: i128) -> Result<bool, Error>;
    fn get_system_totals(env: &Env) -> Result<SystemTotals, Error>;

    /// Fee the next borrow of `amount` would pay
    fn get_borrowing_fee(env: &Env, amount: i128) -> Result<i128, Error>;
    fn get_borrowing_rate(env: &Env) -> Result<i128, Error>;
    fn get_redemption_rate(env: &Env) -> Result<i128, Error>;
    fn get_base_rate(env: &Env) -> i128;
    fn get_decayed_base_rate(env: &Env) -> Result<i128, Error>;
    fn get_last_fee_operation_time(env: &Env) -> u64;

    /// Collateral claimable by `owner` after a liquidation or redemption left a surplus
    fn get_surplus_collateral(env: &Env, owner: Address) -> i128;
}

pub fn get_trove(env: &Env, borrower: &Address) -> Trove {
    storage::get_persistent(env, &DataKey::Trove(borrower.clone())).unwrap_or_default()
}

pub fn set_trove(env: &Env, borrower: &Address, trove: &Trove) {
    TroveUpdated {
        borrower: borrower.clone(),
        principal: trove.principal,
        interest_owed: trove.interest_owed,
        collateral: trove.collateral,
        stake: trove.stake,
        interest_rate: trove.interest_rate,
        status: trove.status,
        ledger: env.ledger().sequence(),
        timestamp: env.ledger().timestamp(),
    }
    .publish(env);
    storage::set_persistent(env, &DataKey::Trove(borrower.clone()), trove);
}

pub fn require_active(env: &Env, borrower: &Address) -> Result<Trove, Error> {
    let trove = get_trove(env, borrower);
    if !trove.is_active() {
        return Err(Error::TroveNotActive);
    }
    Ok(trove)
}

pub fn pending_rewards(env: &Env, trove: &Trove) -> Result<PendingRewards, Error> {
    if !trove.is_active() || trove.stake == 0 {
        return Ok(PendingRewards::default());
    }
    let state = SystemState::get_state(env);
    let collateral_diff = math::sub(state.l_collateral, trove.reward_snapshot_collateral)?;
    let principal_diff = math::sub(state.l_principal, trove.reward_snapshot_principal)?;
    Ok(PendingRewards {
        collateral: math::mul_div(env, trove.stake, collateral_diff, DECIMAL_PRECISION)?,
        principal: math::mul_div(env, trove.stake, principal_diff, DECIMAL_PRECISION)?,
    })
}

pub fn update_reward_snapshots(env: &Env, trove: &mut Trove) {
    let state = SystemState::get_state(env);
    trove.reward_snapshot_collateral = state.l_collateral;
    trove.reward_snapshot_principal = state.l_principal;
}

pub fn entire_debt_and_coll(env: &Env, borrower: &Address) -> Result<EntireDebtAndColl, Error> {
    let trove = get_trove(env, borrower);
    let pending = pending_rewards(env, &trove)?;
    let interest = interest_rate_manager::projected_trove_interest(env, &trove)?;
    let principal = math::add(trove.principal, pending.principal)?;
    Ok(EntireDebtAndColl {
        debt: math::add(principal, interest)?,
        collateral: math::add(trove.collateral, pending.collateral)?,
        principal,
        interest,
        pending_principal: pending.principal,
        pending_collateral: pending.collateral,
    })
}

/// Bring an active trove up to date: settle interest into the trove and its
/// bucket, then pull in pending redistribution rewards from the default pool.
/// Every mutation of a trove starts here.
pub fn sync_trove(env: &Env, borrower: &Address) -> Result<Trove, Error> {
    let mut trove = require_active(env, borrower)?;
    interest_rate_manager::settle_trove_interest(env, &mut trove)?;

    let pending = pending_rewards(env, &trove)?;
    if pending.collateral > 0 || pending.principal > 0 {
        trove.collateral = math::add(trove.collateral, pending.collateral)?;
        trove.principal = math::add(trove.principal, pending.principal)?;
        interest_rate_manager::add_principal(env, trove.interest_rate, pending.principal)?;

        let mut state = SystemState::get_state(env);
        state.default_collateral = math::sub(state.default_collateral, pending.collateral)?;
        state.default_principal = math::sub(state.default_principal, pending.principal)?;
        state.active_collateral = math::add(state.active_collateral, pending.collateral)?;
        SystemState::set_state(env, &state);
    }
    update_reward_snapshots(env, &mut trove);
    set_trove(env, borrower, &trove);
    Ok(trove)
}

fn compute_new_stake(env: &Env, collateral: i128) -> Result<i128, Error> {
    let state = SystemState::get_state(env);
    if state.total_collateral_snapshot == 0 {
        Ok(collateral)
    } else {
        math::mul_div(
            env,
            collateral,
            state.total_stakes_snapshot,
            state.total_collateral_snapshot,
        )
    }
}

pub fn update_stake_and_total_stakes(env: &Env, trove: &mut Trove) -> Result<(), Error> {
    let new_stake = compute_new_stake(env, trove.collateral)?;
    let mut state = SystemState::get_state(env);
    state.total_stakes = math::add(math::sub(state.total_stakes, trove.stake)?, new_stake)?;
    SystemState::set_state(env, &state);
    trove.stake = new_stake;
    Ok(())
}

pub fn remove_stake(env: &Env, trove: &mut Trove) -> Result<(), Error> {
    let mut state = SystemState::get_state(env);
    state.total_stakes = math::sub(state.total_stakes, trove.stake)?;
    SystemState::set_state(env, &state);
    trove.stake = 0;
    Ok(())
}

/// Spread debt and collateral over every remaining stake through the L accumulators.
/// Truncation remainders are carried into the next redistribution.
pub fn redistribute(env: &Env, debt: i128, collateral: i128) -> Result<(), Error> {
    if debt == 0 && collateral == 0 {
        return Ok(());
    }
    let mut state = SystemState::get_state(env);
    if state.total_stakes == 0 {
        return Err(Error::OnlyOneTroveInSystem);
    }
    let (collateral_per_stake, collateral_error) = math::div_with_carry(
        env,
        collateral,
        state.last_coll_error_redist,
        state.total_stakes,
    )?;
    let (principal_per_stake, principal_error) = math::div_with_carry(
        env,
        debt,
        state.last_debt_error_redist,
        state.total_stakes,
    )?;
    state.last_coll_error_redist = collateral_error;
    state.last_debt_error_redist = principal_error;
    state.l_collateral = math::add(state.l_collateral, collateral_per_stake)?;
    state.l_principal = math::add(state.l_principal, principal_per_stake)?;
    state.default_collateral = math::add(state.default_collateral, collateral)?;
    state.default_principal = math::add(state.default_principal, debt)?;
    SystemState::set_state(env, &state);

    Redistribution {
        l_collateral: state.l_collateral,
        l_principal: state.l_principal,
        total_stakes: state.total_stakes,
    }
    .publish(env);
    log!(env, "redistributed debt {} collateral {}", debt, collateral);
    Ok(())
}

/// Snapshot stakes and collateral after a liquidation so later stakes stay proportional.
pub fn update_system_snapshots(env: &Env) -> Result<(), Error> {
    let mut state = SystemState::get_state(env);
    state.total_stakes_snapshot = state.total_stakes;
    state.total_collateral_snapshot = math::add(state.active_collateral, state.default_collateral)?;
    SystemState::set_state(env, &state);
    Ok(())
}

pub fn add_active_collateral(env: &Env, amount: i128) -> Result<(), Error> {
    let mut state = SystemState::get_state(env);
    state.active_collateral = math::add(state.active_collateral, amount)?;
    SystemState::set_state(env, &state);
    Ok(())
}

pub fn entire_system_collateral(env: &Env) -> Result<i128, Error> {
    let state = SystemState::get_state(env);
    math::add(state.active_collateral, state.default_collateral)
}

pub fn entire_system_debt(env: &Env) -> Result<i128, Error> {
    let state = SystemState::get_state(env);
    math::add(
        interest_rate_manager::total_active_debt(env)?,
        state.default_principal,
    )
}

pub fn get_tcr(env: &Env, price: i128) -> Result<i128, Error> {
    math::compute_cr(
        env,
        entire_system_collateral(env)?,
        entire_system_debt(env)?,
        price,
    )
}

pub fn check_recovery_mode(env: &Env, price: i128) -> Result<bool, Error> {
    Ok(get_tcr(env, price)? < ProtocolStorage::get_state(env).ccr)
}

/// TCR after applying signed collateral and debt changes.
pub fn new_tcr(env: &Env, price: i128, collateral_change: i128, debt_change: i128) -> Result<i128, Error> {
    let collateral = math::add(entire_system_collateral(env)?, collateral_change)?;
    let debt = math::add(entire_system_debt(env)?, debt_change)?;
    math::compute_cr(env, collateral, debt, price)
}

pub fn current_icr(env: &Env, borrower: &Address, price: i128) -> Result<i128, Error> {
    let entire = entire_debt_and_coll(env, borrower)?;
    math::compute_cr(env, entire.collateral, entire.debt, price)
}

pub fn nominal_icr(env: &Env, borrower: &Address) -> Result<i128, Error> {
    let entire = entire_debt_and_coll(env, borrower)?;
    math::compute_nominal_cr(env, entire.collateral, entire.debt)
}

/// Debt `collateral` can carry at `price` without dropping below MCR.
pub fn max_borrowing_capacity(env: &Env, collateral: i128, price: i128) -> Result<i128, Error> {
    math::mul_div(env, collateral, price, ProtocolStorage::get_state(env).mcr)
}

pub fn refresh_max_borrowing_capacity(env: &Env, trove: &mut Trove, price: i128) -> Result<(), Error> {
    trove.max_borrowing_capacity = max_borrowing_capacity(env, trove.collateral, price)?;
    Ok(())
}

/// Place a synced trove in the sorted list according to its current NICR.
pub fn reposition(
    env: &Env,
    borrower: &Address,
    trove: &Trove,
    prev_hint: Option<Address>,
    next_hint: Option<Address>,
) -> Result<(), Error> {
    let nicr = math::compute_nominal_cr(env, trove.collateral, trove.debt()?)?;
    if sorted_troves::contains(env, borrower) {
        sorted_troves::re_insert(env, borrower, nicr, prev_hint, next_hint)
    } else {
        sorted_troves::insert(env, borrower, nicr, prev_hint, next_hint)
    }
}

/// Take a synced trove out of the system. Its bucket balances, stake and
/// list entry go away and its collateral leaves the active pool; the caller
/// routes that collateral.
pub fn close_trove(
    env: &Env,
    borrower: &Address,
    mut trove: Trove,
    status: TroveStatus,
) -> Result<(), Error> {
    if sorted_troves::size(env) <= 1 {
        return Err(Error::OnlyOneTroveInSystem);
    }
    interest_rate_manager::remove_trove(env, &trove)?;
    remove_stake(env, &mut trove)?;
    sorted_troves::remove(env, borrower)?;

    let mut state = SystemState::get_state(env);
    state.active_collateral = math::sub(state.active_collateral, trove.collateral)?;
    SystemState::set_state(env, &state);

    set_trove(env, borrower, &Trove::closed(status));
    Ok(())
}

pub fn system_totals(env: &Env) -> Result<SystemTotals, Error> {
    Ok(SystemTotals {
        entire_collateral: entire_system_collateral(env)?,
        entire_debt: entire_system_debt(env)?,
        state: SystemState::get_state(env),
        trove_count: sorted_troves::size(env),
    })
}
