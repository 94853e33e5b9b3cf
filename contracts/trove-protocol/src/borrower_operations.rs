use soroban_sdk::{Address, Env, log};

use crate::{
    Error, collateral_surplus, fees, governance, interest_rate_manager,
    math, price, sorted_troves,
    storage::ProtocolStorage,
    token,
    trove_manager::{self, SystemState, Trove, TroveStatus},
};

pub trait IsBorrowerOperations {
    /// Open a trove, borrowing `debt_amount` against `collateral`.
    ///
    /// The recorded principal is `debt_amount` plus the borrowing fee plus the
    /// gas compensation reserve. `upper_hint` and `lower_hint` are neighbours
    /// near the expected list position; stale hints only cost a longer search.
    fn open_trove(
        env: &Env,
        borrower: Address,
        collateral: i128,
        debt_amount: i128,
        max_fee_percentage: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error>;

    fn add_collateral(
        env: &Env,
        borrower: Address,
        amount: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error>;

    fn withdraw_collateral(
        env: &Env,
        borrower: Address,
        amount: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error>;

    fn withdraw_debt(
        env: &Env,
        borrower: Address,
        amount: i128,
        max_fee_percentage: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error>;

    /// Repay debt, accrued interest first
    fn repay_debt(
        env: &Env,
        borrower: Address,
        amount: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error>;

    /// Change collateral and debt in one step. Collateral may move in one
    /// direction only, and so may debt.
    #[allow(clippy::too_many_arguments)]
    fn adjust_trove(
        env: &Env,
        borrower: Address,
        max_fee_percentage: i128,
        coll_deposit: i128,
        coll_withdrawal: i128,
        debt_increase: i128,
        debt_repayment: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error>;

    /// Repay everything except the gas compensation and take the collateral back
    fn close_trove(env: &Env, borrower: Address) -> Result<(), Error>;

    /// Move the trove to the currently approved interest rate
    fn refinance(
        env: &Env,
        borrower: Address,
        max_fee_percentage: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error>;

    /// Withdraw collateral left over after a liquidation or redemption closed the owner's trove
    fn claim_collateral(env: &Env, owner: Address) -> Result<i128, Error>;
}

/// Requested adjustment of a trove, all amounts non-negative.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Adjustment {
    pub coll_deposit: i128,
    pub coll_withdrawal: i128,
    pub debt_increase: i128,
    pub debt_repayment: i128,
}

impl Adjustment {
    fn validate(&self) -> Result<(), Error> {
        if self.coll_deposit < 0
            || self.coll_withdrawal < 0
            || self.debt_increase < 0
            || self.debt_repayment < 0
        {
            return Err(Error::ValueNotPositive);
        }
        if (self.coll_deposit > 0 && self.coll_withdrawal > 0)
            || (self.debt_increase > 0 && self.debt_repayment > 0)
        {
            return Err(Error::InvalidAdjustment);
        }
        if self.coll_deposit == 0
            && self.coll_withdrawal == 0
            && self.debt_increase == 0
            && self.debt_repayment == 0
        {
            return Err(Error::InvalidAdjustment);
        }
        Ok(())
    }

    fn coll_change(&self) -> i128 {
        self.coll_deposit - self.coll_withdrawal
    }
}

fn require_normal_mode_ratios(
    env: &Env,
    icr: i128,
    price: i128,
    coll_change: i128,
    debt_change: i128,
) -> Result<(), Error> {
    let config = ProtocolStorage::get_state(env);
    if icr < config.mcr {
        return Err(Error::InsufficientCollateralization);
    }
    if trove_manager::new_tcr(env, price, coll_change, debt_change)? < config.ccr {
        return Err(Error::TcrBelowCcr);
    }
    Ok(())
}

fn add_gas_pool(env: &Env, amount: i128) -> Result<(), Error> {
    let mut state = SystemState::get_state(env);
    state.gas_pool = math::add(state.gas_pool, amount)?;
    SystemState::set_state(env, &state);
    Ok(())
}

fn burn_gas_compensation(env: &Env, amount: i128) -> Result<(), Error> {
    let mut state = SystemState::get_state(env);
    state.gas_pool = math::sub(state.gas_pool, amount)?;
    SystemState::set_state(env, &state);
    token::burn(env, &env.current_contract_address(), amount)
}

// Interest goes to the fee recipient, principal is destroyed
fn collect_repayment(
    env: &Env,
    borrower: &Address,
    interest_paid: i128,
    principal_paid: i128,
) -> Result<(), Error> {
    let fee_recipient = ProtocolStorage::get_state(env).fee_recipient;
    token::transfer(env, borrower, &fee_recipient, interest_paid)?;
    token::burn(env, borrower, principal_paid)
}

pub fn open_trove(
    env: &Env,
    borrower: &Address,
    collateral: i128,
    debt_amount: i128,
    max_fee_percentage: i128,
    upper_hint: Option<Address>,
    lower_hint: Option<Address>,
) -> Result<(), Error> {
    if collateral <= 0 || debt_amount <= 0 {
        return Err(Error::ValueNotPositive);
    }
    if trove_manager::get_trove(env, borrower).is_active() {
        return Err(Error::TroveAlreadyActive);
    }
    let config = ProtocolStorage::get_state(env);
    let price = price::fetch_price(env)?;
    let recovery_mode = trove_manager::check_recovery_mode(env, price)?;
    fees::require_valid_max_fee_percentage(env, max_fee_percentage, recovery_mode)?;

    let fee = if recovery_mode {
        0
    } else {
        let system_debt = trove_manager::entire_system_debt(env)?;
        fees::trigger_borrowing_fee(env, debt_amount, system_debt, max_fee_percentage)?
    };
    let net_debt = math::add(debt_amount, fee)?;
    if net_debt < governance::min_net_debt(env)? {
        return Err(Error::DebtBelowMinimum);
    }
    let principal = math::add(net_debt, config.gas_compensation)?;

    let icr = math::compute_cr(env, collateral, principal, price)?;
    if recovery_mode {
        if icr < config.ccr {
            return Err(Error::IcrBelowCcr);
        }
    } else {
        require_normal_mode_ratios(env, icr, price, collateral, principal)?;
    }

    let mut trove = Trove {
        status: TroveStatus::Active,
        principal,
        collateral,
        interest_rate: governance::interest_rate(env)?,
        last_interest_update_time: env.ledger().timestamp(),
        ..Trove::default()
    };
    trove_manager::update_reward_snapshots(env, &mut trove);
    trove_manager::update_stake_and_total_stakes(env, &mut trove)?;
    trove_manager::refresh_max_borrowing_capacity(env, &mut trove, price)?;
    interest_rate_manager::add_principal(env, trove.interest_rate, principal)?;
    trove_manager::add_active_collateral(env, collateral)?;
    trove_manager::reposition(env, borrower, &trove, upper_hint, lower_hint)?;
    trove_manager::set_trove(env, borrower, &trove);

    token::receive_collateral(env, borrower, collateral)?;
    token::mint(env, borrower, debt_amount)?;
    token::mint(env, &env.current_contract_address(), config.gas_compensation)?;
    add_gas_pool(env, config.gas_compensation)?;
    token::mint(env, &config.fee_recipient, fee)?;

    log!(env, "trove opened, principal {} collateral {} fee {}", principal, collateral, fee);
    Ok(())
}

pub fn adjust_trove(
    env: &Env,
    borrower: &Address,
    max_fee_percentage: i128,
    adjustment: &Adjustment,
    upper_hint: Option<Address>,
    lower_hint: Option<Address>,
) -> Result<(), Error> {
    adjustment.validate()?;
    trove_manager::require_active(env, borrower)?;

    let config = ProtocolStorage::get_state(env);
    let price = price::fetch_price(env)?;
    let recovery_mode = trove_manager::check_recovery_mode(env, price)?;
    if adjustment.debt_increase > 0 {
        fees::require_valid_max_fee_percentage(env, max_fee_percentage, recovery_mode)?;
    }
    if recovery_mode && adjustment.coll_withdrawal > 0 {
        return Err(Error::CollateralWithdrawalInRecoveryMode);
    }

    let mut trove = trove_manager::sync_trove(env, borrower)?;
    let debt = trove.debt()?;
    if adjustment.coll_withdrawal > trove.collateral {
        return Err(Error::WithdrawalExceedsCollateral);
    }
    if adjustment.debt_repayment > debt - config.gas_compensation {
        return Err(Error::RepaymentExceedsDebt);
    }
    if adjustment.debt_repayment > token::balance(env, borrower) {
        return Err(Error::InsufficientBalance);
    }

    let fee = if adjustment.debt_increase > 0 && !recovery_mode {
        let system_debt = trove_manager::entire_system_debt(env)?;
        fees::trigger_borrowing_fee(env, adjustment.debt_increase, system_debt, max_fee_percentage)?
    } else {
        0
    };

    let old_icr = math::compute_cr(env, trove.collateral, debt, price)?;
    let new_coll = math::add(trove.collateral, adjustment.coll_change())?;
    let debt_change = adjustment.debt_increase + fee - adjustment.debt_repayment;
    let new_debt = math::add(debt, debt_change)?;
    let new_icr = math::compute_cr(env, new_coll, new_debt, price)?;

    if adjustment.debt_repayment > 0
        && new_debt - config.gas_compensation < governance::min_net_debt(env)?
    {
        return Err(Error::DebtBelowMinimum);
    }
    if recovery_mode {
        if new_icr < old_icr {
            return Err(Error::IcrDecreasedInRecoveryMode);
        }
        if adjustment.debt_increase > 0 && new_icr < config.ccr {
            return Err(Error::IcrBelowCcr);
        }
    } else {
        require_normal_mode_ratios(env, new_icr, price, adjustment.coll_change(), debt_change)?;
    }
    let capacity = if adjustment.coll_change() != 0 {
        trove_manager::max_borrowing_capacity(env, new_coll, price)?
    } else {
        trove.max_borrowing_capacity
    };
    if adjustment.debt_increase > 0 && new_debt > capacity {
        return Err(Error::ExceedsMaxBorrowingCapacity);
    }

    if adjustment.coll_change() != 0 {
        trove.collateral = new_coll;
        trove.max_borrowing_capacity = capacity;
        trove_manager::add_active_collateral(env, adjustment.coll_change())?;
        trove_manager::update_stake_and_total_stakes(env, &mut trove)?;
    }
    if adjustment.debt_increase > 0 {
        let drawn = adjustment.debt_increase + fee;
        trove.principal = math::add(trove.principal, drawn)?;
        interest_rate_manager::add_principal(env, trove.interest_rate, drawn)?;
    }
    let (interest_paid, principal_paid) = if adjustment.debt_repayment > 0 {
        interest_rate_manager::apply_repayment(env, &mut trove, adjustment.debt_repayment)?
    } else {
        (0, 0)
    };
    trove_manager::reposition(env, borrower, &trove, upper_hint, lower_hint)?;
    trove_manager::set_trove(env, borrower, &trove);

    token::receive_collateral(env, borrower, adjustment.coll_deposit)?;
    token::send_collateral(env, borrower, adjustment.coll_withdrawal)?;
    token::mint(env, borrower, adjustment.debt_increase)?;
    token::mint(env, &config.fee_recipient, fee)?;
    collect_repayment(env, borrower, interest_paid, principal_paid)?;

    log!(env, "trove adjusted, coll {} debt {}", new_coll, new_debt);
    Ok(())
}

pub fn close_trove(env: &Env, borrower: &Address) -> Result<(), Error> {
    trove_manager::require_active(env, borrower)?;
    let config = ProtocolStorage::get_state(env);
    let price = price::fetch_price(env)?;
    if trove_manager::check_recovery_mode(env, price)? {
        return Err(Error::TcrBelowCcr);
    }
    if sorted_troves::size(env) <= 1 {
        return Err(Error::OnlyOneTroveInSystem);
    }

    let trove = trove_manager::sync_trove(env, borrower)?;
    let debt = trove.debt()?;
    let collateral = trove.collateral;
    if trove_manager::new_tcr(env, price, -collateral, -debt)? < config.ccr {
        return Err(Error::TcrBelowCcr);
    }
    let repayment = debt - config.gas_compensation;
    if token::balance(env, borrower) < repayment {
        return Err(Error::InsufficientBalance);
    }
    let interest_paid = trove.interest_owed;

    trove_manager::close_trove(env, borrower, trove, TroveStatus::ClosedByOwner)?;
    collect_repayment(env, borrower, interest_paid, repayment - interest_paid)?;
    burn_gas_compensation(env, config.gas_compensation)?;
    token::send_collateral(env, borrower, collateral)?;

    log!(env, "trove closed, repaid {} collateral {}", repayment, collateral);
    Ok(())
}

pub fn refinance(
    env: &Env,
    borrower: &Address,
    max_fee_percentage: i128,
    upper_hint: Option<Address>,
    lower_hint: Option<Address>,
) -> Result<(), Error> {
    trove_manager::require_active(env, borrower)?;
    let config = ProtocolStorage::get_state(env);
    let price = price::fetch_price(env)?;
    let recovery_mode = trove_manager::check_recovery_mode(env, price)?;
    fees::require_valid_max_fee_percentage(env, max_fee_percentage, recovery_mode)?;

    let mut trove = trove_manager::sync_trove(env, borrower)?;
    let fee = if recovery_mode {
        0
    } else {
        let system_debt = trove_manager::entire_system_debt(env)?;
        fees::trigger_refinancing_fee(
            env,
            trove.principal,
            governance::refinancing_fee_percentage(env)?,
            system_debt,
            max_fee_percentage,
        )?
    };

    let new_debt = math::add(trove.debt()?, fee)?;
    let new_icr = math::compute_cr(env, trove.collateral, new_debt, price)?;
    if !recovery_mode {
        require_normal_mode_ratios(env, new_icr, price, 0, fee)?;
    }

    interest_rate_manager::move_trove_to_rate(env, &mut trove, governance::interest_rate(env)?)?;
    trove.principal = math::add(trove.principal, fee)?;
    interest_rate_manager::add_principal(env, trove.interest_rate, fee)?;
    trove_manager::refresh_max_borrowing_capacity(env, &mut trove, price)?;
    trove_manager::reposition(env, borrower, &trove, upper_hint, lower_hint)?;
    trove_manager::set_trove(env, borrower, &trove);
    token::mint(env, &config.fee_recipient, fee)?;

    log!(env, "trove refinanced at {} bps, fee {}", trove.interest_rate, fee);
    Ok(())
}

pub fn claim_collateral(env: &Env, owner: &Address) -> Result<i128, Error> {
    let amount = collateral_surplus::claim(env, owner)?;
    log!(env, "surplus claimed {}", amount);
    Ok(amount)
}
