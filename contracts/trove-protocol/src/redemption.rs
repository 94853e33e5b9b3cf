use soroban_sdk::{Address, Env, contracttype, log};

use crate::{
    Error, collateral_surplus, fees, governance,
    index_types::Redemption,
    interest_rate_manager,
    math::{self, DECIMAL_PRECISION},
    price, sorted_troves,
    storage::ProtocolStorage,
    token,
    trove_manager::{self, SystemState, TroveStatus},
};

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RedemptionTotals {
    pub attempted_amount: i128,
    pub redeemed_amount: i128,
    /// Part of `redeemed_amount` that settled accrued interest
    pub interest_paid: i128,
    pub collateral_drawn: i128,
    pub collateral_fee: i128,
    pub troves_closed: u32,
}

enum Lot {
    Redeemed { debt: i128, interest: i128, collateral: i128, closed: bool },
    /// Redeeming this trove would leave it below the minimum net debt
    Cancelled,
}

fn redeem_from_trove(
    env: &Env,
    borrower: &Address,
    max_amount: i128,
    price: i128,
    gas_compensation: i128,
    min_net_debt: i128,
) -> Result<Lot, Error> {
    let mut trove = trove_manager::sync_trove(env, borrower)?;
    let debt = trove.debt()?;
    let debt_lot = max_amount.min(debt - gas_compensation);
    if debt_lot <= 0 {
        return Ok(Lot::Cancelled);
    }
    let collateral_lot = math::mul_div(env, debt_lot, DECIMAL_PRECISION, price)?;
    let new_debt = debt - debt_lot;
    let closes = new_debt == gas_compensation;
    if closes && sorted_troves::size(env) <= 1 {
        return Ok(Lot::Cancelled);
    }
    if !closes && new_debt - gas_compensation < min_net_debt {
        return Ok(Lot::Cancelled);
    }

    let (interest, _) = interest_rate_manager::apply_repayment(env, &mut trove, debt_lot)?;
    trove.collateral = math::sub(trove.collateral, collateral_lot)?;
    let mut state = SystemState::get_state(env);
    state.active_collateral = math::sub(state.active_collateral, collateral_lot)?;
    SystemState::set_state(env, &state);

    if closes {
        let surplus = trove.collateral;
        trove_manager::close_trove(env, borrower, trove, TroveStatus::ClosedByRedemption)?;
        collateral_surplus::account(env, borrower, surplus)?;

        let mut state = SystemState::get_state(env);
        state.gas_pool = math::sub(state.gas_pool, gas_compensation)?;
        SystemState::set_state(env, &state);
        token::burn(env, &env.current_contract_address(), gas_compensation)?;
    } else {
        trove_manager::update_stake_and_total_stakes(env, &mut trove)?;
        trove_manager::refresh_max_borrowing_capacity(env, &mut trove, price)?;
        trove_manager::reposition(env, borrower, &trove, None, None)?;
        trove_manager::set_trove(env, borrower, &trove);
    }

    Ok(Lot::Redeemed {
        debt: debt_lot,
        interest,
        collateral: collateral_lot,
        closed: closes,
    })
}

/// Burn `amount` of the redeemer's stable against the riskiest troves still above
/// MCR and pay out the collateral at face value, less the redemption fee.
pub fn redeem_collateral(
    env: &Env,
    redeemer: &Address,
    amount: i128,
    max_iterations: u32,
    max_fee_percentage: i128,
) -> Result<RedemptionTotals, Error> {
    if amount <= 0 {
        return Err(Error::ValueNotPositive);
    }
    let floor = governance::redemption_rate_floor(env)?;
    if max_fee_percentage < floor || max_fee_percentage > DECIMAL_PRECISION {
        return Err(Error::MaxFeePercentageOutOfBounds);
    }
    let config = ProtocolStorage::get_state(env);
    let price = price::fetch_price(env)?;
    if trove_manager::get_tcr(env, price)? < config.mcr {
        return Err(Error::TcrBelowMcr);
    }
    if token::balance(env, redeemer) < amount {
        return Err(Error::InsufficientBalance);
    }
    let min_net_debt = governance::min_net_debt(env)?;
    let total_supply = token::total_supply(env);

    let mut current = sorted_troves::last(env);
    while let Some(borrower) = &current {
        if trove_manager::current_icr(env, borrower, price)? >= config.mcr {
            break;
        }
        current = sorted_troves::prev(env, borrower);
    }

    let mut totals = RedemptionTotals {
        attempted_amount: amount,
        ..RedemptionTotals::default()
    };
    let mut iterations = 0u32;
    while let Some(borrower) = current {
        let remaining = amount - totals.redeemed_amount;
        if remaining == 0 || (max_iterations > 0 && iterations >= max_iterations) {
            break;
        }
        iterations += 1;
        let next = sorted_troves::prev(env, &borrower);
        match redeem_from_trove(
            env,
            &borrower,
            remaining,
            price,
            config.gas_compensation,
            min_net_debt,
        )? {
            Lot::Redeemed {
                debt,
                interest,
                collateral,
                closed,
            } => {
                totals.redeemed_amount += debt;
                totals.interest_paid += interest;
                totals.collateral_drawn += collateral;
                if closed {
                    totals.troves_closed += 1;
                }
            }
            Lot::Cancelled => break,
        }
        current = next;
    }

    if totals.collateral_drawn == 0 {
        return Err(Error::UnableToRedeem);
    }

    fees::update_base_rate_from_redemption(env, totals.collateral_drawn, price, total_supply)?;
    totals.collateral_fee = fees::redemption_fee(env, totals.collateral_drawn)?;
    fees::require_user_accepts_fee(
        env,
        totals.collateral_fee,
        totals.collateral_drawn,
        max_fee_percentage,
    )?;

    token::transfer(env, redeemer, &config.fee_recipient, totals.interest_paid)?;
    token::burn(env, redeemer, totals.redeemed_amount - totals.interest_paid)?;
    token::send_collateral(env, &config.fee_recipient, totals.collateral_fee)?;
    token::send_collateral(env, redeemer, totals.collateral_drawn - totals.collateral_fee)?;

    Redemption {
        redeemer: redeemer.clone(),
        attempted: totals.attempted_amount,
        actual: totals.redeemed_amount,
        collateral_sent: totals.collateral_drawn - totals.collateral_fee,
        collateral_fee: totals.collateral_fee,
    }
    .publish(env);
    log!(
        env,
        "redeemed {} of {} for collateral {}",
        totals.redeemed_amount,
        totals.attempted_amount,
        totals.collateral_drawn
    );
    Ok(totals)
}
