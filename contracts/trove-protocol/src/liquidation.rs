use soroban_sdk::{Address, Env, Vec, contracttype, log};

use crate::{
    Error, collateral_surplus,
    index_types::{Liquidation, TroveLiquidated},
    math::{self, DECIMAL_PRECISION, PERCENT_DIVISOR},
    price, sorted_troves, stability_pool,
    storage::ProtocolStorage,
    token,
    trove_manager::{self, SystemState, TroveStatus},
};

/// Aggregate outcome of a liquidation call.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LiquidationTotals {
    pub troves_liquidated: u32,
    pub total_debt_in_sequence: i128,
    pub total_coll_in_sequence: i128,
    pub total_coll_gas_compensation: i128,
    pub total_debt_gas_compensation: i128,
    pub total_debt_to_offset: i128,
    pub total_coll_to_send_to_sp: i128,
    pub total_debt_to_redistribute: i128,
    pub total_coll_to_redistribute: i128,
    pub total_coll_surplus: i128,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct LiquidationValues {
    entire_debt: i128,
    entire_coll: i128,
    coll_gas_compensation: i128,
    debt_gas_compensation: i128,
    debt_to_offset: i128,
    coll_to_send_to_sp: i128,
    debt_to_redistribute: i128,
    coll_to_redistribute: i128,
    coll_surplus: i128,
}

impl LiquidationTotals {
    fn add(&mut self, values: &LiquidationValues) -> Result<(), Error> {
        self.troves_liquidated += 1;
        self.total_debt_in_sequence = math::add(self.total_debt_in_sequence, values.entire_debt)?;
        self.total_coll_in_sequence = math::add(self.total_coll_in_sequence, values.entire_coll)?;
        self.total_coll_gas_compensation =
            math::add(self.total_coll_gas_compensation, values.coll_gas_compensation)?;
        self.total_debt_gas_compensation =
            math::add(self.total_debt_gas_compensation, values.debt_gas_compensation)?;
        self.total_debt_to_offset = math::add(self.total_debt_to_offset, values.debt_to_offset)?;
        self.total_coll_to_send_to_sp =
            math::add(self.total_coll_to_send_to_sp, values.coll_to_send_to_sp)?;
        self.total_debt_to_redistribute =
            math::add(self.total_debt_to_redistribute, values.debt_to_redistribute)?;
        self.total_coll_to_redistribute =
            math::add(self.total_coll_to_redistribute, values.coll_to_redistribute)?;
        self.total_coll_surplus = math::add(self.total_coll_surplus, values.coll_surplus)?;
        Ok(())
    }
}

enum Assessment {
    Liquidate(LiquidationValues),
    /// Not liquidatable, later troves may be
    Ineligible,
    /// Not liquidatable. The list is ordered by stored NICR, which interest
    /// and pending rewards let drift, so troves further up are not checked.
    Halt,
}

/// Running view of the system while a batch is processed.
struct Run {
    price: i128,
    mcr: i128,
    ccr: i128,
    gas_compensation: i128,
    remaining_sp: i128,
    system_coll: i128,
    system_debt: i128,
    recovery_mode: bool,
    totals: LiquidationTotals,
}

impl Run {
    fn start(env: &Env) -> Result<Run, Error> {
        let price = price::fetch_price(env)?;
        let config = ProtocolStorage::get_state(env);
        let system_coll = trove_manager::entire_system_collateral(env)?;
        let system_debt = trove_manager::entire_system_debt(env)?;
        let tcr = math::compute_cr(env, system_coll, system_debt, price)?;
        Ok(Run {
            price,
            mcr: config.mcr,
            ccr: config.ccr,
            gas_compensation: config.gas_compensation,
            remaining_sp: stability_pool::PoolState::get_state(env).total_deposits,
            system_coll,
            system_debt,
            recovery_mode: tcr < config.ccr,
            totals: LiquidationTotals::default(),
        })
    }

    fn tcr(&self, env: &Env) -> Result<i128, Error> {
        math::compute_cr(env, self.system_coll, self.system_debt, self.price)
    }

    /// Work out how a trove would be liquidated right now, if at all.
    fn assess(&self, env: &Env, borrower: &Address) -> Result<Assessment, Error> {
        let entire = trove_manager::entire_debt_and_coll(env, borrower)?;
        let icr = math::compute_cr(env, entire.collateral, entire.debt, self.price)?;

        if !self.recovery_mode {
            if icr >= self.mcr {
                return Ok(Assessment::Halt);
            }
            return Ok(Assessment::Liquidate(self.normal(
                env,
                entire.debt,
                entire.collateral,
            )?));
        }

        if icr >= self.mcr && self.remaining_sp == 0 {
            return Ok(Assessment::Halt);
        }
        let values = if icr <= DECIMAL_PRECISION {
            self.redistribute_all(entire.debt, entire.collateral)
        } else if icr < self.mcr {
            self.normal(env, entire.debt, entire.collateral)?
        } else if icr < self.tcr(env)? && entire.debt <= self.remaining_sp {
            self.capped(env, entire.debt, entire.collateral)?
        } else {
            return Ok(Assessment::Ineligible);
        };
        Ok(Assessment::Liquidate(values))
    }

    fn normal(&self, env: &Env, debt: i128, coll: i128) -> Result<LiquidationValues, Error> {
        let coll_gas_compensation = coll / PERCENT_DIVISOR;
        let coll_to_liquidate = coll - coll_gas_compensation;
        let (debt_to_offset, coll_to_send_to_sp) = if self.remaining_sp > 0 {
            let offset = debt.min(self.remaining_sp);
            (offset, math::mul_div(env, coll_to_liquidate, offset, debt)?)
        } else {
            (0, 0)
        };
        Ok(LiquidationValues {
            entire_debt: debt,
            entire_coll: coll,
            coll_gas_compensation,
            debt_gas_compensation: self.gas_compensation,
            debt_to_offset,
            coll_to_send_to_sp,
            debt_to_redistribute: debt - debt_to_offset,
            coll_to_redistribute: coll_to_liquidate - coll_to_send_to_sp,
            coll_surplus: 0,
        })
    }

    fn redistribute_all(&self, debt: i128, coll: i128) -> LiquidationValues {
        let coll_gas_compensation = coll / PERCENT_DIVISOR;
        LiquidationValues {
            entire_debt: debt,
            entire_coll: coll,
            coll_gas_compensation,
            debt_gas_compensation: self.gas_compensation,
            debt_to_redistribute: debt,
            coll_to_redistribute: coll - coll_gas_compensation,
            ..LiquidationValues::default()
        }
    }

    // Collateral is capped at MCR worth of the debt; the excess stays with the owner
    fn capped(&self, env: &Env, debt: i128, coll: i128) -> Result<LiquidationValues, Error> {
        let capped_coll = math::mul_div(env, debt, self.mcr, self.price)?.min(coll);
        let coll_gas_compensation = capped_coll / PERCENT_DIVISOR;
        Ok(LiquidationValues {
            entire_debt: debt,
            entire_coll: coll,
            coll_gas_compensation,
            debt_gas_compensation: self.gas_compensation,
            debt_to_offset: debt,
            coll_to_send_to_sp: capped_coll - coll_gas_compensation,
            coll_surplus: coll - capped_coll,
            ..LiquidationValues::default()
        })
    }

    /// Liquidate `borrower` if eligible. Returns whether the walk should stop.
    fn liquidate_one(&mut self, env: &Env, borrower: &Address) -> Result<bool, Error> {
        if !trove_manager::get_trove(env, borrower).is_active() || sorted_troves::size(env) <= 1 {
            return Ok(false);
        }
        let values = match self.assess(env, borrower)? {
            Assessment::Liquidate(values) => values,
            Assessment::Ineligible => return Ok(false),
            Assessment::Halt => return Ok(true),
        };

        let trove = trove_manager::sync_trove(env, borrower)?;
        trove_manager::close_trove(env, borrower, trove, TroveStatus::ClosedByLiquidation)?;
        collateral_surplus::account(env, borrower, values.coll_surplus)?;

        TroveLiquidated {
            borrower: borrower.clone(),
            debt: values.entire_debt,
            collateral: values.entire_coll,
            recovery_mode: self.recovery_mode,
        }
        .publish(env);

        self.remaining_sp = math::sub(self.remaining_sp, values.debt_to_offset)?;
        self.system_coll = math::sub(
            self.system_coll,
            values.coll_to_send_to_sp + values.coll_gas_compensation + values.coll_surplus,
        )?;
        self.system_debt = math::sub(self.system_debt, values.debt_to_offset)?;
        if self.recovery_mode {
            self.recovery_mode = self.tcr(env)? < self.ccr;
        }
        self.totals.add(&values)?;
        Ok(false)
    }

    /// Apply the batch totals: offset against the pool, redistribute the rest,
    /// then pay the liquidator.
    fn finish(self, env: &Env, liquidator: &Address) -> Result<LiquidationTotals, Error> {
        let totals = self.totals;
        if totals.troves_liquidated == 0 {
            return Err(Error::NothingToLiquidate);
        }
        stability_pool::offset(env, totals.total_debt_to_offset, totals.total_coll_to_send_to_sp)?;
        trove_manager::redistribute(
            env,
            totals.total_debt_to_redistribute,
            totals.total_coll_to_redistribute,
        )?;
        trove_manager::update_system_snapshots(env)?;

        let mut state = SystemState::get_state(env);
        state.gas_pool = math::sub(state.gas_pool, totals.total_debt_gas_compensation)?;
        SystemState::set_state(env, &state);
        token::transfer(
            env,
            &env.current_contract_address(),
            liquidator,
            totals.total_debt_gas_compensation,
        )?;
        token::send_collateral(env, liquidator, totals.total_coll_gas_compensation)?;

        Liquidation {
            liquidator: liquidator.clone(),
            troves_liquidated: totals.troves_liquidated,
            liquidated_debt: totals.total_debt_in_sequence,
            liquidated_collateral: totals.total_coll_in_sequence,
            coll_gas_compensation: totals.total_coll_gas_compensation,
            debt_gas_compensation: totals.total_debt_gas_compensation,
            debt_offset: totals.total_debt_to_offset,
            debt_redistributed: totals.total_debt_to_redistribute,
            coll_surplus: totals.total_coll_surplus,
            price: self.price,
            timestamp: env.ledger().timestamp(),
        }
        .publish(env);
        log!(
            env,
            "liquidated {} troves, debt {} offset {}",
            totals.troves_liquidated,
            totals.total_debt_in_sequence,
            totals.total_debt_to_offset
        );
        Ok(totals)
    }
}

pub fn liquidate(env: &Env, liquidator: &Address, borrower: &Address) -> Result<LiquidationTotals, Error> {
    trove_manager::require_active(env, borrower)?;
    if sorted_troves::size(env) <= 1 {
        return Err(Error::OnlyOneTroveInSystem);
    }
    let mut run = Run::start(env)?;
    run.liquidate_one(env, borrower)?;
    run.finish(env, liquidator)
}

/// Walk up from the riskiest trove, liquidating at most `n`. Stops at the
/// first healthy trove; a trove above it that fell below MCR through interest
/// or redistribution is reached with `batch_liquidate`.
pub fn liquidate_troves(env: &Env, liquidator: &Address, n: u32) -> Result<LiquidationTotals, Error> {
    let mut run = Run::start(env)?;
    let mut current = sorted_troves::last(env);
    for _ in 0..n {
        let Some(borrower) = current else {
            break;
        };
        if sorted_troves::size(env) <= 1 {
            break;
        }
        let next = sorted_troves::prev(env, &borrower);
        if run.liquidate_one(env, &borrower)? {
            break;
        }
        current = next;
    }
    run.finish(env, liquidator)
}

pub fn batch_liquidate(
    env: &Env,
    liquidator: &Address,
    borrowers: &Vec<Address>,
) -> Result<LiquidationTotals, Error> {
    if borrowers.is_empty() {
        return Err(Error::InvalidParameter);
    }
    let mut run = Run::start(env)?;
    for borrower in borrowers.iter() {
        run.liquidate_one(env, &borrower)?;
    }
    run.finish(env, liquidator)
}
