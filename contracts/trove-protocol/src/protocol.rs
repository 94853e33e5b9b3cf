use soroban_sdk::{
    Address, Env, MuxedAddress, String, Symbol, Vec, assert_with_error, contract, contractimpl,
    panic_with_error,
    token::TokenInterface,
};

use crate::{
    Error,
    borrower_operations::{self, Adjustment, IsBorrowerOperations},
    collateral_surplus,
    fees::{self, FeeState},
    governance::{self, GovernedParam, IsGovernance, ParamState},
    interest_rate_manager::{self, InterestRateBucket, IsInterestRateManager},
    liquidation::{self, LiquidationTotals},
    math::DECIMAL_PRECISION,
    price,
    redemption::{self, RedemptionTotals},
    sorted_troves::{self, IsSortedTroves},
    stability_pool::{self, IsStabilityPool, PoolState, StabilityDeposit},
    storage::{ADMIN_KEY, ProtocolConfig, ProtocolStorage},
    token,
    trove_manager::{
        self, EntireDebtAndColl, IsTroveManager, PendingRewards, SystemTotals, Trove, TroveStatus,
    },
};

const VERSION_STRING: &str = concat!(
    env!("CARGO_PKG_VERSION_MAJOR"),
    ".",
    env!("CARGO_PKG_VERSION_MINOR"),
    ".",
    env!("CARGO_PKG_VERSION_PATCH")
);

fn validate_config(config: &ProtocolConfig) -> Result<(), Error> {
    if config.mcr <= DECIMAL_PRECISION || config.ccr <= config.mcr || config.gas_compensation < 0 {
        return Err(Error::InvalidConfig);
    }
    Ok(())
}

#[contract]
pub struct TroveProtocol;

#[contractimpl]
impl TroveProtocol {
    #[allow(clippy::too_many_arguments)]
    pub fn __constructor(
        env: &Env,
        admin: Address,
        collateral_token: Address,
        price_feed: Address,
        collateral_asset: Symbol,
        fee_recipient: Address,
        name: String,
        symbol: String,
        decimals: u32,
        config: ProtocolConfig,
    ) {
        validate_config(&config).unwrap_or_else(|e| panic_with_error!(env, e));
        env.storage().instance().set(&ADMIN_KEY, &admin);
        ProtocolStorage::set_state(
            env,
            &ProtocolStorage {
                name,
                symbol,
                decimals,
                collateral_token,
                price_feed,
                collateral_asset,
                fee_recipient,
                mcr: config.mcr,
                ccr: config.ccr,
                gas_compensation: config.gas_compensation,
            },
        );

        let seeds = [
            (GovernedParam::MinNetDebt, config.min_net_debt),
            (GovernedParam::BorrowingRate, config.borrowing_rate),
            (GovernedParam::RedemptionRate, config.redemption_rate),
            (GovernedParam::InterestRate, i128::from(config.interest_rate)),
            (
                GovernedParam::RefinancingFeePercentage,
                i128::from(config.refinancing_fee_percentage),
            ),
        ];
        for (param, value) in seeds {
            governance::initialize(env, param, value)
                .unwrap_or_else(|_| panic_with_error!(env, Error::InvalidConfig));
        }

        FeeState::set_state(
            env,
            &FeeState {
                base_rate: 0,
                last_fee_operation_time: env.ledger().timestamp(),
            },
        );
        PoolState::set_state(env, &PoolState::default());
    }

    pub fn admin(env: &Env) -> Address {
        env.storage().instance().get(&ADMIN_KEY).unwrap()
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
        caller.require_auth();
        if *caller != Self::admin(env) {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    pub fn version(env: &Env) -> String {
        String::from_str(env, VERSION_STRING)
    }

    /// Collateral price from the feed, normalised to 1e18
    pub fn get_price(env: &Env) -> Result<i128, Error> {
        price::fetch_price(env)
    }

    pub fn get_config(env: &Env) -> ProtocolStorage {
        ProtocolStorage::get_state(env)
    }

    /// Stable in circulation
    pub fn total_supply(env: &Env) -> i128 {
        token::total_supply(env)
    }
}

#[contractimpl]
impl TokenInterface for TroveProtocol {
    /// Return the allowance for `spender` to transfer from `from`.
    fn allowance(env: Env, from: Address, spender: Address) -> i128 {
        token::allowance(&env, &from, &spender)
    }

    /// Set the allowance by `amount` for `spender` to transfer/burn from `from`
    fn approve(env: Env, from: Address, spender: Address, amount: i128, live_until_ledger: u32) {
        from.require_auth();
        token::set_allowance(&env, &from, &spender, amount, live_until_ledger)
            .unwrap_or_else(|e| panic_with_error!(&env, e));
    }

    /// Return the balance of `id`
    fn balance(env: Env, id: Address) -> i128 {
        token::balance(&env, &id)
    }

    /// Transfer `amount` from `from` to `to`
    fn transfer(env: Env, from: Address, to: MuxedAddress, amount: i128) {
        from.require_auth();
        assert_with_error!(&env, amount > 0, Error::ValueNotPositive);
        assert_with_error!(&env, to.address() != from, Error::CannotTransferToSelf);
        token::transfer(&env, &from, &to.address(), amount)
            .unwrap_or_else(|e| panic_with_error!(&env, e));
    }

    /// Transfer `amount` from `from` to `to`, consuming the allowance of `spender`
    fn transfer_from(env: Env, spender: Address, from: Address, to: Address, amount: i128) {
        spender.require_auth();
        assert_with_error!(&env, amount > 0, Error::ValueNotPositive);
        token::spend_allowance(&env, &from, &spender, amount)
            .and_then(|_| token::transfer(&env, &from, &to, amount))
            .unwrap_or_else(|e| panic_with_error!(&env, e));
    }

    /// Burn `amount` from `from`
    fn burn(env: Env, from: Address, amount: i128) {
        from.require_auth();
        assert_with_error!(&env, amount > 0, Error::ValueNotPositive);
        token::burn(&env, &from, amount).unwrap_or_else(|e| panic_with_error!(&env, e));
    }

    /// Burn `amount` from `from`, consuming the allowance of `spender`
    fn burn_from(env: Env, spender: Address, from: Address, amount: i128) {
        spender.require_auth();
        assert_with_error!(&env, amount > 0, Error::ValueNotPositive);
        token::spend_allowance(&env, &from, &spender, amount)
            .and_then(|_| token::burn(&env, &from, amount))
            .unwrap_or_else(|e| panic_with_error!(&env, e));
    }

    /// Return the number of decimals used to represent amounts of this token
    fn decimals(env: Env) -> u32 {
        ProtocolStorage::get_state(&env).decimals
    }

    /// Return the name for this token
    fn name(env: Env) -> String {
        ProtocolStorage::get_state(&env).name
    }

    /// Return the symbol for this token
    fn symbol(env: Env) -> String {
        ProtocolStorage::get_state(&env).symbol
    }
}

#[contractimpl]
impl IsBorrowerOperations for TroveProtocol {
    fn open_trove(
        env: &Env,
        borrower: Address,
        collateral: i128,
        debt_amount: i128,
        max_fee_percentage: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error> {
        borrower.require_auth();
        borrower_operations::open_trove(
            env,
            &borrower,
            collateral,
            debt_amount,
            max_fee_percentage,
            upper_hint,
            lower_hint,
        )
    }

    fn add_collateral(
        env: &Env,
        borrower: Address,
        amount: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error> {
        borrower.require_auth();
        let adjustment = Adjustment {
            coll_deposit: amount,
            ..Adjustment::default()
        };
        borrower_operations::adjust_trove(env, &borrower, 0, &adjustment, upper_hint, lower_hint)
    }

    fn withdraw_collateral(
        env: &Env,
        borrower: Address,
        amount: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error> {
        borrower.require_auth();
        let adjustment = Adjustment {
            coll_withdrawal: amount,
            ..Adjustment::default()
        };
        borrower_operations::adjust_trove(env, &borrower, 0, &adjustment, upper_hint, lower_hint)
    }

    fn withdraw_debt(
        env: &Env,
        borrower: Address,
        amount: i128,
        max_fee_percentage: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error> {
        borrower.require_auth();
        let adjustment = Adjustment {
            debt_increase: amount,
            ..Adjustment::default()
        };
        borrower_operations::adjust_trove(
            env,
            &borrower,
            max_fee_percentage,
            &adjustment,
            upper_hint,
            lower_hint,
        )
    }

    fn repay_debt(
        env: &Env,
        borrower: Address,
        amount: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error> {
        borrower.require_auth();
        let adjustment = Adjustment {
            debt_repayment: amount,
            ..Adjustment::default()
        };
        borrower_operations::adjust_trove(env, &borrower, 0, &adjustment, upper_hint, lower_hint)
    }

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
    ) -> Result<(), Error> {
        borrower.require_auth();
        let adjustment = Adjustment {
            coll_deposit,
            coll_withdrawal,
            debt_increase,
            debt_repayment,
        };
        borrower_operations::adjust_trove(
            env,
            &borrower,
            max_fee_percentage,
            &adjustment,
            upper_hint,
            lower_hint,
        )
    }

    fn close_trove(env: &Env, borrower: Address) -> Result<(), Error> {
        borrower.require_auth();
        borrower_operations::close_trove(env, &borrower)
    }

    fn refinance(
        env: &Env,
        borrower: Address,
        max_fee_percentage: i128,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<(), Error> {
        borrower.require_auth();
        borrower_operations::refinance(env, &borrower, max_fee_percentage, upper_hint, lower_hint)
    }

    fn claim_collateral(env: &Env, owner: Address) -> Result<i128, Error> {
        owner.require_auth();
        borrower_operations::claim_collateral(env, &owner)
    }
}

#[contractimpl]
impl IsTroveManager for TroveProtocol {
    fn liquidate(
        env: &Env,
        liquidator: Address,
        borrower: Address,
    ) -> Result<LiquidationTotals, Error> {
        liquidator.require_auth();
        liquidation::liquidate(env, &liquidator, &borrower)
    }

    fn liquidate_troves(env: &Env, liquidator: Address, n: u32) -> Result<LiquidationTotals, Error> {
        liquidator.require_auth();
        liquidation::liquidate_troves(env, &liquidator, n)
    }

    fn batch_liquidate_troves(
        env: &Env,
        liquidator: Address,
        borrowers: Vec<Address>,
    ) -> Result<LiquidationTotals, Error> {
        liquidator.require_auth();
        liquidation::batch_liquidate(env, &liquidator, &borrowers)
    }

    fn redeem_collateral(
        env: &Env,
        redeemer: Address,
        amount: i128,
        max_iterations: u32,
        max_fee_percentage: i128,
    ) -> Result<RedemptionTotals, Error> {
        redeemer.require_auth();
        redemption::redeem_collateral(env, &redeemer, amount, max_iterations, max_fee_percentage)
    }

    fn get_trove(env: &Env, borrower: Address) -> Trove {
        trove_manager::get_trove(env, &borrower)
    }

    fn get_trove_status(env: &Env, borrower: Address) -> TroveStatus {
        trove_manager::get_trove(env, &borrower).status
    }

    fn get_entire_debt_and_coll(env: &Env, borrower: Address) -> Result<EntireDebtAndColl, Error> {
        trove_manager::entire_debt_and_coll(env, &borrower)
    }

    fn get_pending_rewards(env: &Env, borrower: Address) -> Result<PendingRewards, Error> {
        trove_manager::pending_rewards(env, &trove_manager::get_trove(env, &borrower))
    }

    fn get_nominal_icr(env: &Env, borrower: Address) -> Result<i128, Error> {
        trove_manager::nominal_icr(env, &borrower)
    }

    fn get_current_icr(env: &Env, borrower: Address, price: i128) -> Result<i128, Error> {
        trove_manager::current_icr(env, &borrower, price)
    }

    fn get_tcr(env: &Env, price: i128) -> Result<i128, Error> {
        trove_manager::get_tcr(env, price)
    }

    fn check_recovery_mode(env: &Env, price: i128) -> Result<bool, Error> {
        trove_manager::check_recovery_mode(env, price)
    }

    fn get_system_totals(env: &Env) -> Result<SystemTotals, Error> {
        trove_manager::system_totals(env)
    }

    fn get_borrowing_fee(env: &Env, amount: i128) -> Result<i128, Error> {
        fees::borrowing_fee(env, amount)
    }

    fn get_borrowing_rate(env: &Env) -> Result<i128, Error> {
        fees::borrowing_rate_with_decay(env)
    }

    fn get_redemption_rate(env: &Env) -> Result<i128, Error> {
        fees::redemption_rate_with_decay(env)
    }

    fn get_base_rate(env: &Env) -> i128 {
        FeeState::get_state(env).base_rate
    }

    fn get_decayed_base_rate(env: &Env) -> Result<i128, Error> {
        fees::decayed_base_rate(env)
    }

    fn get_last_fee_operation_time(env: &Env) -> u64 {
        FeeState::get_state(env).last_fee_operation_time
    }

    fn get_surplus_collateral(env: &Env, owner: Address) -> i128 {
        collateral_surplus::get(env, &owner)
    }
}

#[contractimpl]
impl IsStabilityPool for TroveProtocol {
    fn provide_to_sp(env: &Env, depositor: Address, amount: i128) -> Result<(), Error> {
        depositor.require_auth();
        stability_pool::provide(env, &depositor, amount)
    }

    fn withdraw_from_sp(env: &Env, depositor: Address, amount: i128) -> Result<(), Error> {
        depositor.require_auth();
        stability_pool::withdraw(env, &depositor, Some(amount)).map(|_| ())
    }

    fn withdraw_all_from_sp(env: &Env, depositor: Address) -> Result<i128, Error> {
        depositor.require_auth();
        stability_pool::withdraw(env, &depositor, None)
    }

    fn withdraw_gain_to_trove(
        env: &Env,
        depositor: Address,
        upper_hint: Option<Address>,
        lower_hint: Option<Address>,
    ) -> Result<i128, Error> {
        depositor.require_auth();
        stability_pool::withdraw_gain_to_trove(env, &depositor, upper_hint, lower_hint)
    }

    fn get_compounded_deposit(env: &Env, depositor: Address) -> Result<i128, Error> {
        stability_pool::compounded_deposit(env, &stability_pool::get_deposit(env, &depositor))
    }

    fn get_depositor_collateral_gain(env: &Env, depositor: Address) -> Result<i128, Error> {
        stability_pool::collateral_gain(env, &stability_pool::get_deposit(env, &depositor))
    }

    fn get_deposit(env: &Env, depositor: Address) -> StabilityDeposit {
        stability_pool::get_deposit(env, &depositor)
    }

    fn get_pool_state(env: &Env) -> PoolState {
        PoolState::get_state(env)
    }

    fn get_epoch_scale_sum(env: &Env, epoch: u64, scale: u64) -> i128 {
        stability_pool::epoch_scale_sum(env, epoch, scale)
    }
}

#[contractimpl]
impl IsInterestRateManager for TroveProtocol {
    fn get_interest_rate_bucket(env: &Env, rate: u32) -> Result<InterestRateBucket, Error> {
        interest_rate_manager::projected_bucket(env, rate)
    }

    fn get_active_interest_rates(env: &Env) -> Vec<u32> {
        interest_rate_manager::active_rates(env)
    }

    fn get_accrued_interest(env: &Env, borrower: Address) -> Result<i128, Error> {
        interest_rate_manager::projected_trove_interest(env, &trove_manager::get_trove(env, &borrower))
    }

    fn calculate_interest_owed(
        env: &Env,
        principal: i128,
        rate: u32,
        from: u64,
        to: u64,
    ) -> Result<i128, Error> {
        interest_rate_manager::calculate_interest_owed(env, principal, rate, from, to)
    }

    fn settle_interest(env: &Env, borrower: Address) -> Result<i128, Error> {
        let mut trove = trove_manager::require_active(env, &borrower)?;
        let accrued = interest_rate_manager::settle_trove_interest(env, &mut trove)?;
        trove_manager::set_trove(env, &borrower, &trove);
        Ok(accrued)
    }
}

#[contractimpl]
impl IsSortedTroves for TroveProtocol {
    fn sorted_first(env: &Env) -> Option<Address> {
        sorted_troves::first(env)
    }

    fn sorted_last(env: &Env) -> Option<Address> {
        sorted_troves::last(env)
    }

    fn sorted_next(env: &Env, id: Address) -> Option<Address> {
        sorted_troves::next(env, &id)
    }

    fn sorted_prev(env: &Env, id: Address) -> Option<Address> {
        sorted_troves::prev(env, &id)
    }

    fn sorted_size(env: &Env) -> u32 {
        sorted_troves::size(env)
    }

    fn sorted_contains(env: &Env, id: Address) -> bool {
        sorted_troves::contains(env, &id)
    }

    fn sorted_nicr(env: &Env, id: Address) -> Option<i128> {
        sorted_troves::nicr(env, &id)
    }

    fn valid_insert_position(
        env: &Env,
        nicr: i128,
        prev: Option<Address>,
        next: Option<Address>,
    ) -> bool {
        sorted_troves::valid_insert_position(env, nicr, &prev, &next)
    }

    fn find_insert_position(
        env: &Env,
        nicr: i128,
        prev_hint: Option<Address>,
        next_hint: Option<Address>,
    ) -> (Option<Address>, Option<Address>) {
        sorted_troves::find_insert_position(env, nicr, prev_hint, next_hint)
    }
}

#[contractimpl]
impl IsGovernance for TroveProtocol {
    fn propose_parameter(
        env: &Env,
        caller: Address,
        param: GovernedParam,
        value: i128,
    ) -> Result<(), Error> {
        Self::require_admin(env, &caller)?;
        governance::propose(env, param, value)
    }

    fn approve_parameter(env: &Env, caller: Address, param: GovernedParam) -> Result<i128, Error> {
        Self::require_admin(env, &caller)?;
        governance::approve(env, param)
    }

    fn cancel_proposal(env: &Env, caller: Address, param: GovernedParam) -> Result<(), Error> {
        Self::require_admin(env, &caller)?;
        governance::cancel(env, param)
    }

    fn get_parameter(env: &Env, param: GovernedParam) -> Result<i128, Error> {
        governance::get_parameter(env, param)
    }

    fn get_parameter_state(env: &Env, param: GovernedParam) -> ParamState {
        governance::get_param_state(env, param)
    }

    fn set_fee_recipient(env: &Env, caller: Address, to: Address) -> Result<(), Error> {
        Self::require_admin(env, &caller)?;
        let mut state = ProtocolStorage::get_state(env);
        state.fee_recipient = to;
        ProtocolStorage::set_state(env, &state);
        Ok(())
    }
}
