use soroban_sdk::{Address, String, Symbol, testutils::Address as _};

use super::{DECAY_GAP, DECIMAL_PRECISION, FEED_ONE, GAS_COMPENSATION, ONE, Setup, default_config};
use crate::{Error, TroveProtocol, TroveProtocolClient, TroveStatus};

#[test]
fn test_open_trove_records_principal_and_gas_reserve() {
    let s = Setup::new();
    let borrower = s.open(1_000 * ONE, 400 * ONE);

    let trove = s.protocol.get_trove(&borrower);
    assert_eq!(trove.status, TroveStatus::Active);
    assert_eq!(trove.principal, 410 * ONE);
    assert_eq!(trove.collateral, 1_000 * ONE);
    assert_eq!(trove.stake, 1_000 * ONE);
    assert_eq!(trove.interest_owed, 0);

    assert_eq!(s.stable_balance(&borrower), 400 * ONE);
    assert_eq!(s.stable_balance(&s.contract()), GAS_COMPENSATION);
    assert_eq!(s.protocol.total_supply(), 410 * ONE);
    assert_eq!(s.collateral.balance(&s.contract()), 1_000 * ONE);
    assert_eq!(s.collateral.balance(&borrower), 0);

    assert_eq!(s.protocol.sorted_size(), 1);
    assert_eq!(s.protocol.sorted_first(), Some(borrower.clone()));
    // 1000 / 410 at a price of 1.0
    assert_eq!(
        s.protocol.get_current_icr(&borrower, &DECIMAL_PRECISION),
        2_439_024_390_243_902_439
    );
    let totals = s.protocol.get_system_totals();
    assert_eq!(totals.entire_collateral, 1_000 * ONE);
    assert_eq!(totals.entire_debt, 410 * ONE);
    assert_eq!(totals.state.gas_pool, GAS_COMPENSATION);
}

#[test]
fn test_open_trove_validation() {
    let s = Setup::new();
    let borrower = s.user_with_collateral(10_000 * ONE);

    let result = s
        .protocol
        .try_open_trove(&borrower, &(1_000 * ONE), &(50 * ONE), &DECIMAL_PRECISION, &None, &None);
    assert_eq!(result.unwrap_err().unwrap(), Error::DebtBelowMinimum);

    let result = s
        .protocol
        .try_open_trove(&borrower, &(0), &(500 * ONE), &DECIMAL_PRECISION, &None, &None);
    assert_eq!(result.unwrap_err().unwrap(), Error::ValueNotPositive);

    // 110 / 110 < MCR
    let result = s
        .protocol
        .try_open_trove(&borrower, &(110 * ONE), &(100 * ONE), &DECIMAL_PRECISION, &None, &None);
    assert_eq!(result.unwrap_err().unwrap(), Error::InsufficientCollateralization);

    // ICR of 1.2 is fine on its own but would leave the system below CCR
    let result = s
        .protocol
        .try_open_trove(&borrower, &(132 * ONE), &(100 * ONE), &DECIMAL_PRECISION, &None, &None);
    assert_eq!(result.unwrap_err().unwrap(), Error::TcrBelowCcr);

    s.protocol
        .open_trove(&borrower, &(1_000 * ONE), &(400 * ONE), &DECIMAL_PRECISION, &None, &None);
    let result = s
        .protocol
        .try_open_trove(&borrower, &(1_000 * ONE), &(400 * ONE), &DECIMAL_PRECISION, &None, &None);
    assert_eq!(result.unwrap_err().unwrap(), Error::TroveAlreadyActive);
}

#[test]
fn test_open_trove_without_price_fails() {
    let s = Setup::new();
    let borrower = s.user_with_collateral(1_000 * ONE);
    // The feed has never quoted BTC
    let protocol_id = s.env.register(
        TroveProtocol,
        (
            s.admin.clone(),
            s.collateral.address.clone(),
            s.feed.address.clone(),
            Symbol::new(&s.env, "BTC"),
            s.fee_recipient.clone(),
            String::from_str(&s.env, "Trove Dollar"),
            String::from_str(&s.env, "TUSD"),
            7u32,
            default_config(),
        ),
    );
    let protocol = TroveProtocolClient::new(&s.env, &protocol_id);

    let result = protocol.try_open_trove(
        &borrower,
        &(1_000 * ONE),
        &(400 * ONE),
        &DECIMAL_PRECISION,
        &None,
        &None,
    );
    assert_eq!(result.unwrap_err().unwrap(), Error::PriceUnavailable);
}

#[test]
fn test_adjust_trove_collateral_and_debt() {
    let s = Setup::new();
    let _other = s.open(1_000 * ONE, 400 * ONE);
    let borrower = s.open(1_000 * ONE, 400 * ONE);
    s.advance(DECAY_GAP);

    s.collateral_admin.mint(&borrower, &(100 * ONE));
    s.protocol.add_collateral(&borrower, &(100 * ONE), &None, &None);
    assert_eq!(s.protocol.get_trove(&borrower).collateral, 1_100 * ONE);

    s.protocol.withdraw_collateral(&borrower, &(300 * ONE), &None, &None);
    assert_eq!(s.protocol.get_trove(&borrower).collateral, 800 * ONE);
    assert_eq!(s.collateral.balance(&borrower), 300 * ONE);

    s.protocol
        .withdraw_debt(&borrower, &(100 * ONE), &DECIMAL_PRECISION, &None, &None);
    assert_eq!(s.protocol.get_trove(&borrower).principal, 510 * ONE);
    assert_eq!(s.stable_balance(&borrower), 500 * ONE);

    s.protocol.repay_debt(&borrower, &(200 * ONE), &None, &None);
    assert_eq!(s.protocol.get_trove(&borrower).principal, 310 * ONE);
    assert_eq!(s.stable_balance(&borrower), 300 * ONE);

    let totals = s.protocol.get_system_totals();
    assert_eq!(totals.entire_collateral, 1_800 * ONE);
    assert_eq!(totals.entire_debt, 720 * ONE);
}

#[test]
fn test_adjust_trove_rejections() {
    let s = Setup::new();
    let _other = s.open(1_000 * ONE, 400 * ONE);
    let borrower = s.open(1_000 * ONE, 400 * ONE);

    let result = s.protocol.try_adjust_trove(
        &borrower,
        &DECIMAL_PRECISION,
        &(10 * ONE),
        &(10 * ONE),
        &0,
        &0,
        &None,
        &None,
    );
    assert_eq!(result.unwrap_err().unwrap(), Error::InvalidAdjustment);

    let result =
        s.protocol
            .try_adjust_trove(&borrower, &DECIMAL_PRECISION, &0, &0, &0, &0, &None, &None);
    assert_eq!(result.unwrap_err().unwrap(), Error::InvalidAdjustment);

    let result = s
        .protocol
        .try_withdraw_collateral(&borrower, &(600 * ONE), &None, &None);
    assert_eq!(result.unwrap_err().unwrap(), Error::InsufficientCollateralization);

    let result = s
        .protocol
        .try_withdraw_collateral(&borrower, &(1_001 * ONE), &None, &None);
    assert_eq!(result.unwrap_err().unwrap(), Error::WithdrawalExceedsCollateral);

    // Only debt above the gas compensation can be repaid
    let result = s.protocol.try_repay_debt(&borrower, &(401 * ONE), &None, &None);
    assert_eq!(result.unwrap_err().unwrap(), Error::RepaymentExceedsDebt);

    // Net debt would fall to 99
    let result = s.protocol.try_repay_debt(&borrower, &(301 * ONE), &None, &None);
    assert_eq!(result.unwrap_err().unwrap(), Error::DebtBelowMinimum);

    let stranger = Address::generate(&s.env);
    let result = s
        .protocol
        .try_repay_debt(&stranger, &(10 * ONE), &None, &None);
    assert_eq!(result.unwrap_err().unwrap(), Error::TroveNotActive);
}

#[test]
fn test_borrowing_capacity_is_refreshed_on_collateral_change() {
    let s = Setup::new();
    let _other = s.open(1_000 * ONE, 400 * ONE);
    let borrower = s.open(1_000 * ONE, 400 * ONE);
    // 1000 * 1.0 / 1.1
    assert_eq!(s.protocol.get_trove(&borrower).max_borrowing_capacity, 9_090_909_090);

    s.advance(DECAY_GAP);
    s.set_price(2 * FEED_ONE);
    // ICR would be fine at the new price but capacity was fixed at the old one
    let result =
        s.protocol
            .try_withdraw_debt(&borrower, &(600 * ONE), &DECIMAL_PRECISION, &None, &None);
    assert_eq!(result.unwrap_err().unwrap(), Error::ExceedsMaxBorrowingCapacity);

    s.collateral_admin.mint(&borrower, &ONE);
    s.protocol.add_collateral(&borrower, &ONE, &None, &None);
    assert_eq!(
        s.protocol.get_trove(&borrower).max_borrowing_capacity,
        18_200_000_000
    );
    s.protocol
        .withdraw_debt(&borrower, &(600 * ONE), &DECIMAL_PRECISION, &None, &None);
    assert_eq!(s.protocol.get_trove(&borrower).principal, 1_010 * ONE);
}

#[test]
fn test_recovery_mode_blocks_collateral_withdrawal() {
    let s = Setup::new();
    let a = s.open(1_000 * ONE, 600 * ONE);
    let _b = s.open(300 * ONE, 240 * ONE);
    // TCR = 1300 * 0.95 / 860 < 1.5
    s.set_price(95 * FEED_ONE / 100);
    assert!(s.protocol.check_recovery_mode(&s.protocol.get_price()));

    let result = s.protocol.try_withdraw_collateral(&a, &ONE, &None, &None);
    assert_eq!(
        result.unwrap_err().unwrap(),
        Error::CollateralWithdrawalInRecoveryMode
    );
    let result = s.protocol.try_close_trove(&a);
    assert_eq!(result.unwrap_err().unwrap(), Error::TcrBelowCcr);

    // Borrowing more lowers the ICR
    let result =
        s.protocol
            .try_withdraw_debt(&a, &(10 * ONE), &DECIMAL_PRECISION, &None, &None);
    assert_eq!(
        result.unwrap_err().unwrap(),
        Error::IcrDecreasedInRecoveryMode
    );

    // Topping up is always allowed
    s.collateral_admin.mint(&a, &(100 * ONE));
    s.protocol.add_collateral(&a, &(100 * ONE), &None, &None);
}

#[test]
fn test_close_trove_returns_collateral_and_burns_reserve() {
    let s = Setup::new();
    let _other = s.open(1_000 * ONE, 400 * ONE);
    let borrower = s.open(500 * ONE, 200 * ONE);

    s.protocol.close_trove(&borrower);

    assert_eq!(
        s.protocol.get_trove_status(&borrower),
        TroveStatus::ClosedByOwner
    );
    assert_eq!(s.protocol.get_trove(&borrower).principal, 0);
    assert_eq!(s.stable_balance(&borrower), 0);
    assert_eq!(s.collateral.balance(&borrower), 500 * ONE);
    assert_eq!(s.stable_balance(&s.contract()), GAS_COMPENSATION);
    assert_eq!(s.protocol.sorted_size(), 1);
    assert!(!s.protocol.sorted_contains(&borrower));

    let totals = s.protocol.get_system_totals();
    assert_eq!(totals.entire_collateral, 1_000 * ONE);
    assert_eq!(totals.entire_debt, 410 * ONE);
    assert_eq!(totals.state.gas_pool, GAS_COMPENSATION);
}

#[test]
fn test_close_last_trove_fails() {
    let s = Setup::new();
    let borrower = s.open(1_000 * ONE, 400 * ONE);
    let result = s.protocol.try_close_trove(&borrower);
    assert_eq!(result.unwrap_err().unwrap(), Error::OnlyOneTroveInSystem);
}

#[test]
fn test_close_trove_requires_full_repayment() {
    let s = Setup::new();
    let _other = s.open(1_000 * ONE, 400 * ONE);
    let borrower = s.open(500 * ONE, 200 * ONE);
    let sink = Address::generate(&s.env);
    s.protocol.transfer(&borrower, &sink, &ONE);

    let result = s.protocol.try_close_trove(&borrower);
    assert_eq!(result.unwrap_err().unwrap(), Error::InsufficientBalance);
}

#[test]
fn test_reopen_after_close() {
    let s = Setup::new();
    let _other = s.open(1_000 * ONE, 400 * ONE);
    let borrower = s.open(500 * ONE, 200 * ONE);
    s.protocol.close_trove(&borrower);

    s.advance(DECAY_GAP);
    s.protocol
        .open_trove(&borrower, &(500 * ONE), &(150 * ONE), &DECIMAL_PRECISION, &None, &None);
    let trove = s.protocol.get_trove(&borrower);
    assert_eq!(trove.status, TroveStatus::Active);
    assert_eq!(trove.principal, 160 * ONE);
}
