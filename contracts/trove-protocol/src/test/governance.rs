use soroban_sdk::{Address, testutils::Address as _};

use super::{DECAY_GAP, DECIMAL_PRECISION, MIN_NET_DEBT, ONE, Setup};
use crate::{Error, GovernedParam, ParamState, PendingChange};

const DELAY: u64 = 7 * 24 * 60 * 60;

#[test]
fn test_parameters_seeded_from_config() {
    let s = Setup::new();
    assert_eq!(s.protocol.get_parameter(&GovernedParam::MinNetDebt), MIN_NET_DEBT);
    assert_eq!(s.protocol.get_parameter(&GovernedParam::BorrowingRate), 0);
    assert_eq!(
        s.protocol.get_parameter(&GovernedParam::RedemptionRate),
        5_000_000_000_000_000
    );
    assert_eq!(s.protocol.get_parameter(&GovernedParam::InterestRate), 0);
    assert_eq!(
        s.protocol.get_parameter_state(&GovernedParam::RefinancingFeePercentage),
        ParamState::Active(0)
    );
}

#[test]
fn test_propose_and_approve_after_delay() {
    let s = Setup::new();
    let param = GovernedParam::MinNetDebt;
    let proposed_at = s.env.ledger().timestamp();
    s.protocol.propose_parameter(&s.admin, &param, &(200 * ONE));

    // Readers keep the old value while the change is pending
    assert_eq!(s.protocol.get_parameter(&param), MIN_NET_DEBT);
    assert_eq!(
        s.protocol.get_parameter_state(&param),
        ParamState::Proposed(PendingChange {
            active: Some(MIN_NET_DEBT),
            value: 200 * ONE,
            proposed_at,
        })
    );

    s.advance(DELAY - 1);
    let result = s.protocol.try_approve_parameter(&s.admin, &param);
    assert_eq!(result.unwrap_err().unwrap(), Error::GovernanceDelayNotElapsed);

    s.advance(1);
    assert_eq!(s.protocol.approve_parameter(&s.admin, &param), 200 * ONE);
    assert_eq!(s.protocol.get_parameter(&param), 200 * ONE);
    assert_eq!(s.protocol.get_parameter_state(&param), ParamState::Active(200 * ONE));

    let result = s.protocol.try_approve_parameter(&s.admin, &param);
    assert_eq!(result.unwrap_err().unwrap(), Error::NoPendingProposal);

    // The new minimum applies to new troves
    s.advance(DECAY_GAP);
    let borrower = s.user_with_collateral(1_000 * ONE);
    let result = s.protocol.try_open_trove(
        &borrower,
        &(1_000 * ONE),
        &(150 * ONE),
        &DECIMAL_PRECISION,
        &None,
        &None,
    );
    assert_eq!(result.unwrap_err().unwrap(), Error::DebtBelowMinimum);
}

#[test]
fn test_reproposal_restarts_the_clock() {
    let s = Setup::new();
    let param = GovernedParam::InterestRate;
    s.protocol.propose_parameter(&s.admin, &param, &300);
    s.advance(DELAY - 10);
    s.protocol.propose_parameter(&s.admin, &param, &400);
    s.advance(10);

    let result = s.protocol.try_approve_parameter(&s.admin, &param);
    assert_eq!(result.unwrap_err().unwrap(), Error::GovernanceDelayNotElapsed);
    assert_eq!(s.protocol.get_parameter(&param), 0);

    s.advance(DELAY);
    assert_eq!(s.protocol.approve_parameter(&s.admin, &param), 400);
}

#[test]
fn test_cancel_keeps_active_value() {
    let s = Setup::new();
    let param = GovernedParam::RedemptionRate;
    s.protocol
        .propose_parameter(&s.admin, &param, &(DECIMAL_PRECISION / 10));
    s.protocol.cancel_proposal(&s.admin, &param);
    assert_eq!(
        s.protocol.get_parameter_state(&param),
        ParamState::Active(5_000_000_000_000_000)
    );

    let result = s.protocol.try_cancel_proposal(&s.admin, &param);
    assert_eq!(result.unwrap_err().unwrap(), Error::NoPendingProposal);
    s.advance(DELAY);
    let result = s.protocol.try_approve_parameter(&s.admin, &param);
    assert_eq!(result.unwrap_err().unwrap(), Error::NoPendingProposal);
}

#[test]
fn test_governance_validation_and_access() {
    let s = Setup::new();
    let stranger = Address::generate(&s.env);

    let result = s
        .protocol
        .try_propose_parameter(&stranger, &GovernedParam::InterestRate, &100);
    assert_eq!(result.unwrap_err().unwrap(), Error::Unauthorized);
    let result = s
        .protocol
        .try_approve_parameter(&stranger, &GovernedParam::InterestRate);
    assert_eq!(result.unwrap_err().unwrap(), Error::Unauthorized);

    let cases = [
        (GovernedParam::RefinancingFeePercentage, 101),
        (GovernedParam::RefinancingFeePercentage, -1),
        (GovernedParam::MinNetDebt, 0),
        (GovernedParam::BorrowingRate, DECIMAL_PRECISION + 1),
        (GovernedParam::RedemptionRate, -1),
        (GovernedParam::InterestRate, 10_001),
    ];
    for (param, value) in cases {
        let result = s.protocol.try_propose_parameter(&s.admin, &param, &value);
        assert_eq!(result.unwrap_err().unwrap(), Error::InvalidParameter);
    }
    s.protocol
        .propose_parameter(&s.admin, &GovernedParam::InterestRate, &10_000);
}

#[test]
fn test_set_fee_recipient() {
    let s = Setup::new();
    let recipient = Address::generate(&s.env);

    let result = s.protocol.try_set_fee_recipient(&recipient, &recipient);
    assert_eq!(result.unwrap_err().unwrap(), Error::Unauthorized);

    s.protocol.set_fee_recipient(&s.admin, &recipient);
    assert_eq!(s.protocol.get_config().fee_recipient, recipient);
    assert_eq!(s.protocol.admin(), s.admin);
}
