use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Amount must be strictly positive
    ValueNotPositive = 1,

    /// Borrower already has an active trove
    TroveAlreadyActive = 2,

    /// Trove does not exist or is closed
    TroveNotActive = 3,

    /// Individual collateralization ratio would fall below the minimum (MCR)
    InsufficientCollateralization = 4,

    /// In recovery mode new or increased debt needs ICR at or above the critical ratio
    IcrBelowCcr = 5,

    /// Operation would push the total collateralization ratio below the critical ratio
    TcrBelowCcr = 6,

    /// In recovery mode an adjustment may not lower the trove's ICR
    IcrDecreasedInRecoveryMode = 7,

    /// Collateral cannot be withdrawn in recovery mode
    CollateralWithdrawalInRecoveryMode = 8,

    /// Net debt below the governed minimum
    DebtBelowMinimum = 9,

    /// Max fee percentage must be between the fee floor and 100%
    MaxFeePercentageOutOfBounds = 10,

    /// Fee exceeded the caller's accepted maximum
    FeeExceedsMaximum = 11,

    /// Insufficient balance
    InsufficientBalance = 12,

    /// Repayment amount exceeds the trove's repayable debt
    RepaymentExceedsDebt = 13,

    /// Withdrawal exceeds the trove's collateral
    WithdrawalExceedsCollateral = 14,

    /// Adjustment must change something, and cannot move the same balance both ways
    InvalidAdjustment = 15,

    /// Debt would exceed the trove's maximum borrowing capacity
    ExceedsMaxBorrowingCapacity = 16,

    /// Depositor has no stability pool deposit
    NoStabilityDeposit = 17,

    /// Withdrawal exceeds the compounded deposit
    InsufficientDeposit = 18,

    /// Stability pool withdrawals are blocked while an undercollateralized trove exists
    UndercollateralizedTroves = 19,

    /// Depositor has no collateral gain to move
    NoCollateralGain = 20,

    /// No trove in the batch was liquidatable
    NothingToLiquidate = 21,

    /// The last trove in the system cannot be closed or liquidated
    OnlyOneTroveInSystem = 22,

    /// Redemptions are disabled while TCR is below MCR
    TcrBelowMcr = 23,

    /// Nothing could be redeemed
    UnableToRedeem = 24,

    /// Owner has no surplus collateral to claim
    NoCollateralToClaim = 25,

    /// Caller is not the protocol admin
    Unauthorized = 26,

    /// Governed parameter value out of range
    InvalidParameter = 27,

    /// No proposal is pending for this parameter
    NoPendingProposal = 28,

    /// Governance delay has not elapsed since the proposal
    GovernanceDelayNotElapsed = 29,

    /// Governed parameter has never been approved
    ParameterNotSet = 30,

    /// Deployment configuration is inconsistent
    InvalidConfig = 31,

    /// Failed to fetch price data from the Oracle
    PriceUnavailable = 32,

    /// Failed to fetch decimals from the Oracle
    OracleDecimalsFetchFailed = 33,

    /// Oracle returned a non-positive price
    InvalidPrice = 34,

    /// Collateral token transfer failed
    CollateralTransferFailed = 35,

    /// Sorted list insertion key must be positive
    InvalidNicr = 36,

    /// Trove already present in the sorted list
    NodeAlreadyExists = 37,

    /// Trove not present in the sorted list
    NodeNotFound = 38,

    /// live_until_ledger must be greater than or equal to the current ledger number
    InvalidLedgerSequence = 39,

    /// Insufficient allowance; spender must call `approve` first
    InsufficientAllowance = 40,

    /// Cannot transfer to self
    CannotTransferToSelf = 41,

    /// Arithmetic overflow or underflow occurred
    ArithmeticError = 42,
}
