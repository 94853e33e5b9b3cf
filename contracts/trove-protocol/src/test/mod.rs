#![cfg(test)]
extern crate std;

mod borrower_operations;
mod governance;
mod sorted_troves;

use price_feed::{Asset as FeedAsset, PriceFeed, PriceFeedClient};
use soroban_sdk::{
    Address, Env, String, Symbol, Vec,
    testutils::{Address as _, Ledger},
    token::{Client as TokenClient, StellarAssetClient},
};

use crate::{ProtocolConfig, TroveProtocol, TroveProtocolClient};

/// One whole unit of a 7-decimal token
pub const ONE: i128 = 10_000_000;
/// 1.0 in the feed's 14 decimals
pub const FEED_ONE: i128 = 100_000_000_000_000;
pub const DECIMAL_PRECISION: i128 = 1_000_000_000_000_000_000;
pub const GAS_COMPENSATION: i128 = 10 * ONE;
pub const MIN_NET_DEBT: i128 = 100 * ONE;
/// Long enough for the base rate to decay to zero
pub const DECAY_GAP: u64 = 100 * 24 * 60 * 60;
pub const START_TIME: u64 = 1_000_000;

pub fn default_config() -> ProtocolConfig {
    ProtocolConfig {
        mcr: 1_100_000_000_000_000_000,
        ccr: 1_500_000_000_000_000_000,
        gas_compensation: GAS_COMPENSATION,
        min_net_debt: MIN_NET_DEBT,
        borrowing_rate: 0,
        redemption_rate: 5_000_000_000_000_000,
        interest_rate: 0,
        refinancing_fee_percentage: 0,
    }
}

pub struct Setup<'a> {
    pub env: Env,
    pub protocol: TroveProtocolClient<'a>,
    pub feed: PriceFeedClient<'a>,
    pub collateral: TokenClient<'a>,
    pub collateral_admin: StellarAssetClient<'a>,
    pub admin: Address,
    pub fee_recipient: Address,
}

impl Setup<'_> {
    pub fn new() -> Self {
        Self::with_config(default_config())
    }

    pub fn with_config(config: ProtocolConfig) -> Self {
        let env = Env::default();
        env.mock_all_auths();
        env.cost_estimate().budget().reset_unlimited();
        env.ledger().set_timestamp(START_TIME);

        let admin = Address::generate(&env);
        let fee_recipient = Address::generate(&env);

        let sac = env.register_stellar_asset_contract_v2(admin.clone());
        let collateral = TokenClient::new(&env, &sac.address());
        let collateral_admin = StellarAssetClient::new(&env, &sac.address());

        let xlm = FeedAsset::Other(Symbol::new(&env, "XLM"));
        let usd = FeedAsset::Other(Symbol::new(&env, "USD"));
        let feed_id = env.register(
            PriceFeed,
            (
                admin.clone(),
                Vec::from_array(&env, [xlm, usd.clone()]),
                usd,
                14u32,
                300u32,
            ),
        );
        let feed = PriceFeedClient::new(&env, &feed_id);

        let protocol_id = env.register(
            TroveProtocol,
            (
                admin.clone(),
                sac.address(),
                feed_id.clone(),
                Symbol::new(&env, "XLM"),
                fee_recipient.clone(),
                String::from_str(&env, "Trove Dollar"),
                String::from_str(&env, "TUSD"),
                7u32,
                config,
            ),
        );
        let protocol = TroveProtocolClient::new(&env, &protocol_id);

        let setup = Setup {
            env,
            protocol,
            feed,
            collateral,
            collateral_admin,
            admin,
            fee_recipient,
        };
        setup.set_price(FEED_ONE);
        setup
    }

    /// Publish a collateral price in feed units (14 decimals)
    pub fn set_price(&self, price: i128) {
        let xlm = FeedAsset::Other(Symbol::new(&self.env, "XLM"));
        self.feed
            .set_asset_price(&xlm, &price, &self.env.ledger().timestamp());
    }

    pub fn advance(&self, seconds: u64) {
        let now = self.env.ledger().timestamp();
        self.env.ledger().set_timestamp(now + seconds);
    }

    pub fn user_with_collateral(&self, amount: i128) -> Address {
        let user = Address::generate(&self.env);
        self.collateral_admin.mint(&user, &amount);
        user
    }

    /// Open a trove for a fresh account after letting the base rate decay,
    /// so the borrowing fee is the configured floor.
    pub fn open(&self, collateral: i128, debt: i128) -> Address {
        self.advance(DECAY_GAP);
        let borrower = self.user_with_collateral(collateral);
        self.protocol.open_trove(
            &borrower,
            &collateral,
            &debt,
            &DECIMAL_PRECISION,
            &None,
            &None,
        );
        borrower
    }

    pub fn stable_balance(&self, id: &Address) -> i128 {
        self.protocol.balance(id)
    }

    pub fn contract(&self) -> Address {
        self.protocol.address.clone()
    }
}
