#![cfg(test)]
extern crate std;

use crate::price_feed::{PriceFeed, PriceFeedClient};
use crate::{Asset, PriceData};

use soroban_sdk::{Address, Env, Symbol, Vec, testutils::Address as _};

fn create_price_feed_contract<'a>(e: &Env) -> PriceFeedClient<'a> {
    let asset_xlm = Asset::Other(Symbol::new(e, "XLM"));
    let asset_usd = Asset::Other(Symbol::new(e, "USD"));
    let asset_vec = Vec::from_array(e, [asset_xlm, asset_usd.clone()]);
    let admin = Address::generate(e);
    let contract_id = e.register(PriceFeed, (admin, asset_vec, asset_usd, 14u32, 300u32));
    PriceFeedClient::new(e, &contract_id)
}

#[test]
fn test_price_feed_initialization() {
    let e = Env::default();
    e.mock_all_auths();

    let feed = create_price_feed_contract(&e);

    assert_eq!(feed.assets().len(), 2);
    assert_eq!(feed.base(), Asset::Other(Symbol::new(&e, "USD")));
    assert_eq!(feed.decimals(), 14);
    assert_eq!(feed.resolution(), 300);
}

#[test]
fn test_lastprice_tracks_newest_record() {
    let e = Env::default();
    e.mock_all_auths();

    let feed = create_price_feed_contract(&e);
    let xlm = Asset::Other(Symbol::new(&e, "XLM"));

    assert_eq!(feed.lastprice(&xlm), None);

    feed.set_asset_price(&xlm, &11_000_000_000_000, &1_000);
    feed.set_asset_price(&xlm, &12_500_000_000_000, &1_300);

    assert_eq!(
        feed.lastprice(&xlm),
        Some(PriceData {
            price: 12_500_000_000_000,
            timestamp: 1_300
        })
    );
    assert_eq!(feed.price(&xlm, &1_000).unwrap().price, 11_000_000_000_000);
    assert_eq!(feed.price(&xlm, &1_100), None);

    let history = feed.prices(&xlm, &5).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.get(0).unwrap().timestamp, 1_300);
    assert_eq!(history.get(1).unwrap().timestamp, 1_000);
}

#[test]
fn test_add_assets() {
    let e = Env::default();
    e.mock_all_auths();

    let feed = create_price_feed_contract(&e);
    let btc = Asset::Other(Symbol::new(&e, "BTC"));

    feed.add_assets(&Vec::from_array(&e, [btc.clone()]));
    assert_eq!(feed.assets().len(), 3);

    feed.set_asset_price(&btc, &600_000_000_000_000_000, &10);
    assert_eq!(feed.lastprice(&btc).unwrap().price, 600_000_000_000_000_000);
}

#[test]
fn test_unknown_asset_has_no_price() {
    let e = Env::default();
    e.mock_all_auths();

    let feed = create_price_feed_contract(&e);
    let unknown = Asset::Other(Symbol::new(&e, "NOPE"));

    assert_eq!(feed.lastprice(&unknown), None);
    assert_eq!(feed.prices(&unknown, &3), None);
}

#[test]
#[should_panic(expected = "Error(Contract, #1)")]
fn test_set_price_for_unknown_asset() {
    let e = Env::default();
    e.mock_all_auths();

    let feed = create_price_feed_contract(&e);
    feed.set_asset_price(&Asset::Other(Symbol::new(&e, "NOPE")), &1, &1);
}

#[test]
#[should_panic(expected = "Error(Contract, #2)")]
fn test_add_duplicate_asset() {
    let e = Env::default();
    e.mock_all_auths();

    let feed = create_price_feed_contract(&e);
    feed.add_assets(&Vec::from_array(&e, [Asset::Other(Symbol::new(&e, "XLM"))]));
}

#[test]
#[should_panic(expected = "Error(Contract, #3)")]
fn test_non_positive_price_rejected() {
    let e = Env::default();
    e.mock_all_auths();

    let feed = create_price_feed_contract(&e);
    feed.set_asset_price(&Asset::Other(Symbol::new(&e, "XLM")), &0, &1);
}

#[test]
#[should_panic(expected = "Error(Contract, #4)")]
fn test_out_of_order_price_rejected() {
    let e = Env::default();
    e.mock_all_auths();

    let feed = create_price_feed_contract(&e);
    let xlm = Asset::Other(Symbol::new(&e, "XLM"));
    feed.set_asset_price(&xlm, &100, &50);
    feed.set_asset_price(&xlm, &100, &40);
}

#[test]
#[should_panic]
fn test_set_price_requires_admin_auth() {
    let e = Env::default();

    let feed = create_price_feed_contract(&e);
    feed.set_asset_price(&Asset::Other(Symbol::new(&e, "XLM")), &100, &1);
}
