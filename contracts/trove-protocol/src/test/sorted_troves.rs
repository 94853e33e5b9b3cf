use soroban_sdk::{Address, Env, testutils::Address as _, vec};

use super::{DECAY_GAP, DECIMAL_PRECISION, ONE, Setup};
use crate::{Error, sorted_troves};

fn walk(env: &Env) -> soroban_sdk::Vec<Address> {
    let mut out = vec![env];
    let mut current = sorted_troves::first(env);
    while let Some(id) = current {
        current = sorted_troves::next(env, &id);
        out.push_back(id);
    }
    out
}

#[test]
fn test_insert_keeps_descending_order() {
    let s = Setup::new();
    let [a, b, c, d] = [0; 4].map(|_| Address::generate(&s.env));

    s.env.as_contract(&s.contract(), || {
        let env = &s.env;
        sorted_troves::insert(env, &a, 300, None, None).unwrap();
        sorted_troves::insert(env, &b, 100, None, None).unwrap();
        sorted_troves::insert(env, &c, 200, None, None).unwrap();
        // Equal keys go after the existing node
        sorted_troves::insert(env, &d, 200, None, None).unwrap();

        assert_eq!(walk(env), vec![env, a.clone(), c.clone(), d.clone(), b.clone()]);
        assert_eq!(sorted_troves::size(env), 4);
        assert_eq!(sorted_troves::first(env), Some(a.clone()));
        assert_eq!(sorted_troves::last(env), Some(b.clone()));
        assert_eq!(sorted_troves::prev(env, &a), None);
        assert_eq!(sorted_troves::prev(env, &b), Some(d.clone()));
        assert_eq!(sorted_troves::nicr(env, &c), Some(200));

        assert_eq!(
            sorted_troves::insert(env, &a, 50, None, None),
            Err(Error::NodeAlreadyExists)
        );
        let e = Address::generate(env);
        assert_eq!(
            sorted_troves::insert(env, &e, 0, None, None),
            Err(Error::InvalidNicr)
        );
    });
}

#[test]
fn test_insert_position_and_hints() {
    let s = Setup::new();
    let [a, b, c, stranger] = [0; 4].map(|_| Address::generate(&s.env));

    s.env.as_contract(&s.contract(), || {
        let env = &s.env;
        assert!(sorted_troves::valid_insert_position(env, 100, &None, &None));
        sorted_troves::insert(env, &a, 300, None, None).unwrap();
        sorted_troves::insert(env, &b, 200, Some(a.clone()), None).unwrap();
        sorted_troves::insert(env, &c, 100, Some(b.clone()), None).unwrap();

        assert!(sorted_troves::valid_insert_position(env, 400, &None, &Some(a.clone())));
        assert!(sorted_troves::valid_insert_position(env, 150, &Some(b.clone()), &Some(c.clone())));
        assert!(sorted_troves::valid_insert_position(env, 50, &Some(c.clone()), &None));
        assert!(!sorted_troves::valid_insert_position(env, 250, &Some(b.clone()), &Some(c.clone())));
        assert!(!sorted_troves::valid_insert_position(env, 150, &Some(a.clone()), &Some(c.clone())));
        assert!(!sorted_troves::valid_insert_position(env, 100, &None, &None));

        let expected = (Some(b.clone()), Some(c.clone()));
        // Hints on either side, stale or missing hints all resolve to the same spot
        assert_eq!(sorted_troves::find_insert_position(env, 150, Some(a.clone()), None), expected);
        assert_eq!(sorted_troves::find_insert_position(env, 150, None, Some(c.clone())), expected);
        assert_eq!(sorted_troves::find_insert_position(env, 150, Some(c.clone()), Some(a.clone())), expected);
        assert_eq!(sorted_troves::find_insert_position(env, 150, Some(stranger.clone()), None), expected);
        assert_eq!(sorted_troves::find_insert_position(env, 150, None, None), expected);

        assert_eq!(
            sorted_troves::find_insert_position(env, 500, None, None),
            (None, Some(a.clone()))
        );
        assert_eq!(
            sorted_troves::find_insert_position(env, 10, Some(a.clone()), None),
            (Some(c.clone()), None)
        );
    });
}

#[test]
fn test_remove_and_reinsert() {
    let s = Setup::new();
    let [a, b, c, stranger] = [0; 4].map(|_| Address::generate(&s.env));

    s.env.as_contract(&s.contract(), || {
        let env = &s.env;
        sorted_troves::insert(env, &a, 300, None, None).unwrap();
        sorted_troves::insert(env, &b, 200, None, None).unwrap();
        sorted_troves::insert(env, &c, 100, None, None).unwrap();

        sorted_troves::remove(env, &b).unwrap();
        assert_eq!(walk(env), vec![env, a.clone(), c.clone()]);
        assert_eq!(sorted_troves::next(env, &a), Some(c.clone()));
        assert_eq!(sorted_troves::prev(env, &c), Some(a.clone()));
        assert!(!sorted_troves::contains(env, &b));
        assert_eq!(sorted_troves::remove(env, &stranger), Err(Error::NodeNotFound));

        sorted_troves::re_insert(env, &c, 400, None, None).unwrap();
        assert_eq!(walk(env), vec![env, c.clone(), a.clone()]);
        assert_eq!(sorted_troves::last(env), Some(a.clone()));
        assert_eq!(sorted_troves::re_insert(env, &a, 0, None, None), Err(Error::InvalidNicr));

        sorted_troves::remove(env, &c).unwrap();
        sorted_troves::remove(env, &a).unwrap();
        assert_eq!(sorted_troves::size(env), 0);
        assert_eq!(sorted_troves::first(env), None);
        assert_eq!(sorted_troves::last(env), None);
    });
}

#[test]
fn test_troves_reorder_on_adjustment() {
    let s = Setup::new();
    let a = s.open(1_000 * ONE, 400 * ONE);
    let b = s.open(600 * ONE, 200 * ONE);
    let c = s.open(2_000 * ONE, 500 * ONE);
    assert_eq!(s.protocol.sorted_first(), Some(c.clone()));
    assert_eq!(s.protocol.sorted_last(), Some(a.clone()));
    assert_eq!(s.protocol.sorted_next(&c), Some(b.clone()));

    // 1000 * 1e20 / 410
    assert_eq!(s.protocol.sorted_nicr(&a), Some(243_902_439_024_390_243_902));
    assert_eq!(
        s.protocol.sorted_nicr(&a),
        Some(s.protocol.get_nominal_icr(&a))
    );

    // Push A to the top, using hints computed off-chain
    s.collateral_admin.mint(&a, &(2_000 * ONE));
    let new_nicr = 3_000 * ONE * 100_000_000_000_000_000_000 / (410 * ONE);
    let (prev, next) = s.protocol.find_insert_position(&new_nicr, &None, &Some(c.clone()));
    assert_eq!((prev.clone(), next.clone()), (None, Some(c.clone())));
    s.protocol.add_collateral(&a, &(2_000 * ONE), &prev, &next);
    assert_eq!(s.protocol.sorted_first(), Some(a.clone()));
    assert_eq!(s.protocol.sorted_last(), Some(b.clone()));

    // Closing takes the node out
    s.advance(DECAY_GAP);
    s.protocol.close_trove(&b);
    assert!(!s.protocol.sorted_contains(&b));
    assert_eq!(s.protocol.sorted_size(), 2);
    assert_eq!(s.protocol.sorted_prev(&c), Some(a.clone()));

    let stranger = s.user_with_collateral(1_000 * ONE);
    s.protocol.open_trove(
        &stranger,
        &(1_000 * ONE),
        &(200 * ONE),
        &DECIMAL_PRECISION,
        &Some(Address::generate(&s.env)),
        &None,
    );
    assert_eq!(s.protocol.sorted_size(), 3);
}
