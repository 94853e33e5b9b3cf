use soroban_sdk::{Address, Env, contracttype};

use crate::{
    Error,
    storage::{self, DataKey, SORTED},
};

/// Links followed from a hint before giving up and scanning from the head
pub const MAX_HINT_WALK: u32 = 10;

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SortedTrovesState {
    pub head: Option<Address>,
    pub tail: Option<Address>,
    pub size: u32,
}

/// List node. `nicr` is the key the trove was last (re)inserted with.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    pub nicr: i128,
    pub prev: Option<Address>,
    pub next: Option<Address>,
}

/// Read-only navigation of the list, ordered by nominal ICR from highest to lowest.
pub trait IsSortedTroves {
    fn sorted_first(env: &Env) -> Option<Address>;
    fn sorted_last(env: &Env) -> Option<Address>;
    fn sorted_next(env: &Env, id: Address) -> Option<Address>;
    fn sorted_prev(env: &Env, id: Address) -> Option<Address>;
    fn sorted_size(env: &Env) -> u32;
    fn sorted_contains(env: &Env, id: Address) -> bool;
    fn sorted_nicr(env: &Env, id: Address) -> Option<i128>;
    /// Whether `(prev, next)` is an exact insertion point for `nicr`
    fn valid_insert_position(
        env: &Env,
        nicr: i128,
        prev: Option<Address>,
        next: Option<Address>,
    ) -> bool;
    /// Resolve hints into an exact `(prev, next)` insertion point for `nicr`
    fn find_insert_position(
        env: &Env,
        nicr: i128,
        prev_hint: Option<Address>,
        next_hint: Option<Address>,
    ) -> (Option<Address>, Option<Address>);
}

pub fn get_state(env: &Env) -> SortedTrovesState {
    env.storage().instance().get(&SORTED).unwrap_or_default()
}

fn set_state(env: &Env, state: &SortedTrovesState) {
    env.storage().instance().set(&SORTED, state);
}

pub fn node(env: &Env, id: &Address) -> Option<Node> {
    storage::get_persistent(env, &DataKey::Node(id.clone()))
}

fn set_node(env: &Env, id: &Address, node: &Node) {
    storage::set_persistent(env, &DataKey::Node(id.clone()), node);
}

pub fn contains(env: &Env, id: &Address) -> bool {
    env.storage().persistent().has(&DataKey::Node(id.clone()))
}

pub fn size(env: &Env) -> u32 {
    get_state(env).size
}

pub fn first(env: &Env) -> Option<Address> {
    get_state(env).head
}

pub fn last(env: &Env) -> Option<Address> {
    get_state(env).tail
}

pub fn next(env: &Env, id: &Address) -> Option<Address> {
    node(env, id).and_then(|n| n.next)
}

pub fn prev(env: &Env, id: &Address) -> Option<Address> {
    node(env, id).and_then(|n| n.prev)
}

pub fn nicr(env: &Env, id: &Address) -> Option<i128> {
    node(env, id).map(|n| n.nicr)
}

fn key(env: &Env, id: &Address) -> i128 {
    nicr(env, id).unwrap_or(0)
}

/// Equal keys keep insertion order, so a new node goes after every node with the same key.
pub fn valid_insert_position(
    env: &Env,
    nicr: i128,
    prev: &Option<Address>,
    next: &Option<Address>,
) -> bool {
    let state = get_state(env);
    match (prev, next) {
        (None, None) => state.size == 0,
        (None, Some(n)) => state.head.as_ref() == Some(n) && nicr > key(env, n),
        (Some(p), None) => state.tail.as_ref() == Some(p) && key(env, p) >= nicr,
        (Some(p), Some(n)) => {
            self::next(env, p).as_ref() == Some(n) && key(env, p) >= nicr && nicr > key(env, n)
        }
    }
}

fn descend_from(env: &Env, nicr: i128, start: Address) -> Option<(Option<Address>, Option<Address>)> {
    let mut prev = start;
    for _ in 0..MAX_HINT_WALK {
        let next = next(env, &prev);
        match next {
            Some(n) if key(env, &n) >= nicr => prev = n,
            _ => return Some((Some(prev), next)),
        }
    }
    None
}

fn ascend_from(env: &Env, nicr: i128, start: Address) -> Option<(Option<Address>, Option<Address>)> {
    let mut next = start;
    for _ in 0..MAX_HINT_WALK {
        let prev = prev(env, &next);
        match prev {
            Some(p) if key(env, &p) < nicr => next = p,
            _ => return Some((prev, Some(next))),
        }
    }
    None
}

fn scan_from_head(env: &Env, nicr: i128) -> (Option<Address>, Option<Address>) {
    let Some(head) = first(env) else {
        return (None, None);
    };
    if nicr > key(env, &head) {
        return (None, Some(head));
    }
    let mut prev = head;
    loop {
        let next = next(env, &prev);
        match next {
            Some(n) if key(env, &n) >= nicr => prev = n,
            _ => return (Some(prev), next),
        }
    }
}

pub fn find_insert_position(
    env: &Env,
    nicr: i128,
    prev_hint: Option<Address>,
    next_hint: Option<Address>,
) -> (Option<Address>, Option<Address>) {
    // A hint is only usable if it sits on the correct side of `nicr`
    let prev_hint = prev_hint.filter(|p| self::nicr(env, p).is_some_and(|k| k >= nicr));
    let next_hint = next_hint.filter(|n| self::nicr(env, n).is_some_and(|k| nicr > k));

    let walked = match (prev_hint, next_hint) {
        (Some(p), _) => descend_from(env, nicr, p),
        (None, Some(n)) => ascend_from(env, nicr, n),
        (None, None) => None,
    };
    walked.unwrap_or_else(|| scan_from_head(env, nicr))
}

pub fn insert(
    env: &Env,
    id: &Address,
    nicr: i128,
    prev_hint: Option<Address>,
    next_hint: Option<Address>,
) -> Result<(), Error> {
    if contains(env, id) {
        return Err(Error::NodeAlreadyExists);
    }
    if nicr <= 0 {
        return Err(Error::InvalidNicr);
    }
    let (prev, next) = if valid_insert_position(env, nicr, &prev_hint, &next_hint) {
        (prev_hint, next_hint)
    } else {
        find_insert_position(env, nicr, prev_hint, next_hint)
    };

    let mut state = get_state(env);
    match &prev {
        Some(p) => {
            let mut prev_node = node(env, p).ok_or(Error::NodeNotFound)?;
            prev_node.next = Some(id.clone());
            set_node(env, p, &prev_node);
        }
        None => state.head = Some(id.clone()),
    }
    match &next {
        Some(n) => {
            let mut next_node = node(env, n).ok_or(Error::NodeNotFound)?;
            next_node.prev = Some(id.clone());
            set_node(env, n, &next_node);
        }
        None => state.tail = Some(id.clone()),
    }
    set_node(env, id, &Node { nicr, prev, next });
    state.size += 1;
    set_state(env, &state);
    Ok(())
}

pub fn remove(env: &Env, id: &Address) -> Result<(), Error> {
    let removed = node(env, id).ok_or(Error::NodeNotFound)?;
    let mut state = get_state(env);
    match &removed.prev {
        Some(p) => {
            let mut prev_node = node(env, p).ok_or(Error::NodeNotFound)?;
            prev_node.next = removed.next.clone();
            set_node(env, p, &prev_node);
        }
        None => state.head = removed.next.clone(),
    }
    match &removed.next {
        Some(n) => {
            let mut next_node = node(env, n).ok_or(Error::NodeNotFound)?;
            next_node.prev = removed.prev.clone();
            set_node(env, n, &next_node);
        }
        None => state.tail = removed.prev.clone(),
    }
    storage::remove_persistent(env, &DataKey::Node(id.clone()));
    state.size -= 1;
    set_state(env, &state);
    Ok(())
}

pub fn re_insert(
    env: &Env,
    id: &Address,
    new_nicr: i128,
    prev_hint: Option<Address>,
    next_hint: Option<Address>,
) -> Result<(), Error> {
    if new_nicr <= 0 {
        return Err(Error::InvalidNicr);
    }
    remove(env, id)?;
    insert(env, id, new_nicr, prev_hint, next_hint)
}
