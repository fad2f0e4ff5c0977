//! Tests for the category domain.

use uuid::Uuid;

use super::*;

#[test]
fn test_lock_ranks_are_distinct_and_ordered() {
    let ranks: Vec<u8> = Category::ALL.iter().map(|c| c.lock_rank()).collect();

    let mut sorted = ranks.clone();
    sorted.sort_unstable();
    sorted.dedup();

    assert_eq!(sorted.len(), Category::ALL.len(), "ranks must be distinct");
    assert_eq!(ranks, sorted, "ALL must be listed in lock-rank order");
}

#[test]
fn test_parse_identifier() {
    assert_eq!("RUNNING".parse::<Category>().unwrap(), Category::Running);
    assert_eq!("running".parse::<Category>().unwrap(), Category::Running);
    assert_eq!("Gym".parse::<Category>().unwrap(), Category::Gym);
}

#[test]
fn test_parse_display_name() {
    assert_eq!("CrossFit".parse::<Category>().unwrap(), Category::Crossfit);
    assert_eq!("Bodyweight".parse::<Category>().unwrap(), Category::Bodyweight);
}

#[test]
fn test_parse_unknown_category() {
    let err = "UNDERWATER_CHESS".parse::<Category>().unwrap_err();
    assert!(err.to_string().contains("UNDERWATER_CHESS"));
}

#[test]
fn test_as_str_round_trips() {
    for cat in Category::ALL {
        assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
    }
}

#[test]
fn test_serde_uses_identifier_form() {
    let json = serde_json::to_string(&Category::Running).expect("failed to serialize");
    assert_eq!(json, "\"RUNNING\"");

    let back: Category = serde_json::from_str(&json).expect("failed to deserialize");
    assert_eq!(back, Category::Running);
}

#[test]
fn test_counter_key_orders_by_lock_rank() {
    let owner = Uuid::new_v4();
    let gym = CounterKey::new(owner, Category::Gym);
    let running = CounterKey::new(owner, Category::Running);

    assert!(gym < running);

    let mut keys = vec![running, gym];
    keys.sort();
    assert_eq!(keys, vec![gym, running]);
}

#[test]
fn test_counter_key_orders_by_owner_first() {
    let a = Uuid::from_u128(1);
    let b = Uuid::from_u128(2);

    let high_cat_low_owner = CounterKey::new(a, Category::Climbing);
    let low_cat_high_owner = CounterKey::new(b, Category::Gym);

    assert!(high_cat_low_owner < low_cat_high_owner);
}
