use mineral_cache::{BestSoFar, CacheKey, Claim, VisitationCache};
use mineral_core::RankDirection;
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_distinct_tuples_get_distinct_keys(
        a in prop::collection::vec("\\PC*", 0..5),
        b in prop::collection::vec("\\PC*", 0..5),
    ) {
        if a != b {
            prop_assert_ne!(CacheKey::encode(&a), CacheKey::encode(&b));
        } else {
            prop_assert_eq!(CacheKey::encode(&a), CacheKey::encode(&b));
        }
    }

    #[test]
    fn test_separator_heavy_tuples_never_collide(
        a in prop::collection::vec("[|:0-9]{0,6}", 1..4),
        b in prop::collection::vec("[|:0-9]{0,6}", 1..4),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(CacheKey::encode(&a), CacheKey::encode(&b));
    }

    #[test]
    fn test_best_never_regresses(offers in prop::collection::vec(-1000i64..1000, 1..50)) {
        let best = BestSoFar::new(RankDirection::Asc);
        let mut seen_min = i64::MAX;
        for value in offers {
            best.offer(value);
            seen_min = seen_min.min(value);
            let current = best.current_best().unwrap();
            prop_assert!(current <= value);
            prop_assert_eq!(current, seen_min);
        }
    }

    #[test]
    fn test_prune_agrees_with_best(
        offers in prop::collection::vec(-100i64..100, 1..20),
        accumulator in -100i64..100,
    ) {
        let best = BestSoFar::new(RankDirection::Desc);
        for value in &offers {
            best.offer(*value);
        }
        let max = *offers.iter().max().unwrap();
        prop_assert_eq!(best.should_prune(&accumulator), accumulator <= max);
    }

    #[test]
    fn test_cells_never_move_backward(values in prop::collection::vec(0u8..10, 1..20)) {
        let cache = VisitationCache::<u8>::new();
        let key = CacheKey::encode(&["k"]);
        prop_assert_eq!(cache.claim(&key), Claim::Claimed);
        for value in &values {
            cache.resolve(&key, *value);
        }
        prop_assert_eq!(cache.claim(&key), Claim::Resolved(values[0]));
        prop_assert!(!cache.mark_in_progress(&key));
    }
}
