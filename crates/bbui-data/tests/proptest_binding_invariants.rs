//! Property-based invariant tests for the binding primitives.
//!
//! These tests drive the caches with arbitrary key sequences and check:
//!
//! 1. A `DynamicQuery` fetches once per value change of its key (plus once
//!    for the first call).
//! 2. Every value except the live one is closed exactly once; the live one is
//!    never closed.
//! 3. Value equality of keys agrees with element-wise comparison.
//! 4. A `StaticQuery` fetches exactly once for any number of calls.
//! 5. An `AccessorSlot` opens and closes exactly one handle per lifetime.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bbui_data::{
    AccessorSlot, Closable, DepValue, DependencyVector, DynamicQuery, MemorySession, StaticQuery,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Tracked {
    closes: Rc<Cell<u32>>,
}

impl Closable for Tracked {
    fn close(&self) {
        self.closes.set(self.closes.get() + 1);
    }

    fn is_closed(&self) -> bool {
        self.closes.get() > 0
    }
}

fn dep_value_strategy() -> impl Strategy<Value = DepValue> {
    // Narrow domains so that consecutive keys collide often.
    prop_oneof![
        Just(DepValue::Null),
        any::<bool>().prop_map(DepValue::Bool),
        (0i64..3).prop_map(DepValue::Int),
        prop::sample::select(vec!["a", "b"]).prop_map(DepValue::from),
    ]
}

fn key_strategy() -> impl Strategy<Value = DependencyVector> {
    proptest::collection::vec(dep_value_strategy(), 0..4).prop_map(DependencyVector::from)
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2. Fetch count and close accounting
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn fetches_track_value_changes(keys in proptest::collection::vec(key_strategy(), 1..40)) {
        let made: RefCell<Vec<Tracked>> = RefCell::new(Vec::new());
        let mut query = DynamicQuery::new();

        for key in &keys {
            query.get_or_refetch(key, || {
                let tracked = Tracked { closes: Rc::new(Cell::new(0)) };
                made.borrow_mut().push(tracked.clone());
                tracked
            });
        }

        let changes = keys.windows(2).filter(|w| w[0] != w[1]).count();
        let made = made.into_inner();
        prop_assert_eq!(made.len(), changes + 1);
        prop_assert_eq!(query.fetches() as usize, made.len());

        let (live, retired) = made.split_last().unwrap();
        prop_assert_eq!(live.closes.get(), 0);
        for tracked in retired {
            prop_assert_eq!(tracked.closes.get(), 1);
        }
        prop_assert_eq!(query.deps(), keys.last());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Key equality is element-wise
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn key_equality_is_elementwise(a in key_strategy(), b in key_strategy()) {
        let elementwise = a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y);
        prop_assert_eq!(a == b, elementwise);
        prop_assert!(a == a.clone());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. StaticQuery fetches once
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn static_query_fetches_once(calls in 1usize..64) {
        let fetches = Cell::new(0u32);
        let mut query = StaticQuery::new();
        for i in 0..calls {
            let value = *query.get_or_fetch(|| {
                fetches.set(fetches.get() + 1);
                i
            });
            prop_assert_eq!(value, 0);
        }
        prop_assert_eq!(fetches.get(), 1);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. AccessorSlot lifetime accounting
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn accessor_opens_and_closes_once(renders in 1usize..50, extra_releases in 0usize..3) {
        let session = MemorySession::new();
        {
            let mut slot = AccessorSlot::new();
            for _ in 0..renders {
                prop_assert!(slot.acquire(&session).is_ok());
            }
            for _ in 0..extra_releases {
                slot.release();
            }
        }
        let stats = session.stats();
        prop_assert_eq!(stats.handles_opened, 1);
        prop_assert_eq!(stats.handles_closed, 1);
    }
}
