use arc_swap::ArcSwapOption;
use mineral_core::RankDirection;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Total order of the outer ranking clause.
pub trait RankOrder<V>: Send + Sync {
    /// `Less` when `a` ranks ahead of `b`.
    fn compare(&self, a: &V, b: &V) -> Ordering;

    fn is_better(&self, a: &V, b: &V) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

impl<V: Ord> RankOrder<V> for RankDirection {
    fn compare(&self, a: &V, b: &V) -> Ordering {
        match self {
            RankDirection::Asc => a.cmp(b),
            RankDirection::Desc => b.cmp(a),
        }
    }
}

/// Best result seen so far across every call sharing this register.
///
/// The register only moves to strictly better values and is never cleared, which makes it a
/// valid bound for branch-and-bound style pruning. That pruning is only sound when the
/// accumulator argument never improves along a recursion (under the same order) and the outer
/// query only consumes the best-ranked result; anything else can lose answers.
pub struct BestSoFar<V, O = RankDirection> {
    best: ArcSwapOption<V>,
    order: O,
}

impl<V, O> BestSoFar<V, O>
where
    V: Clone,
    O: RankOrder<V>,
{
    pub fn new(order: O) -> Self {
        Self {
            best: ArcSwapOption::empty(),
            order,
        }
    }

    pub fn current_best(&self) -> Option<V> {
        self.best.load_full().map(|best| (*best).clone())
    }

    /// Install `candidate` if the register is empty or it is strictly better than the holder.
    /// Concurrent offers are resolved with a compare-and-swap loop, so the best of them wins.
    pub fn offer(&self, candidate: V) -> bool {
        let candidate = Arc::new(candidate);
        let mut installed = false;
        self.best.rcu(|current| match current {
            Some(best) if !self.order.is_better(&candidate, best) => {
                installed = false;
                Some(Arc::clone(best))
            }
            _ => {
                installed = true;
                Some(Arc::clone(&candidate))
            }
        });
        installed
    }

    /// True when a best exists and `accumulator` is no better than it.
    pub fn should_prune(&self, accumulator: &V) -> bool {
        match self.best.load_full() {
            Some(best) => !self.order.is_better(accumulator, &best),
            None => false,
        }
    }

    pub fn order(&self) -> &O {
        &self.order
    }
}

impl<V: fmt::Debug, O: fmt::Debug> fmt::Debug for BestSoFar<V, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BestSoFar")
            .field("best", &self.best.load_full())
            .field("order", &self.order)
            .finish()
    }
}
