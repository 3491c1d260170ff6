//! Cost ordering and running cost accounting.

use crate::registry::BackendDescriptor;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Sort candidates cheapest first.
///
/// The sort is stable: equal costs are ordered by backend id, so the result
/// never depends on registration or arrival order.
pub fn order_by_cost<T: AsRef<BackendDescriptor>>(mut candidates: Vec<T>) -> Vec<T> {
    candidates.sort_by(|a, b| {
        let (a, b) = (a.as_ref(), b.as_ref());
        a.cost_per_call
            .total_cmp(&b.cost_per_call)
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates
}

#[derive(Debug, Default)]
struct MeterState {
    /// Running total as `f64` bits
    total_bits: AtomicU64,
    calls_issued: AtomicU64,
}

/// Shared running cost of one evaluation.
///
/// Each call is charged its declared cost when issued and corrected to the
/// actual cost once it completes. A caller holding a clone can read the
/// figure at any time, including after cancelling the evaluation, in which
/// case in-flight calls stay charged at their declared cost.
#[derive(Debug, Clone, Default)]
pub struct CostMeter {
    state: Arc<MeterState>,
}

impl CostMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge the declared cost of a call about to be issued.
    pub fn charge(&self, declared: f64) {
        self.state.calls_issued.fetch_add(1, Ordering::SeqCst);
        self.add(declared);
    }

    /// Replace a declared charge with the actual cost of the completed call.
    pub fn settle(&self, declared: f64, actual: f64) {
        let delta = actual - declared;
        if delta != 0.0 {
            self.add(delta);
        }
    }

    /// Cost accumulated so far.
    pub fn total(&self) -> f64 {
        f64::from_bits(self.state.total_bits.load(Ordering::SeqCst))
    }

    /// Number of backend calls issued so far.
    pub fn calls_issued(&self) -> u64 {
        self.state.calls_issued.load(Ordering::SeqCst)
    }

    fn add(&self, amount: f64) {
        if !amount.is_finite() {
            tracing::warn!(amount, "Ignoring non-finite cost");
            return;
        }
        loop {
            let current = self.state.total_bits.load(Ordering::SeqCst);
            let new_val = (f64::from_bits(current) + amount).to_bits();
            match self.state.total_bits.compare_exchange(
                current,
                new_val,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return,
                Err(_) => continue,
            }
        }
    }
}

/// Hands out cascade candidates cheapest first, charging each as it goes.
///
/// Candidates that are never handed out are never charged.
pub struct CascadeController<T> {
    pending: VecDeque<T>,
    meter: CostMeter,
    issued: usize,
}

impl<T: AsRef<BackendDescriptor>> CascadeController<T> {
    pub fn new(candidates: Vec<T>, meter: CostMeter) -> Self {
        Self {
            pending: order_by_cost(candidates).into(),
            meter,
            issued: 0,
        }
    }

    /// Next-cheapest candidate, charged to the meter.
    pub fn issue_next(&mut self) -> Option<T> {
        let next = self.pending.pop_front()?;
        self.meter.charge(next.as_ref().cost_per_call);
        self.issued += 1;
        Some(next)
    }

    pub fn issued(&self) -> usize {
        self.issued
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str, cost: f64) -> BackendDescriptor {
        BackendDescriptor::new(id, "test").with_cost_per_call(cost)
    }

    fn ids(descriptors: &[BackendDescriptor]) -> Vec<&str> {
        descriptors.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn orders_by_cost_then_id() {
        let ordered = order_by_cost(vec![
            descriptor("c", 3.0),
            descriptor("b", 1.0),
            descriptor("a", 1.0),
            descriptor("d", 0.5),
        ]);
        assert_eq!(ids(&ordered), vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn meter_settles_to_actual_cost() {
        let meter = CostMeter::new();
        meter.charge(1.0);
        meter.charge(2.0);
        meter.settle(2.0, 0.5);

        assert_eq!(meter.total(), 1.5);
        assert_eq!(meter.calls_issued(), 2);
    }

    #[test]
    fn meter_clones_share_state() {
        let meter = CostMeter::new();
        let observer = meter.clone();
        meter.charge(0.25);
        assert_eq!(observer.total(), 0.25);
    }

    #[test]
    fn cascade_charges_only_issued_candidates() {
        let meter = CostMeter::new();
        let mut cascade = CascadeController::new(
            vec![descriptor("b", 2.0), descriptor("c", 3.0), descriptor("a", 1.0)],
            meter.clone(),
        );

        let first = cascade.issue_next().unwrap();
        assert_eq!(first.id, "a");
        assert_eq!(meter.total(), 1.0);
        assert_eq!(cascade.issued(), 1);
        assert_eq!(cascade.remaining(), 2);
    }

    #[test]
    fn concurrent_charges_are_not_lost() {
        let meter = CostMeter::new();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let meter = meter.clone();
                scope.spawn(move || {
                    for _ in 0..1000 {
                        meter.charge(1.0);
                    }
                });
            }
        });
        assert_eq!(meter.total(), 8000.0);
        assert_eq!(meter.calls_issued(), 8000);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn ordering_is_non_decreasing_in_cost(costs in prop::collection::vec(0.0..10.0f64, 0..16)) {
                let candidates = costs
                    .iter()
                    .enumerate()
                    .map(|(i, cost)| descriptor(&format!("b{i:02}"), *cost))
                    .collect();
                let ordered = order_by_cost(candidates);

                prop_assert_eq!(ordered.len(), costs.len());
                for pair in ordered.windows(2) {
                    prop_assert!(pair[0].cost_per_call <= pair[1].cost_per_call);
                    if pair[0].cost_per_call == pair[1].cost_per_call {
                        prop_assert!(pair[0].id < pair[1].id);
                    }
                }
            }
        }
    }
}
