//! Single-partition linearizability search.
//!
//! The procedure scans the ribbon left to right. At a call it tries to
//! linearize the operation at the current point: if the model accepts the
//! step and the resulting (linearized-set, state) pair is new, the pair is
//! lifted out of the ribbon and the scan restarts at the front; otherwise
//! the scan moves on. Reaching a return whose call was not accepted on this
//! branch means the current prefix cannot be extended past that return, so
//! the most recent acceptance is undone and the scan resumes after it. The
//! history is linearizable exactly when the ribbon drains.

use std::collections::HashMap;
use std::hash::{BuildHasher, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

use crate::bitset::Bitset;
use crate::history::Partition;
use crate::model::Model;
use crate::ribbon::{Ribbon, NIL};

/// How many loop iterations pass between deadline reads. The shared cancel
/// flag is still polled every iteration.
const DEADLINE_POLL_STRIDE: u64 = 4096;

/// Cancellation plumbing shared by all workers of one check.
pub(crate) struct SearchLimits<'a> {
    pub cancel: &'a AtomicBool,
    pub timed_out: &'a AtomicBool,
    pub deadline: Option<Instant>,
}

impl SearchLimits<'_> {
    fn past_deadline(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// What one partition worker produced.
pub(crate) struct SingleOutcome {
    /// The partition admits a linearization. Meaningless when `cancelled`.
    pub accepted: bool,
    /// The worker stopped because the shared cancel flag was raised, not
    /// because it finished.
    pub cancelled: bool,
    /// Per id, the longest accepted prefix seen that contains it. Populated
    /// only when partial tracking was requested; on acceptance every slot
    /// references the complete linearization.
    pub longest: Vec<Option<Arc<[usize]>>>,
}

/// Hasher for maps whose keys are already 64-bit hashes: passes the key
/// through instead of re-hashing it.
#[derive(Default)]
struct KeyHasher(u64);

impl Hasher for KeyHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        // Not reached for u64 keys, but handle gracefully.
        for &b in bytes {
            self.0 = self.0.wrapping_mul(31).wrapping_add(b as u64);
        }
    }

    #[inline]
    fn write_u64(&mut self, key: u64) {
        self.0 = key;
    }
}

#[derive(Default, Clone)]
struct KeyBuildHasher;

impl BuildHasher for KeyBuildHasher {
    type Hasher = KeyHasher;

    #[inline]
    fn build_hasher(&self) -> KeyHasher {
        KeyHasher(0)
    }
}

/// Explored (linearized-set, state) pairs, bucketed by the bitset hash.
/// Membership is elementwise bitset equality plus state equality: two
/// branches that accept the same id set may still leave the model in
/// different states, and conflating them would be unsound.
type Cache<S> = HashMap<u64, Vec<(Bitset, S)>, KeyBuildHasher>;

fn cache_insert<S: Clone + Eq>(cache: &mut Cache<S>, linearized: Bitset, state: &S) -> bool {
    let bucket = cache.entry(linearized.hash()).or_default();
    if bucket
        .iter()
        .any(|(seen_set, seen_state)| *seen_set == linearized && seen_state == state)
    {
        return false;
    }
    bucket.push((linearized, state.clone()));
    true
}

/// Point every id on the stack whose recorded prefix is shorter at the
/// current snapshot of the stack. The snapshot is materialized at most once
/// per backtrack; eagerly rebuilding it per frame would make backtracking
/// quadratic in allocations.
fn record_longest<S>(
    ribbon: &Ribbon,
    calls: &[(u32, S)],
    longest: &mut [Option<Arc<[usize]>>],
) {
    let depth = calls.len();
    let mut snapshot: Option<Arc<[usize]>> = None;
    for &(call, _) in calls {
        let id = ribbon.id(call);
        if longest[id].as_ref().is_none_or(|seq| depth > seq.len()) {
            let seq = snapshot
                .get_or_insert_with(|| calls.iter().map(|&(c, _)| ribbon.id(c)).collect());
            longest[id] = Some(Arc::clone(seq));
        }
    }
}

/// Decide linearizability of one normalized partition.
pub(crate) fn check_single<M: Model>(
    model: &M,
    partition: &Partition<M::Input, M::Output>,
    compute_partial: bool,
    limits: &SearchLimits<'_>,
) -> SingleOutcome {
    let n = partition.len();
    let mut ribbon = Ribbon::new(&partition.entries, n);
    let mut linearized = Bitset::new(n);
    let mut cache: Cache<M::State> = HashMap::default();
    let mut calls: Vec<(u32, M::State)> = Vec::new();
    let mut longest: Vec<Option<Arc<[usize]>>> = vec![None; n];
    let mut state = model.init();

    let mut entry = ribbon.front();
    let mut iterations = 0u64;
    while ribbon.front() != NIL {
        if limits.cancel.load(Ordering::Relaxed) {
            return SingleOutcome {
                accepted: false,
                cancelled: true,
                longest,
            };
        }
        iterations += 1;
        if iterations.is_multiple_of(DEADLINE_POLL_STRIDE) && limits.past_deadline() {
            limits.timed_out.store(true, Ordering::Relaxed);
            limits.cancel.store(true, Ordering::Relaxed);
            return SingleOutcome {
                accepted: false,
                cancelled: true,
                longest,
            };
        }

        if ribbon.matching(entry) != NIL {
            // Call: try to linearize this operation here.
            let id = ribbon.id(entry);
            let accepted = model
                .step(&state, &partition.inputs[id], &partition.outputs[id])
                .and_then(|next_state| {
                    let mut next_linearized = linearized.clone();
                    next_linearized.set(id);
                    cache_insert(&mut cache, next_linearized, &next_state).then_some(next_state)
                });
            match accepted {
                Some(next_state) => {
                    trace!(id, depth = calls.len() + 1, "accepted call");
                    calls.push((entry, std::mem::replace(&mut state, next_state)));
                    linearized.set(id);
                    ribbon.lift(entry);
                    entry = ribbon.front();
                }
                // Rejected by the model, or this exact (set, state) was
                // already explored: try the next possible extension.
                None => entry = ribbon.next(entry),
            }
        } else {
            // Return whose call was not accepted on this branch: the prefix
            // cannot grow past it, so undo the latest acceptance.
            if calls.is_empty() {
                return SingleOutcome {
                    accepted: false,
                    cancelled: false,
                    longest,
                };
            }
            if compute_partial {
                record_longest(&ribbon, &calls, &mut longest);
            }
            let (top, saved_state) = calls.pop().expect("checked non-empty above");
            trace!(id = ribbon.id(top), depth = calls.len(), "backtracking");
            linearized.clear(ribbon.id(top));
            state = saved_state;
            ribbon.unlift(top);
            entry = ribbon.next(top);
        }
    }

    // The ribbon drained: the calls stack is a complete linearization.
    let seq: Arc<[usize]> = calls.iter().map(|&(call, _)| ribbon.id(call)).collect();
    for slot in &mut longest {
        *slot = Some(Arc::clone(&seq));
    }
    SingleOutcome {
        accepted: true,
        cancelled: false,
        longest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{from_operations, Operation};

    /// Integer register: `Some(v)` writes v, `None` reads.
    struct TestRegister;

    impl Model for TestRegister {
        type State = i64;
        type Input = Option<i64>;
        type Output = i64;

        fn init(&self) -> i64 {
            0
        }

        fn step(&self, state: &i64, input: &Option<i64>, output: &i64) -> Option<i64> {
            match input {
                Some(value) => Some(*value),
                None => (output == state).then_some(*state),
            }
        }
    }

    fn no_limits() -> (AtomicBool, AtomicBool) {
        (AtomicBool::new(false), AtomicBool::new(false))
    }

    fn run(
        ops: Vec<Operation<Option<i64>, i64>>,
        compute_partial: bool,
    ) -> SingleOutcome {
        let partition = from_operations(ops).unwrap();
        let (cancel, timed_out) = no_limits();
        let limits = SearchLimits {
            cancel: &cancel,
            timed_out: &timed_out,
            deadline: None,
        };
        check_single(&TestRegister, &partition, compute_partial, &limits)
    }

    fn op(input: Option<i64>, call: i64, output: i64, ret: i64) -> Operation<Option<i64>, i64> {
        Operation {
            client_id: 0,
            input,
            call,
            output,
            ret,
        }
    }

    #[test]
    fn test_empty_partition_accepts() {
        let outcome = run(vec![], true);
        assert!(outcome.accepted);
        assert!(outcome.longest.is_empty());
    }

    #[test]
    fn test_single_valid_op() {
        let outcome = run(vec![op(None, 0, 0, 1)], true);
        assert!(outcome.accepted);
        assert_eq!(outcome.longest[0].as_deref(), Some(&[0][..]));
    }

    #[test]
    fn test_single_invalid_op() {
        let outcome = run(vec![op(None, 0, 7, 1)], false);
        assert!(!outcome.accepted);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_concurrent_read_can_precede_write() {
        // put(1) and get->0 overlap: the read linearizes first.
        let outcome = run(vec![op(Some(1), 0, 0, 10), op(None, 0, 0, 10)], false);
        assert!(outcome.accepted);
    }

    #[test]
    fn test_stale_read_after_write_rejected() {
        let outcome = run(vec![op(Some(1), 0, 0, 1), op(None, 5, 0, 6)], false);
        assert!(!outcome.accepted);
    }

    #[test]
    fn test_longest_on_rejection_covers_progress() {
        // get->2 can never linearize; put(1) alone can.
        let outcome = run(vec![op(Some(1), 0, 0, 10), op(None, 0, 2, 10)], true);
        assert!(!outcome.accepted);
        let seq = outcome.longest[0].as_deref().expect("put made progress");
        assert_eq!(seq, &[0]);
        assert!(outcome.longest[1].is_none());
    }

    #[test]
    fn test_cancel_observed() {
        let partition = from_operations(vec![op(None, 0, 0, 1)]).unwrap();
        let cancel = AtomicBool::new(true);
        let timed_out = AtomicBool::new(false);
        let limits = SearchLimits {
            cancel: &cancel,
            timed_out: &timed_out,
            deadline: None,
        };
        let outcome = check_single(&TestRegister, &partition, false, &limits);
        assert!(outcome.cancelled);
        assert!(!outcome.accepted);
    }
}
