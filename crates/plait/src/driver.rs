//! Partition-parallel driver and the public check entry points.
//!
//! The model's partitioner splits the history into independently checkable
//! sub-histories (a history is linearizable iff every partition is). One
//! worker runs per partition; the only state they share is a pair of atomic
//! flags for cooperative cancellation. In non-verbose mode the first proven
//! violation cancels the rest; in verbose mode every worker runs to
//! completion so the per-operation witnesses are coherent, and the driver
//! reads them only after the parallel join.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::checker::{check_single, SearchLimits, SingleOutcome};
use crate::history::{self, Event, HistoryError, Operation, Partition};
use crate::model::{CheckResult, Model};
use crate::report::LinearizationInfo;

/// Check whether an operation-form history is linearizable.
///
/// Fails only on a malformed history; an unlimited search always reaches a
/// verdict.
pub fn check_operations<M>(
    model: &M,
    history: Vec<Operation<M::Input, M::Output>>,
) -> Result<bool, HistoryError>
where
    M: Model + Sync,
    M::Input: Sync,
    M::Output: Sync,
{
    let partitions = partitioned_operations(model, history)?;
    let (result, _) = check_parallel(model, &partitions, false, None);
    Ok(result == CheckResult::Ok)
}

/// Check whether an operation-form history is linearizable, giving up after
/// `timeout` (`None` = unlimited) with [`CheckResult::Unknown`].
pub fn check_operations_timeout<M>(
    model: &M,
    history: Vec<Operation<M::Input, M::Output>>,
    timeout: Option<Duration>,
) -> Result<CheckResult, HistoryError>
where
    M: Model + Sync,
    M::Input: Sync,
    M::Output: Sync,
{
    let partitions = partitioned_operations(model, history)?;
    let (result, _) = check_parallel(model, &partitions, false, timeout);
    Ok(result)
}

/// Check an operation-form history while recording the data needed to
/// report partial linearizations, at some cost in time and memory.
pub fn check_operations_verbose<M>(
    model: &M,
    history: Vec<Operation<M::Input, M::Output>>,
    timeout: Option<Duration>,
) -> Result<(CheckResult, LinearizationInfo<M::Input, M::Output>), HistoryError>
where
    M: Model + Sync,
    M::Input: Sync,
    M::Output: Sync,
{
    let partitions = partitioned_operations(model, history)?;
    let (result, outcomes) = check_parallel(model, &partitions, true, timeout);
    let partials = extract_partials(&outcomes);
    Ok((result, LinearizationInfo::new(partitions, partials)))
}

/// Check whether an event-form history is linearizable.
pub fn check_events<M>(
    model: &M,
    history: Vec<Event<M::Input, M::Output>>,
) -> Result<bool, HistoryError>
where
    M: Model + Sync,
    M::Input: Sync,
    M::Output: Sync,
{
    let partitions = partitioned_events(model, history)?;
    let (result, _) = check_parallel(model, &partitions, false, None);
    Ok(result == CheckResult::Ok)
}

/// Check whether an event-form history is linearizable, giving up after
/// `timeout` (`None` = unlimited) with [`CheckResult::Unknown`].
pub fn check_events_timeout<M>(
    model: &M,
    history: Vec<Event<M::Input, M::Output>>,
    timeout: Option<Duration>,
) -> Result<CheckResult, HistoryError>
where
    M: Model + Sync,
    M::Input: Sync,
    M::Output: Sync,
{
    let partitions = partitioned_events(model, history)?;
    let (result, _) = check_parallel(model, &partitions, false, timeout);
    Ok(result)
}

/// Check an event-form history while recording the data needed to report
/// partial linearizations.
pub fn check_events_verbose<M>(
    model: &M,
    history: Vec<Event<M::Input, M::Output>>,
    timeout: Option<Duration>,
) -> Result<(CheckResult, LinearizationInfo<M::Input, M::Output>), HistoryError>
where
    M: Model + Sync,
    M::Input: Sync,
    M::Output: Sync,
{
    let partitions = partitioned_events(model, history)?;
    let (result, outcomes) = check_parallel(model, &partitions, true, timeout);
    let partials = extract_partials(&outcomes);
    Ok((result, LinearizationInfo::new(partitions, partials)))
}

fn partitioned_operations<M: Model>(
    model: &M,
    history: Vec<Operation<M::Input, M::Output>>,
) -> Result<Vec<Partition<M::Input, M::Output>>, HistoryError> {
    model
        .partition(history)
        .into_iter()
        .map(history::from_operations)
        .collect()
}

fn partitioned_events<M: Model>(
    model: &M,
    history: Vec<Event<M::Input, M::Output>>,
) -> Result<Vec<Partition<M::Input, M::Output>>, HistoryError> {
    model
        .partition_events(history)
        .into_iter()
        .map(history::from_events)
        .collect()
}

fn check_parallel<M>(
    model: &M,
    partitions: &[Partition<M::Input, M::Output>],
    compute_partial: bool,
    timeout: Option<Duration>,
) -> (CheckResult, Vec<SingleOutcome>)
where
    M: Model + Sync,
    M::Input: Sync,
    M::Output: Sync,
{
    let cancel = AtomicBool::new(false);
    let timed_out = AtomicBool::new(false);
    let deadline = timeout.map(|t| Instant::now() + t);
    info!(
        partitions = partitions.len(),
        operations = partitions.iter().map(|p| p.len()).sum::<usize>(),
        verbose = compute_partial,
        "checking linearizability"
    );

    let outcomes: Vec<SingleOutcome> = partitions
        .par_iter()
        .enumerate()
        .map(|(index, partition)| {
            let limits = SearchLimits {
                cancel: &cancel,
                timed_out: &timed_out,
                deadline,
            };
            let outcome = check_single(model, partition, compute_partial, &limits);
            debug!(
                partition = index,
                accepted = outcome.accepted,
                cancelled = outcome.cancelled,
                "partition finished"
            );
            // Early stop: without witnesses to collect, one proven
            // violation settles the verdict.
            if !compute_partial && !outcome.accepted && !outcome.cancelled {
                cancel.store(true, Ordering::Relaxed);
            }
            outcome
        })
        .collect();

    // A worker that stopped because it observed cancellation proves
    // nothing; only an uncancelled rejection is a violation.
    let illegal = outcomes.iter().any(|o| !o.accepted && !o.cancelled);
    let result = if illegal {
        CheckResult::Illegal
    } else if timed_out.load(Ordering::Relaxed) {
        CheckResult::Unknown
    } else {
        CheckResult::Ok
    };
    info!(result = ?result, "check complete");
    (result, outcomes)
}

/// Reduce each partition's per-operation longest prefixes to the distinct
/// sequences among them. The checker shares one snapshot between all the
/// ids it covers, so pointer identity is the dedup key.
fn extract_partials(outcomes: &[SingleOutcome]) -> Vec<Vec<Vec<usize>>> {
    outcomes
        .iter()
        .map(|outcome| {
            let mut seen = HashSet::new();
            let mut partials = Vec::new();
            for seq in outcome.longest.iter().flatten() {
                if seen.insert(Arc::as_ptr(seq) as *const usize as usize) {
                    partials.push(seq.to_vec());
                }
            }
            partials
        })
        .collect()
}
