//! Sequential specifications and check results.

use std::fmt::Debug;
use std::hash::Hash;

use crate::history::{Event, Operation};

/// A sequential specification of a system under test.
///
/// A model is purely functional: [`step`](Model::step) receives the current
/// state by reference and returns the successor state, never mutating its
/// arguments. Only `init` and `step` are required.
///
/// Implementing [`partition`](Model::partition) (and
/// [`partition_events`](Model::partition_events) for event histories) can
/// improve performance dramatically: a history is linearizable iff every
/// partition is, so a key-value store partitioned by key checks each key's
/// operations independently, with per-key state instead of a whole map.
///
/// State equality and hashing, used to deduplicate search branches, come
/// from the `Eq + Hash` bounds on [`State`](Model::State); structural
/// equality is the default and a model wanting a coarser equivalence
/// implements `PartialEq`/`Hash` accordingly.
pub trait Model {
    type State: Clone + Eq + Hash + Debug;
    type Input: Debug;
    type Output: Debug;

    /// Initial state of the system.
    fn init(&self) -> Self::State;

    /// Whether the system can take this step, and if so the state it leaves
    /// behind. `None` means the (input, output) pair is not admissible in
    /// `state`.
    fn step(
        &self,
        state: &Self::State,
        input: &Self::Input,
        output: &Self::Output,
    ) -> Option<Self::State>;

    /// Split an operation-form history into independently checkable
    /// sub-histories. The default is a single partition.
    fn partition(
        &self,
        history: Vec<Operation<Self::Input, Self::Output>>,
    ) -> Vec<Vec<Operation<Self::Input, Self::Output>>> {
        vec![history]
    }

    /// Split an event-form history into independently checkable
    /// sub-histories. The default is a single partition.
    fn partition_events(
        &self,
        history: Vec<Event<Self::Input, Self::Output>>,
    ) -> Vec<Vec<Event<Self::Input, Self::Output>>> {
        vec![history]
    }

    /// Render an operation for reports, e.g. `get('x') -> 'y'`.
    fn describe_operation(&self, input: &Self::Input, output: &Self::Output) -> String {
        format!("{:?} -> {:?}", input, output)
    }

    /// Render a state for reports.
    fn describe_state(&self, state: &Self::State) -> String {
        format!("{:?}", state)
    }
}

/// The outcome of a linearizability check.
///
/// Checking is NP-hard, so a timeout may be supplied; without one the
/// checker always answers [`Ok`](CheckResult::Ok) or
/// [`Illegal`](CheckResult::Illegal). [`Unknown`](CheckResult::Unknown)
/// means the search was cut off, not that a violation exists; depending on
/// the use case it can be read as "no violation found within the budget".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    /// Every partition admits a linearization.
    Ok,
    /// Some partition provably admits none.
    Illegal,
    /// The timeout fired before the search finished.
    Unknown,
}
