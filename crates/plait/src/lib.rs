//! Linearizability checking for histories of concurrent operations.
//!
//! A history records the calls and returns observed while exercising a
//! shared object; it is *linearizable* when some total order of its
//! operations respects both real-time precedence (an operation that
//! returned before another was called comes first) and a sequential
//! specification of the object. This crate decides that question with the
//! Wing–Gong search extended with P-compositionality: matched call/return
//! pairs are lifted greedily, explored (linearized-set, state) pairs are
//! memoized, and independent partitions of the history are checked in
//! parallel.
//!
//! # Defining a model
//!
//! Implement [`Model`]: an initial state, and a `step` function saying
//! whether an (input, output) pair is admissible in a state and what state
//! it leaves behind. Partitionable objects (e.g. a key-value store, by key)
//! should also implement [`Model::partition`]: checking is NP-hard, and
//! partitioning is the single biggest lever on running time.
//!
//! # Checking histories
//!
//! Histories come in two forms: [`Operation`]s with absolute call/return
//! timestamps, or relatively-ordered [`Event`]s matched by id. The
//! [`check_operations`] and [`check_events`] families decide
//! linearizability; the `_timeout` variants give up with
//! [`CheckResult::Unknown`] after a budget, and the `_verbose` variants
//! additionally return a [`LinearizationInfo`] with the longest partial
//! linearizations found, suitable for visualization.

mod bitset;
mod checker;
mod driver;
mod history;
mod model;
mod report;
mod ribbon;

pub use driver::{
    check_events, check_events_timeout, check_events_verbose, check_operations,
    check_operations_timeout, check_operations_verbose,
};
pub use history::{Event, EventValue, HistoryError, Operation};
pub use model::{CheckResult, Model};
pub use report::{
    Annotation, AnnotationData, HistoryElement, LinearizationInfo, LinearizationStep,
    PartitionData, VisualizationData,
};
