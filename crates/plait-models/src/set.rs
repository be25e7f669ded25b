//! A grow-only set of integers.

use std::collections::BTreeSet;

use plait::Model;

/// Operations on an [`AppendSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetInput {
    Add(i64),
    Contains(i64),
}

/// A set that only grows. `Add` always succeeds (its output is ignored);
/// `Contains` must report membership accurately.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendSet;

impl Model for AppendSet {
    // BTreeSet rather than HashSet: states must hash.
    type State = BTreeSet<i64>;
    type Input = SetInput;
    type Output = bool;

    fn init(&self) -> BTreeSet<i64> {
        BTreeSet::new()
    }

    fn step(&self, state: &BTreeSet<i64>, input: &SetInput, output: &bool) -> Option<BTreeSet<i64>> {
        match input {
            SetInput::Add(value) => {
                let mut next = state.clone();
                next.insert(*value);
                Some(next)
            }
            SetInput::Contains(value) => {
                (*output == state.contains(value)).then(|| state.clone())
            }
        }
    }

    fn describe_operation(&self, input: &SetInput, output: &bool) -> String {
        match input {
            SetInput::Add(value) => format!("add({value})"),
            SetInput::Contains(value) => format!("contains({value}) -> {output}"),
        }
    }
}
