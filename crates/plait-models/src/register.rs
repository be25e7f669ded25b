//! An integer read/write register.

use plait::Model;

/// Operations on a [`Register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOp {
    Put(i64),
    Get,
}

/// A register holding a single integer. The output of a `Put` is ignored;
/// a `Get` must return the current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Register {
    /// Value held before any operation takes effect.
    pub initial: i64,
}

impl Model for Register {
    type State = i64;
    type Input = RegisterOp;
    type Output = i64;

    fn init(&self) -> i64 {
        self.initial
    }

    fn step(&self, state: &i64, input: &RegisterOp, output: &i64) -> Option<i64> {
        match input {
            RegisterOp::Put(value) => Some(*value),
            RegisterOp::Get => (output == state).then_some(*state),
        }
    }

    fn describe_operation(&self, input: &RegisterOp, output: &i64) -> String {
        match input {
            RegisterOp::Put(value) => format!("put({value})"),
            RegisterOp::Get => format!("get() -> {output}"),
        }
    }
}
