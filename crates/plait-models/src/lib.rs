//! Ready-made sequential models for the `plait` linearizability checker.
//!
//! Each type here implements [`plait::Model`] for a common shared object:
//! a read/write [`Register`], a per-key partitioned [`KvStore`], and a
//! grow-only [`AppendSet`]. They serve both as usable specifications and as
//! worked examples for writing your own.

mod kv;
mod register;
mod set;

pub use kv::{KvInput, KvStore};
pub use register::{Register, RegisterOp};
pub use set::{AppendSet, SetInput};
