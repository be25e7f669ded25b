//! History input forms and normalization into the checker's entry stream.
//!
//! Two representations are accepted. The operation form packages a call and
//! its return together with absolute timestamps; the event form is a
//! relatively-ordered stream of call and return events matched by id. Both
//! normalize into a sorted [`Entry`] stream plus dense per-id payload
//! tables, which is what the search consumes.

use thiserror::Error;

/// A completed operation: one element of an operation-form history.
///
/// `call` and `ret` are the invocation and response timestamps. Intervals
/// are closed: two operations whose boundary timestamps coincide are
/// considered concurrent.
#[derive(Debug, Clone)]
pub struct Operation<I, O> {
    /// Zero-indexed client identifier; only used for reporting.
    pub client_id: usize,
    pub input: I,
    /// Invocation timestamp.
    pub call: i64,
    pub output: O,
    /// Response timestamp.
    pub ret: i64,
}

/// Payload of an [`Event`]: the input of a call or the output of a return.
#[derive(Debug, Clone)]
pub enum EventValue<I, O> {
    Call(I),
    Return(O),
}

/// One element of an event-form history.
///
/// Events carry no timestamps; their order in the input sequence is their
/// order in time. The `id` matches a call event with its return event and
/// may be arbitrary (ids are renumbered densely per partition).
#[derive(Debug, Clone)]
pub struct Event<I, O> {
    /// Zero-indexed client identifier; only used for reporting.
    pub client_id: usize,
    /// Matches a call with its return.
    pub id: usize,
    pub value: EventValue<I, O>,
}

/// A malformed history. The checker does not attempt repair.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("operation {id} returns at {ret}, before its call at {call}")]
    ReturnBeforeCall { id: usize, call: i64, ret: i64 },

    #[error("duplicate call event for operation id {id}")]
    DuplicateCall { id: usize },

    #[error("duplicate return event for operation id {id}")]
    DuplicateReturn { id: usize },

    #[error("return event for operation id {id} without a preceding call")]
    ReturnWithoutCall { id: usize },

    #[error("call event for operation id {id} has no matching return")]
    UnmatchedCall { id: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    Call,
    Return,
}

/// Normalized history element. Payloads live in the owning partition's
/// `inputs`/`outputs` tables, indexed by `id`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Entry {
    pub kind: EntryKind,
    /// Dense operation id within the partition.
    pub id: usize,
    pub time: i64,
    pub client_id: usize,
}

/// One partition of a history, normalized: entries sorted by
/// (time, call-before-return), ids dense in `[0, n)`.
#[derive(Debug)]
pub(crate) struct Partition<I, O> {
    pub entries: Vec<Entry>,
    /// Call payload per id.
    pub inputs: Vec<I>,
    /// Return payload per id.
    pub outputs: Vec<O>,
}

impl<I, O> Partition<I, O> {
    /// Number of operations.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }
}

/// Normalize an operation-form partition. Ids are assigned by position.
pub(crate) fn from_operations<I, O>(
    history: Vec<Operation<I, O>>,
) -> Result<Partition<I, O>, HistoryError> {
    let mut entries = Vec::with_capacity(history.len() * 2);
    let mut inputs = Vec::with_capacity(history.len());
    let mut outputs = Vec::with_capacity(history.len());
    for (id, op) in history.into_iter().enumerate() {
        if op.ret < op.call {
            return Err(HistoryError::ReturnBeforeCall {
                id,
                call: op.call,
                ret: op.ret,
            });
        }
        entries.push(Entry {
            kind: EntryKind::Call,
            id,
            time: op.call,
            client_id: op.client_id,
        });
        entries.push(Entry {
            kind: EntryKind::Return,
            id,
            time: op.ret,
            client_id: op.client_id,
        });
        inputs.push(op.input);
        outputs.push(op.output);
    }
    // Calls sort before returns on equal timestamps; this is what makes
    // intervals closed.
    entries.sort_by_key(|e| (e.time, e.kind == EntryKind::Return));
    Ok(Partition {
        entries,
        inputs,
        outputs,
    })
}

/// Normalize an event-form partition. The sequence position becomes the
/// timestamp (the required ordering holds by construction) and ids are
/// renumbered densely in order of first appearance.
pub(crate) fn from_events<I, O>(
    history: Vec<Event<I, O>>,
) -> Result<Partition<I, O>, HistoryError> {
    let mut entries = Vec::with_capacity(history.len());
    let mut inputs = Vec::new();
    let mut outputs: Vec<Option<O>> = Vec::new();
    let mut original_ids = Vec::new();
    let mut renumber = std::collections::HashMap::new();
    for (time, event) in history.into_iter().enumerate() {
        match event.value {
            EventValue::Call(input) => {
                if renumber.contains_key(&event.id) {
                    return Err(HistoryError::DuplicateCall { id: event.id });
                }
                let dense = inputs.len();
                renumber.insert(event.id, dense);
                original_ids.push(event.id);
                inputs.push(input);
                outputs.push(None);
                entries.push(Entry {
                    kind: EntryKind::Call,
                    id: dense,
                    time: time as i64,
                    client_id: event.client_id,
                });
            }
            EventValue::Return(output) => {
                let dense = *renumber
                    .get(&event.id)
                    .ok_or(HistoryError::ReturnWithoutCall { id: event.id })?;
                if outputs[dense].is_some() {
                    return Err(HistoryError::DuplicateReturn { id: event.id });
                }
                outputs[dense] = Some(output);
                entries.push(Entry {
                    kind: EntryKind::Return,
                    id: dense,
                    time: time as i64,
                    client_id: event.client_id,
                });
            }
        }
    }
    let outputs = outputs
        .into_iter()
        .enumerate()
        .map(|(dense, output)| {
            output.ok_or(HistoryError::UnmatchedCall {
                id: original_ids[dense],
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Partition {
        entries,
        inputs,
        outputs,
    })
}
