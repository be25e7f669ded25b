//! A string key-value store, partitioned by key.
//!
//! Operations on different keys are independent, so the store partitions
//! the history per key and the checker runs the partitions in parallel.
//! Within a partition the state is just that key's value.

use std::collections::{BTreeMap, HashMap};

use plait::{Event, EventValue, Model, Operation};

/// Operations on a [`KvStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvInput {
    Get { key: String },
    Put { key: String, value: String },
    Append { key: String, value: String },
}

impl KvInput {
    fn key(&self) -> &str {
        match self {
            KvInput::Get { key } => key,
            KvInput::Put { key, .. } => key,
            KvInput::Append { key, .. } => key,
        }
    }
}

/// A map from string keys to string values, all keys initially holding the
/// empty string. The output of a `Get` is the key's value; outputs of `Put`
/// and `Append` are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct KvStore;

impl Model for KvStore {
    /// Per-key value; the partitioner guarantees a partition only ever
    /// sees one key.
    type State = String;
    type Input = KvInput;
    type Output = String;

    fn init(&self) -> String {
        String::new()
    }

    fn step(&self, state: &String, input: &KvInput, output: &String) -> Option<String> {
        match input {
            KvInput::Get { .. } => (output == state).then(|| state.clone()),
            KvInput::Put { value, .. } => Some(value.clone()),
            KvInput::Append { value, .. } => Some(format!("{state}{value}")),
        }
    }

    fn partition(
        &self,
        history: Vec<Operation<KvInput, String>>,
    ) -> Vec<Vec<Operation<KvInput, String>>> {
        // BTreeMap keeps partition order deterministic across runs.
        let mut groups: BTreeMap<String, Vec<Operation<KvInput, String>>> = BTreeMap::new();
        for op in history {
            groups.entry(op.input.key().to_owned()).or_default().push(op);
        }
        groups.into_values().collect()
    }

    fn partition_events(
        &self,
        history: Vec<Event<KvInput, String>>,
    ) -> Vec<Vec<Event<KvInput, String>>> {
        // Return events carry no key; resolve it through the call with the
        // same id. An orphaned return groups under the empty key and is
        // rejected downstream as malformed.
        let mut key_of: HashMap<usize, String> = HashMap::new();
        for event in &history {
            if let EventValue::Call(input) = &event.value {
                key_of.insert(event.id, input.key().to_owned());
            }
        }
        let mut groups: BTreeMap<String, Vec<Event<KvInput, String>>> = BTreeMap::new();
        for event in history {
            let key = key_of.get(&event.id).cloned().unwrap_or_default();
            groups.entry(key).or_default().push(event);
        }
        groups.into_values().collect()
    }

    fn describe_operation(&self, input: &KvInput, output: &String) -> String {
        match input {
            KvInput::Get { key } => format!("get({key:?}) -> {output:?}"),
            KvInput::Put { key, value } => format!("put({key:?}, {value:?})"),
            KvInput::Append { key, value } => format!("append({key:?}, {value:?})"),
        }
    }

    fn describe_state(&self, state: &String) -> String {
        format!("{state:?}")
    }
}
