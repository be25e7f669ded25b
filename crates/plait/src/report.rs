//! Verbose check output: witnesses, annotations, and visualization data.
//!
//! A verbose check yields a [`LinearizationInfo`]: per partition, the
//! ordered entry stream and the distinct partial linearizations extracted
//! from the per-operation longest prefixes. From it,
//! [`visualization_data`](LinearizationInfo::visualization_data) builds the
//! JSON-serializable payload an external renderer consumes: operation
//! intervals on a compressed time axis, each partial linearization replayed
//! through the model for per-step state descriptions, and a map from each
//! operation to the longest partial containing it.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::history::{EntryKind, Partition};
use crate::model::Model;

/// Witness data from a verbose check.
pub struct LinearizationInfo<I, O> {
    partitions: Vec<Partition<I, O>>,
    /// Distinct partial linearizations per partition, as id sequences.
    partials: Vec<Vec<Vec<usize>>>,
    annotations: Vec<Annotation>,
}

/// An extra marker to overlay on a visualized history.
///
/// Either `client_id` or `tag` identifies the row the annotation belongs
/// to; a tag names a row of its own (a server, the test framework, …).
/// `end` is optional in spirit: leaving it before `start` produces a
/// point-in-time annotation at `start`. Colors, when set, should be valid
/// CSS colors.
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    pub client_id: Option<usize>,
    pub tag: String,
    pub start: i64,
    pub end: i64,
    pub description: String,
    pub details: String,
    pub text_color: String,
    pub background_color: String,
}

impl<I, O> LinearizationInfo<I, O> {
    pub(crate) fn new(partitions: Vec<Partition<I, O>>, partials: Vec<Vec<Vec<usize>>>) -> Self {
        Self {
            partitions,
            partials,
            annotations: Vec::new(),
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Number of operations in a partition.
    pub fn num_operations(&self, partition: usize) -> usize {
        self.partitions[partition].len()
    }

    /// The distinct partial linearizations of a partition, each an ordered
    /// sequence of operation ids. For an accepted partition this is a
    /// single complete linearization.
    pub fn partial_linearizations(&self, partition: usize) -> &[Vec<usize>] {
        &self.partials[partition]
    }

    /// Attach annotations; they flow through to the visualization data
    /// untouched except that an `end` before `start` is clamped to `start`.
    pub fn add_annotations(&mut self, annotations: impl IntoIterator<Item = Annotation>) {
        self.annotations
            .extend(annotations.into_iter().map(|mut annotation| {
                annotation.end = annotation.end.max(annotation.start);
                annotation
            }));
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Monotonic map from every timestamp appearing in the history or the
    /// annotations onto 0, 100, 200, …: exported integers stay small and
    /// any two distinct timestamps keep a comfortable gap for the renderer
    /// to nudge within.
    fn timestamp_mapping(&self) -> HashMap<i64, i64> {
        let mut timestamps = BTreeSet::new();
        for partition in &self.partitions {
            for entry in &partition.entries {
                timestamps.insert(entry.time);
            }
        }
        for annotation in &self.annotations {
            timestamps.insert(annotation.start);
            timestamps.insert(annotation.end);
        }
        timestamps
            .into_iter()
            .enumerate()
            .map(|(index, time)| (time, index as i64 * 100))
            .collect()
    }

    /// Build the renderer payload.
    ///
    /// Panics if a recorded linearization is rejected by the model on
    /// replay: the checker only records model-accepted prefixes, so that is
    /// a bug in the checker (or a non-deterministic model), never a
    /// property of the input history.
    pub fn visualization_data<M>(&self, model: &M) -> VisualizationData
    where
        M: Model<Input = I, Output = O>,
    {
        let time_map = self.timestamp_mapping();
        let partitions = self
            .partitions
            .iter()
            .zip(&self.partials)
            .enumerate()
            .map(|(partition_index, (partition, partials))| {
                let mut history = vec![HistoryElement::default(); partition.len()];
                for entry in &partition.entries {
                    let element = &mut history[entry.id];
                    match entry.kind {
                        EntryKind::Call => {
                            element.client_id = entry.client_id;
                            element.start = time_map[&entry.time];
                            element.original_start = entry.time.to_string();
                        }
                        EntryKind::Return => {
                            element.end = time_map[&entry.time];
                            element.original_end = entry.time.to_string();
                            element.description = model.describe_operation(
                                &partition.inputs[entry.id],
                                &partition.outputs[entry.id],
                            );
                        }
                    }
                }

                let mut ordered: Vec<&Vec<usize>> = partials.iter().collect();
                ordered.sort_by_key(|partial| std::cmp::Reverse(partial.len()));
                let mut largest = HashMap::new();
                let mut largest_size: HashMap<usize, usize> = HashMap::new();
                let partial_linearizations = ordered
                    .iter()
                    .enumerate()
                    .map(|(rank, partial)| {
                        let mut state = model.init();
                        partial
                            .iter()
                            .enumerate()
                            .map(|(step, &id)| {
                                state = model
                                    .step(
                                        &state,
                                        &partition.inputs[id],
                                        &partition.outputs[id],
                                    )
                                    .unwrap_or_else(|| {
                                        panic!(
                                            "recorded linearization rejected on replay \
                                             (partition {partition_index}, step {step}, \
                                             operation {id}): checker bug or \
                                             non-deterministic model"
                                        )
                                    });
                                if largest_size.get(&id).copied().unwrap_or(0) < partial.len() {
                                    largest_size.insert(id, partial.len());
                                    largest.insert(id, rank);
                                }
                                LinearizationStep {
                                    index: id,
                                    state_description: model.describe_state(&state),
                                }
                            })
                            .collect()
                    })
                    .collect();

                PartitionData {
                    history,
                    partial_linearizations,
                    largest,
                }
            })
            .collect();

        let annotations = self
            .annotations
            .iter()
            .map(|annotation| AnnotationData {
                client_id: annotation.client_id,
                tag: annotation.tag.clone(),
                start: time_map[&annotation.start],
                end: time_map[&annotation.end],
                description: annotation.description.clone(),
                details: annotation.details.clone(),
                annotation: true,
                text_color: annotation.text_color.clone(),
                background_color: annotation.background_color.clone(),
            })
            .collect();

        VisualizationData {
            partitions,
            annotations,
        }
    }
}

/// Renderer payload for one whole check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationData {
    pub partitions: Vec<PartitionData>,
    pub annotations: Vec<AnnotationData>,
}

impl VisualizationData {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionData {
    /// Operation intervals, indexed by operation id.
    pub history: Vec<HistoryElement>,
    /// Replayed partial linearizations, longest first.
    pub partial_linearizations: Vec<Vec<LinearizationStep>>,
    /// For each operation id, the rank of the longest partial
    /// linearization containing it.
    pub largest: HashMap<usize, usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryElement {
    pub client_id: usize,
    pub start: i64,
    pub original_start: String,
    pub end: i64,
    pub original_end: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearizationStep {
    /// Operation id linearized at this step.
    pub index: usize,
    pub state_description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationData {
    pub client_id: Option<usize>,
    pub tag: String,
    pub start: i64,
    pub end: i64,
    pub description: String,
    pub details: String,
    /// Always true; distinguishes annotation rows in the export.
    pub annotation: bool,
    pub text_color: String,
    pub background_color: String,
}
