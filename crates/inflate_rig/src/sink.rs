//! Effector sinks: where finished rig frames go.

use crate::frame::RigFrame;
use crate::node::RigNode;
use anyhow::Context;
use std::collections::BTreeMap;

/// Engine glue implements this to pose the model.
pub trait EffectorSink: Send {
    fn apply(&mut self, frame: &RigFrame);
}

/// Discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EffectorSink for NullSink {
    fn apply(&mut self, _frame: &RigFrame) {}
}

/// Keeps every frame it is given.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub frames: Vec<RigFrame>,
}

impl EffectorSink for RecordingSink {
    fn apply(&mut self, frame: &RigFrame) {
        self.frames.push(*frame);
    }
}

/// Bone names the sink looks up in the skeleton.
#[derive(Debug, Clone)]
pub struct BoneNames {
    pub tail: String,
    pub ears: Vec<String>,
}

impl Default for BoneNames {
    fn default() -> Self {
        Self {
            tail: "tailBase".to_string(),
            ears: vec!["EarBaseL".to_string(), "EarBaseR".to_string()],
        }
    }
}

/// Poses a bone hierarchy directly: scales the tail and ear bones and keeps
/// shader and animator parameters in named slots.
#[derive(Debug, Clone)]
pub struct BoneRig {
    root: RigNode,
    tail: Vec<usize>,
    ears: Vec<Vec<usize>>,
    params: BTreeMap<&'static str, f32>,
}

impl BoneRig {
    /// Resolve every bone up front so a missing one fails at load time.
    pub fn new(root: RigNode, names: &BoneNames) -> anyhow::Result<Self> {
        let tail = root
            .find_path(&names.tail)
            .with_context(|| format!("Tail bone '{}' not found under '{}'", names.tail, root.name))?;
        let ears = names
            .ears
            .iter()
            .map(|ear| {
                root.find_path(ear)
                    .with_context(|| format!("Ear bone '{}' not found under '{}'", ear, root.name))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            root,
            tail,
            ears,
            params: BTreeMap::new(),
        })
    }

    pub fn root(&self) -> &RigNode {
        &self.root
    }

    pub fn param(&self, name: &str) -> Option<f32> {
        self.params.get(name).copied()
    }
}

impl EffectorSink for BoneRig {
    fn apply(&mut self, frame: &RigFrame) {
        self.root.at_mut(&self.tail).set_uniform_scale(frame.tail_scale);
        for ear in &self.ears {
            self.root.at_mut(ear).set_uniform_scale(frame.ear_scale);
        }

        self.params.insert("belly", frame.belly_blend);
        self.params.insert("_Blush", frame.blush);
        self.params.insert("_PupilSize", frame.pupil_size);
        self.params.insert("Startle", frame.startle_blend);
        self.params.insert("Horny", frame.horny_blend);
        self.params.insert("Concern", frame.concern_blend);
    }
}
