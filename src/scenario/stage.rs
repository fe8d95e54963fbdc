use std::fmt;

use super::ScenarioError;

/// How far an article has been observed to travel through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScenarioStage {
    Ingested,
    EifProduced,
    AssetsPropagated,
    ReadyToPublish,
    PublishTriggered,
    Published,
    Indexed,
}

impl ScenarioStage {
    pub const ALL: [ScenarioStage; 7] = [
        ScenarioStage::Ingested,
        ScenarioStage::EifProduced,
        ScenarioStage::AssetsPropagated,
        ScenarioStage::ReadyToPublish,
        ScenarioStage::PublishTriggered,
        ScenarioStage::Published,
        ScenarioStage::Indexed,
    ];

    /// The only stage reachable from this one, if any.
    pub fn next(&self) -> Option<ScenarioStage> {
        match self {
            ScenarioStage::Ingested => Some(ScenarioStage::EifProduced),
            ScenarioStage::EifProduced => Some(ScenarioStage::AssetsPropagated),
            ScenarioStage::AssetsPropagated => Some(ScenarioStage::ReadyToPublish),
            ScenarioStage::ReadyToPublish => Some(ScenarioStage::PublishTriggered),
            ScenarioStage::PublishTriggered => Some(ScenarioStage::Published),
            ScenarioStage::Published => Some(ScenarioStage::Indexed),
            ScenarioStage::Indexed => None, // Terminal state
        }
    }

    /// Stages only move one step forward. Staying put is a no-op.
    pub fn can_transition_to(&self, new_stage: &ScenarioStage) -> bool {
        self == new_stage || self.next().as_ref() == Some(new_stage)
    }

    pub fn try_transition(&self, new_stage: ScenarioStage) -> Result<ScenarioStage, ScenarioError> {
        if self.can_transition_to(&new_stage) {
            Ok(new_stage)
        } else {
            Err(ScenarioError::InvalidTransition {
                from: *self,
                to: new_stage,
            })
        }
    }
}

impl fmt::Display for ScenarioStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioStage::Ingested => "ingested",
            ScenarioStage::EifProduced => "eif-produced",
            ScenarioStage::AssetsPropagated => "assets-propagated",
            ScenarioStage::ReadyToPublish => "ready-to-publish",
            ScenarioStage::PublishTriggered => "publish-triggered",
            ScenarioStage::Published => "published",
            ScenarioStage::Indexed => "indexed",
        };
        f.write_str(name)
    }
}
