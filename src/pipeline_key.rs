//! Structural pipeline cache keys.
//!
//! A pipeline's identity is the full set of inputs its native object is
//! built from, captured as plain typed fields and compared by `Eq`/`Hash`.
//! No string concatenation, no pre-hashed digests; the maps that use these
//! keys compare every field, so distinct keys can never alias.

use crate::backend::CacheToken;
use crate::pipeline::PipelineKind;
use crate::stage::StageId;
use crate::state::RenderState;

/// Identity of a render pipeline.
///
/// Two objects whose requests reduce to equal keys share one native
/// pipeline. Stage ids stand in for the interned source text, so a key is
/// only meaningful while its stages are live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPipelineKey {
    pub vertex_stage: StageId,
    pub fragment_stage: StageId,
    pub state: RenderState,
    pub token: CacheToken,
}

/// Identity of a compute pipeline.
///
/// Compute has no fixed-function state and no backend token; the interned
/// stage alone decides sharing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComputePipelineKey {
    pub compute_stage: StageId,
}

/// Either pipeline identity, as stored in the registry's lookup map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKey {
    Render(RenderPipelineKey),
    Compute(ComputePipelineKey),
}

impl PipelineKey {
    #[must_use]
    pub fn kind(self) -> PipelineKind {
        match self {
            Self::Render(_) => PipelineKind::Render,
            Self::Compute(_) => PipelineKind::Compute,
        }
    }
}

impl From<RenderPipelineKey> for PipelineKey {
    fn from(key: RenderPipelineKey) -> Self {
        Self::Render(key)
    }
}

impl From<ComputePipelineKey> for PipelineKey {
    fn from(key: ComputePipelineKey) -> Self {
        Self::Compute(key)
    }
}
