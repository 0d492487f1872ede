//! Collaborator contracts.
//!
//! The cache makes no graphics API calls and generates no shader text;
//! both concerns live behind the traits in this module, implemented by the
//! embedding renderer:
//!
//! - [`Backend`] compiles and destroys native stages and pipelines, and
//!   answers two per-object questions ([`needs_update`] and
//!   [`cache_token`]).
//! - [`ShaderBuilder`] produces final stage source text for an object's
//!   current state.
//! - [`Bindings`] is told when a removed object's pipeline reference was
//!   released, so resource-binding caches can drop theirs too.
//!
//! [`needs_update`]: Backend::needs_update
//! [`cache_token`]: Backend::cache_token

use crate::errors::BackendError;
use crate::stage::StageKind;
use crate::state::RenderState;
use crate::store::ObjectId;

/// Opaque backend contribution to the render cache key.
///
/// Covers pipeline-relevant state only the backend can see (render target
/// formats, sample counts, …). Tokens are compared for equality, never
/// interpreted: two objects with equal tokens are compatible with the same
/// native pipeline as far as the backend is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CacheToken(pub u64);

/// Everything the backend needs to compile one shader stage.
#[derive(Debug, Clone, Copy)]
pub struct StageDescriptor<'a> {
    pub kind: StageKind,
    /// Final source text, exactly as interned.
    pub source: &'a str,
}

/// Everything the backend needs to link a render pipeline.
#[derive(Debug)]
pub struct RenderPipelineDescriptor<'a, H> {
    /// The object that triggered creation, for labels and diagnostics.
    pub object: ObjectId,
    pub vertex_stage: &'a H,
    pub fragment_stage: &'a H,
    pub state: &'a RenderState,
}

/// Everything the backend needs to link a compute pipeline.
#[derive(Debug)]
pub struct ComputePipelineDescriptor<'a, H> {
    /// The compute node that triggered creation.
    pub node: ObjectId,
    pub compute_stage: &'a H,
}

/// The native graphics API boundary.
///
/// Handles are opaque to the cache; it stores them, hands them back in
/// pipeline descriptors, and returns them for destruction exactly once.
pub trait Backend {
    /// Handle of a compiled shader stage (module / program object).
    type StageHandle;
    /// Handle of a linked pipeline object.
    type PipelineHandle;

    /// Compiles one shader stage from final source text.
    fn create_stage(
        &mut self,
        desc: &StageDescriptor<'_>,
    ) -> Result<Self::StageHandle, BackendError>;

    /// Destroys a stage handle. Only called once the last pipeline that
    /// linked against it is gone.
    fn destroy_stage(&mut self, handle: Self::StageHandle);

    /// Links a render pipeline from two compiled stages plus fixed-function
    /// state.
    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor<'_, Self::StageHandle>,
    ) -> Result<Self::PipelineHandle, BackendError>;

    /// Links a compute pipeline from a single compiled stage.
    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDescriptor<'_, Self::StageHandle>,
    ) -> Result<Self::PipelineHandle, BackendError>;

    /// Destroys a pipeline handle. Always called before the stages the
    /// pipeline references are destroyed.
    fn destroy_pipeline(&mut self, handle: Self::PipelineHandle);

    /// Backend-private staleness oracle, consulted on every render request.
    ///
    /// Returning `true` forces a rebuild even when the tracked snapshot is
    /// unchanged, for state the cache cannot see (geometry layout changes,
    /// backend-internal reconfiguration, …).
    fn needs_update(&mut self, object: ObjectId) -> bool;

    /// Backend contribution to `object`'s render cache key.
    fn cache_token(&mut self, object: ObjectId) -> CacheToken;
}

/// Shader source produced for a render object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderShaderSource {
    pub vertex: String,
    pub fragment: String,
}

/// Produces final stage source text for an object's current state.
///
/// Expected to be a pure function of that state. The cache deduplicates
/// the output by exact text, so builders should not cache compiled
/// artifacts themselves.
pub trait ShaderBuilder {
    fn build_for_render(&mut self, object: ObjectId) -> RenderShaderSource;
    fn build_for_compute(&mut self, node: ObjectId) -> String;
}

/// Observer for resource-binding caches that shadow pipeline lifetimes.
pub trait Bindings {
    /// `object`'s pipeline reference was just released by
    /// [`PipelineManager::remove`](crate::manager::PipelineManager::remove).
    fn delete(&mut self, object: ObjectId);
}
