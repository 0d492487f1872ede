//! Per-object pipeline cache front end.
//!
//! [`PipelineManager`] owns the backend, the stage and pipeline registries
//! and one record per object, and turns "give me this object's pipeline"
//! into cache hits whenever it can.
//!
//! # Staleness
//!
//! A render record is fresh when its stored snapshot (material id, material
//! version, full render state and backend cache token) equals the current
//! one and the backend's [`needs_update`] oracle stays quiet. A compute
//! record tracks a caller-supplied version number alone. Anything else, or
//! a record with no pipeline, triggers a rebuild.
//!
//! # Rebuild ordering
//!
//! A rebuild drops the object's old reference *before* interning, so an
//! unchanged stage or an identical key is reused instead of recreated, but
//! defers destruction until after: the old pipeline is swept once the new
//! one is in place (or the rebuild has failed), at which point anything
//! still unreferenced is destroyed. Stage and pipeline handles the object
//! no longer needs are thus reclaimed within the same call, and never
//! destroyed while the rebuild could still re-hit them.
//!
//! [`needs_update`]: Backend::needs_update

use crate::backend::{Backend, Bindings, CacheToken, RenderShaderSource, ShaderBuilder};
use crate::errors::Result;
use crate::pipeline::{CacheStats, Pipeline, PipelineId, PipelineRegistry};
use crate::pipeline_key::{ComputePipelineKey, RenderPipelineKey};
use crate::stage::{ShaderStage, StageId, StageKind, StageRegistry};
use crate::state::{MaterialDescriptor, MaterialId, RenderState};
use crate::store::{KeyedStore, ObjectId};

/// Inputs the last successful build was based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Snapshot {
    Render(RenderSnapshot),
    Compute { version: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderSnapshot {
    material: MaterialId,
    material_version: u64,
    state: RenderState,
    token: CacheToken,
}

#[derive(Debug, Default)]
struct ObjectRecord {
    pipeline: Option<PipelineId>,
    snapshot: Option<Snapshot>,
}

/// Owns the pipeline cache for one backend.
pub struct PipelineManager<B: Backend> {
    backend: B,
    bindings: Option<Box<dyn Bindings>>,
    records: KeyedStore<ObjectId, ObjectRecord>,
    stages: StageRegistry<B::StageHandle>,
    pipelines: PipelineRegistry<B::PipelineHandle>,
}

impl<B: Backend> PipelineManager<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            bindings: None,
            records: KeyedStore::new(),
            stages: StageRegistry::new(),
            pipelines: PipelineRegistry::new(),
        }
    }

    /// Registers the binding-cache observer notified by [`remove`].
    ///
    /// [`remove`]: Self::remove
    pub fn set_bindings(&mut self, bindings: Box<dyn Bindings>) {
        self.bindings = Some(bindings);
    }

    /// Returns `object`'s render pipeline, rebuilding it only when stale.
    ///
    /// On a rebuild the builder is asked for fresh source text and the
    /// result is interned; unchanged stages and an unchanged overall key
    /// come back as cache hits. On failure the object is left with no
    /// pipeline, previously shared stages stay alive for their other
    /// users, and stages compiled only for the failed attempt are
    /// destroyed again.
    pub fn get_for_render(
        &mut self,
        object: ObjectId,
        material: &MaterialDescriptor,
        builder: &mut impl ShaderBuilder,
    ) -> Result<PipelineId> {
        let token = self.backend.cache_token(object);
        let backend_dirty = self.backend.needs_update(object);
        let current = RenderSnapshot {
            material: material.id,
            material_version: material.version,
            state: material.state,
            token,
        };

        let record = self.records.get_or_create(object);
        if let Some(id) = record.pipeline
            && !backend_dirty
            && record.snapshot == Some(Snapshot::Render(current))
        {
            return Ok(id);
        }

        // Drop the old reference before interning so an unchanged stage or
        // an identical key is reused instead of recreated.
        let previous = record.pipeline.take();
        record.snapshot = None;
        if let Some(prev) = previous {
            self.pipelines.begin_release(prev);
        }

        let source = builder.build_for_render(object);
        let built = self.build_render(object, material.state, token, &source);

        if let Some(prev) = previous {
            // Runs on the failure path too; a now-unreferenced pipeline
            // must not linger.
            self.pipelines.sweep(&mut self.backend, &mut self.stages, prev);
        }
        let id = built?;

        let record = self.records.get_or_create(object);
        record.pipeline = Some(id);
        record.snapshot = Some(Snapshot::Render(current));
        Ok(id)
    }

    fn build_render(
        &mut self,
        object: ObjectId,
        state: RenderState,
        token: CacheToken,
        source: &RenderShaderSource,
    ) -> Result<PipelineId> {
        let (vertex_stage, vertex_created) =
            self.stages
                .intern(&mut self.backend, StageKind::Vertex, &source.vertex)?;
        let (fragment_stage, fragment_created) = match self.stages.intern(
            &mut self.backend,
            StageKind::Fragment,
            &source.fragment,
        ) {
            Ok(interned) => interned,
            Err(err) => {
                if vertex_created {
                    self.stages.discard_unused(&mut self.backend, vertex_stage);
                }
                return Err(err);
            }
        };

        let key = RenderPipelineKey {
            vertex_stage,
            fragment_stage,
            state,
            token,
        };
        match self
            .pipelines
            .intern_render(&mut self.backend, &mut self.stages, key, object)
        {
            Ok(id) => {
                self.pipelines.acquire(id);
                Ok(id)
            }
            Err(err) => {
                if fragment_created {
                    self.stages.discard_unused(&mut self.backend, fragment_stage);
                }
                if vertex_created {
                    self.stages.discard_unused(&mut self.backend, vertex_stage);
                }
                Err(err)
            }
        }
    }

    /// Returns `node`'s compute pipeline, rebuilding it only when `version`
    /// changed since the last successful build.
    ///
    /// Compute identity is the interned stage alone, so a version bump
    /// whose rebuilt source is byte-identical still lands on the same
    /// pipeline.
    pub fn get_for_compute(
        &mut self,
        node: ObjectId,
        version: u64,
        builder: &mut impl ShaderBuilder,
    ) -> Result<PipelineId> {
        let record = self.records.get_or_create(node);
        if let Some(id) = record.pipeline
            && record.snapshot == Some(Snapshot::Compute { version })
        {
            return Ok(id);
        }

        let previous = record.pipeline.take();
        record.snapshot = None;
        if let Some(prev) = previous {
            self.pipelines.begin_release(prev);
        }

        let source = builder.build_for_compute(node);
        let built = self.build_compute(node, &source);

        if let Some(prev) = previous {
            self.pipelines.sweep(&mut self.backend, &mut self.stages, prev);
        }
        let id = built?;

        let record = self.records.get_or_create(node);
        record.pipeline = Some(id);
        record.snapshot = Some(Snapshot::Compute { version });
        Ok(id)
    }

    fn build_compute(&mut self, node: ObjectId, source: &str) -> Result<PipelineId> {
        let (compute_stage, stage_created) =
            self.stages
                .intern(&mut self.backend, StageKind::Compute, source)?;
        let key = ComputePipelineKey { compute_stage };
        match self
            .pipelines
            .intern_compute(&mut self.backend, &mut self.stages, key, node)
        {
            Ok(id) => {
                self.pipelines.acquire(id);
                Ok(id)
            }
            Err(err) => {
                if stage_created {
                    self.stages.discard_unused(&mut self.backend, compute_stage);
                }
                Err(err)
            }
        }
    }

    /// Forgets `object`, releasing its pipeline reference.
    ///
    /// If a reference was actually released the registered [`Bindings`]
    /// observer is told to drop its own per-object state too. Unknown
    /// objects are a no-op.
    pub fn remove(&mut self, object: ObjectId) {
        let Some(record) = self.records.remove(object) else {
            return;
        };
        if let Some(id) = record.pipeline {
            self.pipelines
                .release(&mut self.backend, &mut self.stages, id);
            if let Some(bindings) = self.bindings.as_deref_mut() {
                bindings.delete(object);
            }
        }
    }

    /// Destroys every cached pipeline and stage and forgets all objects.
    ///
    /// Pipelines go first, their stage references are reclaimed wholesale
    /// when the stages are destroyed after.
    pub fn dispose(&mut self) {
        let pipelines = self.pipelines.len();
        let stages = self.stages.len();
        self.records.clear();
        self.pipelines.clear(&mut self.backend);
        self.stages.clear(&mut self.backend);
        log::info!("Pipeline cache disposed ({pipelines} pipelines, {stages} stages destroyed)");
    }

    /// Whether `object` currently has a record (even a failed one).
    #[must_use]
    pub fn has(&self, object: ObjectId) -> bool {
        self.records.contains(object)
    }

    /// The pipeline `object` last built successfully, if it is still
    /// current.
    #[must_use]
    pub fn cached_pipeline(&self, object: ObjectId) -> Option<PipelineId> {
        self.records.get(object).and_then(|record| record.pipeline)
    }

    #[must_use]
    pub fn pipeline(&self, id: PipelineId) -> Option<&Pipeline<B::PipelineHandle>> {
        self.pipelines.get(id)
    }

    #[must_use]
    pub fn stage(&self, id: StageId) -> Option<&ShaderStage<B::StageHandle>> {
        self.stages.get(id)
    }

    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.pipelines.stats()
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
