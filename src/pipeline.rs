//! Pipeline interning and reference counting.
//!
//! Pipelines are deduplicated by [`PipelineKey`]: requests that reduce to
//! an equal key share one native pipeline object, with a share count
//! tracking how many object records point at it. Each pipeline holds one
//! counted reference to every stage it links, taken when the pipeline is
//! created and given back when it is destroyed, always after the native
//! pipeline object itself is gone.
//!
//! Release is split in two so a caller can drop its old reference, rebuild
//! (possibly re-hitting the same pipeline), and only then destroy:
//! [`begin_release`] decrements, [`sweep`] destroys if the count is still
//! zero. [`release`] does both for the simple case.
//!
//! [`begin_release`]: PipelineRegistry::begin_release
//! [`sweep`]: PipelineRegistry::sweep
//! [`release`]: PipelineRegistry::release

use std::fmt;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::{SmallVec, smallvec};

use crate::backend::{Backend, ComputePipelineDescriptor, RenderPipelineDescriptor};
use crate::errors::{PipelineError, Result};
use crate::pipeline_key::{ComputePipelineKey, PipelineKey, RenderPipelineKey};
use crate::stage::{StageId, StageRegistry};
use crate::store::ObjectId;

new_key_type! {
    /// Generational handle of an interned pipeline.
    pub struct PipelineId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Render,
    Compute,
}

impl PipelineKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Compute => "compute",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One interned pipeline plus its share count.
#[derive(Debug)]
pub struct Pipeline<H> {
    key: PipelineKey,
    stages: SmallVec<[StageId; 2]>,
    used_times: u32,
    handle: H,
}

impl<H> Pipeline<H> {
    #[must_use]
    pub fn kind(&self) -> PipelineKind {
        self.key.kind()
    }

    #[must_use]
    pub fn key(&self) -> PipelineKey {
        self.key
    }

    /// The stages this pipeline holds counted references to.
    #[must_use]
    pub fn stages(&self) -> &[StageId] {
        &self.stages
    }

    /// Number of object records sharing this pipeline.
    #[must_use]
    pub fn used_times(&self) -> u32 {
        self.used_times
    }

    #[must_use]
    pub fn handle(&self) -> &H {
        &self.handle
    }
}

/// Running hit/miss counters for pipeline interning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Intern requests answered by an existing pipeline.
    pub hits: u64,
    /// Intern requests that created a new pipeline.
    pub misses: u64,
}

/// Interning store for native pipelines.
#[derive(Debug)]
pub struct PipelineRegistry<H> {
    pipelines: SlotMap<PipelineId, Pipeline<H>>,
    by_key: FxHashMap<PipelineKey, PipelineId>,
    stats: CacheStats,
}

impl<H> Default for PipelineRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> PipelineRegistry<H> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipelines: SlotMap::with_key(),
            by_key: FxHashMap::default(),
            stats: CacheStats::default(),
        }
    }

    /// Returns the render pipeline for `key`, creating it on first sight.
    ///
    /// On creation the native pipeline is linked first, then one stage
    /// reference is acquired per stage; a link failure therefore leaves the
    /// stage counts untouched. The pipeline's own share count starts at
    /// zero, callers pair every record that stores the id with [`acquire`].
    ///
    /// [`acquire`]: Self::acquire
    pub fn intern_render<B>(
        &mut self,
        backend: &mut B,
        stages: &mut StageRegistry<B::StageHandle>,
        key: RenderPipelineKey,
        object: ObjectId,
    ) -> Result<PipelineId>
    where
        B: Backend<PipelineHandle = H>,
    {
        if let Some(&id) = self.by_key.get(&PipelineKey::Render(key)) {
            self.stats.hits += 1;
            return Ok(id);
        }
        self.stats.misses += 1;

        let handle = backend
            .create_render_pipeline(&RenderPipelineDescriptor {
                object,
                vertex_stage: stages.stage(key.vertex_stage).handle(),
                fragment_stage: stages.stage(key.fragment_stage).handle(),
                state: &key.state,
            })
            .map_err(|err| PipelineError::PipelineCreate {
                kind: PipelineKind::Render,
                source: err,
            })?;
        stages.acquire(key.vertex_stage);
        stages.acquire(key.fragment_stage);

        let id = self.insert(
            PipelineKey::Render(key),
            smallvec![key.vertex_stage, key.fragment_stage],
            handle,
        );
        log::debug!("Created render pipeline {id:?} (live: {})", self.pipelines.len());
        Ok(id)
    }

    /// Returns the compute pipeline for `key`, creating it on first sight.
    pub fn intern_compute<B>(
        &mut self,
        backend: &mut B,
        stages: &mut StageRegistry<B::StageHandle>,
        key: ComputePipelineKey,
        node: ObjectId,
    ) -> Result<PipelineId>
    where
        B: Backend<PipelineHandle = H>,
    {
        if let Some(&id) = self.by_key.get(&PipelineKey::Compute(key)) {
            self.stats.hits += 1;
            return Ok(id);
        }
        self.stats.misses += 1;

        let handle = backend
            .create_compute_pipeline(&ComputePipelineDescriptor {
                node,
                compute_stage: stages.stage(key.compute_stage).handle(),
            })
            .map_err(|err| PipelineError::PipelineCreate {
                kind: PipelineKind::Compute,
                source: err,
            })?;
        stages.acquire(key.compute_stage);

        let id = self.insert(
            PipelineKey::Compute(key),
            smallvec![key.compute_stage],
            handle,
        );
        log::debug!("Created compute pipeline {id:?} (live: {})", self.pipelines.len());
        Ok(id)
    }

    fn insert(&mut self, key: PipelineKey, stages: SmallVec<[StageId; 2]>, handle: H) -> PipelineId {
        let id = self.pipelines.insert(Pipeline {
            key,
            stages,
            used_times: 0,
            handle,
        });
        self.by_key.insert(key, id);
        id
    }

    /// Records one more object sharing `id`.
    pub fn acquire(&mut self, id: PipelineId) {
        if let Some(pipeline) = self.pipelines.get_mut(id) {
            pipeline.used_times += 1;
        } else {
            debug_assert!(false, "acquire of unknown pipeline {id:?}");
            log::error!("Acquire of unknown pipeline {id:?}");
        }
    }

    /// Drops one share of `id` without destroying anything yet.
    ///
    /// Pair with [`sweep`](Self::sweep) after any interning that might
    /// re-hit the same pipeline.
    pub fn begin_release(&mut self, id: PipelineId) {
        let Some(pipeline) = self.pipelines.get_mut(id) else {
            debug_assert!(false, "release of unknown pipeline {id:?}");
            log::error!("Release of unknown pipeline {id:?}");
            return;
        };
        if pipeline.used_times == 0 {
            debug_assert!(false, "pipeline {id:?} released more often than acquired");
            log::error!("Pipeline {id:?} released more often than acquired");
            return;
        }
        pipeline.used_times -= 1;
    }

    /// Destroys `id` if its share count is still zero.
    ///
    /// The native pipeline is destroyed before its stage references are
    /// given back, stages always outlive the pipelines linked against them.
    pub fn sweep<B>(
        &mut self,
        backend: &mut B,
        stages: &mut StageRegistry<B::StageHandle>,
        id: PipelineId,
    ) where
        B: Backend<PipelineHandle = H>,
    {
        if !self.pipelines.get(id).is_some_and(|p| p.used_times == 0) {
            return;
        }
        let Some(pipeline) = self.pipelines.remove(id) else {
            return;
        };
        let kind = pipeline.key.kind();
        self.by_key.remove(&pipeline.key);
        backend.destroy_pipeline(pipeline.handle);
        for stage in pipeline.stages {
            stages.release(backend, stage);
        }
        log::debug!("Destroyed {kind} pipeline {id:?}");
    }

    /// Drops one share of `id` and destroys it if it was the last.
    pub fn release<B>(
        &mut self,
        backend: &mut B,
        stages: &mut StageRegistry<B::StageHandle>,
        id: PipelineId,
    ) where
        B: Backend<PipelineHandle = H>,
    {
        self.begin_release(id);
        self.sweep(backend, stages, id);
    }

    /// Returns the pipeline behind `id`.
    ///
    /// **Panics** if the id is not live.
    #[must_use]
    pub fn pipeline(&self, id: PipelineId) -> &Pipeline<H> {
        &self.pipelines[id]
    }

    #[must_use]
    pub fn get(&self, id: PipelineId) -> Option<&Pipeline<H>> {
        self.pipelines.get(id)
    }

    /// Looks up the live pipeline interned under `key`, if any.
    #[must_use]
    pub fn find(&self, key: &PipelineKey) -> Option<PipelineId> {
        self.by_key.get(key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Destroys every pipeline regardless of share counts.
    ///
    /// Stage references are not given back one by one; pair with
    /// [`StageRegistry::clear`] afterwards, which destroys the stages
    /// wholesale.
    pub fn clear<B>(&mut self, backend: &mut B)
    where
        B: Backend<PipelineHandle = H>,
    {
        for (_, pipeline) in self.pipelines.drain() {
            backend.destroy_pipeline(pipeline.handle);
        }
        self.by_key.clear();
    }
}
