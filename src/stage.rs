//! Shader stage interning and reference counting.
//!
//! Stage identity is the exact source text per [`StageKind`]: two requests
//! with byte-identical source share one compiled stage, any difference
//! (including whitespace) compiles a new one. An xxh3-128 fingerprint of
//! the source is kept alongside each stage for logs and `Debug` output;
//! the lookup itself always compares full text, so colliding hashes can
//! never alias two different shaders.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use xxhash_rust::xxh3::xxh3_128;

use crate::backend::{Backend, StageDescriptor};
use crate::errors::{PipelineError, Result};

new_key_type! {
    /// Generational handle of an interned shader stage.
    pub struct StageId;
}

/// The programmable pipeline slot a stage compiles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
    Compute,
}

impl StageKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compiled shader stage plus its share count.
pub struct ShaderStage<H> {
    kind: StageKind,
    source: Arc<str>,
    source_hash: u128,
    used_times: u32,
    handle: H,
}

impl<H> ShaderStage<H> {
    #[must_use]
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// The exact source text this stage was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// xxh3-128 fingerprint of the source text, for logs and diagnostics.
    #[must_use]
    pub fn source_hash(&self) -> u128 {
        self.source_hash
    }

    /// Number of live pipelines linked against this stage.
    #[must_use]
    pub fn used_times(&self) -> u32 {
        self.used_times
    }

    #[must_use]
    pub fn handle(&self) -> &H {
        &self.handle
    }
}

impl<H> fmt::Debug for ShaderStage<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderStage")
            .field("kind", &self.kind)
            .field("source_hash", &format_args!("{:032x}", self.source_hash))
            .field("source_len", &self.source.len())
            .field("used_times", &self.used_times)
            .finish_non_exhaustive()
    }
}

/// Interning store for compiled shader stages.
///
/// Keeps one lookup map per [`StageKind`], so a vertex stage and a compute
/// stage with coincidentally identical text stay distinct.
#[derive(Debug)]
pub struct StageRegistry<H> {
    stages: SlotMap<StageId, ShaderStage<H>>,
    vertex_lookup: FxHashMap<Arc<str>, StageId>,
    fragment_lookup: FxHashMap<Arc<str>, StageId>,
    compute_lookup: FxHashMap<Arc<str>, StageId>,
}

impl<H> Default for StageRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> StageRegistry<H> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: SlotMap::with_key(),
            vertex_lookup: FxHashMap::default(),
            fragment_lookup: FxHashMap::default(),
            compute_lookup: FxHashMap::default(),
        }
    }

    fn lookup(&self, kind: StageKind) -> &FxHashMap<Arc<str>, StageId> {
        match kind {
            StageKind::Vertex => &self.vertex_lookup,
            StageKind::Fragment => &self.fragment_lookup,
            StageKind::Compute => &self.compute_lookup,
        }
    }

    fn lookup_mut(&mut self, kind: StageKind) -> &mut FxHashMap<Arc<str>, StageId> {
        match kind {
            StageKind::Vertex => &mut self.vertex_lookup,
            StageKind::Fragment => &mut self.fragment_lookup,
            StageKind::Compute => &mut self.compute_lookup,
        }
    }

    /// Returns the stage compiled from `source`, compiling it on first sight.
    ///
    /// The returned flag is `true` when this call compiled a new stage and
    /// `false` on a cache hit. The share count is not touched either way;
    /// callers pair every successfully linked pipeline with [`acquire`].
    ///
    /// [`acquire`]: Self::acquire
    pub fn intern<B>(
        &mut self,
        backend: &mut B,
        kind: StageKind,
        source: &str,
    ) -> Result<(StageId, bool)>
    where
        B: Backend<StageHandle = H>,
    {
        if let Some(&id) = self.lookup(kind).get(source) {
            return Ok((id, false));
        }

        let handle = backend
            .create_stage(&StageDescriptor { kind, source })
            .map_err(|err| PipelineError::StageCompile { kind, source: err })?;

        let source: Arc<str> = Arc::from(source);
        let source_hash = xxh3_128(source.as_bytes());
        let id = self.stages.insert(ShaderStage {
            kind,
            source: Arc::clone(&source),
            source_hash,
            used_times: 0,
            handle,
        });
        log::debug!(
            "Compiled {kind} stage ({} bytes, xxh3 {source_hash:032x})",
            source.len()
        );
        self.lookup_mut(kind).insert(source, id);

        Ok((id, true))
    }

    /// Records one more pipeline linked against `id`.
    pub fn acquire(&mut self, id: StageId) {
        if let Some(stage) = self.stages.get_mut(id) {
            stage.used_times += 1;
        } else {
            debug_assert!(false, "acquire of unknown stage {id:?}");
            log::error!("Acquire of unknown shader stage {id:?}");
        }
    }

    /// Records that one pipeline linked against `id` is gone, destroying
    /// the stage when the last one goes.
    pub fn release<B>(&mut self, backend: &mut B, id: StageId)
    where
        B: Backend<StageHandle = H>,
    {
        let Some(stage) = self.stages.get_mut(id) else {
            debug_assert!(false, "release of unknown stage {id:?}");
            log::error!("Release of unknown shader stage {id:?}");
            return;
        };
        if stage.used_times == 0 {
            debug_assert!(false, "stage {id:?} released more often than acquired");
            log::error!("Shader stage {id:?} released more often than acquired");
            return;
        }
        stage.used_times -= 1;
        if stage.used_times == 0 {
            self.evict(backend, id);
        }
    }

    /// Destroys `id` if nothing ever linked against it (or nothing does
    /// anymore). Used to roll back stages compiled for a pipeline that then
    /// failed to link.
    pub fn discard_unused<B>(&mut self, backend: &mut B, id: StageId)
    where
        B: Backend<StageHandle = H>,
    {
        if self.stages.get(id).is_some_and(|stage| stage.used_times == 0) {
            self.evict(backend, id);
        }
    }

    fn evict<B>(&mut self, backend: &mut B, id: StageId)
    where
        B: Backend<StageHandle = H>,
    {
        let Some(stage) = self.stages.remove(id) else {
            return;
        };
        self.lookup_mut(stage.kind).remove(&*stage.source);
        log::debug!(
            "Destroyed {} stage (xxh3 {:032x})",
            stage.kind,
            stage.source_hash
        );
        backend.destroy_stage(stage.handle);
    }

    /// Returns the stage behind `id`.
    ///
    /// **Panics** if the id is not live.
    #[must_use]
    pub fn stage(&self, id: StageId) -> &ShaderStage<H> {
        &self.stages[id]
    }

    #[must_use]
    pub fn get(&self, id: StageId) -> Option<&ShaderStage<H>> {
        self.stages.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Destroys every stage regardless of share counts.
    ///
    /// Only valid once all pipelines are already gone; pipelines hold
    /// stage references and must be torn down first.
    pub fn clear<B>(&mut self, backend: &mut B)
    where
        B: Backend<StageHandle = H>,
    {
        for (_, stage) in self.stages.drain() {
            backend.destroy_stage(stage.handle);
        }
        self.vertex_lookup.clear();
        self.fragment_lookup.clear();
        self.compute_lookup.clear();
    }
}
