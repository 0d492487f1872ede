#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod store;
pub mod state;
pub mod errors;
pub mod backend;
pub mod stage;
pub mod pipeline_key;
pub mod pipeline;
pub mod manager;

pub use store::{KeyedStore, ObjectId};
pub use state::{BlendFactor, BlendMode, BlendOperation, ColorWrites, CompareFunction, MaterialDescriptor, MaterialId, RenderState, Side, StencilOperation};
pub use errors::{BackendError, PipelineError, Result};
pub use backend::{Backend, Bindings, CacheToken, ComputePipelineDescriptor, RenderPipelineDescriptor, RenderShaderSource, ShaderBuilder, StageDescriptor};
pub use stage::{ShaderStage, StageId, StageKind, StageRegistry};
pub use pipeline_key::{ComputePipelineKey, PipelineKey, RenderPipelineKey};
pub use pipeline::{CacheStats, Pipeline, PipelineId, PipelineKind, PipelineRegistry};
pub use manager::PipelineManager;
