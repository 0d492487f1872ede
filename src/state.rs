//! Render state model.
//!
//! Plain, hashable descriptions of the fixed-function state that shapes a
//! render pipeline: blending, depth/stencil, color write mask and face
//! culling. Native backend descriptor types generally do not implement
//! `Hash` / `Eq`, so the cache works on these mirror enums and folds them
//! into its structural cache keys.
//!
//! [`RenderState`] is embedded whole in the render cache key and in the
//! per-object staleness snapshot, so adding a field here automatically
//! extends both; there is no second field list to keep in sync.

use bitflags::bitflags;

// ─── State Enums ─────────────────────────────────────────────────────────────

/// High-level blending preset carried by a material.
///
/// `Custom` defers to the explicit factor/equation fields of
/// [`RenderState`]; the presets cover the common cases and let backends
/// pick their canonical factor tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source overwrites destination.
    None,
    /// Standard alpha blending.
    Normal,
    Additive,
    Subtractive,
    Multiply,
    /// Use the explicit `blend_*` fields verbatim.
    Custom,
}

/// Multiplier applied to a blend input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    Src,
    OneMinusSrc,
    SrcAlpha,
    OneMinusSrcAlpha,
    Dst,
    OneMinusDst,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturated,
    Constant,
    OneMinusConstant,
}

/// How the two blend inputs are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Depth / stencil comparison predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Action taken on a stencil buffer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOperation {
    Keep,
    Zero,
    Replace,
    Invert,
    IncrementClamp,
    DecrementClamp,
    IncrementWrap,
    DecrementWrap,
}

/// Which triangle face gets rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Back,
    Double,
}

bitflags! {
    /// Per-channel color write mask.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u32 {
        const RED   = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE  = 1 << 2;
        const ALPHA = 1 << 3;
        const COLOR = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits();
        const ALL   = Self::COLOR.bits() | Self::ALPHA.bits();
    }
}

// ─── Render State ────────────────────────────────────────────────────────────

/// Fixed-function pipeline state tracked per material.
///
/// Every field participates in pipeline identity. The `Default` impl
/// matches the conventional opaque-material defaults: normal alpha
/// blending, depth write/test on with `LessEqual`, stencil off, all color
/// channels written, front-side rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderState {
    pub transparent: bool,
    pub blending: BlendMode,
    pub premultiplied_alpha: bool,
    pub blend_src: BlendFactor,
    pub blend_dst: BlendFactor,
    pub blend_equation: BlendOperation,
    /// Separate alpha-channel factor; `None` falls back to `blend_src`.
    pub blend_src_alpha: Option<BlendFactor>,
    /// Separate alpha-channel factor; `None` falls back to `blend_dst`.
    pub blend_dst_alpha: Option<BlendFactor>,
    /// Separate alpha-channel equation; `None` falls back to `blend_equation`.
    pub blend_equation_alpha: Option<BlendOperation>,
    pub color_write: ColorWrites,
    pub depth_write: bool,
    pub depth_test: bool,
    pub depth_func: CompareFunction,
    pub stencil_write: bool,
    pub stencil_func: CompareFunction,
    pub stencil_fail: StencilOperation,
    pub stencil_zfail: StencilOperation,
    pub stencil_zpass: StencilOperation,
    pub stencil_func_mask: u32,
    pub stencil_write_mask: u32,
    pub side: Side,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            transparent: false,
            blending: BlendMode::Normal,
            premultiplied_alpha: false,
            blend_src: BlendFactor::SrcAlpha,
            blend_dst: BlendFactor::OneMinusSrcAlpha,
            blend_equation: BlendOperation::Add,
            blend_src_alpha: None,
            blend_dst_alpha: None,
            blend_equation_alpha: None,
            color_write: ColorWrites::ALL,
            depth_write: true,
            depth_test: true,
            depth_func: CompareFunction::LessEqual,
            stencil_write: false,
            stencil_func: CompareFunction::Always,
            stencil_fail: StencilOperation::Keep,
            stencil_zfail: StencilOperation::Keep,
            stencil_zpass: StencilOperation::Keep,
            stencil_func_mask: 0xff,
            stencil_write_mask: 0xff,
            side: Side::Front,
        }
    }
}

// ─── Material Inputs ─────────────────────────────────────────────────────────

/// Opaque material identity, assigned by the embedding engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MaterialId(pub u64);

/// Material inputs to a render request.
///
/// `version` is bumped by the engine whenever pipeline-relevant material
/// content changes that the [`RenderState`] tuple cannot see (shader graph
/// edits, define flips, …); the cache compares it, never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialDescriptor {
    pub id: MaterialId,
    pub version: u64,
    pub state: RenderState,
}
