//! Fixed-function render state carried by materials

use serde::{Deserialize, Serialize};

/// Which triangle faces are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    /// Counter-clockwise (front) faces
    #[default]
    Front,
    /// Clockwise (back) faces
    Back,
    /// Both faces, no culling
    Double,
}

impl Side {
    /// Name used in program cache keys
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
            Self::Double => "double",
        }
    }

    /// Side with front and back swapped; double stays double
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
            Self::Double => Self::Double,
        }
    }
}

/// Blend equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendEquation {
    /// `src + dst`
    #[default]
    Add,
    /// `src - dst`
    Subtract,
    /// `dst - src`
    ReverseSubtract,
    /// `min(src, dst)`
    Min,
    /// `max(src, dst)`
    Max,
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source color
    SrcColor,
    /// 1 - source color
    OneMinusSrcColor,
    /// Source alpha
    SrcAlpha,
    /// 1 - source alpha
    OneMinusSrcAlpha,
    /// Destination color
    DstColor,
    /// 1 - destination color
    OneMinusDstColor,
    /// Destination alpha
    DstAlpha,
    /// 1 - destination alpha
    OneMinusDstAlpha,
    /// Saturated source alpha
    SrcAlphaSaturate,
}

/// Fully specified blend function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlendFunction {
    /// Color equation
    pub equation: BlendEquation,
    /// Color source factor
    pub src: BlendFactor,
    /// Color destination factor
    pub dst: BlendFactor,
    /// Alpha equation
    pub equation_alpha: BlendEquation,
    /// Alpha source factor
    pub src_alpha: BlendFactor,
    /// Alpha destination factor
    pub dst_alpha: BlendFactor,
}

impl BlendFunction {
    const fn same(equation: BlendEquation, src: BlendFactor, dst: BlendFactor) -> Self {
        Self {
            equation,
            src,
            dst,
            equation_alpha: equation,
            src_alpha: src,
            dst_alpha: dst,
        }
    }
}

/// Blending presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Blending {
    /// Blending disabled
    None,
    /// Standard alpha blending
    #[default]
    Normal,
    /// Add source onto destination
    Additive,
    /// Subtract source from destination
    Subtractive,
    /// Multiply destination by source
    Multiply,
    /// Caller-provided function
    Custom(BlendFunction),
}

impl Blending {
    /// Name used in program cache keys and logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Normal => "normal",
            Self::Additive => "additive",
            Self::Subtractive => "subtractive",
            Self::Multiply => "multiply",
            Self::Custom(_) => "custom",
        }
    }

    /// Device blend function, `None` when blending is off
    ///
    /// Premultiplied alpha switches the presets to their premultiplied forms.
    pub const fn function(&self, premultiplied_alpha: bool) -> Option<BlendFunction> {
        use BlendEquation::{Add, ReverseSubtract};
        use BlendFactor::{One, OneMinusSrcAlpha, OneMinusSrcColor, SrcAlpha, SrcColor, Zero};
        match (self, premultiplied_alpha) {
            (Self::None, _) => None,
            (Self::Normal, false) => Some(BlendFunction {
                equation: Add,
                src: SrcAlpha,
                dst: OneMinusSrcAlpha,
                equation_alpha: Add,
                src_alpha: One,
                dst_alpha: OneMinusSrcAlpha,
            }),
            (Self::Normal, true) => Some(BlendFunction::same(Add, One, OneMinusSrcAlpha)),
            (Self::Additive, false) => Some(BlendFunction::same(Add, SrcAlpha, One)),
            (Self::Additive, true) => Some(BlendFunction::same(Add, One, One)),
            (Self::Subtractive, false) => Some(BlendFunction {
                equation: ReverseSubtract,
                src: Zero,
                dst: OneMinusSrcColor,
                equation_alpha: Add,
                src_alpha: Zero,
                dst_alpha: One,
            }),
            (Self::Subtractive, true) => Some(BlendFunction::same(Add, Zero, OneMinusSrcColor)),
            (Self::Multiply, false) => Some(BlendFunction::same(Add, Zero, SrcColor)),
            (Self::Multiply, true) => Some(BlendFunction {
                equation: Add,
                src: Zero,
                dst: SrcColor,
                equation_alpha: Add,
                src_alpha: Zero,
                dst_alpha: SrcAlpha,
            }),
            (Self::Custom(f), _) => Some(*f),
        }
    }
}

/// Comparison used for depth and stencil tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompareFunction {
    /// Never passes
    Never,
    /// Passes when less
    Less,
    /// Passes when equal
    Equal,
    /// Passes when less or equal
    #[default]
    LessEqual,
    /// Passes when greater
    Greater,
    /// Passes when not equal
    NotEqual,
    /// Passes when greater or equal
    GreaterEqual,
    /// Always passes
    Always,
}

/// Stencil buffer operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StencilOp {
    /// Keep the current value
    #[default]
    Keep,
    /// Set to zero
    Zero,
    /// Set to the reference value
    Replace,
    /// Increment with clamping
    Increment,
    /// Increment with wrapping
    IncrementWrap,
    /// Decrement with clamping
    Decrement,
    /// Decrement with wrapping
    DecrementWrap,
    /// Bitwise invert
    Invert,
}

/// Stencil test configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StencilState {
    /// Comparison against the reference
    pub func: CompareFunction,
    /// Reference value
    pub reference: u32,
    /// Mask applied to reference and stored value before comparison
    pub func_mask: u32,
    /// Mask applied to writes
    pub write_mask: u32,
    /// Operation when the stencil test fails
    pub fail: StencilOp,
    /// Operation when the stencil test passes but depth fails
    pub z_fail: StencilOp,
    /// Operation when both tests pass
    pub z_pass: StencilOp,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            func: CompareFunction::Always,
            reference: 0,
            func_mask: 0xff,
            write_mask: 0xff,
            fail: StencilOp::Keep,
            z_fail: StencilOp::Keep,
            z_pass: StencilOp::Keep,
        }
    }
}

/// Depth offset to avoid z-fighting of coplanar geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygonOffset {
    /// Slope-scaled factor
    pub factor: f64,
    /// Constant units
    pub units: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_presets() {
        assert_eq!(Blending::None.function(false), None);
        let normal = Blending::Normal.function(false);
        assert_eq!(normal.map(|f| f.src), Some(BlendFactor::SrcAlpha));
        assert_eq!(normal.map(|f| f.src_alpha), Some(BlendFactor::One));
        let premultiplied = Blending::Normal.function(true);
        assert_eq!(premultiplied.map(|f| f.src), Some(BlendFactor::One));
        assert_eq!(
            Blending::Subtractive.function(false).map(|f| f.equation),
            Some(BlendEquation::ReverseSubtract)
        );
    }

    #[test]
    fn test_side_flip() {
        assert_eq!(Side::Front.flipped(), Side::Back);
        assert_eq!(Side::Double.flipped(), Side::Double);
    }
}
