//! Typed vertex attribute buffers
//!
//! A [`BufferAttribute`] owns a flat typed array interpreted as `count`
//! items of `item_size` components. Integer arrays may be flagged as
//! normalized, in which case reads map them to `[0, 1]` (unsigned) or
//! `[-1, 1]` (signed) and writes quantize back.

use serde::{Deserialize, Serialize};

use crate::foundation::ids::ATTRIBUTE_IDS;
use crate::foundation::math::{
    MathError, MathResult, Matrix3, Matrix4, Vector2, Vector3, Vector4,
};

/// Scalar type of an attribute array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    /// 32-bit float
    F32,
    /// Unsigned byte
    U8,
    /// Signed byte
    I8,
    /// Unsigned short
    U16,
    /// Signed short
    I16,
    /// Unsigned int
    U32,
    /// Signed int
    I32,
}

impl ComponentType {
    /// Size of one component in bytes
    pub const fn byte_size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::F32 | Self::U32 | Self::I32 => 4,
        }
    }

    /// True for the float type
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32)
    }

    /// Map a stored integer value to `[0, 1]` or `[-1, 1]`
    ///
    /// Signed types clamp at `-1` so the most negative integer does not
    /// overshoot. Floats are not a normalized format.
    pub fn denormalize(self, value: f64) -> MathResult<f64> {
        Ok(match self {
            Self::F32 => return Err(Self::float_normalization_error()),
            Self::U8 => value / 255.0,
            Self::U16 => value / 65_535.0,
            Self::U32 => value / 4_294_967_295.0,
            Self::I8 => (value / 127.0).max(-1.0),
            Self::I16 => (value / 32_767.0).max(-1.0),
            Self::I32 => (value / 2_147_483_647.0).max(-1.0),
        })
    }

    /// Quantize a normalized value to the integer range of this type
    pub fn normalize(self, value: f64) -> MathResult<f64> {
        let (scale, min, max) = match self {
            Self::F32 => return Err(Self::float_normalization_error()),
            Self::U8 => (255.0, 0.0, 255.0),
            Self::U16 => (65_535.0, 0.0, 65_535.0),
            Self::U32 => (4_294_967_295.0, 0.0, 4_294_967_295.0),
            Self::I8 => (127.0, -127.0, 127.0),
            Self::I16 => (32_767.0, -32_767.0, 32_767.0),
            Self::I32 => (2_147_483_647.0, -2_147_483_647.0, 2_147_483_647.0),
        };
        Ok((value * scale).round().clamp(min, max))
    }

    fn float_normalization_error() -> MathError {
        MathError::InvalidFormat("float components cannot be normalized".to_string())
    }
}

/// Owned typed array backing an attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeArray {
    /// 32-bit floats
    F32(Vec<f32>),
    /// Unsigned bytes
    U8(Vec<u8>),
    /// Signed bytes
    I8(Vec<i8>),
    /// Unsigned shorts
    U16(Vec<u16>),
    /// Signed shorts
    I16(Vec<i16>),
    /// Unsigned ints
    U32(Vec<u32>),
    /// Signed ints
    I32(Vec<i32>),
}

macro_rules! each_array {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            AttributeArray::F32($v) => $body,
            AttributeArray::U8($v) => $body,
            AttributeArray::I8($v) => $body,
            AttributeArray::U16($v) => $body,
            AttributeArray::I16($v) => $body,
            AttributeArray::U32($v) => $body,
            AttributeArray::I32($v) => $body,
        }
    };
}

impl AttributeArray {
    /// Number of scalar elements
    pub fn len(&self) -> usize {
        each_array!(self, v => v.len())
    }

    /// True when the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalar type
    pub const fn component_type(&self) -> ComponentType {
        match self {
            Self::F32(_) => ComponentType::F32,
            Self::U8(_) => ComponentType::U8,
            Self::I8(_) => ComponentType::I8,
            Self::U16(_) => ComponentType::U16,
            Self::I16(_) => ComponentType::I16,
            Self::U32(_) => ComponentType::U32,
            Self::I32(_) => ComponentType::I32,
        }
    }

    /// Raw element as `f64`
    pub fn get(&self, index: usize) -> Option<f64> {
        each_array!(self, v => v.get(index).map(|x| f64::from(*x)))
    }

    /// Store `value` at `index`, converting with saturation
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set(&mut self, index: usize, value: f64) -> bool {
        match self {
            Self::F32(v) => v.get_mut(index).map(|x| *x = value as f32),
            Self::U8(v) => v.get_mut(index).map(|x| *x = value as u8),
            Self::I8(v) => v.get_mut(index).map(|x| *x = value as i8),
            Self::U16(v) => v.get_mut(index).map(|x| *x = value as u16),
            Self::I16(v) => v.get_mut(index).map(|x| *x = value as i16),
            Self::U32(v) => v.get_mut(index).map(|x| *x = value as u32),
            Self::I32(v) => v.get_mut(index).map(|x| *x = value as i32),
        }
        .is_some()
    }

    /// Byte view for device upload
    pub fn as_bytes(&self) -> &[u8] {
        each_array!(self, v => bytemuck::cast_slice(v.as_slice()))
    }

    /// Size in bytes
    pub fn byte_length(&self) -> usize {
        self.len() * self.component_type().byte_size()
    }

    /// New array of the same type holding the items at `indices`
    pub fn gather(&self, indices: &[u32], item_size: usize) -> Self {
        fn pick<T: Copy>(src: &[T], indices: &[u32], item_size: usize) -> Vec<T> {
            let mut out = Vec::with_capacity(indices.len() * item_size);
            for &i in indices {
                let start = i as usize * item_size;
                if let Some(item) = src.get(start..start + item_size) {
                    out.extend_from_slice(item);
                }
            }
            out
        }
        match self {
            Self::F32(v) => Self::F32(pick(v, indices, item_size)),
            Self::U8(v) => Self::U8(pick(v, indices, item_size)),
            Self::I8(v) => Self::I8(pick(v, indices, item_size)),
            Self::U16(v) => Self::U16(pick(v, indices, item_size)),
            Self::I16(v) => Self::I16(pick(v, indices, item_size)),
            Self::U32(v) => Self::U32(pick(v, indices, item_size)),
            Self::I32(v) => Self::I32(pick(v, indices, item_size)),
        }
    }

    /// Elements widened to `u32` (index buffers); `None` for float or signed data
    pub fn to_u32_vec(&self) -> Option<Vec<u32>> {
        match self {
            Self::U8(v) => Some(v.iter().map(|x| u32::from(*x)).collect()),
            Self::U16(v) => Some(v.iter().map(|x| u32::from(*x)).collect()),
            Self::U32(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Expected update frequency, forwarded to the device as a hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Usage {
    /// Written once
    #[default]
    Static,
    /// Rewritten occasionally
    Dynamic,
    /// Rewritten every frame
    Stream,
}

/// Sub-range of elements to re-upload instead of the whole buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRange {
    /// First element
    pub start: usize,
    /// Number of elements
    pub count: usize,
}

/// Typed per-vertex (or per-instance) data with identity and version tracking
#[derive(Debug, PartialEq)]
pub struct BufferAttribute {
    id: u64,
    array: AttributeArray,
    item_size: usize,
    /// Integer data is read as normalized floats
    pub normalized: bool,
    /// Update frequency hint
    pub usage: Usage,
    /// Instances sharing one item; zero for per-vertex data
    pub divisor: u32,
    update_ranges: Vec<UpdateRange>,
    version: u64,
}

impl Clone for BufferAttribute {
    /// Copies get a fresh identity so they upload independently
    fn clone(&self) -> Self {
        Self {
            id: ATTRIBUTE_IDS.next_id(),
            array: self.array.clone(),
            item_size: self.item_size,
            normalized: self.normalized,
            usage: self.usage,
            divisor: self.divisor,
            update_ranges: self.update_ranges.clone(),
            version: self.version,
        }
    }
}

impl BufferAttribute {
    /// Create an attribute over `array` with `item_size` components per item
    ///
    /// Normalizing a float array fails with [`MathError::InvalidFormat`].
    pub fn new(array: AttributeArray, item_size: usize, normalized: bool) -> MathResult<Self> {
        if item_size == 0 {
            return Err(MathError::InvalidFormat("item size must be at least 1".to_string()));
        }
        if normalized && array.component_type().is_float() {
            return Err(ComponentType::float_normalization_error());
        }
        Ok(Self {
            id: ATTRIBUTE_IDS.next_id(),
            array,
            item_size,
            normalized,
            usage: Usage::Static,
            divisor: 0,
            update_ranges: Vec::new(),
            version: 0,
        })
    }

    /// Float attribute; a zero `item_size` is treated as one
    pub fn from_f32(data: Vec<f32>, item_size: usize) -> Self {
        Self {
            id: ATTRIBUTE_IDS.next_id(),
            array: AttributeArray::F32(data),
            item_size: item_size.max(1),
            normalized: false,
            usage: Usage::Static,
            divisor: 0,
            update_ranges: Vec::new(),
            version: 0,
        }
    }

    /// Index attribute with one component per item
    pub fn from_index_array(array: AttributeArray) -> Self {
        Self {
            id: ATTRIBUTE_IDS.next_id(),
            array,
            item_size: 1,
            normalized: false,
            usage: Usage::Static,
            divisor: 0,
            update_ranges: Vec::new(),
            version: 0,
        }
    }

    /// Float attribute of 3D vectors
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_vector3s(vectors: &[Vector3]) -> Self {
        let data = vectors
            .iter()
            .flat_map(|v| [v.x as f32, v.y as f32, v.z as f32])
            .collect();
        Self::from_f32(data, 3)
    }

    /// Zero-filled float attribute holding `count` items
    pub fn zeroed(count: usize, item_size: usize) -> Self {
        Self::from_f32(vec![0.0; count * item_size.max(1)], item_size)
    }

    /// Builder: set the usage hint
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Builder: mark as per-instance data advancing every `divisor` instances
    pub fn with_divisor(mut self, divisor: u32) -> Self {
        self.divisor = divisor;
        self
    }

    /// Unique identity used by the device buffer cache
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Content version; bumped on every mutation
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Components per item
    pub const fn item_size(&self) -> usize {
        self.item_size
    }

    /// Number of items
    pub fn count(&self) -> usize {
        self.array.len() / self.item_size
    }

    /// Backing array
    pub const fn array(&self) -> &AttributeArray {
        &self.array
    }

    /// Scalar type of the backing array
    pub const fn component_type(&self) -> ComponentType {
        self.array.component_type()
    }

    /// Replace the backing array; the buffer is reallocated if its size changed
    pub fn set_array(&mut self, array: AttributeArray) -> &mut Self {
        self.array = array;
        self.update_ranges.clear();
        self.needs_update();
        self
    }

    /// Flag the data as modified so the next frame re-uploads it
    pub fn needs_update(&mut self) {
        self.version += 1;
    }

    /// Restrict the next upload to a sub-range (ranges accumulate)
    pub fn add_update_range(&mut self, start: usize, count: usize) -> &mut Self {
        self.update_ranges.push(UpdateRange { start, count });
        self
    }

    /// Pending partial-upload ranges
    pub fn update_ranges(&self) -> &[UpdateRange] {
        &self.update_ranges
    }

    /// Drop pending partial-upload ranges
    pub fn clear_update_ranges(&mut self) {
        self.update_ranges.clear();
    }

    /// Byte view for device upload
    pub fn as_bytes(&self) -> &[u8] {
        self.array.as_bytes()
    }

    /// Size of the backing array in bytes
    pub fn byte_length(&self) -> usize {
        self.array.byte_length()
    }

    fn offset(&self, index: usize, component: usize) -> MathResult<usize> {
        if component >= self.item_size || index >= self.count() {
            return Err(MathError::IndexOutOfRange {
                index: index * self.item_size + component,
                len: self.array.len(),
            });
        }
        Ok(index * self.item_size + component)
    }

    /// Component `component` of item `index`, denormalized when flagged
    pub fn get_component(&self, index: usize, component: usize) -> MathResult<f64> {
        let offset = self.offset(index, component)?;
        let raw = self.array.get(offset).ok_or(MathError::IndexOutOfRange {
            index: offset,
            len: self.array.len(),
        })?;
        if self.normalized {
            self.component_type().denormalize(raw)
        } else {
            Ok(raw)
        }
    }

    /// Write component `component` of item `index`, quantizing when normalized
    ///
    /// Does not bump the version; call [`Self::needs_update`] after a batch of writes.
    pub fn set_component(&mut self, index: usize, component: usize, value: f64) -> MathResult<&mut Self> {
        let offset = self.offset(index, component)?;
        let stored = if self.normalized {
            self.component_type().normalize(value)?
        } else {
            value
        };
        self.array.set(offset, stored);
        Ok(self)
    }

    /// X component of item `index`
    pub fn get_x(&self, index: usize) -> MathResult<f64> {
        self.get_component(index, 0)
    }

    /// Y component of item `index`
    pub fn get_y(&self, index: usize) -> MathResult<f64> {
        self.get_component(index, 1)
    }

    /// Z component of item `index`
    pub fn get_z(&self, index: usize) -> MathResult<f64> {
        self.get_component(index, 2)
    }

    /// W component of item `index`
    pub fn get_w(&self, index: usize) -> MathResult<f64> {
        self.get_component(index, 3)
    }

    /// Set the X component of item `index`
    pub fn set_x(&mut self, index: usize, x: f64) -> MathResult<&mut Self> {
        self.set_component(index, 0, x)
    }

    /// Set the Y component of item `index`
    pub fn set_y(&mut self, index: usize, y: f64) -> MathResult<&mut Self> {
        self.set_component(index, 1, y)
    }

    /// Set the Z component of item `index`
    pub fn set_z(&mut self, index: usize, z: f64) -> MathResult<&mut Self> {
        self.set_component(index, 2, z)
    }

    /// Set the W component of item `index`
    pub fn set_w(&mut self, index: usize, w: f64) -> MathResult<&mut Self> {
        self.set_component(index, 3, w)
    }

    /// Set two components of item `index`
    pub fn set_xy(&mut self, index: usize, x: f64, y: f64) -> MathResult<&mut Self> {
        self.set_component(index, 0, x)?;
        self.set_component(index, 1, y)
    }

    /// Set three components of item `index`
    pub fn set_xyz(&mut self, index: usize, x: f64, y: f64, z: f64) -> MathResult<&mut Self> {
        self.set_component(index, 0, x)?;
        self.set_component(index, 1, y)?;
        self.set_component(index, 2, z)
    }

    /// Set four components of item `index`
    pub fn set_xyzw(&mut self, index: usize, x: f64, y: f64, z: f64, w: f64) -> MathResult<&mut Self> {
        self.set_component(index, 0, x)?;
        self.set_component(index, 1, y)?;
        self.set_component(index, 2, z)?;
        self.set_component(index, 3, w)
    }

    /// Item `index` as a 2D vector
    pub fn get_vector2(&self, index: usize) -> MathResult<Vector2> {
        Ok(Vector2::new(self.get_x(index)?, self.get_y(index)?))
    }

    /// Item `index` as a 3D vector
    pub fn get_vector3(&self, index: usize) -> MathResult<Vector3> {
        Ok(Vector3::new(self.get_x(index)?, self.get_y(index)?, self.get_z(index)?))
    }

    /// Item `index` as a 4D vector
    pub fn get_vector4(&self, index: usize) -> MathResult<Vector4> {
        Ok(Vector4::new(
            self.get_x(index)?,
            self.get_y(index)?,
            self.get_z(index)?,
            self.get_w(index)?,
        ))
    }

    /// Store a 3D vector at item `index`
    pub fn set_vector3(&mut self, index: usize, v: &Vector3) -> MathResult<&mut Self> {
        self.set_xyz(index, v.x, v.y, v.z)
    }

    fn map_vector3(&mut self, f: impl Fn(Vector3) -> Vector3) -> MathResult<()> {
        for i in 0..self.count() {
            let v = f(self.get_vector3(i)?);
            self.set_vector3(i, &v)?;
        }
        self.needs_update();
        Ok(())
    }

    /// Multiply every item by a 3x3 matrix (2D items are treated as homogeneous points)
    pub fn apply_matrix3(&mut self, m: &Matrix3) -> MathResult<()> {
        if self.item_size == 2 {
            for i in 0..self.count() {
                let v = self.get_vector2(i)?.apply_matrix3(m);
                self.set_xy(i, v.x, v.y)?;
            }
            self.needs_update();
            return Ok(());
        }
        self.map_vector3(|v| v.apply_matrix3(m))
    }

    /// Transform every item as a point
    pub fn apply_matrix4(&mut self, m: &Matrix4) -> MathResult<()> {
        self.map_vector3(|v| v.apply_matrix4(m))
    }

    /// Transform every item as a normal and renormalize
    pub fn apply_normal_matrix(&mut self, m: &Matrix3) -> MathResult<()> {
        self.map_vector3(|v| v.apply_normal_matrix(m))
    }

    /// Transform every item as a direction and renormalize
    pub fn transform_direction(&mut self, m: &Matrix4) -> MathResult<()> {
        self.map_vector3(|v| v.transform_direction(m))
    }

    /// Every item as a 3D vector (empty when `item_size < 3`)
    pub fn to_vector3s(&self) -> Vec<Vector3> {
        (0..self.count()).filter_map(|i| self.get_vector3(i).ok()).collect()
    }
}
