use crate::array::ColumnData;
use std::fmt;

/// Element type of a column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DType {
    #[default]
    F64,
    F32,
    I64,
    I32,
    Bool,
}

impl DType {
    pub fn zero(self) -> Scalar {
        match self {
            DType::F64 => Scalar::F64(0.0),
            DType::F32 => Scalar::F32(0.0),
            DType::I64 => Scalar::I64(0),
            DType::I32 => Scalar::I32(0),
            DType::Bool => Scalar::Bool(false),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::F64 => "f64",
            DType::F32 => "f32",
            DType::I64 => "i64",
            DType::I32 => "i32",
            DType::Bool => "bool",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single dynamically typed element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    F64(f64),
    F32(f32),
    I64(i64),
    I32(i32),
    Bool(bool),
}

/// Largest magnitude below which every integer is exactly representable as `f64`.
const F64_EXACT_INT: u64 = 1 << 53;
const F32_EXACT_INT: u64 = 1 << 24;

impl Scalar {
    pub fn dtype(self) -> DType {
        match self {
            Scalar::F64(_) => DType::F64,
            Scalar::F32(_) => DType::F32,
            Scalar::I64(_) => DType::I64,
            Scalar::I32(_) => DType::I32,
            Scalar::Bool(_) => DType::Bool,
        }
    }

    /// Convert to `dtype` if, and only if, the conversion is exact.
    ///
    /// Booleans never convert to or from numbers. `NaN` survives float-to-float
    /// conversions but not float-to-integer ones.
    pub fn cast(self, dtype: DType) -> Option<Scalar> {
        if self.dtype() == dtype {
            return Some(self);
        }
        match (self, dtype) {
            (Scalar::F32(v), DType::F64) => Some(Scalar::F64(f64::from(v))),
            (Scalar::I32(v), DType::F64) => Some(Scalar::F64(f64::from(v))),
            (Scalar::I32(v), DType::I64) => Some(Scalar::I64(i64::from(v))),
            (Scalar::I64(v), DType::F64) => {
                (v.unsigned_abs() <= F64_EXACT_INT).then_some(Scalar::F64(v as f64))
            }
            (Scalar::I64(v), DType::F32) => {
                (v.unsigned_abs() <= F32_EXACT_INT).then_some(Scalar::F32(v as f32))
            }
            (Scalar::I32(v), DType::F32) => {
                (u64::from(v.unsigned_abs()) <= F32_EXACT_INT).then_some(Scalar::F32(v as f32))
            }
            (Scalar::I64(v), DType::I32) => i32::try_from(v).ok().map(Scalar::I32),
            (Scalar::F64(v), DType::F32) => {
                let narrowed = v as f32;
                (v.is_nan() || f64::from(narrowed) == v).then_some(Scalar::F32(narrowed))
            }
            (Scalar::F64(v), DType::I64) => float_to_int(v).map(Scalar::I64),
            (Scalar::F64(v), DType::I32) => float_to_int(v)
                .and_then(|v| i32::try_from(v).ok())
                .map(Scalar::I32),
            (Scalar::F32(v), DType::I64) => float_to_int(f64::from(v)).map(Scalar::I64),
            (Scalar::F32(v), DType::I32) => float_to_int(f64::from(v))
                .and_then(|v| i32::try_from(v).ok())
                .map(Scalar::I32),
            _ => None,
        }
    }

    pub fn as_f64(self) -> Option<f64> {
        match self.cast(DType::F64)? {
            Scalar::F64(v) => Some(v),
            _ => None,
        }
    }
}

fn float_to_int(v: f64) -> Option<i64> {
    if !v.is_finite() || v.fract() != 0.0 || v.abs() > F64_EXACT_INT as f64 {
        return None;
    }
    Some(v as i64)
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::F64(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::Bool(v) => write!(f, "{v}"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Rust element types that can back a column.
///
/// Implemented for `f64`, `f32`, `i64`, `i32` and `bool`; sealed.
pub trait Element: Copy + PartialEq + fmt::Debug + Default + 'static + sealed::Sealed {
    const DTYPE: DType;

    fn slice(data: &ColumnData) -> Option<&[Self]>;
    fn wrap(values: Vec<Self>) -> ColumnData;
    fn from_scalar(value: Scalar) -> Option<Self>;
    fn into_scalar(self) -> Scalar;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl sealed::Sealed for $ty {}

        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn slice(data: &ColumnData) -> Option<&[Self]> {
                match data {
                    ColumnData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn wrap(values: Vec<Self>) -> ColumnData {
                ColumnData::$variant(values)
            }

            fn from_scalar(value: Scalar) -> Option<Self> {
                match value {
                    Scalar::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_scalar(self) -> Scalar {
                Scalar::$variant(self)
            }
        }

        impl From<$ty> for Scalar {
            fn from(value: $ty) -> Self {
                Scalar::$variant(value)
            }
        }
    };
}

impl_element!(f64, F64);
impl_element!(f32, F32);
impl_element!(i64, I64);
impl_element!(i32, I32);
impl_element!(bool, Bool);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_casts_are_exact() {
        assert_eq!(Scalar::I32(-7).cast(DType::F64), Some(Scalar::F64(-7.0)));
        assert_eq!(Scalar::F32(0.5).cast(DType::F64), Some(Scalar::F64(0.5)));
        assert_eq!(Scalar::I32(3).cast(DType::I64), Some(Scalar::I64(3)));
    }

    #[test]
    fn lossy_casts_are_refused() {
        assert_eq!(Scalar::F64(0.1).cast(DType::F32), None);
        assert_eq!(Scalar::F64(1.5).cast(DType::I64), None);
        assert_eq!(Scalar::I64((1 << 53) + 1).cast(DType::F64), None);
        assert_eq!(Scalar::I64(i64::from(i32::MAX) + 1).cast(DType::I32), None);
        assert_eq!(Scalar::Bool(true).cast(DType::I32), None);
        assert_eq!(Scalar::F64(f64::NAN).cast(DType::I64), None);
    }

    #[test]
    fn representable_narrowing_is_allowed() {
        assert_eq!(Scalar::F64(0.5).cast(DType::F32), Some(Scalar::F32(0.5)));
        assert_eq!(Scalar::F64(-12.0).cast(DType::I32), Some(Scalar::I32(-12)));
        assert!(matches!(
            Scalar::F64(f64::NAN).cast(DType::F32),
            Some(Scalar::F32(v)) if v.is_nan()
        ));
    }
}
