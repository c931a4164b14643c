use serde::{Deserialize, Serialize};

use crate::error::PortError;
use crate::types::PortType;

/// A value travelling along a wire, tagged with its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortValue {
  Integer(i64),
  Real(f64),
  Complex { re: f64, im: f64 },
  Vector(Vec<f64>),
  Array(ArrayValue),
  Image(ImageValue),
}

impl PortValue {
  /// The tag this value carries.
  pub fn port_type(&self) -> PortType {
    match self {
      PortValue::Integer(_) => PortType::Integer,
      PortValue::Real(_) => PortType::Real,
      PortValue::Complex { .. } => PortType::Complex,
      PortValue::Vector(_) => PortType::Vector,
      PortValue::Array(array) => PortType::array_of(array.element.clone()),
      PortValue::Image(_) => PortType::Image,
    }
  }

  /// Build an `Array<Real>` value.
  pub fn reals(values: impl IntoIterator<Item = f64>) -> Self {
    PortValue::Array(ArrayValue::reals(values))
  }

  /// Scalar numeric payload, if any.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      PortValue::Integer(i) => Some(*i as f64),
      PortValue::Real(r) => Some(*r),
      _ => None,
    }
  }

  /// Payload of a `Vector` or `Array<Real>` as plain reals.
  pub fn as_reals(&self) -> Option<Vec<f64>> {
    match self {
      PortValue::Vector(values) => Some(values.clone()),
      PortValue::Array(array) => array.to_reals(),
      _ => None,
    }
  }

  /// Re-tag this value as `target`.
  ///
  /// Only lossless conversions between identically shaped payloads succeed:
  /// `Integer -> Real`, integral `Real -> Integer`, and `Vector <-> Array<Real>`.
  pub fn retag(self, target: &PortType) -> Result<PortValue, PortError> {
    let actual = self.port_type();
    if &actual == target {
      return Ok(self);
    }

    match (self, target) {
      (PortValue::Integer(i), PortType::Real) => Ok(PortValue::Real(i as f64)),
      (PortValue::Real(r), PortType::Integer)
        if r.fract() == 0.0 && r >= i64::MIN as f64 && r < i64::MAX as f64 =>
      {
        Ok(PortValue::Integer(r as i64))
      }
      (PortValue::Vector(values), PortType::Array(inner)) if **inner == PortType::Real => {
        Ok(PortValue::reals(values))
      }
      (PortValue::Array(array), PortType::Vector) if array.element == PortType::Real => {
        Ok(PortValue::Vector(array.to_reals().unwrap_or_default()))
      }
      _ => Err(PortError::Retag {
        expected: target.clone(),
        actual,
      }),
    }
  }
}

/// Homogeneous array whose items all carry the element tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArrayRepr")]
pub struct ArrayValue {
  element: PortType,
  items: Vec<PortValue>,
}

#[derive(Deserialize)]
struct ArrayRepr {
  element: PortType,
  #[serde(default)]
  items: Vec<PortValue>,
}

impl TryFrom<ArrayRepr> for ArrayValue {
  type Error = PortError;

  fn try_from(repr: ArrayRepr) -> Result<Self, Self::Error> {
    ArrayValue::new(repr.element, repr.items)
  }
}

impl ArrayValue {
  /// Build an array, checking every item against `element`.
  pub fn new(element: PortType, items: Vec<PortValue>) -> Result<Self, PortError> {
    for (index, item) in items.iter().enumerate() {
      let actual = item.port_type();
      if actual != element {
        return Err(PortError::ElementMismatch {
          index,
          expected: element,
          actual,
        });
      }
    }
    Ok(Self { element, items })
  }

  pub fn reals(values: impl IntoIterator<Item = f64>) -> Self {
    Self {
      element: PortType::Real,
      items: values.into_iter().map(PortValue::Real).collect(),
    }
  }

  pub fn element(&self) -> &PortType {
    &self.element
  }

  pub fn items(&self) -> &[PortValue] {
    &self.items
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Items as reals when the element type is `Real`.
  pub fn to_reals(&self) -> Option<Vec<f64>> {
    if self.element != PortType::Real {
      return None;
    }
    self.items.iter().map(PortValue::as_f64).collect()
  }
}

/// Raw 8-bit image, row-major, interleaved channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ImageRepr")]
pub struct ImageValue {
  width: u32,
  height: u32,
  channels: u8,
  data: Vec<u8>,
}

#[derive(Deserialize)]
struct ImageRepr {
  width: u32,
  height: u32,
  channels: u8,
  data: Vec<u8>,
}

impl TryFrom<ImageRepr> for ImageValue {
  type Error = PortError;

  fn try_from(repr: ImageRepr) -> Result<Self, Self::Error> {
    ImageValue::new(repr.width, repr.height, repr.channels, repr.data)
  }
}

impl ImageValue {
  pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, PortError> {
    let expected = width as usize * height as usize * channels as usize;
    if data.len() != expected {
      return Err(PortError::ImageSize {
        width,
        height,
        channels,
        actual: data.len(),
      });
    }
    Ok(Self {
      width,
      height,
      channels,
      data,
    })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn channels(&self) -> u8 {
    self.channels
  }

  pub fn data(&self) -> &[u8] {
    &self.data
  }
}
