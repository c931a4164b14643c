use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PortError;

/// Type tag of a value flowing through a port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
  Integer,
  Real,
  Complex,
  /// Flat sequence of reals.
  Vector,
  /// Homogeneous array of the inner type.
  Array(Box<PortType>),
  /// Raster image blob.
  Image,
}

impl PortType {
  /// Shorthand for `Array<element>`.
  pub fn array_of(element: PortType) -> Self {
    PortType::Array(Box::new(element))
  }
}

impl fmt::Display for PortType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PortType::Integer => write!(f, "Integer"),
      PortType::Real => write!(f, "Real"),
      PortType::Complex => write!(f, "Complex"),
      PortType::Vector => write!(f, "Vector"),
      PortType::Array(inner) => write!(f, "Array<{}>", inner),
      PortType::Image => write!(f, "Image"),
    }
  }
}

/// Whether an output producing `output` may be wired into an input accepting `accepted`.
///
/// Matching is exact and structural. There is no numeric coercion here:
/// `Real` does not satisfy an input that only accepts `Integer`.
pub fn is_compatible(output: &PortType, accepted: &[PortType]) -> bool {
  accepted.iter().any(|candidate| candidate == output)
}

/// Connection-time check used by the topology layer before a wire is created.
pub fn check_connection(output: &PortType, accepted: &[PortType]) -> Result<(), PortError> {
  if is_compatible(output, accepted) {
    Ok(())
  } else {
    Err(PortError::PortTypeMismatch {
      output: output.clone(),
      accepted: accepted.to_vec(),
    })
  }
}
