//! Built-in node types.
//!
//! Every built-in is a pure function of its inputs and resolved configuration.

use std::f64::consts::PI;

use gpi_port::{InputPort, OutputPort, PortType, PortValue};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::definition::{Compute, Config, Inputs, NodeDefinition};
use crate::error::NodeError;

/// Closed set of in-process node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Builtin {
  #[serde(rename = "_Constant")]
  Constant,
  #[serde(rename = "_Add")]
  Add,
  #[serde(rename = "_Subtract")]
  Subtract,
  #[serde(rename = "_Multiply")]
  Multiply,
  #[serde(rename = "_Range")]
  Range,
  #[serde(rename = "_Linspace")]
  Linspace,
  #[serde(rename = "_sin")]
  Sin,
  #[serde(rename = "_cos")]
  Cos,
  #[serde(rename = "_sinc")]
  Sinc,
  #[serde(rename = "_ArrayAdd")]
  ArrayAdd,
  #[serde(rename = "_ArrayMult")]
  ArrayMult,
  #[serde(rename = "_Plot")]
  Plot,
  #[serde(rename = "_Image")]
  Image,
}

/// Type name of the built-in whose compute is delegated to the external process.
pub const DYNAMIC_NODE: &str = "_DynamicNode";

impl Builtin {
  pub const ALL: [Builtin; 13] = [
    Builtin::Constant,
    Builtin::Add,
    Builtin::Subtract,
    Builtin::Multiply,
    Builtin::Range,
    Builtin::Linspace,
    Builtin::Sin,
    Builtin::Cos,
    Builtin::Sinc,
    Builtin::ArrayAdd,
    Builtin::ArrayMult,
    Builtin::Plot,
    Builtin::Image,
  ];

  pub fn node_type(self) -> &'static str {
    match self {
      Builtin::Constant => "_Constant",
      Builtin::Add => "_Add",
      Builtin::Subtract => "_Subtract",
      Builtin::Multiply => "_Multiply",
      Builtin::Range => "_Range",
      Builtin::Linspace => "_Linspace",
      Builtin::Sin => "_sin",
      Builtin::Cos => "_cos",
      Builtin::Sinc => "_sinc",
      Builtin::ArrayAdd => "_ArrayAdd",
      Builtin::ArrayMult => "_ArrayMult",
      Builtin::Plot => "_Plot",
      Builtin::Image => "_Image",
    }
  }

  /// The declaration for this built-in.
  pub fn definition(self) -> NodeDefinition {
    let reals = || PortType::array_of(PortType::Real);
    let scalars = || [PortType::Real, PortType::Integer];
    let signal = || [reals(), PortType::Vector];
    let def = |output: PortType| {
      NodeDefinition::new(
        self.node_type(),
        OutputPort::new(output),
        Compute::Builtin { builtin: self },
      )
    };

    match self {
      Builtin::Constant => def(PortType::Real).with_config("value", json!(10)),
      Builtin::Add => def(PortType::Integer)
        .with_input("a", InputPort::required(scalars()))
        .with_input("b", InputPort::required(scalars())),
      Builtin::Subtract => def(PortType::Real)
        .with_input("a", InputPort::required(scalars()))
        .with_input("b", InputPort::required(scalars()))
        .with_config("formula", json!("-")),
      Builtin::Multiply => def(PortType::Real)
        .with_input("a", InputPort::required(scalars()))
        .with_input("b", InputPort::required(scalars()))
        .with_config("formula", json!("\\times")),
      Builtin::Range => def(reals())
        .with_config("start", json!(-10.0))
        .with_config("end", json!(10.0))
        .with_config("step", json!(0.1)),
      Builtin::Linspace => def(reals())
        .with_config("start", json!(-100.0))
        .with_config("stop", json!(100.0))
        .with_config("num", json!(100)),
      Builtin::Sin | Builtin::Cos | Builtin::Sinc => def(reals())
        .with_input("a", InputPort::required(signal()))
        .with_config("amplitude", json!(1.0))
        .with_config("phaseOffset", json!(0.0))
        .with_config("frequency", json!(4.0)),
      Builtin::ArrayAdd => def(reals())
        .with_input("a", InputPort::required(signal()))
        .with_input("b", InputPort::required(signal()))
        .with_config("formula", json!("\\textbf{+}")),
      Builtin::ArrayMult => def(reals())
        .with_input("a", InputPort::required(signal()))
        .with_input("b", InputPort::required(signal()))
        .with_config("formula", json!("\\times")),
      Builtin::Plot => def(reals()).with_input("a", InputPort::required([reals()])),
      Builtin::Image => def(PortType::Image).with_input("a", InputPort::required([PortType::Image])),
    }
  }

  /// Evaluate this built-in. `config` must already be resolved against the defaults.
  pub fn compute(self, inputs: &Inputs, config: &Config) -> Result<PortValue, NodeError> {
    match self {
      Builtin::Constant => Ok(PortValue::Real(config_f64(config, "value")?)),
      Builtin::Add => {
        let sum = scalar(inputs, "a")? + scalar(inputs, "b")?;
        Ok(PortValue::Integer(sum.round() as i64))
      }
      Builtin::Subtract => Ok(PortValue::Real(scalar(inputs, "a")? - scalar(inputs, "b")?)),
      Builtin::Multiply => Ok(PortValue::Real(scalar(inputs, "a")? * scalar(inputs, "b")?)),
      Builtin::Range => {
        let start = config_f64(config, "start")?;
        let end = config_f64(config, "end")?;
        let step = config_f64(config, "step")?;
        Ok(PortValue::reals(range(start, end, step)?))
      }
      Builtin::Linspace => {
        let start = config_f64(config, "start")?;
        let stop = config_f64(config, "stop")?;
        let num = config_i64(config, "num")?;
        Ok(PortValue::reals(linspace(start, stop, num)?))
      }
      Builtin::Sin | Builtin::Cos | Builtin::Sinc => {
        let wave = Wave::from_config(config)?;
        let signal = reals(inputs, "a")?;
        let out = signal.into_iter().map(|x| match self {
          Builtin::Sin => wave.amplitude * (x * wave.frequency + wave.phase_offset).sin(),
          Builtin::Cos => wave.amplitude * (x * wave.frequency + wave.phase_offset).cos(),
          _ => wave.sinc(x),
        });
        Ok(PortValue::reals(out))
      }
      Builtin::ArrayAdd => zip_with(inputs, |a, b| a + b),
      Builtin::ArrayMult => zip_with(inputs, |a, b| a * b),
      Builtin::Plot | Builtin::Image => input(inputs, "a").cloned(),
    }
  }
}

/// All built-in declarations, including the remote-backed `_DynamicNode`.
pub fn builtin_definitions() -> Vec<NodeDefinition> {
  let mut defs: Vec<NodeDefinition> = Builtin::ALL.iter().map(|b| b.definition()).collect();
  defs.push(
    NodeDefinition::new(
      DYNAMIC_NODE,
      OutputPort::new(PortType::Real),
      Compute::Remote {
        remote_type: "add_int".to_string(),
      },
    )
    .with_input("a", InputPort::required([PortType::Real]))
    .with_input("b", InputPort::required([PortType::Real])),
  );
  defs
}

struct Wave {
  amplitude: f64,
  phase_offset: f64,
  frequency: f64,
}

impl Wave {
  fn from_config(config: &Config) -> Result<Self, NodeError> {
    Ok(Self {
      amplitude: config_f64(config, "amplitude")?,
      phase_offset: config_f64(config, "phaseOffset")?,
      frequency: config_f64(config, "frequency")?,
    })
  }

  fn sinc(&self, x: f64) -> f64 {
    let x = x * self.frequency + self.phase_offset;
    if x == 0.0 {
      return self.amplitude;
    }
    self.amplitude * (PI * x).sin() / (PI * x)
  }
}

/// Upper bound on the length of a sequence generated from config.
const MAX_SAMPLES: usize = 1 << 24;

fn range(start: f64, end: f64, step: f64) -> Result<Vec<f64>, NodeError> {
  if !start.is_finite() || !end.is_finite() {
    return Err(NodeError::InvalidConfig {
      key: if start.is_finite() { "end" } else { "start" }.to_string(),
      expected: "a finite number",
    });
  }
  if step <= 0.0 || start >= end || !step.is_finite() {
    return Ok(Vec::new());
  }
  let count = ((end - start) / step).ceil();
  if count > MAX_SAMPLES as f64 {
    return Err(NodeError::InvalidConfig {
      key: "step".to_string(),
      expected: "large enough to give at most 16777216 samples",
    });
  }
  Ok((0..count as usize).map(|i| start + i as f64 * step).collect())
}

fn linspace(start: f64, stop: f64, num: i64) -> Result<Vec<f64>, NodeError> {
  if num > MAX_SAMPLES as i64 {
    return Err(NodeError::InvalidConfig {
      key: "num".to_string(),
      expected: "at most 16777216",
    });
  }
  Ok(match num {
    n if n <= 0 => Vec::new(),
    1 => vec![start],
    n => {
      let step = (stop - start) / (n - 1) as f64;
      (0..n).map(|i| start + i as f64 * step).collect()
    }
  })
}

fn zip_with(inputs: &Inputs, op: impl Fn(f64, f64) -> f64) -> Result<PortValue, NodeError> {
  let a = reals(inputs, "a")?;
  let b = reals(inputs, "b")?;
  Ok(PortValue::reals(
    a.into_iter().zip(b).map(|(a, b)| op(a, b)),
  ))
}

fn input<'a>(inputs: &'a Inputs, port: &str) -> Result<&'a PortValue, NodeError> {
  inputs.get(port).ok_or_else(|| NodeError::MissingInput {
    port: port.to_string(),
  })
}

fn scalar(inputs: &Inputs, port: &str) -> Result<f64, NodeError> {
  let value = input(inputs, port)?;
  value.as_f64().ok_or_else(|| NodeError::InputType {
    port: port.to_string(),
    expected: "a number",
    actual: value.port_type(),
  })
}

fn reals(inputs: &Inputs, port: &str) -> Result<Vec<f64>, NodeError> {
  let value = input(inputs, port)?;
  value.as_reals().ok_or_else(|| NodeError::InputType {
    port: port.to_string(),
    expected: "a real sequence",
    actual: value.port_type(),
  })
}

fn config_f64(config: &Config, key: &str) -> Result<f64, NodeError> {
  config
    .get(key)
    .and_then(serde_json::Value::as_f64)
    .ok_or_else(|| NodeError::InvalidConfig {
      key: key.to_string(),
      expected: "a number",
    })
}

fn config_i64(config: &Config, key: &str) -> Result<i64, NodeError> {
  let value = config.get(key);
  value
    .and_then(serde_json::Value::as_i64)
    .or_else(|| {
      value
        .and_then(serde_json::Value::as_f64)
        .filter(|f| f.fract() == 0.0)
        .map(|f| f as i64)
    })
    .ok_or_else(|| NodeError::InvalidConfig {
      key: key.to_string(),
      expected: "an integer",
    })
}
