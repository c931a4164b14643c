use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use gpi_node::{Config, Inputs};
use gpi_port::PortValue;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::RemoteError;
use crate::message::{Request, RunReply};
use crate::source::NodeSource;

/// Runs the host program once per request.
///
/// The program is invoked as `program args... nodes_dir`. The request is
/// written to its stdin, which is then closed, and the whole of stdout is
/// read as the response.
#[derive(Debug, Clone)]
pub struct ProcessNodeSource {
  program: PathBuf,
  args: Vec<String>,
  nodes_dir: PathBuf,
  timeout: Duration,
}

impl ProcessNodeSource {
  pub fn new(
    program: impl Into<PathBuf>,
    args: Vec<String>,
    nodes_dir: impl Into<PathBuf>,
    timeout: Duration,
  ) -> Self {
    Self {
      program: program.into(),
      args,
      nodes_dir: nodes_dir.into(),
      timeout,
    }
  }

  pub fn nodes_dir(&self) -> &Path {
    &self.nodes_dir
  }

  async fn exchange(&self, request: &Request) -> Result<Vec<u8>, RemoteError> {
    let payload = serde_json::to_vec(request).map_err(|e| RemoteError::Malformed {
      reason: format!("could not encode request: {}", e),
    })?;

    let mut child = Command::new(&self.program)
      .args(&self.args)
      .arg(&self.nodes_dir)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| RemoteError::Unavailable {
        reason: format!("failed to start {}: {}", self.program.display(), e),
      })?;

    let mut stdin = child.stdin.take().ok_or_else(|| RemoteError::Unavailable {
      reason: "child stdin was not captured".to_string(),
    })?;

    let write = async move {
      let sent = async {
        stdin.write_all(&payload).await?;
        stdin.shutdown().await
      }
      .await;
      match sent {
        // The host may reply without reading the whole request.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
      }
    };
    let run = async { tokio::try_join!(write, child.wait_with_output()) };

    let (_, output) = tokio::time::timeout(self.timeout, run)
      .await
      .map_err(|_| RemoteError::Timeout {
        timeout: self.timeout,
      })?
      .map_err(|e| RemoteError::Unavailable {
        reason: format!("i/o with {} failed: {}", self.program.display(), e),
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RemoteError::Unavailable {
        reason: format!("{} exited with {}: {}", self.program.display(), output.status, stderr.trim()),
      });
    }

    debug!(bytes = output.stdout.len(), "node source replied");
    Ok(output.stdout)
  }
}

#[async_trait]
impl NodeSource for ProcessNodeSource {
  #[instrument(skip(self), fields(program = %self.program.display()))]
  async fn list_nodes(&self) -> Result<Vec<serde_json::Value>, RemoteError> {
    let stdout = self.exchange(&Request::ListNodes).await?;
    serde_json::from_slice(&stdout).map_err(|e| RemoteError::Malformed {
      reason: format!("expected a list of node descriptions: {}", e),
    })
  }

  #[instrument(skip(self, inputs, config), fields(program = %self.program.display()))]
  async fn run_node(
    &self,
    node_type: &str,
    inputs: &Inputs,
    config: &Config,
  ) -> Result<PortValue, RemoteError> {
    let request = Request::RunNode {
      node_type: node_type.to_string(),
      inputs: inputs.clone(),
      config: config.clone(),
    };
    let stdout = self.exchange(&request).await?;
    let reply: RunReply = serde_json::from_slice(&stdout).map_err(|e| RemoteError::Malformed {
      reason: format!("expected a run reply: {}", e),
    })?;
    reply.into_result(node_type)
  }
}
