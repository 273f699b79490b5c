//! Out-of-process AAC-ELD decoder
//!
//! Fallback for streams the native FDK bindings cannot configure. A child
//! process is spawned from the configured command line, fed one LOAS/LATM
//! frame per decode call on stdin, and expected to write one fixed-size PCM
//! frame to stdout. The pipes are driven asynchronously so a slow or
//! wedged child cannot stall the receive loops; a round trip that
//! outlives the frame timeout fails the decode and the pipeline
//! substitutes silence. The child lives exactly as long as the decoder
//! and is killed when it drops.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::latm;
use super::{AudioDecoder, CodecError, DecoderConfig};

/// Longest a single frame round trip through the child may take.
const DECODE_TIMEOUT: Duration = Duration::from_millis(500);

/// AAC-ELD decoder running in a child process.
#[derive(Debug)]
pub struct EldPipeDecoder {
    // Held for lifetime scoping; kill_on_drop reaps the child with us
    _child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    config: DecoderConfig,
    out: Vec<u8>,
}

impl EldPipeDecoder {
    /// Spawn the external decoder.
    ///
    /// # Errors
    /// Returns `CodecError::Configuration` if no command is configured and
    /// `CodecError::Process` if the child fails to start.
    pub fn spawn(config: DecoderConfig, command: &[String]) -> Result<Self, CodecError> {
        let program = command
            .first()
            .ok_or_else(|| CodecError::Configuration("no external decoder configured".into()))?;

        let mut child = Command::new(program)
            .args(&command[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CodecError::Configuration("decoder child has no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CodecError::Configuration("decoder child has no stdout".into()))?;

        Ok(Self {
            _child: child,
            stdin,
            stdout,
            config,
            out: vec![0u8; config.output_size()],
        })
    }
}

#[async_trait]
impl AudioDecoder for EldPipeDecoder {
    fn config(&self) -> DecoderConfig {
        self.config
    }

    async fn decode(&mut self, input: &[u8]) -> Result<&[u8], CodecError> {
        let framed = latm::loas_frame(&self.config, input);

        let output_size = self.config.output_size();
        self.out.resize(output_size, 0);

        let exchange = async {
            self.stdin.write_all(&framed).await?;
            self.stdin.flush().await?;
            self.stdout.read_exact(&mut self.out).await?;
            Ok::<(), std::io::Error>(())
        };

        match tokio::time::timeout(DECODE_TIMEOUT, exchange).await {
            Ok(Ok(())) => Ok(&self.out),
            Ok(Err(e)) => Err(CodecError::Process(e)),
            Err(_) => Err(CodecError::Decode("external decoder timed out".into())),
        }
    }
}
