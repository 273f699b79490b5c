//! Audio session configuration

use std::path::PathBuf;

/// Configuration supplied by the collaborator that sets up a session.
#[derive(Debug, Clone, Default)]
pub struct AudioSessionConfig {
    /// UDP port for the control socket (0 = ephemeral)
    pub control_port: u16,
    /// UDP port for the data socket (0 = ephemeral)
    pub data_port: u16,
    /// Key into the session store
    pub session_id: String,
    /// Mirroring sessions disable retransmission and accept audio on the
    /// control socket
    pub is_mirroring: bool,
    /// Directory for raw/pcm packet dumps (only used with the `dump` feature)
    pub dump_path: Option<PathBuf>,
    /// Command line for the out-of-process AAC-ELD decoder fallback
    /// (argv[0] + arguments; empty = fallback disabled)
    pub eld_decoder_command: Vec<String>,
}
