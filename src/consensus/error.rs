use thiserror::Error;

/// Request-level failures of a consensus evaluation.
///
/// Individual backend failures never surface here: they become excluded
/// verdicts and only count against the quorum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("insufficient quorum: {received} successful verdicts, {required} required")]
    InsufficientQuorum { required: usize, received: usize },

    #[error("no enabled backend matches the request")]
    AllBackendsDisabled,
}

impl ConsensusError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ConsensusError::InsufficientQuorum { .. } => "insufficient_quorum",
            ConsensusError::AllBackendsDisabled => "all_backends_disabled",
        }
    }
}
