//! Per-transfer lifecycle state.

use pairsync_proto::{ClientId, RoomId};

/// Status a [`TransferContext`] can occupy.
///
/// `Offered` is never constructed by normal flow in this implementation —
/// the source system sometimes left a transfer in a `created`-like status
/// without ever emitting a distinct "offered" status, and the decision
/// timeout worker defensively checked for both. That defensive check is
/// preserved here (see the timeout guard in `transfer_machine`) without
/// ever exercising this variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransferStatus {
    Created,
    Offered,
    WaitingResult,
    LanSuccess,
    FallbackRequested,
    FallbackTimeout,
    Completed,
}

impl TransferStatus {
    /// Once terminal, further triggers for this transfer are ignored.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::LanSuccess
                | Self::Completed
                | Self::FallbackRequested
                | Self::FallbackTimeout
        )
    }
}

#[derive(Clone, Debug)]
pub struct TransferContext {
    pub transfer_id: String,
    pub room: RoomId,
    pub sender_client_id: ClientId,
    pub receiver_client_id: Option<ClientId>,
    pub file_id: String,
    pub filename: String,
    pub status: TransferStatus,
    pub created_at_ms: i64,
    pub updated_at_ms: Option<i64>,
    pub decision_timeout_ms: u64,
    pub decision_deadline_ms: i64,
    pub last_reason: Option<String>,
}

impl TransferContext {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
