//! Background worker: arms one expiry timer per request and relays
//! transmitted results to their callers.
//!
//! Both a timer firing and a transmission arriving end up in [`deliver`].
//! The store's eviction is the only arbiter between them: whichever path
//! claims the request first answers it, the other is dropped. A timer
//! claims only the submission it was armed for, and is cancelled as soon
//! as that submission leaves the store.

use crate::domain::{Delivery, PendingRequest, RequestStore, TransmitResponse};
use crate::metrics;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Error delivered to callers whose request expired.
pub const TIMEOUT_MESSAGE: &str = "timeout exceeded: could not process request before expiry";

/// Request that needs an expiry timer.
#[derive(Debug, Clone)]
pub(crate) struct ArmTimer {
    pub workflow_execution_id: String,
    /// Store sequence number of the submission
    pub seq: u64,
    pub expires_at: Instant,
    /// Cancelled when the submission is answered or dropped
    pub cancel: CancellationToken,
}

/// Result of one finalize attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Finalized {
    Answered(Delivery),
    AlreadyHandled,
}

pub(crate) struct Worker {
    store: Arc<RequestStore>,
    arm_rx: mpsc::UnboundedReceiver<ArmTimer>,
    transmit_rx: mpsc::UnboundedReceiver<TransmitResponse>,
    cancel: CancellationToken,
    timers: TaskTracker,
}

impl Worker {
    pub(crate) fn new(
        store: Arc<RequestStore>,
        arm_rx: mpsc::UnboundedReceiver<ArmTimer>,
        transmit_rx: mpsc::UnboundedReceiver<TransmitResponse>,
        cancel: CancellationToken,
        timers: TaskTracker,
    ) -> Self {
        Self {
            store,
            arm_rx,
            transmit_rx,
            cancel,
            timers,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Consensus capability worker started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                Some(arm) = self.arm_rx.recv() => self.arm(arm),
                Some(msg) = self.transmit_rx.recv() => {
                    finalize(&self.store, msg).await;
                }
                else => break,
            }
        }

        info!("Consensus capability worker stopped");
    }

    fn arm(&self, arm: ArmTimer) {
        let store = Arc::clone(&self.store);
        let cancel = self.cancel.clone();

        self.timers.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = arm.cancel.cancelled() => {}
                _ = tokio::time::sleep_until(arm.expires_at) => {
                    let msg = TransmitResponse::failure(
                        arm.workflow_execution_id.as_str(),
                        TIMEOUT_MESSAGE,
                    );
                    let claimed = store.evict_if(&arm.workflow_execution_id, arm.seq);
                    if let Finalized::Answered(_) = deliver(claimed, msg).await {
                        metrics::record_request_timed_out();
                        info!(
                            workflow_execution_id = %arm.workflow_execution_id,
                            "Request expired before transmission"
                        );
                    }
                }
            }
        });
    }
}

/// Claim the request and answer it exactly once.
pub(crate) async fn finalize(store: &RequestStore, msg: TransmitResponse) -> Finalized {
    let claimed = store.evict(&msg.workflow_execution_id);
    deliver(claimed, msg).await
}

async fn deliver(claimed: Option<PendingRequest>, msg: TransmitResponse) -> Finalized {
    let Some(pending) = claimed else {
        debug!(
            workflow_execution_id = %msg.workflow_execution_id,
            "Request already handled, dropping response"
        );
        metrics::record_response_dropped("already_handled");
        return Finalized::AlreadyHandled;
    };

    let delivery = pending.respond(msg.response).await;
    match delivery {
        Delivery::Delivered => {
            metrics::record_response_delivered();
            debug!(
                workflow_execution_id = %msg.workflow_execution_id,
                "Response delivered"
            );
        }
        Delivery::CallerGone | Delivery::ChannelClosed => {
            metrics::record_response_dropped(delivery.as_str());
            warn!(
                workflow_execution_id = %msg.workflow_execution_id,
                reason = delivery.as_str(),
                "Caller no longer waiting for response"
            );
        }
    }
    Finalized::Answered(delivery)
}
