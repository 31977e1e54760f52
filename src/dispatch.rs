//! Request dispatch — route a decoded request to its handler
//!
//! A pure routing table over the declared action: transactions go to
//! the executor (which alone decides the reply content), availability
//! probes get the fixed `"available"` token, and everything else —
//! unrecognized actions and decode failures alike — gets
//! `"unknown-action"`.

use async_trait::async_trait;

use crate::error::Result;
use crate::registry::ContractDescriptor;
use crate::reply::ReplyChannel;
use crate::types::{Action, DecodedRequest};

/// Reply sent to availability probes
pub const AVAILABLE: &str = "available";

/// Reply sent for unrecognized or undecodable requests
pub const UNKNOWN_ACTION: &str = "unknown-action";

/// External collaborator that signs, submits, and settles transactions
///
/// The executor owns the reply for transaction requests; the relay
/// only forwards. Errors are logged at the dispatch boundary and
/// never propagate past a single message.
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    async fn execute(
        &self,
        contract: &ContractDescriptor,
        request: &DecodedRequest,
        reply: &ReplyChannel,
    ) -> Result<()>;
}

/// Stand-in executor for deployments without a settlement backend
///
/// Logs the request and leaves it unanswered.
pub struct NoopExecutor;

#[async_trait]
impl TransactionExecutor for NoopExecutor {
    async fn execute(
        &self,
        contract: &ContractDescriptor,
        request: &DecodedRequest,
        _reply: &ReplyChannel,
    ) -> Result<()> {
        tracing::warn!(
            contract = %contract.name,
            function = ?request.function_name,
            "No transaction executor configured, request dropped"
        );
        Ok(())
    }
}

/// Route one decoded request
pub async fn dispatch(
    executor: &dyn TransactionExecutor,
    contract: Option<&ContractDescriptor>,
    request: &DecodedRequest,
    reply: &ReplyChannel,
) {
    match &request.action {
        Some(Action::Transaction) => match contract {
            Some(contract) => {
                if let Err(e) = executor.execute(contract, request, reply).await {
                    tracing::error!(
                        contract = %contract.name,
                        error = %e,
                        "Transaction executor failed"
                    );
                }
            }
            None => {
                tracing::warn!("Transaction request on unregistered topic");
                reply.reply(UNKNOWN_ACTION, None).await;
            }
        },
        Some(Action::Availability) => {
            reply.reply(AVAILABLE, None).await;
        }
        _ => {
            reply.reply(UNKNOWN_ACTION, None).await;
        }
    }
}
