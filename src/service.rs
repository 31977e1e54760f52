//! Relay service — startup sequencing, event loop, and lifecycle
//!
//! Startup is a straight line of fallible steps: probe the node, load
//! the registry, check funding, bootstrap key material, fan out
//! subscriptions. After that the service reacts to subscription
//! traffic until a shutdown signal or balance starvation stops it.
//! Every planned stop maps to a successful exit.

use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::{RelayConfig, WhisperConfig};
use crate::decoder::decode;
use crate::dispatch::{dispatch, TransactionExecutor};
use crate::error::Result;
use crate::guard::{BalanceGuard, BalanceVerdict};
use crate::provider::{MessageStream, WhisperProvider};
use crate::registry::ContractRegistry;
use crate::reply::ReplyChannel;
use crate::subscription;
use crate::types::IncomingMessage;

/// Which signal asked the service to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownKind {
    /// Explicit shutdown: tear down subscriptions, then exit
    Interrupt,
    /// External termination request: log intent and exit
    Terminate,
}

/// How a service run ended; every variant is a planned, clean stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Stopped on a shutdown signal
    Shutdown,
    /// Stopped because the relayer account ran dry
    LowBalance,
    /// The node could not be reached at startup
    ConnectionFailed,
}

/// The message relay orchestrator
pub struct RelayService {
    config: RelayConfig,
    provider: Arc<dyn WhisperProvider>,
    executor: Arc<dyn TransactionExecutor>,
}

/// Shared context for spawned message handlers
struct HandlerCtx {
    provider: Arc<dyn WhisperProvider>,
    registry: Arc<ContractRegistry>,
    executor: Arc<dyn TransactionExecutor>,
    guard: BalanceGuard,
    whisper: WhisperConfig,
    key_id: String,
}

impl RelayService {
    pub fn new(
        config: RelayConfig,
        provider: Arc<dyn WhisperProvider>,
        executor: Arc<dyn TransactionExecutor>,
    ) -> Self {
        Self {
            config,
            provider,
            executor,
        }
    }

    /// Run the relay until a shutdown signal or a fatal condition
    pub async fn run<S>(&self, shutdown: S) -> Result<RunOutcome>
    where
        S: std::future::Future<Output = ShutdownKind>,
    {
        let endpoint = self.config.node.endpoint_url();
        match self.provider.is_listening().await {
            Ok(true) => {
                tracing::info!(%endpoint, provider = self.provider.name(), "Connected")
            }
            Ok(false) => {
                tracing::error!(%endpoint, "Node is not listening");
                return Ok(RunOutcome::ConnectionFailed);
            }
            Err(e) => {
                tracing::error!(%endpoint, error = %e, "Could not reach node");
                return Ok(RunOutcome::ConnectionFailed);
            }
        }

        let registry = Arc::new(ContractRegistry::load(&self.config.contracts)?);
        if registry.is_empty() {
            tracing::warn!("No contracts registered, the relay will serve no topics");
        }

        let guard = BalanceGuard::new(
            &self.config.account.address,
            self.config.account.min_balance()?,
        );

        // Pre-listen funding check; no subscriptions exist yet
        if let BalanceVerdict::Insufficient(balance) =
            guard.check(self.provider.as_ref()).await?
        {
            log_insufficient(&guard, balance);
            return Ok(RunOutcome::LowBalance);
        }

        let key_id = self.provider.new_key_pair().await?;
        let sym_key_id = self.provider.add_sym_key(&self.config.whisper.sym_key).await?;
        let public_key = self.provider.public_key(&key_id).await?;
        tracing::info!(%public_key, "Relayer key pair ready");

        let streams = subscription::open_all(
            self.provider.as_ref(),
            &registry,
            &key_id,
            &sym_key_id,
            &self.config.whisper,
        )
        .await?;

        let ctx = Arc::new(HandlerCtx {
            provider: self.provider.clone(),
            registry,
            executor: self.executor.clone(),
            guard,
            whisper: self.config.whisper.clone(),
            key_id,
        });

        self.listen(streams, ctx, shutdown).await
    }

    async fn listen<S>(
        &self,
        streams: Vec<Box<dyn MessageStream>>,
        ctx: Arc<HandlerCtx>,
        shutdown: S,
    ) -> Result<RunOutcome>
    where
        S: std::future::Future<Output = ShutdownKind>,
    {
        let mut inbox = futures::stream::select_all(streams.into_iter().map(into_stream));
        let (halt_tx, mut halt_rx) = mpsc::channel::<()>(1);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                kind = &mut shutdown => {
                    return match kind {
                        ShutdownKind::Interrupt => {
                            if let Err(e) = self.provider.clear_subscriptions().await {
                                tracing::warn!(error = %e, "Failed to clear subscriptions");
                            }
                            tracing::info!("Closing service");
                            Ok(RunOutcome::Shutdown)
                        }
                        ShutdownKind::Terminate => {
                            // Known gap: this path exits without tearing
                            // down subscriptions or flushing replies.
                            tracing::info!("Stopping");
                            Ok(RunOutcome::Shutdown)
                        }
                    };
                }
                Some(()) = halt_rx.recv() => {
                    if let Err(e) = self.provider.clear_subscriptions().await {
                        tracing::warn!(error = %e, "Failed to clear subscriptions");
                    }
                    return Ok(RunOutcome::LowBalance);
                }
                maybe = inbox.next() => match maybe {
                    Some(message) => {
                        // Messages are handled concurrently, not queued;
                        // each carries its own pre-flight balance check.
                        let topic = message.topic.clone();
                        let task =
                            tokio::spawn(handle_message(ctx.clone(), message, halt_tx.clone()));
                        tokio::spawn(async move {
                            if let Err(e) = task.await {
                                tracing::error!(%topic, error = %e, "Message handler failed");
                            }
                        });
                    }
                    None => {
                        tracing::warn!("All subscriptions closed");
                        return Ok(RunOutcome::Shutdown);
                    }
                }
            }
        }
    }
}

fn into_stream(stream: Box<dyn MessageStream>) -> BoxStream<'static, IncomingMessage> {
    Box::pin(futures::stream::unfold(stream, |mut stream| async move {
        match stream.next().await {
            Ok(Some(message)) => Some((message, stream)),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, "Subscription stream failed");
                None
            }
        }
    }))
}

fn log_insufficient(guard: &BalanceGuard, balance: primitive_types::U256) {
    tracing::error!(
        account = %guard.account(),
        %balance,
        minimum = %guard.minimum(),
        "Not enough balance available for processing transactions"
    );
}

/// Handle one message; faults here never escape the task
async fn handle_message(
    ctx: Arc<HandlerCtx>,
    message: IncomingMessage,
    halt: mpsc::Sender<()>,
) {
    match ctx.guard.check(ctx.provider.as_ref()).await {
        Ok(BalanceVerdict::Sufficient(_)) => {}
        Ok(BalanceVerdict::Insufficient(balance)) => {
            log_insufficient(&ctx.guard, balance);
            // Full means a halt is already on its way
            let _ = halt.try_send(());
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "Balance query failed, message dropped");
            return;
        }
    }

    let request = decode(&message.payload);
    let reply = ReplyChannel::new(
        ctx.provider.clone(),
        &message,
        &ctx.key_id,
        &ctx.whisper,
    );
    let contract = ctx.registry.get(&message.topic);

    dispatch(ctx.executor.as_ref(), contract, &request, &reply).await;
}
