/*
[INPUT]:  Global interrupt token, remote-call futures, collaborator errors
[OUTPUT]: Interrupted unwinding signal, BotError, interruptible await helpers
[POS]:    Error handling layer - the only failures that escape the quoting core
[UPDATE]: When adding new terminal failure classes for a control loop
*/

use std::future::Future;
use std::time::Duration;

use pegwall_adapter::HttpError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The global interrupt fired while a call or retry sleep was pending.
///
/// Never converted into an error result; it unwinds every retry loop.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("interrupted")]
pub struct Interrupted;

/// Terminal failure of a control loop.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    /// The reference price could not be read at startup.
    #[error("startup price unavailable: {0}")]
    Startup(#[source] HttpError),

    /// The independent price feed failed.
    #[error("price feed failed: {0}")]
    Feed(#[source] HttpError),
}

impl BotError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, BotError::Interrupted(_))
    }
}

/// Await `fut` unless the interrupt fires first.
pub(crate) async fn interruptible<F>(
    interrupt: &CancellationToken,
    fut: F,
) -> Result<F::Output, Interrupted>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = interrupt.cancelled() => Err(Interrupted),
        out = fut => Ok(out),
    }
}

pub(crate) async fn sleep_or_interrupt(
    interrupt: &CancellationToken,
    duration: Duration,
) -> Result<(), Interrupted> {
    interruptible(interrupt, tokio::time::sleep(duration)).await
}
