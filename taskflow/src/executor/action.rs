//! Action dispatch with timeout and panic containment.

use crate::context::UnitContext;
use crate::core::ActionResult;
use crate::errors::UnitError;
use futures::future::BoxFuture;
use std::any::Any;
use std::time::Duration;
use tracing::{debug, warn, Instrument, Span};

/// Runs an action on its own task.
///
/// A panic inside the action becomes `UnitError::ActionPanic`. When `limit`
/// expires the unit's token is cancelled and the action gets `grace` to
/// settle; after that the task is aborted. Either way the result is a
/// timeout and any late outputs are discarded.
pub(crate) async fn invoke(
    action: BoxFuture<'static, ActionResult>,
    ctx: &UnitContext,
    limit: Option<Duration>,
    grace: Duration,
    span: Span,
) -> ActionResult {
    let mut handle = tokio::spawn(action.instrument(span));

    let joined = match limit {
        None => (&mut handle).await,
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                warn!(unit = %ctx.unit_id(), timeout_ms, "Unit timed out");
                ctx.cancellation()
                    .cancel(format!("timed out after {timeout_ms}ms"));

                if tokio::time::timeout(grace, &mut handle).await.is_err() {
                    debug!(unit = %ctx.unit_id(), "Action did not settle within grace period; aborting");
                    handle.abort();
                }

                return Err(UnitError::Timeout {
                    unit: ctx.unit_id().to_string(),
                    timeout_ms,
                });
            }
        },
    };

    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(UnitError::ActionPanic {
            message: panic_message(e.into_panic().as_ref()),
        }),
        Err(e) => Err(UnitError::failed_with_cause("Action task was cancelled", e.to_string())),
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
