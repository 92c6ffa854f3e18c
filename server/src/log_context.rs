//! Per-request logging context
//!
//! `log_mdc` values live in thread-local storage, while several request
//! futures take turns on one worker thread. The context is therefore owned
//! by the future and installed only while that future is being polled.

use std::future::{poll_fn, Future};
use std::pin::pin;

pub(crate) type LogContext = Vec<(String, String)>;

/// Snapshot of the context installed on the current thread
pub(crate) fn current() -> LogContext {
    let mut context = Vec::new();
    log_mdc::iter(|key, value| context.push((key.to_string(), value.to_string())));
    context
}

/// Drives `fut` with `context` installed around every poll. Whatever the
/// thread held before a poll is restored after it.
pub(crate) async fn scoped<F: Future>(context: LogContext, fut: F) -> F::Output {
    let mut fut = pin!(fut);
    poll_fn(move |cx| {
        let _mdc = log_mdc::extend_scoped(context.clone());
        fut.as_mut().poll(cx)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(key: &str) -> Option<String> {
        log_mdc::get(key, |v| v.map(str::to_string))
    }

    fn context(operation: &str) -> LogContext {
        vec![("operation".to_string(), operation.to_string())]
    }

    #[actix_web::test]
    async fn test_context_is_visible_only_inside_scope() {
        let seen = scoped(context("a"), async { value("operation") }).await;
        assert_eq!(seen.as_deref(), Some("a"));
        assert_eq!(value("operation"), None);
    }

    #[actix_web::test]
    async fn test_interleaved_scopes_keep_their_own_context() {
        let first = scoped(context("first"), async {
            let before = value("operation");
            tokio::task::yield_now().await;
            (before, value("operation"))
        });
        let second = scoped(context("second"), async {
            let before = value("operation");
            tokio::task::yield_now().await;
            (before, value("operation"))
        });

        let (first, second) = futures::join!(first, second);
        assert_eq!(first, (Some("first".to_string()), Some("first".to_string())));
        assert_eq!(second, (Some("second".to_string()), Some("second".to_string())));
        assert_eq!(value("operation"), None);
    }

    #[test]
    fn test_current_snapshots_installed_values() {
        let _mdc = log_mdc::extend_scoped(vec![("request_id", "r-9")]);
        assert!(current().contains(&("request_id".to_string(), "r-9".to_string())));
    }
}
