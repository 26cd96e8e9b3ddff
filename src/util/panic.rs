use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Run a future, turning a panic inside it into an `Err` with the panic
/// message.
///
/// Background work (refresh cycles, translations) is wrapped in this so a bug
/// in one task is reported in the status bar instead of silently killing the
/// task or, worse, leaving the terminal in raw mode.
///
/// ```ignore
/// tokio::spawn(async move {
///     if let Err(panic_msg) = catch_task_panic(work()).await {
///         tracing::error!(error = %panic_msg, "Task panicked");
///     }
/// });
/// ```
pub async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic payload".to_string()
            }
        })
}
