//! Background jobs on the tokio runtime
//!
//! A job owns a clone of the service context, runs after an optional delay and only
//! logs its failure.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, Instrument};

use super::error::ServiceResult;

pub fn spawn_job<F>(name: &'static str, delay: Option<Duration>, job: F) -> JoinHandle<()>
where
    F: Future<Output = ServiceResult<()>> + Send + 'static,
{
    let span = tracing::info_span!("job", name);
    tokio::spawn(
        async move {
            if let Some(delay) = delay.filter(|d| !d.is_zero()) {
                tokio::time::sleep(delay).await;
            }
            match job.await {
                Ok(()) => debug!("Job finished"),
                Err(e) => error!(error = %e, code = e.error_code(), "Job failed"),
            }
        }
        .instrument(span),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::error::ServiceError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_job_runs_after_delay() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let handle = spawn_job("test", Some(Duration::from_millis(5)), async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        handle.await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_job_does_not_panic() {
        let handle = spawn_job("failing", None, async { Err(ServiceError::not_found("User", "1")) });
        assert!(handle.await.is_ok());
    }
}
