pub mod auth;
pub mod routes;
pub mod slots;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::PipelineError;
use crate::pipeline::Pipelines;
use slots::PipelineSlots;

pub use routes::router;

#[derive(Clone)]
pub struct AppState {
    pub pipelines: Arc<Pipelines>,
    pub slots: PipelineSlots,
    pub request_timeout: Duration,
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(pipelines: Pipelines, max_concurrency: usize, request_timeout: Duration) -> Self {
        Self {
            pipelines: Arc::new(pipelines),
            slots: PipelineSlots::new(max_concurrency),
            request_timeout,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.map(Arc::from);
        self
    }

    /// Runs one pipeline inside a slot, bounded by the request deadline
    /// (time spent waiting for a slot counts against it).
    pub async fn run<T, F>(
        &self,
        operation: &'static str,
        user_id: &str,
        fut: F,
    ) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, PipelineError>>,
    {
        match tokio::time::timeout(self.request_timeout, self.slots.run(fut)).await {
            Ok(result) => result,
            Err(_) => {
                let err = PipelineError::DeadlineExceeded;
                tracing::warn!(
                    user_id,
                    operation,
                    code = err.code(),
                    timeout_secs = self.request_timeout.as_secs_f64(),
                    "request deadline exceeded; pipeline abandoned"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use tracing::instrument::WithSubscriber as _;

    use super::*;
    use crate::config::Settings;
    use crate::store::LocalFsDocumentStore;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn app_state(dir: &tempfile::TempDir, timeout: Duration) -> AppState {
        let settings = Settings::from_lookup(|_| None).unwrap();
        let store = Arc::new(LocalFsDocumentStore::new(dir.path()));
        let pipelines = Pipelines::from_settings(&settings, store).unwrap();
        AppState::new(pipelines, 1, timeout)
    }

    #[tokio::test]
    async fn deadline_is_logged_with_operation_and_user() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir, Duration::from_millis(20));
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let result = state
            .run(
                "insights",
                "user-7",
                std::future::pending::<Result<(), PipelineError>>(),
            )
            .with_subscriber(subscriber)
            .await;

        assert!(matches!(result, Err(PipelineError::DeadlineExceeded)));
        let logs = captured.text();
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("request deadline exceeded"), "{logs}");
        assert!(logs.contains("insights"), "{logs}");
        assert!(logs.contains("user-7"), "{logs}");
        assert!(logs.contains("deadline-exceeded"), "{logs}");
    }

    #[tokio::test]
    async fn finished_runs_pass_through_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir, Duration::from_secs(5));

        let ok = state.run("post", "user-7", async { Ok::<_, PipelineError>(3) }).await;
        assert_eq!(ok.unwrap(), 3);

        let err = state
            .run("post", "user-7", async {
                Err::<(), _>(PipelineError::NoArticlesFound)
            })
            .await;
        assert!(matches!(err, Err(PipelineError::NoArticlesFound)));
    }
}
