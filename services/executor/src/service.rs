use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::{
    container::{ContainerRuntime, container_name},
    domain::{ExecutionRequest, ImageConfig},
    error::ExecutorError,
};

#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    Log(String),
}

/// C3 Executor Service: orchestrates C1 (container lifecycle) and C2
/// (log demuxing) for a single execution request, grounded in
/// `xcutr-service/internal/application/service/services.go`'s
/// `xcutrService.Execute`/`goService`/`streamLogs`/`createCont`.
pub struct ExecutorService {
    runtime: Arc<dyn ContainerRuntime>,
    images: ImageConfig,
    log_buf_size: usize,
}

impl ExecutorService {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, images: ImageConfig, log_buf_size: usize) -> Self {
        Self {
            runtime,
            images,
            log_buf_size,
        }
    }

    /// Runs one execution and returns a channel of events. The container
    /// is always force-removed when the run ends, whether it finishes
    /// normally, errors, or the caller drops the returned receiver (e.g.
    /// because the client disconnected mid-stream) — see
    /// [`CleanupGuard`], the corrected "fresh context" cleanup behavior
    /// required in place of the original Go `defer`'s reuse of the
    /// request's own context.
    pub fn execute(
        &self,
        request: ExecutionRequest,
    ) -> mpsc::Receiver<Result<ExecutionEvent, ExecutorError>> {
        let (tx, rx) = mpsc::channel(self.log_buf_size.max(1));
        let runtime = self.runtime.clone();
        let image = request.lang.image(&self.images).to_string();
        let lang_tag = request.lang.tag().to_string();

        let max_timeout = request.max_timeout;

        tokio::spawn(async move {
            let outcome = tokio::time::timeout(
                max_timeout,
                run(runtime, image, lang_tag, request, tx.clone()),
            )
            .await;

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    let _ = tx.send(Err(err)).await;
                }
                // Deadline elapsed: `run`'s future is dropped here, which
                // drops its local `CleanupGuard` and force-removes the
                // container — the effective-deadline-is-the-minimum rule
                // (server ceiling, per-request max_timeout, client cancel).
                Err(_elapsed) => {}
            }
        });

        rx
    }
}

async fn run(
    runtime: Arc<dyn ContainerRuntime>,
    image: String,
    lang_tag: String,
    request: ExecutionRequest,
    tx: mpsc::Sender<Result<ExecutionEvent, ExecutorError>>,
) -> Result<(), ExecutorError> {
    runtime.pull_image(&image).await?;

    let name = container_name(&lang_tag);
    let cmd = request.lang.command();
    let container_id = runtime.create_and_start(&name, &image, &cmd).await?;
    let _cleanup = CleanupGuard::new(runtime.clone(), container_id.clone());

    runtime.copy_files(&container_id, &request.files).await?;

    let mut logs = runtime.stream_logs(&container_id);
    loop {
        // Race the next log read against the receiver going away, matching
        // the original `GetLogs` goroutine's `select` on `<-ctx.Done()`
        // between reads: a client disconnect must end the run (and drop
        // `CleanupGuard`) right away, even for a container that never
        // produces output, rather than waiting for `tx.send` to notice.
        tokio::select! {
            _ = tx.closed() => return Ok(()),
            line = logs.next() => {
                match line {
                    Some(line) => {
                        if tx.send(Ok(ExecutionEvent::Log(line))).await.is_err() {
                            return Ok(());
                        }
                    }
                    None => return Ok(()),
                }
            }
        }
    }
}

/// Guarantees the container started for an execution is always removed,
/// even if this task is cancelled mid-run. The removal itself is spawned
/// as its own detached task rather than awaited inline, so it cannot be
/// pre-empted by the same cancellation that triggered it.
struct CleanupGuard {
    runtime: Arc<dyn ContainerRuntime>,
    container_id: Option<String>,
}

impl CleanupGuard {
    fn new(runtime: Arc<dyn ContainerRuntime>, container_id: String) -> Self {
        Self {
            runtime,
            container_id: Some(container_id),
        }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let Some(container_id) = self.container_id.take() else {
            return;
        };
        let runtime = self.runtime.clone();
        tokio::spawn(async move {
            if let Err(err) = runtime.force_remove(&container_id).await {
                tracing::warn!(error = %err, container_id, "failed to clean up container");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::stream;

    use super::*;
    use crate::{container::LogLineStream, domain::File};

    struct FakeRuntime {
        removed: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn pull_image(&self, _image: &str) -> Result<(), ExecutorError> {
            Ok(())
        }

        async fn create_and_start(
            &self,
            name: &str,
            _image: &str,
            _cmd: &[String],
        ) -> Result<String, ExecutorError> {
            Ok(name.to_string())
        }

        async fn copy_files(&self, _container_id: &str, _files: &[File]) -> Result<(), ExecutorError> {
            Ok(())
        }

        fn stream_logs(&self, _container_id: &str) -> LogLineStream {
            Box::pin(stream::iter(vec!["hello".to_string(), "world".to_string()]))
        }

        async fn force_remove(&self, container_id: &str) -> Result<(), ExecutorError> {
            self.removed.lock().unwrap().push(container_id.to_string());
            Ok(())
        }
    }

    /// A runtime whose container never produces end-of-output, standing in
    /// for a program that runs past the request's `max_timeout` (spec's S6
    /// scenario).
    struct NeverEndingRuntime {
        removed: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ContainerRuntime for NeverEndingRuntime {
        async fn pull_image(&self, _image: &str) -> Result<(), ExecutorError> {
            Ok(())
        }

        async fn create_and_start(
            &self,
            name: &str,
            _image: &str,
            _cmd: &[String],
        ) -> Result<String, ExecutorError> {
            Ok(name.to_string())
        }

        async fn copy_files(&self, _container_id: &str, _files: &[File]) -> Result<(), ExecutorError> {
            Ok(())
        }

        fn stream_logs(&self, _container_id: &str) -> LogLineStream {
            Box::pin(stream::pending::<String>())
        }

        async fn force_remove(&self, container_id: &str) -> Result<(), ExecutorError> {
            self.removed.lock().unwrap().push(container_id.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn execute_emits_logs_in_order_and_always_cleans_up() {
        let removed = Arc::new(Mutex::new(Vec::new()));
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(FakeRuntime {
            removed: removed.clone(),
        });
        let service = ExecutorService::new(
            runtime,
            ImageConfig {
                go: "golang:1.22".to_string(),
                python: "python:3.12".to_string(),
            },
            16,
        );

        let request = ExecutionRequest::parse(
            "golang",
            vec![("main".to_string(), "go".to_string(), b"package main".to_vec())],
            10 * 1_000_000_000,
            30 * 1_000_000_000,
        )
        .unwrap();

        let mut rx = service.execute(request);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event.unwrap());
        }

        assert!(matches!(events[0], ExecutionEvent::Log(ref s) if s == "hello"));
        assert!(matches!(events[1], ExecutionEvent::Log(ref s) if s == "world"));
        assert_eq!(events.len(), 2);

        // Cleanup is spawned on drop, not awaited inline; give it a tick.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(removed.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn execute_force_removes_container_on_max_timeout() {
        let removed = Arc::new(Mutex::new(Vec::new()));
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(NeverEndingRuntime {
            removed: removed.clone(),
        });
        let service = ExecutorService::new(
            runtime,
            ImageConfig {
                go: "golang:1.22".to_string(),
                python: "python:3.12".to_string(),
            },
            16,
        );

        let request = ExecutionRequest::parse(
            "golang",
            vec![("main".to_string(), "go".to_string(), b"package main".to_vec())],
            1_000_000_000,
            30 * 1_000_000_000,
        )
        .unwrap();

        let mut rx = service.execute(request);
        assert!(rx.recv().await.is_none(), "stream closes with no lines once the deadline elapses");

        // Cleanup is spawned on drop, not awaited inline; give it a tick.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(removed.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn execute_force_removes_container_promptly_on_client_disconnect() {
        let removed = Arc::new(Mutex::new(Vec::new()));
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(NeverEndingRuntime {
            removed: removed.clone(),
        });
        let service = ExecutorService::new(
            runtime,
            ImageConfig {
                go: "golang:1.22".to_string(),
                python: "python:3.12".to_string(),
            },
            16,
        );

        // A long max_timeout: cleanup must not have to wait for it once the
        // caller stops listening (e.g. the client disconnected).
        let request = ExecutionRequest::parse(
            "golang",
            vec![("main".to_string(), "go".to_string(), b"package main".to_vec())],
            30 * 1_000_000_000,
            30 * 1_000_000_000,
        )
        .unwrap();

        let rx = service.execute(request);
        drop(rx);

        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(
            removed.lock().unwrap().len(),
            1,
            "cleanup must run as soon as the receiver is dropped, not wait for max_timeout"
        );
    }
}
