//! Browser-driven video capture
//!
//! The recording itself is produced by an isolated browser context that
//! records its page to the session's artifact directory. The mechanics of
//! driving the browser live behind the `BrowserDriver` trait; this adapter
//! owns the per-session context/page handles and sequences navigation,
//! meeting join, and teardown around it.

use crate::capture::{CaptureError, CaptureResult};
use crate::config::Config;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Interval between ready-flag polls while joining a meeting
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Opaque handle to a browser context owned by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

/// Opaque handle to a page owned by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId(pub u64);

/// External browser-automation capability
///
/// Implemented by the embedding service over its automation stack. The
/// adapter only assumes: a context records its pages' video into the
/// directory it was created with, and `evaluate` returns the script's value
/// as JSON.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Create an isolated context that records page video into `video_dir`.
    async fn create_recording_context(&self, video_dir: &Path) -> CaptureResult<ContextId>;

    /// Open a blank page within the context.
    async fn open_page(&self, context: ContextId) -> CaptureResult<PageId>;

    /// Navigate the page and resolve once it has finished loading.
    async fn navigate(&self, page: PageId, url: &str) -> CaptureResult<()>;

    /// Evaluate a script on the page and return its value.
    async fn evaluate(&self, page: PageId, script: &str) -> CaptureResult<serde_json::Value>;

    /// Path of the context's finished recording, if one was produced.
    async fn recorded_video_path(&self, context: ContextId) -> CaptureResult<Option<PathBuf>>;

    async fn close_page(&self, page: PageId) -> CaptureResult<()>;

    async fn close_context(&self, context: ContextId) -> CaptureResult<()>;
}

struct BrowserHandle {
    context: ContextId,
    page: PageId,
}

/// Video capture adapter
///
/// At most one live context/page pair per session. Handles created during a
/// failed start are torn down before the error propagates.
pub struct VideoCapture {
    config: Arc<Config>,
    driver: Arc<dyn BrowserDriver>,
    handles: Mutex<HashMap<Uuid, BrowserHandle>>,
}

impl VideoCapture {
    pub fn new(config: Arc<Config>, driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            config,
            driver,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire a recording context and a ready page for the session.
    pub async fn start(&self, session_id: Uuid) -> CaptureResult<()> {
        if self.handles.lock().contains_key(&session_id) {
            return Err(CaptureError::AlreadyCapturing {
                backend: "video",
                session: session_id,
            });
        }

        let video_dir = self.config.session_dir(session_id);
        std::fs::create_dir_all(&video_dir)?;

        let context = self.driver.create_recording_context(&video_dir).await?;

        let page = match self.driver.open_page(context).await {
            Ok(page) => page,
            Err(error) => {
                let _ = self.driver.close_context(context).await;
                return Err(error);
            }
        };

        let load_timeout = self.config.page_load_timeout;
        let navigated = match tokio::time::timeout(
            load_timeout,
            self.driver.navigate(page, &self.config.client_url),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CaptureError::Timeout {
                what: "page load",
                secs: load_timeout.as_secs(),
            }),
        };

        if let Err(error) = navigated {
            let _ = self.driver.close_page(page).await;
            let _ = self.driver.close_context(context).await;
            return Err(error);
        }

        tracing::debug!("Recording page ready for session {}", session_id);
        self.handles
            .lock()
            .insert(session_id, BrowserHandle { context, page });
        Ok(())
    }

    /// Attach the session's page to the target meeting and wait for the
    /// client to report it joined, bounded by the configured timeout.
    pub async fn join(&self, session_id: Uuid, meeting_id: &str, user_id: &str) -> CaptureResult<()> {
        let page = self
            .handles
            .lock()
            .get(&session_id)
            .map(|handle| handle.page)
            .ok_or_else(|| {
                CaptureError::Driver(format!("no recording page for session {}", session_id))
            })?;

        let client_config = serde_json::json!({
            "meetingId": meeting_id,
            "userId": user_id,
            "autoJoin": true,
        });
        self.driver
            .evaluate(page, &format!("window.__recorderConfig = {};", client_config))
            .await?;

        let join_timeout = self.config.join_timeout;
        let joined = async {
            loop {
                let flag = self
                    .driver
                    .evaluate(page, "window.__meetingJoined === true")
                    .await?;
                if flag == serde_json::Value::Bool(true) {
                    return Ok(());
                }
                tokio::time::sleep(JOIN_POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(join_timeout, joined).await {
            Ok(result) => result,
            Err(_) => Err(CaptureError::Timeout {
                what: "meeting join",
                secs: join_timeout.as_secs(),
            }),
        }
    }

    /// Tear down the session's page and context, returning the recorded
    /// video path when it can be resolved. A path-resolution failure is
    /// logged, never fatal. No-op when the session holds no handle.
    pub async fn stop(&self, session_id: Uuid) -> CaptureResult<Option<PathBuf>> {
        let Some(handle) = self.handles.lock().remove(&session_id) else {
            return Ok(None);
        };

        let page_closed = self.driver.close_page(handle.page).await;

        let video_path = match self.driver.recorded_video_path(handle.context).await {
            Ok(path) => path,
            Err(error) => {
                tracing::warn!(
                    "Could not resolve recorded video for session {}: {}",
                    session_id,
                    error
                );
                None
            }
        };

        let context_closed = self.driver.close_context(handle.context).await;

        page_closed?;
        context_closed?;
        Ok(video_path)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Scripted driver for orchestration tests
    #[derive(Default)]
    pub(crate) struct FakeDriver {
        next_id: AtomicU64,
        pub calls: Mutex<Vec<String>>,
        pub open_contexts: Mutex<HashSet<ContextId>>,
        pub open_pages: Mutex<HashSet<PageId>>,
        video_dirs: Mutex<HashMap<ContextId, PathBuf>>,
        pub fail_open_page: AtomicBool,
        pub fail_navigate: AtomicBool,
        pub never_join: AtomicBool,
        pub fail_next_close_context: AtomicBool,
    }

    impl FakeDriver {
        fn next(&self) -> u64 {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        }

        fn record(&self, call: &str) {
            self.calls.lock().push(call.to_string());
        }

        pub(crate) fn no_calls_made(&self) -> bool {
            self.calls.lock().is_empty()
        }
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        async fn create_recording_context(&self, video_dir: &Path) -> CaptureResult<ContextId> {
            self.record("create_recording_context");
            let context = ContextId(self.next());
            self.open_contexts.lock().insert(context);
            self.video_dirs
                .lock()
                .insert(context, video_dir.to_path_buf());
            Ok(context)
        }

        async fn open_page(&self, _context: ContextId) -> CaptureResult<PageId> {
            self.record("open_page");
            if self.fail_open_page.load(Ordering::SeqCst) {
                return Err(CaptureError::Driver("page crashed".into()));
            }
            let page = PageId(self.next());
            self.open_pages.lock().insert(page);
            Ok(page)
        }

        async fn navigate(&self, _page: PageId, _url: &str) -> CaptureResult<()> {
            self.record("navigate");
            if self.fail_navigate.load(Ordering::SeqCst) {
                return Err(CaptureError::Driver("net::ERR_CONNECTION_REFUSED".into()));
            }
            Ok(())
        }

        async fn evaluate(&self, _page: PageId, script: &str) -> CaptureResult<serde_json::Value> {
            self.record("evaluate");
            if script.contains("__meetingJoined") {
                let joined = !self.never_join.load(Ordering::SeqCst);
                return Ok(serde_json::Value::Bool(joined));
            }
            Ok(serde_json::Value::Null)
        }

        async fn recorded_video_path(&self, context: ContextId) -> CaptureResult<Option<PathBuf>> {
            self.record("recorded_video_path");
            Ok(self
                .video_dirs
                .lock()
                .get(&context)
                .map(|dir| dir.join("video.webm")))
        }

        async fn close_page(&self, page: PageId) -> CaptureResult<()> {
            self.record("close_page");
            self.open_pages.lock().remove(&page);
            Ok(())
        }

        async fn close_context(&self, context: ContextId) -> CaptureResult<()> {
            self.record("close_context");
            if self.fail_next_close_context.swap(false, Ordering::SeqCst) {
                return Err(CaptureError::Driver("context wedged".into()));
            }
            self.open_contexts.lock().remove(&context);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeDriver;
    use super::*;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn capture_with(driver: Arc<FakeDriver>, tmp: &TempDir) -> VideoCapture {
        let config = Config {
            recording_dir: tmp.path().to_path_buf(),
            ..Config::default()
        };
        VideoCapture::new(Arc::new(config), driver)
    }

    #[tokio::test]
    async fn start_then_stop_yields_video_path() {
        let tmp = TempDir::new().unwrap();
        let driver = Arc::new(FakeDriver::default());
        let capture = capture_with(driver.clone(), &tmp);
        let session = Uuid::new_v4();

        capture.start(session).await.unwrap();
        assert!(tmp.path().join(session.to_string()).is_dir());

        let video = capture.stop(session).await.unwrap();
        assert_eq!(
            video,
            Some(tmp.path().join(session.to_string()).join("video.webm"))
        );
        assert!(driver.open_contexts.lock().is_empty());
        assert!(driver.open_pages.lock().is_empty());
    }

    #[tokio::test]
    async fn failed_start_tears_down_created_handles() {
        let tmp = TempDir::new().unwrap();
        let driver = Arc::new(FakeDriver::default());
        driver.fail_navigate.store(true, Ordering::SeqCst);
        let capture = capture_with(driver.clone(), &tmp);

        let err = capture.start(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CaptureError::Driver(_)));
        assert!(driver.open_contexts.lock().is_empty());
        assert!(driver.open_pages.lock().is_empty());
    }

    #[tokio::test]
    async fn failed_page_open_closes_context() {
        let tmp = TempDir::new().unwrap();
        let driver = Arc::new(FakeDriver::default());
        driver.fail_open_page.store(true, Ordering::SeqCst);
        let capture = capture_with(driver.clone(), &tmp);

        capture.start(Uuid::new_v4()).await.unwrap_err();
        assert!(driver.open_contexts.lock().is_empty());
    }

    #[tokio::test]
    async fn double_start_fails_fast() {
        let tmp = TempDir::new().unwrap();
        let driver = Arc::new(FakeDriver::default());
        let capture = capture_with(driver, &tmp);
        let session = Uuid::new_v4();

        capture.start(session).await.unwrap();
        let err = capture.start(session).await.unwrap_err();
        assert!(matches!(err, CaptureError::AlreadyCapturing { .. }));
    }

    #[tokio::test]
    async fn stop_without_handle_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let driver = Arc::new(FakeDriver::default());
        let capture = capture_with(driver.clone(), &tmp);

        let video = capture.stop(Uuid::new_v4()).await.unwrap();
        assert_eq!(video, None);
        assert!(driver.no_calls_made());
    }

    #[tokio::test(start_paused = true)]
    async fn join_times_out_when_client_never_joins() {
        let tmp = TempDir::new().unwrap();
        let driver = Arc::new(FakeDriver::default());
        driver.never_join.store(true, Ordering::SeqCst);
        let capture = capture_with(driver, &tmp);
        let session = Uuid::new_v4();

        capture.start(session).await.unwrap();
        let err = capture.join(session, "m1", "u1").await.unwrap_err();
        assert!(matches!(
            err,
            CaptureError::Timeout {
                what: "meeting join",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn join_passes_client_config() {
        let tmp = TempDir::new().unwrap();
        let driver = Arc::new(FakeDriver::default());
        let capture = capture_with(driver.clone(), &tmp);
        let session = Uuid::new_v4();

        capture.start(session).await.unwrap();
        capture.join(session, "m1", "u1").await.unwrap();

        let calls = driver.calls.lock();
        assert!(calls.iter().any(|c| c == "evaluate"));
    }
}
