//! Download manager
//!
//! Fetches selected items into `dest_root/<query>/<source>/<filename>`.
//! Each payload is streamed into a hidden `.part` file next to its final
//! location and only linked into place once complete, so a reader never
//! sees a partial file under the final name. The `.part` file is removed on
//! every exit path, including cancellation of the surrounding future.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::core::error::{DownloadErrorKind, Result};
use crate::core::item::{DisplayItem, DownloadFailure, DownloadResult, SavedFile};
use crate::core::normalize::{query_dirname, sanitize_component, sanitize_filename};
use crate::core::source::http_client;
use crate::core::stream::{DownloadOptions, DownloadState};

/// Give up looking for a free `_N` suffix after this many candidates
const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// Distinguishes temporary files created by this process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Why one attempt failed
#[derive(Debug)]
enum AttemptError {
    Timeout(Duration),
    Network(String),
    Status(StatusCode),
    Write(io::Error),
}

impl AttemptError {
    /// Timeouts, transport failures, throttling and server errors are worth another attempt
    fn is_transient(&self) -> bool {
        match self {
            AttemptError::Timeout(_) | AttemptError::Network(_) => true,
            AttemptError::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            AttemptError::Write(_) => false,
        }
    }

    fn kind(&self) -> DownloadErrorKind {
        match self {
            AttemptError::Timeout(_) => DownloadErrorKind::DownloadTimeout,
            AttemptError::Network(_) | AttemptError::Status(_) => DownloadErrorKind::DownloadNetworkError,
            AttemptError::Write(_) => DownloadErrorKind::WriteError,
        }
    }

    fn message(&self) -> String {
        match self {
            AttemptError::Timeout(t) => format!("no complete response within {t:?}"),
            AttemptError::Network(msg) => msg.clone(),
            AttemptError::Status(status) => format!("server answered {status}"),
            AttemptError::Write(e) => format!("write failed: {e}"),
        }
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        AttemptError::Network(err.to_string())
    }
}

/// Temporary file removed on drop unless it has been committed
struct PartFile {
    path: PathBuf,
}

impl PartFile {
    async fn create(dir: &Path, filename: &str) -> io::Result<Self> {
        loop {
            let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
            let path = dir.join(format!(".{filename}.{}.{n}.part", std::process::id()));
            match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("could not remove {}: {e}", self.path.display());
            }
        }
    }
}

/// `cat.gif` -> `cat_1.gif`, `README` -> `README_1`
fn numbered_name(filename: &str, n: u32) -> String {
    if n == 0 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{n}.{ext}"),
        _ => format!("{filename}_{n}"),
    }
}

/// Move `part` to the first free name in `dir`, never replacing an existing file
async fn commit(part: &PartFile, dir: &Path, filename: &str) -> io::Result<PathBuf> {
    for n in 0..MAX_COLLISION_SUFFIX {
        let candidate = dir.join(numbered_name(filename, n));
        match tokio::fs::hard_link(&part.path, &candidate).await {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                // Filesystems without hard links: fall back to a checked rename
                debug!("hard link unavailable ({e}), renaming instead");
                if tokio::fs::try_exists(&candidate).await? {
                    continue;
                }
                tokio::fs::rename(&part.path, &candidate).await?;
                return Ok(candidate);
            }
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {filename} in {}", dir.display()),
    ))
}

/// Delay before attempt `attempt + 1`: `base_delay` doubled per failed attempt, saturating
fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base_delay.saturating_mul(factor)
}

/// Run `operation` until it succeeds, fails permanently, or `max_retries` is spent.
///
/// Returns the value with the number of attempts it took; errors carry the
/// attempt count too.
async fn retry_transient<F, Fut, T>(
    max_retries: u32,
    base_delay: Duration,
    mut operation: F,
) -> std::result::Result<(T, u32), (AttemptError, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptError>>,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(result) => return Ok((result, attempt)),
            Err(e) if e.is_transient() && attempt <= max_retries => {
                let delay = backoff_delay(base_delay, attempt);
                warn!("⚠️  {} (attempt {attempt}), retrying in {delay:?}", e.message());
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err((e, attempt)),
        }
    }
}

/// Fetches items to disk with bounded concurrency, retries and timeouts
pub struct Downloader {
    client: Client,
    options: DownloadOptions,
}

impl Downloader {
    /// Create a downloader with its own HTTP client
    pub fn new(options: DownloadOptions) -> Result<Self> {
        Ok(Self::with_client(http_client()?, options))
    }

    /// Create a downloader sharing an existing client
    pub fn with_client(client: Client, options: DownloadOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Directory an item from `source` lands in
    pub fn target_dir(dest_root: &Path, query: &str, source: &str) -> PathBuf {
        dest_root
            .join(query_dirname(query))
            .join(sanitize_component(source, 50))
    }

    fn notify(&self, filename: &str, state: DownloadState) {
        debug!("{filename}: {state}");
        if let Some(observer) = &self.options.observer {
            observer(filename, &state);
        }
    }

    /// Download one item. Never fails past the caller; the outcome is in the result.
    pub async fn download(
        &self,
        item: &DisplayItem,
        dest_root: &Path,
        query: &str,
        timeout: Option<Duration>,
    ) -> DownloadResult {
        self.notify(&item.filename, DownloadState::Pending);
        let outcome = self.fetch_item(item, dest_root, query, timeout).await;
        match &outcome {
            Ok(saved) => {
                self.notify(&item.filename, DownloadState::Succeeded);
                info!("saved {} ({} bytes)", saved.path.display(), saved.bytes);
            }
            Err(failure) => {
                self.notify(&item.filename, DownloadState::Failed(failure.kind));
                warn!("{}: {} after {} attempt(s): {}", item.filename, failure.kind, failure.attempts, failure.message);
            }
        }
        DownloadResult {
            source: item.source.clone(),
            filename: item.filename.clone(),
            outcome,
        }
    }

    async fn fetch_item(
        &self,
        item: &DisplayItem,
        dest_root: &Path,
        query: &str,
        timeout: Option<Duration>,
    ) -> std::result::Result<SavedFile, DownloadFailure> {
        let write_failure = |e: io::Error, attempts: u32| DownloadFailure {
            kind: DownloadErrorKind::WriteError,
            message: format!("write failed: {e}"),
            attempts,
        };

        let dir = Self::target_dir(dest_root, query, &item.source);
        let filename = sanitize_filename(&item.filename);
        self.notify(&item.filename, DownloadState::Fetching { attempt: 1 });
        tokio::fs::create_dir_all(&dir).await.map_err(|e| write_failure(e, 1))?;
        let part = PartFile::create(&dir, &filename)
            .await
            .map_err(|e| write_failure(e, 1))?;

        let per_attempt = self.options.timeout_for(&item.source, timeout);
        let fetched = retry_transient(self.options.max_retries, self.options.retry_base_delay, |attempt| {
            if attempt > 1 {
                self.notify(&item.filename, DownloadState::Fetching { attempt });
            }
            self.fetch_once(&item.url, &part.path, per_attempt)
        })
        .await;

        let (bytes, attempts) = fetched.map_err(|(e, attempts)| DownloadFailure {
            kind: e.kind(),
            message: e.message(),
            attempts,
        })?;

        let path = commit(&part, &dir, &filename)
            .await
            .map_err(|e| write_failure(e, attempts))?;
        Ok(SavedFile { path, bytes })
    }

    async fn fetch_once(&self, url: &str, part: &Path, timeout: Duration) -> std::result::Result<u64, AttemptError> {
        let attempt = async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(AttemptError::Status(status));
            }
            let expected = response.content_length();

            let file = tokio::fs::File::create(part).await.map_err(AttemptError::Write)?;
            let mut writer = BufWriter::with_capacity(self.options.buffer_size, file);
            let mut body = response.bytes_stream();
            let mut written = 0u64;
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                writer.write_all(&chunk).await.map_err(AttemptError::Write)?;
                written += chunk.len() as u64;
            }
            writer.flush().await.map_err(AttemptError::Write)?;

            if let Some(expected) = expected {
                if expected != written {
                    return Err(AttemptError::Network(format!(
                        "connection closed after {written} of {expected} bytes"
                    )));
                }
            }
            Ok::<u64, AttemptError>(written)
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(AttemptError::Timeout(timeout)),
        }
    }

    /// Download every item under the concurrency cap.
    ///
    /// Returns one result per item in input order; completion order is not
    /// observable except through the progress callback.
    pub async fn download_all(
        &self,
        items: &[DisplayItem],
        dest_root: &Path,
        query: &str,
        timeout: Option<Duration>,
    ) -> Vec<DownloadResult> {
        let total = items.len() as u64;
        let completed = Arc::new(AtomicU64::new(0));
        if let Some(progress) = &self.options.progress {
            progress(0, total);
        }

        let results: Vec<DownloadResult> = futures::stream::iter(items)
            .map(|item| {
                let completed = Arc::clone(&completed);
                async move {
                    let result = self.download(item, dest_root, query, timeout).await;
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(progress) = &self.options.progress {
                        progress(done, total);
                    }
                    result
                }
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let ok = results.iter().filter(|r| r.is_success()).count();
        info!("downloaded {ok}/{total} item(s)");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::MediaKind;
    use std::sync::Mutex;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(server: &MockServer, route: &str, filename: &str) -> DisplayItem {
        DisplayItem {
            title: filename.to_string(),
            source: "giphy".to_string(),
            kind: MediaKind::Gif,
            url: format!("{}{route}", server.uri()),
            preview_url: None,
            filename: filename.to_string(),
            size_bytes: None,
        }
    }

    fn fast_options() -> DownloadOptions {
        DownloadOptions {
            retry_base_delay: Duration::from_millis(5),
            ..Default::default()
        }
    }

    fn leftover_parts(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
                    .count()
            })
            .unwrap_or(0)
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("cat.gif", 0), "cat.gif");
        assert_eq!(numbered_name("cat.gif", 1), "cat_1.gif");
        assert_eq!(numbered_name("a.b.mp4", 2), "a.b_2.mp4");
        assert_eq!(numbered_name("README", 3), "README_3");
    }

    #[test]
    fn test_backoff_delay_doubles_and_saturates() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 40), base.saturating_mul(u32::MAX));
        assert_eq!(backoff_delay(Duration::MAX, 5), Duration::MAX);
    }

    #[tokio::test]
    async fn test_retry_counts_attempts() {
        let ok = retry_transient(2, Duration::from_millis(1), |attempt| async move {
            if attempt < 3 {
                Err(AttemptError::Network("connection reset".to_string()))
            } else {
                Ok(7u64)
            }
        })
        .await;
        assert_eq!(ok.unwrap(), (7, 3));

        let err = retry_transient(5, Duration::from_millis(1), |_| async {
            Err::<u64, _>(AttemptError::Status(StatusCode::FORBIDDEN))
        })
        .await;
        let (e, attempts) = err.unwrap_err();
        assert_eq!(e.kind(), DownloadErrorKind::DownloadNetworkError);
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_download_writes_layout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cat.gif"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"GIF89a-data".to_vec()))
            .mount(&server)
            .await;

        let dest = tempdir().unwrap();
        let downloader = Downloader::new(fast_options()).unwrap();
        let result = downloader
            .download(&item(&server, "/cat.gif", "cat.gif"), dest.path(), "funny cats", None)
            .await;

        let saved = result.outcome.unwrap();
        assert_eq!(saved.path, dest.path().join("funny_cats").join("giphy").join("cat.gif"));
        assert_eq!(saved.bytes, 11);
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"GIF89a-data");
        assert_eq!(leftover_parts(saved.path.parent().unwrap()), 0);
    }

    #[tokio::test]
    async fn test_collisions_get_suffixes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 10]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![2u8; 20]))
            .mount(&server)
            .await;

        let dest = tempdir().unwrap();
        let downloader = Downloader::new(fast_options()).unwrap();
        let items = vec![item(&server, "/a", "cat.gif"), item(&server, "/b", "cat.gif")];
        let results = downloader.download_all(&items, dest.path(), "cats", None).await;
        assert!(results.iter().all(|r| r.is_success()));

        let dir = dest.path().join("cats").join("giphy");
        let mut sizes = vec![
            std::fs::metadata(dir.join("cat.gif")).unwrap().len(),
            std::fs::metadata(dir.join("cat_1.gif")).unwrap().len(),
        ];
        sizes.sort_unstable();
        assert_eq!(sizes, vec![10, 20]);

        // re-running into an existing directory never overwrites
        let again = downloader.download(&items[0], dest.path(), "cats", None).await;
        assert_eq!(again.outcome.unwrap().path, dir.join("cat_2.gif"));
    }

    #[tokio::test]
    async fn test_timeout_on_every_attempt_leaves_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.gif"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 64])
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let dest = tempdir().unwrap();
        let downloader = Downloader::new(DownloadOptions {
            max_retries: 1,
            ..fast_options()
        })
        .unwrap();
        let result = downloader
            .download(
                &item(&server, "/slow.gif", "slow.gif"),
                dest.path(),
                "cats",
                Some(Duration::from_millis(100)),
            )
            .await;

        let failure = result.outcome.unwrap_err();
        assert_eq!(failure.kind, DownloadErrorKind::DownloadTimeout);
        assert_eq!(failure.attempts, 2);
        let dir = dest.path().join("cats").join("giphy");
        assert!(!dir.join("slow.gif").exists());
        assert_eq!(leftover_parts(&dir), 0);
    }

    #[tokio::test]
    async fn test_cancelled_batch_leaves_no_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 64])
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let dest = tempdir().unwrap();
        let downloader = Downloader::new(fast_options()).unwrap();
        let items = vec![item(&server, "/a.gif", "a.gif"), item(&server, "/b.gif", "b.gif")];
        let cancelled = tokio::time::timeout(
            Duration::from_millis(300),
            downloader.download_all(&items, dest.path(), "cats", None),
        )
        .await;
        assert!(cancelled.is_err());

        let dir = dest.path().join("cats").join("giphy");
        let remaining: Vec<_> = std::fs::read_dir(&dir)
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.file_name()).collect())
            .unwrap_or_default();
        assert!(remaining.is_empty(), "left behind: {remaining:?}");
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky.gif"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky.gif"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let states = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&states);
        let downloader = Downloader::new(DownloadOptions {
            observer: Some(Arc::new(move |_: &str, state: &DownloadState| {
                recorded.lock().unwrap().push(*state);
            })),
            ..fast_options()
        })
        .unwrap();

        let dest = tempdir().unwrap();
        let result = downloader
            .download(&item(&server, "/flaky.gif", "flaky.gif"), dest.path(), "cats", None)
            .await;
        assert!(result.is_success());
        assert_eq!(
            *states.lock().unwrap(),
            vec![
                DownloadState::Pending,
                DownloadState::Fetching { attempt: 1 },
                DownloadState::Fetching { attempt: 2 },
                DownloadState::Succeeded,
            ]
        );
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.gif"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dest = tempdir().unwrap();
        let downloader = Downloader::new(fast_options()).unwrap();
        let result = downloader
            .download(&item(&server, "/missing.gif", "missing.gif"), dest.path(), "cats", None)
            .await;
        let failure = result.outcome.unwrap_err();
        assert_eq!(failure.kind, DownloadErrorKind::DownloadNetworkError);
        assert_eq!(failure.attempts, 1);
        assert_eq!(leftover_parts(&dest.path().join("cats").join("giphy")), 0);
    }

    #[tokio::test]
    async fn test_unwritable_root_is_write_error() {
        let server = MockServer::start().await;
        let dest = tempdir().unwrap();
        let blocker = dest.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let downloader = Downloader::new(fast_options()).unwrap();
        let result = downloader
            .download(&item(&server, "/x.gif", "x.gif"), &blocker, "cats", None)
            .await;
        assert_eq!(result.outcome.unwrap_err().kind, DownloadErrorKind::WriteError);
    }

    #[tokio::test]
    async fn test_progress_reports_every_item() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        let downloader = Downloader::new(DownloadOptions {
            progress: Some(Arc::new(move |done, total| {
                recorded.lock().unwrap().push((done, total));
            })),
            concurrency: 2,
            ..fast_options()
        })
        .unwrap();

        let dest = tempdir().unwrap();
        let items: Vec<DisplayItem> = (0..3)
            .map(|i| item(&server, &format!("/{i}.gif"), &format!("{i}.gif")))
            .collect();
        let results = downloader.download_all(&items, dest.path(), "cats", None).await;
        assert_eq!(results.len(), 3);
        let filenames: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(filenames, vec!["0.gif", "1.gif", "2.gif"]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&(0, 3)));
        assert_eq!(seen.last(), Some(&(3, 3)));
    }
}
