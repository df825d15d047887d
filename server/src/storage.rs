use async_trait::async_trait;
use log::{debug, warn};
use std::{
    collections::{hash_map::Entry, HashMap},
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};
use thiserror::Error;
use tokio::{
    fs::{self, OpenOptions},
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter},
};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage name already taken: {0}")]
    AlreadyExists(String),

    #[error("upload directory does not exist: {}", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("no free storage name for {original} after {attempts} attempts")]
    NamesExhausted { original: String, attempts: u64 },

    #[error("failed to read upload body: {0}")]
    Body(#[source] io::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A file that has been written completely under its storage name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// The shared namespace uploads are written into.
///
/// `store` must never replace an existing entry: if `name` is taken it returns
/// [`StorageError::AlreadyExists`] before reading anything from `body`, so the
/// caller can retry the same body under another name.
#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn store(
        &self,
        name: &str,
        body: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<StoredFile, StorageError>;

    async fn remove(&self, file: &StoredFile) -> Result<(), StorageError>;
}

/// Writes uploads as plain files into an existing directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the upload directory is present. It is never created here.
    pub fn dir_ready(&self) -> bool {
        self.dir.is_dir()
    }
}

#[async_trait]
impl UploadStore for DiskStore {
    async fn store(
        &self,
        name: &str,
        body: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<StoredFile, StorageError> {
        let path = self.dir.join(name);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(name.to_string()),
                io::ErrorKind::NotFound => StorageError::DirectoryMissing(self.dir.clone()),
                _ => StorageError::io(&path, e),
            })?;

        let mut partial = PartialFile::new(path.clone());
        let mut writer = BufWriter::new(file);
        let size = copy_body(body, &mut writer, &path).await?;
        writer
            .flush()
            .await
            .map_err(|e| StorageError::io(&path, e))?;
        writer
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| StorageError::io(&path, e))?;
        drop(writer);
        partial.keep();

        debug!("Wrote {} bytes to {}", size, path.display());
        Ok(StoredFile {
            name: name.to_string(),
            path,
            size,
        })
    }

    async fn remove(&self, file: &StoredFile) -> Result<(), StorageError> {
        fs::remove_file(&file.path)
            .await
            .map_err(|e| StorageError::io(&file.path, e))
    }
}

async fn copy_body<W>(
    body: &mut (dyn AsyncRead + Send + Unpin),
    writer: &mut W,
    path: &Path,
) -> Result<u64, StorageError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let read = body.read(&mut buf).await.map_err(StorageError::Body)?;
        if read == 0 {
            return Ok(total);
        }
        writer
            .write_all(&buf[..read])
            .await
            .map_err(|e| StorageError::io(path, e))?;
        total += read as u64;
    }
}

/// Removes a file on drop unless it was kept.
///
/// Covers both explicit write failures and the request future being dropped
/// when a client goes away mid-upload.
struct PartialFile {
    path: PathBuf,
    kept: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, kept: false }
    }

    fn keep(&mut self) {
        self.kept = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Discarded partial upload {}", self.path.display()),
            Err(e) => warn!(
                "Failed to discard partial upload {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// In-process store, mostly for tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().get(name).cloned()
    }

    /// Stored names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UploadStore for MemoryStore {
    async fn store(
        &self,
        name: &str,
        body: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<StoredFile, StorageError> {
        // Reserve the name first so a concurrent store of the same name fails
        // before either side reads its body.
        match self.lock().entry(name.to_string()) {
            Entry::Occupied(_) => return Err(StorageError::AlreadyExists(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Vec::new());
            }
        }

        let mut content = Vec::new();
        if let Err(e) = body.read_to_end(&mut content).await {
            self.lock().remove(name);
            return Err(StorageError::Body(e));
        }

        let size = content.len() as u64;
        self.lock().insert(name.to_string(), content);
        Ok(StoredFile {
            name: name.to_string(),
            path: PathBuf::from(name),
            size,
        })
    }

    async fn remove(&self, file: &StoredFile) -> Result<(), StorageError> {
        match self.lock().remove(&file.name) {
            Some(_) => Ok(()),
            None => Err(StorageError::io(
                &file.path,
                io::Error::from(io::ErrorKind::NotFound),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::ReadBuf;

    /// Yields some bytes, then fails like a dropped connection.
    struct BrokenBody {
        sent: bool,
    }

    impl AsyncRead for BrokenBody {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "client went away",
                )));
            }
            self.sent = true;
            buf.put_slice(b"%PDF-1.4 trunc");
            Poll::Ready(Ok(()))
        }
    }

    /// Yields some bytes, then stalls like a client that stopped sending.
    struct StalledBody {
        sent: bool,
    }

    impl AsyncRead for StalledBody {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                return Poll::Pending;
            }
            self.sent = true;
            buf.put_slice(b"%PDF-1.4 stalled");
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn disk_store_writes_exact_bytes() {
        let temp = TempDir::new().expect("temp dir");
        let store = DiskStore::new(temp.path());
        let mut body: &[u8] = b"%PDF-1.4 test";

        let stored = store
            .store("1-report.pdf", &mut body)
            .await
            .expect("store");

        assert_eq!(stored.name, "1-report.pdf");
        assert_eq!(stored.size, 13);
        assert_eq!(std::fs::read(&stored.path).expect("read"), b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn disk_store_never_overwrites() {
        let temp = TempDir::new().expect("temp dir");
        let store = DiskStore::new(temp.path());
        let mut first: &[u8] = b"first";
        let mut second: &[u8] = b"second";

        store.store("1-a.pdf", &mut first).await.expect("store");
        let err = store.store("1-a.pdf", &mut second).await.unwrap_err();

        assert!(matches!(err, StorageError::AlreadyExists(ref name) if name == "1-a.pdf"));
        assert_eq!(second, b"second", "body must be left unread");
        assert_eq!(std::fs::read(temp.path().join("1-a.pdf")).unwrap(), b"first");
    }

    #[tokio::test]
    async fn disk_store_reports_missing_directory() {
        let temp = TempDir::new().expect("temp dir");
        let missing = temp.path().join("uploads");
        let store = DiskStore::new(&missing);
        let mut body: &[u8] = b"data";

        assert!(!store.dir_ready());
        let err = store.store("1-a.pdf", &mut body).await.unwrap_err();

        assert!(matches!(err, StorageError::DirectoryMissing(ref dir) if dir == &missing));
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn disk_store_discards_partial_file_on_body_error() {
        let temp = TempDir::new().expect("temp dir");
        let store = DiskStore::new(temp.path());
        let mut body = BrokenBody { sent: false };

        let err = store.store("1-a.pdf", &mut body).await.unwrap_err();

        assert!(matches!(err, StorageError::Body(_)));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn disk_store_discards_partial_file_when_dropped() {
        let temp = TempDir::new().expect("temp dir");
        let store = DiskStore::new(temp.path());
        let mut body = StalledBody { sent: false };

        let outcome = tokio::time::timeout(
            Duration::from_millis(200),
            store.store("1-a.pdf", &mut body),
        )
        .await;

        assert!(outcome.is_err(), "store should still be waiting on the body");
        assert!(body.sent);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn disk_store_remove_deletes_file() {
        let temp = TempDir::new().expect("temp dir");
        let store = DiskStore::new(temp.path());
        let mut body: &[u8] = b"data";

        let stored = store.store("1-a.pdf", &mut body).await.expect("store");
        store.remove(&stored).await.expect("remove");

        assert!(!stored.path.exists());
    }

    #[tokio::test]
    async fn memory_store_reserves_names() {
        let store = MemoryStore::new();
        let mut first: &[u8] = b"one";
        let mut second: &[u8] = b"two";

        store.store("1-a.pdf", &mut first).await.expect("store");
        let err = store.store("1-a.pdf", &mut second).await.unwrap_err();

        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(store.get("1-a.pdf").as_deref(), Some(&b"one"[..]));
    }

    #[tokio::test]
    async fn memory_store_releases_name_on_body_error() {
        let store = MemoryStore::new();
        let mut body = BrokenBody { sent: false };

        let err = store.store("1-a.pdf", &mut body).await.unwrap_err();

        assert!(matches!(err, StorageError::Body(_)));
        assert!(store.is_empty());
    }
}
