//! Directory enumeration for directory pins

use crate::error::{Error, Result};
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::trace;
use walkdir::{DirEntry, WalkDir};

/// A regular file found under a pinned directory
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Path relative to the parent of the pinned directory, `/`-separated,
    /// so every file shares the directory's own name as first component
    pub relative_path: String,
    pub content: Bytes,
}

/// Produces the files under a directory as a lazy, finite stream
///
/// A failure to read any entry is yielded in place and ends the useful part
/// of the stream for the caller.
pub trait FileSource: Send + Sync {
    fn files(&self, root: &Path) -> BoxStream<'static, Result<SourceFile>>;
}

/// Entries buffered between the walking thread and the stream
const WALK_BUFFER: usize = 64;

/// [`FileSource`] walking the local filesystem
///
/// Symbolic links are followed by default. With link following turned off a
/// link is reported as an error, never skipped.
#[derive(Debug, Clone)]
pub struct WalkDirSource {
    follow_links: bool,
    include_hidden: bool,
}

impl Default for WalkDirSource {
    fn default() -> Self {
        Self {
            follow_links: true,
            include_hidden: false,
        }
    }
}

impl WalkDirSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow symbolic links while walking
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.follow_links = yes;
        self
    }

    /// Include dot-files and dot-directories
    pub fn include_hidden(mut self, yes: bool) -> Self {
        self.include_hidden = yes;
        self
    }

    /// Blocking walk, run on the blocking pool. Stops at the first error or
    /// when the receiving stream is dropped.
    fn walk(&self, root: &Path, tx: mpsc::Sender<Result<PathBuf>>) {
        let include_hidden = self.include_hidden;
        let walker = WalkDir::new(root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| include_hidden || e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let item = match entry {
                Ok(e) if e.file_type().is_file() => Ok(e.into_path()),
                Ok(e) if e.file_type().is_symlink() => Err(Error::Walk {
                    path: e.into_path(),
                    message: "symbolic link not followed".to_string(),
                }),
                Ok(_) => continue,
                Err(e) => Err(Error::from(e)),
            };

            let stop = item.is_err();
            if tx.blocking_send(item).is_err() || stop {
                break;
            }
        }
    }
}

impl FileSource for WalkDirSource {
    fn files(&self, root: &Path) -> BoxStream<'static, Result<SourceFile>> {
        let root = root.to_path_buf();
        let prefix = base_name(&root);
        let (tx, rx) = mpsc::channel(WALK_BUFFER);

        // The walk starts on first poll
        let source = self.clone();
        let walk_root = root.clone();
        let start = stream::once(async move {
            tokio::task::spawn_blocking(move || source.walk(&walk_root, tx));
        })
        .filter_map(|()| async { None::<Result<PathBuf>> });

        let entries = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|entry| (entry, rx))
        });

        start
            .chain(entries)
            .then(move |entry| {
                let root = root.clone();
                let prefix = prefix.clone();
                async move {
                    let file = entry?;
                    let content = tokio::fs::read(&file).await?;
                    let relative_path = upload_path(&prefix, &root, &file);
                    trace!(path = %relative_path, bytes = content.len(), "Enumerated file");
                    Ok::<_, Error>(SourceFile {
                        relative_path,
                        content: Bytes::from(content),
                    })
                }
            })
            .boxed()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Name of the pinned directory itself, resolving `.` and `..`
fn base_name(root: &Path) -> String {
    let resolved: PathBuf = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn upload_path(prefix: &str, root: &Path, file: &Path) -> String {
    let relative = file
        .strip_prefix(root)
        .unwrap_or(file)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");

    match (prefix.is_empty(), relative.is_empty()) {
        (_, true) => prefix.to_string(),
        (true, false) => relative,
        (false, false) => format!("{}/{}", prefix, relative),
    }
}
