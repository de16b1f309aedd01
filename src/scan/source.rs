//! Capture sources shipped with the crate.
//!
//! # Overview
//!
//! - [`FrameDirSource`] treats a directory as a camera feed: a snapshot tool
//!   (or a test) drops image frames into it, and each read returns the next
//!   frame not yet seen, in file-name order.
//! - [`NoCamera`] never acquires; it stands in when only static images are
//!   scanned.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{CaptureSource, Facing, PixelBuffer, SourceError};

/// File extensions accepted as frames.
const FRAME_EXTENSIONS: &[&str] = &["png", "bmp", "gif", "tif", "tiff", "webp"];

/// Reads a frame may fail before it is skipped for good. A snapshot tool may
/// still be writing the file when it is first listed.
const MAX_FRAME_ATTEMPTS: u8 = 2;

/// A directory of image frames read like a camera stream.
#[derive(Debug, Clone)]
pub struct FrameDirSource {
    dir: PathBuf,
}

/// Open handle on a [`FrameDirSource`].
#[derive(Debug)]
pub struct FrameFeed {
    dir: PathBuf,
    seen: BTreeSet<OsString>,
    failed: BTreeMap<OsString, u8>,
    frames_read: u64,
}

impl FrameFeed {
    /// Number of frames handed out so far.
    #[must_use]
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl FrameDirSource {
    /// Create a source reading frames from `dir`.
    #[must_use]
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Directory this source reads from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn map_io_error(path: &Path, error: std::io::Error) -> SourceError {
        match error.kind() {
            ErrorKind::PermissionDenied => SourceError::PermissionDenied(path.to_path_buf()),
            ErrorKind::NotFound => SourceError::NotFound(path.to_path_buf()),
            _ => SourceError::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    fn is_frame(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
    }

    /// Next unseen frame path in name order.
    fn next_frame(&self, feed: &FrameFeed) -> Result<Option<(OsString, PathBuf)>, SourceError> {
        let entries =
            std::fs::read_dir(&feed.dir).map_err(|e| Self::map_io_error(&feed.dir, e))?;

        let mut candidates: Vec<(OsString, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| (entry.file_name(), entry.path()))
            .filter(|(name, path)| !feed.seen.contains(name) && Self::is_frame(path))
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(candidates.into_iter().next())
    }
}

impl CaptureSource for FrameDirSource {
    type Handle = FrameFeed;

    fn acquire(&mut self, facing: Facing) -> Result<FrameFeed, SourceError> {
        let metadata =
            std::fs::metadata(&self.dir).map_err(|e| Self::map_io_error(&self.dir, e))?;
        if !metadata.is_dir() {
            return Err(SourceError::NotADirectory(self.dir.clone()));
        }
        // Listing is the "permission prompt" of a directory feed.
        std::fs::read_dir(&self.dir).map_err(|e| Self::map_io_error(&self.dir, e))?;

        log::debug!(
            "Opened frame feed {} (preferred facing: {}, ignored for directory feeds)",
            self.dir.display(),
            facing
        );
        Ok(FrameFeed {
            dir: self.dir.clone(),
            seen: BTreeSet::new(),
            failed: BTreeMap::new(),
            frames_read: 0,
        })
    }

    fn read_frame(&mut self, feed: &mut FrameFeed) -> Result<Option<PixelBuffer>, SourceError> {
        while let Some((name, path)) = self.next_frame(feed)? {
            match image::open(&path) {
                Ok(img) => {
                    feed.failed.remove(&name);
                    feed.seen.insert(name);
                    feed.frames_read += 1;
                    log::trace!("Frame {} from {}", feed.frames_read, path.display());
                    return Ok(Some(PixelBuffer::from_image(&img)));
                }
                Err(e) => {
                    let attempts = feed.failed.entry(name.clone()).or_insert(0);
                    *attempts += 1;
                    if *attempts < MAX_FRAME_ATTEMPTS {
                        log::trace!("Frame {} not readable yet: {}", path.display(), e);
                        return Ok(None);
                    }
                    log::debug!("Skipping unreadable frame {}: {}", path.display(), e);
                    feed.failed.remove(&name);
                    feed.seen.insert(name);
                }
            }
        }
        Ok(None)
    }

    fn release(&mut self, feed: FrameFeed) {
        log::debug!(
            "Closed frame feed {} after {} frame(s)",
            feed.dir.display(),
            feed.frames_read
        );
    }
}

/// A source with no device behind it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

impl CaptureSource for NoCamera {
    type Handle = ();

    fn acquire(&mut self, _facing: Facing) -> Result<(), SourceError> {
        Err(SourceError::NoDevice)
    }

    fn read_frame(&mut self, _handle: &mut ()) -> Result<Option<PixelBuffer>, SourceError> {
        Ok(None)
    }

    fn release(&mut self, _handle: ()) {}
}
