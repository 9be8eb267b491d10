//! Saving rendered images to disk

use std::fs;
use std::io::{ErrorKind, Write};
use std::iter;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::{Builder, NamedTempFile};
use url::Url;

use crate::markup::{epoch_millis, random_token};
use crate::{Error, Result};

/// Attempts at finding an unused filename before giving up
const MAX_ATTEMPTS: usize = 3;

/// Resolve `dir` against the current working directory if it is relative
pub fn absolute_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| Error::PersistenceError(format!("cannot resolve working directory: {e}")))?;
    Ok(cwd.join(dir))
}

/// Generated name for a persisted PNG, `img-<epoch-ms>-<token>.png`
pub fn artifact_name() -> String {
    format!("img-{}-{}.png", epoch_millis(), random_token())
}

/// Write `bytes` into a fresh file under `dir` and return its `file://` URI.
///
/// The directory is created if missing. Bytes go to a hidden temporary file
/// first and are linked into place once flushed, so the returned path only
/// ever names a complete file. Existing files are never overwritten.
pub fn save_png(dir: &Path, bytes: &[u8]) -> Result<Url> {
    save_with_names(dir, bytes, iter::repeat_with(artifact_name))
}

/// Like [`save_png`], trying up to [`MAX_ATTEMPTS`] names from `names`
fn save_with_names<I>(dir: &Path, bytes: &[u8], names: I) -> Result<Url>
where
    I: IntoIterator<Item = String>,
{
    let dir = absolute_dir(dir)?;
    fs::create_dir_all(&dir).map_err(|e| {
        Error::PersistenceError(format!("cannot create directory {}: {e}", dir.display()))
    })?;

    let mut staged = stage(&dir, bytes)?;
    for name in names.into_iter().take(MAX_ATTEMPTS) {
        let target = dir.join(&name);
        // the final link fails rather than replace an existing file
        match staged.persist_noclobber(&target) {
            Ok(_) => {
                return Url::from_file_path(&target).map_err(|()| {
                    Error::PersistenceError(format!("cannot build file URI for {}", target.display()))
                });
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                debug!("artifact name {name} already taken, drawing another");
                staged = e.file;
            }
            Err(e) => {
                return Err(Error::PersistenceError(format!(
                    "cannot move image into {}: {}",
                    target.display(),
                    e.error
                )));
            }
        }
    }

    warn!("gave up finding a free artifact name in {}", dir.display());
    Err(Error::PersistenceError(format!(
        "no free file name in {} after {MAX_ATTEMPTS} attempts",
        dir.display()
    )))
}

/// Hidden temporary file in `dir` holding `bytes`, removed again on drop
fn stage(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let write = || -> std::io::Result<NamedTempFile> {
        let mut file = Builder::new().prefix(".img-").suffix(".tmp").tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;
        Ok(file)
    };
    write().map_err(|e| {
        Error::PersistenceError(format!("cannot write image into {}: {e}", dir.display()))
    })
}
