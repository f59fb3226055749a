use crate::prelude::*;
use easy_ext::ext;
use std::path::Path;

#[ext(PathExt)]
pub(crate) impl Path {
    fn unwrap_utf8(&self) -> &Utf8Path {
        Utf8Path::from_path(self).unwrap_or_else(|| panic!("BUG: Path is not UTF8: {self:?}"))
    }
}

/// [`tempfile::TempDir`] with a UTF-8 path. The directory is removed when
/// the value is dropped.
#[derive(Debug)]
pub(crate) struct Utf8TempDir(tempfile::TempDir);

impl Utf8TempDir {
    pub(crate) fn new(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .context("Failed to create a temporary directory")?;

        Utf8Path::from_path(dir.path())
            .with_context(|| format!("Temporary directory path is not UTF8: {:?}", dir.path()))?;

        Ok(Self(dir))
    }

    pub(crate) fn path(&self) -> &Utf8Path {
        self.0.path().unwrap_utf8()
    }

    pub(crate) fn join(&self, path: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.path().join(path)
    }
}
