use crate::prelude::*;
use async_trait::async_trait;
use std::fmt;
use std::io::Write;

#[async_trait]
pub(crate) trait Archiver: fmt::Debug + Send + Sync {
    /// Packs every file of the directory into a single archive at `output`.
    async fn archive(&self, dir: &Utf8Path, output: &Utf8Path) -> Result;
}

/// `.wastickers` files are plain zip archives
#[derive(Debug)]
pub(crate) struct ZipArchiver;

#[async_trait]
impl Archiver for ZipArchiver {
    async fn archive(&self, dir: &Utf8Path, output: &Utf8Path) -> Result {
        let mut entries = crate::fs::files(dir).await?;

        // Sorted for reproducible archives
        entries.sort();

        let output = output.to_owned();

        tokio::task::spawn_blocking(move || write_zip(&entries, &output))
            .await
            .context("Failed to join the archiving task")?
    }
}

fn write_zip(entries: &[Utf8PathBuf], output: &Utf8Path) -> Result {
    let file = fs_err::File::create(output.as_std_path())?;
    let mut zip = zip::ZipWriter::new(file);

    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in entries {
        let name = entry
            .file_name()
            .with_context(|| format!("Archive entry has no file name: `{entry}`"))?;

        zip.start_file(name, options)?;
        zip.write_all(&fs_err::read(entry.as_std_path())?)?;
    }

    zip.finish()?;

    debug!(entries = entries.len(), output = %output, "Archived");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::testing;
    use crate::util::path::Utf8TempDir;
    use expect_test::expect;

    #[test_log::test(tokio::test)]
    async fn smoke_zip_archive() {
        let dir = Utf8TempDir::new("wastick-test").unwrap();
        for (name, content) in [("02.webp", "two"), ("01.webp", "one"), ("title.txt", "Cats")] {
            fs::write(dir.join(name), content).await.unwrap();
        }

        let out = Utf8TempDir::new("wastick-test").unwrap();
        let output = out.join("pack.wastickers");

        ZipArchiver.archive(dir.path(), &output).await.unwrap();

        let names = testing::entry_names(&output).join(", ");
        expect!["01.webp, 02.webp, title.txt"].assert_eq(&names);

        assert_eq!(testing::read_entry(&output, "title.txt"), b"Cats");
    }
}
