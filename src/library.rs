//! Local stand-ins for the chat platform: packs are read from directories
//! on disk and the replies go to the log and an output directory.

use crate::display;
use crate::media::SourceItem;
use crate::platform::{Destination, Messenger, PackSelector, PackSource, SourcePack};
use crate::prelude::*;
use async_trait::async_trait;

/// Optional file in the pack directory with the pack's title
const TITLE_FILE: &str = "title.txt";

/// Directory with one subdirectory per sticker pack, named by the pack's
/// short name. Every file in the pack directory except for the title file
/// is a sticker, ordered by the file name.
#[derive(Debug)]
pub(crate) struct LibrarySource {
    root: Utf8PathBuf,
}

impl LibrarySource {
    pub(crate) fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn pack_dir(&self, selector: &PackSelector) -> Result<Utf8PathBuf> {
        match selector {
            PackSelector::ShortName(name) => Ok(self.root.join(name)),
            PackSelector::OpaqueReference(sticker) => {
                // The reference points to a sticker file inside the pack
                let sticker = self.root.join(sticker);
                sticker
                    .parent()
                    .map(ToOwned::to_owned)
                    .with_context(|| format!("Sticker `{sticker}` has no parent directory"))
            }
        }
    }
}

#[async_trait]
impl PackSource for LibrarySource {
    #[instrument(skip_all, fields(pack = %selector))]
    async fn resolve_pack(&self, selector: &PackSelector) -> Result<SourcePack> {
        let dir = self.pack_dir(selector)?;

        let is_dir = fs::metadata(&dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);

        ensure!(is_dir, "Sticker pack {selector} wasn't found at `{dir}`");

        let title_file = dir.join(TITLE_FILE);

        let mut items = vec![];
        let mut title = None;

        for path in crate::fs::files(&dir).await?.into_iter().sorted() {
            if path == title_file {
                title = Some(fs::read_to_string(&path).await?.trim().to_owned());
                continue;
            }

            if !fs::metadata(&path).await?.is_file() {
                continue;
            }

            let file_name = path
                .file_name()
                .with_context(|| format!("Sticker path has no file name: `{path}`"))?
                .to_owned();

            items.push(SourceItem::new(path.into_string(), file_name));
        }

        let title = title
            .filter(|title| !title.is_empty())
            .or_else(|| dir.file_name().map(ToOwned::to_owned))
            .unwrap_or_else(|| selector.to_string());

        debug!(%title, items = items.len(), "Resolved the pack");

        Ok(SourcePack { title, items })
    }

    async fn fetch_item(&self, item: &SourceItem) -> Result<Vec<u8>> {
        fs::read(&item.locator).await.err_into()
    }
}

/// Logs the text replies and saves the delivered files into a directory
#[derive(Debug)]
pub(crate) struct DirectoryMessenger {
    output: Utf8PathBuf,
}

impl DirectoryMessenger {
    pub(crate) fn new(output: impl Into<Utf8PathBuf>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

#[async_trait]
impl Messenger for DirectoryMessenger {
    async fn send_text(&self, destination: Destination, text: &str) -> Result {
        info!(
            chat = destination.chat.0,
            reply_to = ?destination.reply_to.map(|message| message.0),
            "💬 {text}"
        );
        Ok(())
    }

    async fn send_file(&self, destination: Destination, file: &Utf8Path, caption: &str) -> Result {
        let file_name = file
            .file_name()
            .with_context(|| format!("Delivered file has no name: `{file}`"))?;

        fs::create_dir_all(&self.output).await?;

        let target = self.output.join(file_name);
        fs::copy(file, &target).await?;

        info!(
            chat = destination.chat.0,
            caption,
            "🔥 Saved output at {}",
            display::path(&target)
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ChatId;
    use crate::util::path::Utf8TempDir;
    use expect_test::expect;

    async fn library() -> Utf8TempDir {
        let root = Utf8TempDir::new("wastick-test").unwrap();

        let cats = root.join("cats");
        fs::create_dir(&cats).await.unwrap();
        fs::create_dir(cats.join("nested")).await.unwrap();

        for (name, content) in [("002.webm", "video"), ("001.webp", "image"), ("003.tgs", "lottie")] {
            fs::write(cats.join(name), content).await.unwrap();
        }
        fs::write(cats.join(TITLE_FILE), "Cute Cats\n").await.unwrap();

        let dogs = root.join("dogs");
        fs::create_dir(&dogs).await.unwrap();
        fs::write(dogs.join("1.png"), "image").await.unwrap();

        root
    }

    fn render(pack: &SourcePack) -> String {
        let items = pack
            .items
            .iter()
            .map(|item| format!("{} ({})", item.file_name, item.kind))
            .join(", ");

        format!("{}: {items}", pack.title)
    }

    #[test_log::test(tokio::test)]
    async fn smoke_resolve_pack() {
        let root = library().await;
        let source = LibrarySource::new(root.path().to_owned());

        let by_name = source
            .resolve_pack(&PackSelector::ShortName("cats".to_owned()))
            .await
            .unwrap();

        expect!["Cute Cats: 001.webp (static-image), 002.webm (video), 003.tgs (vector-animation)"]
            .assert_eq(&render(&by_name));

        let by_sticker = source
            .resolve_pack(&PackSelector::OpaqueReference("cats/002.webm".to_owned()))
            .await
            .unwrap();

        assert_eq!(render(&by_sticker), render(&by_name));

        // The directory name is the fallback title
        let untitled = source
            .resolve_pack(&PackSelector::ShortName("dogs".to_owned()))
            .await
            .unwrap();

        expect!["dogs: 1.png (static-image)"].assert_eq(&render(&untitled));

        let bytes = source.fetch_item(&by_name.items[1]).await.unwrap();
        assert_eq!(bytes, b"video");
    }

    #[test_log::test(tokio::test)]
    async fn missing_pack_is_an_error() {
        let root = library().await;
        let source = LibrarySource::new(root.path().to_owned());

        let err = source
            .resolve_pack(&PackSelector::ShortName("birds".to_owned()))
            .await
            .unwrap_err()
            .to_string();

        assert!(err.starts_with("Sticker pack birds wasn't found at"), "{err}");
    }

    #[test_log::test(tokio::test)]
    async fn delivered_files_are_copied_into_the_output() {
        let scratch = Utf8TempDir::new("wastick-test").unwrap();
        let file = scratch.join("Cats.wastickers");
        fs::write(&file, "zip").await.unwrap();

        let output = scratch.join("out");
        let messenger = DirectoryMessenger::new(output.clone());

        let destination = Destination {
            chat: ChatId(1),
            reply_to: None,
        };

        messenger.send_text(destination, "Hello").await.unwrap();
        messenger
            .send_file(destination, &file, "Part 1/1 - 3 B")
            .await
            .unwrap();

        assert_eq!(fs::read(output.join("Cats.wastickers")).await.unwrap(), b"zip");
    }
}
