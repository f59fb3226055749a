use super::{Destination, Messenger, PackSelector, PackSource, SourcePack};
use crate::media::SourceItem;
use crate::prelude::*;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Item with the locator `n` and the file name `00n.{extension}`
pub(crate) fn item(n: usize, extension: &str) -> SourceItem {
    SourceItem::new(n.to_string(), format!("{n:03}.{extension}"))
}

pub(crate) fn items(range: impl IntoIterator<Item = usize>, extension: &str) -> Vec<SourceItem> {
    range.into_iter().map(|n| item(n, extension)).collect()
}

/// In-memory packs keyed by their short names
#[derive(Debug, Default)]
pub(crate) struct MockSource {
    pub(crate) packs: HashMap<String, SourcePack>,

    /// Locators of the items that fail to download
    pub(crate) unreachable: HashSet<String>,

    pub(crate) resolved: Mutex<Vec<PackSelector>>,
}

impl MockSource {
    pub(crate) fn with_pack(mut self, name: &str, title: &str, items: Vec<SourceItem>) -> Self {
        let title = title.to_owned();
        self.packs.insert(name.to_owned(), SourcePack { title, items });
        self
    }

    pub(crate) fn resolved(&self) -> Vec<PackSelector> {
        self.resolved.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackSource for MockSource {
    async fn resolve_pack(&self, selector: &PackSelector) -> Result<SourcePack> {
        self.resolved.lock().unwrap().push(selector.clone());

        let PackSelector::ShortName(name) = selector else {
            bail!("Mock source doesn't support {selector}");
        };

        self.packs
            .get(name)
            .cloned()
            .with_context(|| format!("Sticker pack `{name}` doesn't exist"))
    }

    async fn fetch_item(&self, item: &SourceItem) -> Result<Vec<u8>> {
        if self.unreachable.contains(&item.locator) {
            bail!("Mock download failure of `{}`", item.locator);
        }
        Ok(item.locator.clone().into_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Text(String),
    File {
        caption: String,
        file_name: String,
        /// Archive entries as they were at the time of sending
        entries: Vec<String>,
    },
}

/// Records everything that is sent. Files are inspected right away,
/// because they are removed after the delivery.
#[derive(Debug, Default)]
pub(crate) struct MockMessenger {
    pub(crate) log: Mutex<Vec<(Destination, Sent)>>,

    /// Every send fails, but is still recorded
    pub(crate) fail: bool,
}

impl MockMessenger {
    pub(crate) fn sent(&self) -> Vec<(Destination, Sent)> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, destination: Destination, sent: Sent) -> Result {
        self.log.lock().unwrap().push((destination, sent));
        if self.fail {
            bail!("Mock delivery failure");
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_text(&self, destination: Destination, text: &str) -> Result {
        self.record(destination, Sent::Text(text.to_owned()))
    }

    async fn send_file(&self, destination: Destination, file: &Utf8Path, caption: &str) -> Result {
        let sent = Sent::File {
            caption: caption.to_owned(),
            file_name: file.file_name().unwrap().to_owned(),
            entries: crate::pack::testing::entry_names(file),
        };
        self.record(destination, sent)
    }
}
