//! Boundary with the chat platform. The core only talks to it through
//! the traits defined here.

#[cfg(test)]
pub(crate) mod testing;

use crate::media::SourceItem;
use crate::prelude::*;
use async_trait::async_trait;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct UserId(pub(crate) i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ChatId(pub(crate) i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MessageId(pub(crate) i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The user who requested the conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Requester {
    pub(crate) id: UserId,

    /// Shown as the author of the produced packs
    pub(crate) display_name: String,
}

/// Where the replies to a request go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Destination {
    pub(crate) chat: ChatId,
    pub(crate) reply_to: Option<MessageId>,
}

/// Identifies the source pack to convert
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PackSelector {
    /// The pack's short name, the part after `t.me/addstickers/`
    ShortName(String),

    /// Platform-specific reference taken from a forwarded sticker
    OpaqueReference(String),
}

impl PackSelector {
    /// Accepts either a link to the pack or its bare short name.
    pub(crate) fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let name = lazy_regex::regex_captures!(
            r"(?:(?:t|telegram)\.me/)?addstickers/([A-Za-z0-9_]+)",
            input
        )
        .map(|(_, name)| name)
        .unwrap_or(input);

        ensure!(
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "Invalid sticker pack link or name: `{input}`. \
            Expected a link like t.me/addstickers/<name> or the bare pack name"
        );

        Ok(Self::ShortName(name.to_owned()))
    }
}

impl fmt::Display for PackSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortName(name) => f.write_str(name),
            Self::OpaqueReference(token) => write!(f, "<reference {token}>"),
        }
    }
}

/// Normalized source pack, the core never looks at platform-specific shapes
#[derive(Debug, Clone)]
pub(crate) struct SourcePack {
    pub(crate) title: String,
    pub(crate) items: Vec<SourceItem>,
}

#[async_trait]
pub(crate) trait PackSource: fmt::Debug + Send + Sync {
    /// Fails if the pack doesn't exist, is private or can't be reached.
    async fn resolve_pack(&self, selector: &PackSelector) -> Result<SourcePack>;

    async fn fetch_item(&self, item: &SourceItem) -> Result<Vec<u8>>;
}

#[async_trait]
pub(crate) trait Messenger: fmt::Debug + Send + Sync {
    async fn send_text(&self, destination: Destination, text: &str) -> Result;

    async fn send_file(&self, destination: Destination, file: &Utf8Path, caption: &str)
        -> Result;
}
