//! Feed entry model.

use chrono::{DateTime, Utc};
use rss::{GuidBuilder, Item};

use crate::datetime::parse_pub_date;

/// One feed item as stored in a cache.
///
/// The underlying RSS item is kept whole, so fields the cache does not
/// interpret (description, enclosure, categories, namespaced extensions)
/// survive a read-merge-write cycle untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entry {
    item: Item,
}

impl Entry {
    /// Wrap an RSS item.
    pub fn new(item: Item) -> Self {
        Self { item }
    }

    /// Deduplication key: the guid if non-empty, else the link if non-empty.
    /// Compared verbatim.
    pub fn identity(&self) -> Option<&str> {
        let guid = self.item.guid().map(|guid| guid.value());
        let link = self.item.link();

        guid.filter(|value| !value.is_empty())
            .or_else(|| link.filter(|value| !value.is_empty()))
    }

    pub fn title(&self) -> Option<&str> {
        self.item.title()
    }

    pub fn link(&self) -> Option<&str> {
        self.item.link()
    }

    /// Raw `pubDate` value as found in the feed.
    pub fn pub_date(&self) -> Option<&str> {
        self.item.pub_date()
    }

    /// Parsed `pubDate`. `None` when absent or unparseable.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.pub_date().and_then(parse_pub_date)
    }

    /// Borrow the underlying RSS item.
    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Unwrap into the underlying RSS item.
    pub fn into_item(self) -> Item {
        self.item
    }

    /// Set a non-permalink guid.
    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        let guid = GuidBuilder::default()
            .value(guid.into())
            .permalink(false)
            .build();
        self.item.set_guid(guid);
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.item.set_link(link.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.item.set_title(title.into());
        self
    }

    pub fn with_pub_date(mut self, pub_date: impl Into<String>) -> Self {
        self.item.set_pub_date(pub_date.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.item.set_description(description.into());
        self
    }
}

impl From<Item> for Entry {
    fn from(item: Item) -> Self {
        Self::new(item)
    }
}

impl From<Entry> for Item {
    fn from(entry: Entry) -> Self {
        entry.into_item()
    }
}
