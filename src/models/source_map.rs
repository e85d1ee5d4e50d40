use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Channel name to candidate URLs, in first-seen order per channel
///
/// Keys are kept sorted so iteration is deterministic; nothing downstream
/// relies on insertion order between channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceMap {
    channels: BTreeMap<String, Vec<String>>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a URL to a channel, creating the channel on first use
    pub fn push<C: Into<String>, U: Into<String>>(&mut self, channel: C, url: U) {
        self.channels.entry(channel.into()).or_default().push(url.into());
    }

    /// Append all of `other`'s URLs after the ones already held per channel
    pub fn append(&mut self, other: SourceMap) {
        for (channel, urls) in other.channels {
            self.channels.entry(channel).or_default().extend(urls);
        }
    }

    /// Replace a channel's URL list
    pub fn insert(&mut self, channel: String, urls: Vec<String>) {
        self.channels.insert(channel, urls);
    }

    pub fn get(&self, channel: &str) -> Option<&[String]> {
        self.channels.get(channel).map(Vec::as_slice)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn url_count(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channels in ascending name order
    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<String>> {
        self.channels.iter()
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }
}

impl IntoIterator for SourceMap {
    type Item = (String, Vec<String>);
    type IntoIter = btree_map::IntoIter<String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.into_iter()
    }
}

impl<'a> IntoIterator for &'a SourceMap {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = btree_map::Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter()
    }
}

impl FromIterator<(String, Vec<String>)> for SourceMap {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        let mut map = SourceMap::new();
        for (channel, urls) in iter {
            map.channels.entry(channel).or_default().extend(urls);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_first_seen_order() {
        let mut map = SourceMap::new();
        map.push("CNN", "http://b.example/1");
        map.push("CNN", "http://a.example/2");
        map.push("CNN", "http://b.example/1");

        assert_eq!(
            map.get("CNN").unwrap(),
            ["http://b.example/1", "http://a.example/2", "http://b.example/1"]
        );
        assert_eq!(map.channel_count(), 1);
        assert_eq!(map.url_count(), 3);
    }

    #[test]
    fn test_append_concatenates_per_channel() {
        let mut first = SourceMap::new();
        first.push("A", "http://one");
        let mut second = SourceMap::new();
        second.push("A", "http://two");
        second.push("B", "http://three");

        first.append(second);

        assert_eq!(first.get("A").unwrap(), ["http://one", "http://two"]);
        assert_eq!(first.get("B").unwrap(), ["http://three"]);
    }

    #[test]
    fn test_iteration_is_sorted_by_channel() {
        let mut map = SourceMap::new();
        map.push("Zulu", "http://z");
        map.push("Alpha", "http://a");
        map.push("Mike", "http://m");

        let names: Vec<&str> = map.channel_names().collect();
        assert_eq!(names, ["Alpha", "Mike", "Zulu"]);
    }
}
