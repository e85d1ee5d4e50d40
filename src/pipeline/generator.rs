//! Text renderers for the filtered map

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::config::OutputConfig;
use crate::errors::ConfigError;
use crate::models::SourceMap;

pub const RESULT_TITLE: &str = "# Live source update result";

/// Renders the delimited result document and the extended playlist
#[derive(Debug, Clone)]
pub struct ResultGenerator {
    include_header: bool,
    tz: Tz,
    group_title: String,
}

impl ResultGenerator {
    pub fn new(include_header: bool, tz: Tz) -> Self {
        Self {
            include_header,
            tz,
            group_title: crate::config::defaults::DEFAULT_M3U_GROUP_TITLE.to_string(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            include_header: config.include_header,
            tz: config.tz()?,
            group_title: config.m3u_group_title.clone(),
        })
    }

    /// Render `map` stamped with the current time
    ///
    /// `channels_collected` only decides the wording of the empty-result block.
    pub fn render(&self, map: &SourceMap, channels_collected: usize) -> String {
        self.render_at(map, channels_collected, Utc::now())
    }

    pub fn render_at(
        &self,
        map: &SourceMap,
        channels_collected: usize,
        now: DateTime<Utc>,
    ) -> String {
        let mut out = String::new();

        // Channels kept by `retain_empty_channels` contribute no lines
        if map.url_count() == 0 {
            out.push_str(RESULT_TITLE);
            out.push('\n');
            out.push_str(&format!("# Updated: {}\n", self.timestamp(now)));
            out.push_str("# No channels available.\n");
            if channels_collected == 0 {
                out.push_str("# No sources were collected: check the local list, subscriptions and template.\n");
            } else if map.is_empty() {
                out.push_str(&format!(
                    "# All {channels_collected} collected channels were filtered out during validation.\n"
                ));
            } else {
                out.push_str(&format!(
                    "# {} channels were retained but none of their URLs survived validation.\n",
                    map.channel_count()
                ));
            }
            return out;
        }

        if self.include_header {
            out.push_str(RESULT_TITLE);
            out.push('\n');
            out.push_str(&format!("# Updated: {}\n", self.timestamp(now)));
            out.push_str(&format!("# Channels: {}\n", map.channel_count()));
            out.push_str(&format!("# Total URLs: {}\n", map.url_count()));
            out.push('\n');
        }

        // BTreeMap iteration is already ascending by channel name
        for (channel, urls) in map {
            for url in urls {
                out.push_str(channel);
                out.push(',');
                out.push_str(url);
                out.push('\n');
            }
        }

        out
    }

    /// Extended playlist with the same ordering as [`Self::render`]
    pub fn render_m3u(&self, map: &SourceMap) -> String {
        let mut out = String::from("#EXTM3U\n");
        for (channel, urls) in map {
            for url in urls {
                out.push_str(&format!(
                    "#EXTINF:-1 group-title=\"{}\",{}\n{}\n",
                    self.group_title, channel, url
                ));
            }
        }
        out
    }

    fn timestamp(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.tz)
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string()
    }
}
