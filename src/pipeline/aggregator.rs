use tracing::debug;

use crate::models::SourceMap;

/// Merge the three producers, local first, then subscriptions, then template
///
/// A channel present in several inputs gets the concatenation of their URL
/// lists in that order. Nothing is deduplicated here.
pub fn aggregate(local: SourceMap, subscription: SourceMap, template: SourceMap) -> SourceMap {
    let mut merged = local;
    merged.append(subscription);
    merged.append(template);

    debug!(
        "Aggregated {} channels with {} urls",
        merged.channel_count(),
        merged.url_count()
    );
    merged
}
