use std::collections::HashMap;

/// Entity id → merged recency timestamp in milliseconds.
pub type RecencyMap = HashMap<u64, u64>;

/// Combine the local usage clock (milliseconds) with the external focus log
/// (seconds) into one timestamp per window.
///
/// The focus log sees focus changes made outside the picker (hotkeys, mouse);
/// local usage sees activations made by the picker before the log is flushed.
/// The later of the two wins. Windows with no signal in either source are left
/// out: an absent entry ranks as zero.
pub fn merge<I>(local_usage: &HashMap<u64, u64>, external_log: &HashMap<u64, u64>, ids: I) -> RecencyMap
where
    I: IntoIterator<Item = u64>,
{
    ids.into_iter()
        .filter_map(|id| {
            let external_ms = external_log
                .get(&id)
                .map(|secs| secs.saturating_mul(1000))
                .unwrap_or(0);
            let local_ms = local_usage.get(&id).copied().unwrap_or(0);

            let merged = external_ms.max(local_ms);
            (merged > 0).then_some((id, merged))
        })
        .collect()
}
