use crate::types::{PowerState, Zone, DECODER, MUTE, POWER, SOURCE, VOLUME};
use std::collections::BTreeMap;
use std::time::Instant;

/// Last observed raw field values for one zone
///
/// A missing field has never been reported by the receiver; it is not the
/// same as "off" or zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneState {
    fields: BTreeMap<String, String>,
}

impl ZoneState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value of a field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn power(&self) -> Option<&str> {
        self.get(POWER)
    }

    pub fn source(&self) -> Option<&str> {
        self.get(SOURCE)
    }

    pub fn volume(&self) -> Option<&str> {
        self.get(VOLUME)
    }

    pub fn mute(&self) -> Option<&str> {
        self.get(MUTE)
    }

    pub fn decoder(&self) -> Option<&str> {
        self.get(DECODER)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Set a field unless it already has a value
    ///
    /// Used while extracting a single response, where the first pattern to
    /// report a field wins.
    pub(crate) fn insert_if_absent(&mut self, field: &str, value: &str) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| value.to_string());
    }

    /// Overwrite the fields present in `update`, keep everything else
    pub fn merge(&mut self, update: &ZoneState) {
        for (field, value) in &update.fields {
            self.fields.insert(field.clone(), value.clone());
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ZoneState
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Per-zone state owned by a client
///
/// Zones are created the first time a response mentions them and are never
/// removed.
#[derive(Debug, Default)]
pub struct StateStore {
    zones: BTreeMap<Zone, ZoneState>,
    power: BTreeMap<Zone, PowerState>,
    last_update: Option<Instant>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one exchange's extraction into the store
    pub fn merge(&mut self, extracted: BTreeMap<Zone, ZoneState>) {
        for (zone, update) in extracted {
            self.zones.entry(zone).or_default().merge(&update);
        }
        self.last_update = Some(Instant::now());
    }

    pub fn zone(&self, zone: Zone) -> Option<&ZoneState> {
        self.zones.get(&zone)
    }

    /// Snapshot of a zone, empty if nothing has been observed
    pub fn snapshot(&self, zone: Zone) -> ZoneState {
        self.zones.get(&zone).cloned().unwrap_or_default()
    }

    pub fn zones(&self) -> impl Iterator<Item = Zone> + '_ {
        self.zones.keys().copied()
    }

    pub fn power(&self, zone: Zone) -> PowerState {
        self.power.get(&zone).copied().unwrap_or_default()
    }

    pub fn set_power(&mut self, zone: Zone, state: PowerState) {
        let previous = self.power.insert(zone, state).unwrap_or_default();
        if previous != state {
            tracing::info!("Zone {} power {:?} -> {:?}", zone, previous, state);
        }
    }

    /// Time of the last exchange that produced a response
    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_fields_missing_from_update() {
        let mut state: ZoneState = [("volume", "-40"), ("mute", "0")].into_iter().collect();
        state.merge(&[("power", "1")].into_iter().collect::<ZoneState>());
        assert_eq!(state.volume(), Some("-40"));
        assert_eq!(state.mute(), Some("0"));
        assert_eq!(state.power(), Some("1"));
    }

    #[test]
    fn merge_overwrites_reported_fields() {
        let mut state: ZoneState = [("volume", "-40")].into_iter().collect();
        state.merge(&[("volume", "-35")].into_iter().collect::<ZoneState>());
        assert_eq!(state.volume(), Some("-35"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn insert_if_absent_keeps_first_value() {
        let mut state = ZoneState::new();
        state.insert_if_absent("volume", "-45");
        state.insert_if_absent("volume", "-40");
        assert_eq!(state.volume(), Some("-45"));
    }

    #[test]
    fn store_creates_zones_lazily() {
        let mut store = StateStore::new();
        assert!(store.zone(Zone::MAIN).is_none());
        assert!(store.snapshot(Zone::MAIN).is_empty());
        assert_eq!(store.power(Zone::MAIN), PowerState::Unknown);
        assert!(store.last_update().is_none());

        let mut extracted = BTreeMap::new();
        extracted.insert(Zone::ZONE2, [("mute", "1")].into_iter().collect::<ZoneState>());
        store.merge(extracted);

        assert!(store.zone(Zone::MAIN).is_none());
        assert_eq!(store.snapshot(Zone::ZONE2).mute(), Some("1"));
        assert_eq!(store.zones().collect::<Vec<_>>(), vec![Zone::ZONE2]);
        assert!(store.last_update().is_some());
    }

    #[test]
    fn power_state_transitions() {
        let mut store = StateStore::new();
        store.set_power(Zone::MAIN, PowerState::On);
        assert_eq!(store.power(Zone::MAIN), PowerState::On);
        store.set_power(Zone::MAIN, PowerState::Off);
        assert_eq!(store.power(Zone::MAIN), PowerState::Off);
        assert_eq!(store.power(Zone::ZONE2), PowerState::Unknown);
    }
}
