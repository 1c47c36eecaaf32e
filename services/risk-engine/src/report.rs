//! Risk report sink
//!
//! Publishes per-race reports into the report store. Each race's report is
//! replaced as one value, so a reader sees either the previous report or
//! the new one, never a mix.

use std::sync::Arc;
use types::ids::RaceId;
use types::risk::RiskReport;

use crate::store::SharedStore;

#[derive(Clone)]
pub struct RiskReportSink {
    store: SharedStore<RaceId, Arc<RiskReport>>,
}

impl RiskReportSink {
    pub fn new(store: SharedStore<RaceId, Arc<RiskReport>>) -> Self {
        Self { store }
    }

    /// Replace the race's report
    pub fn publish(&self, report: RiskReport) -> Arc<RiskReport> {
        let report = Arc::new(report);
        self.store.put(report.race_id, Arc::clone(&report));
        report
    }

    /// Flag the race's last report as stale.
    ///
    /// Returns the flagged report, or None if the race was never reported.
    pub fn mark_stale(&self, race_id: RaceId) -> Option<Arc<RiskReport>> {
        self.store
            .update(&race_id, &|r| Arc::new(r.as_ref().clone().into_stale()))
    }

    pub fn latest(&self, race_id: RaceId) -> Option<Arc<RiskReport>> {
        self.store.get(&race_id)
    }

    /// Every published report, in race order
    pub fn all(&self) -> Vec<Arc<RiskReport>> {
        self.store.all_values()
    }

    /// Races whose latest report is stale
    pub fn stale_races(&self) -> Vec<RaceId> {
        self.store.keys(&|_, r| r.stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreBackend;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;
    use types::ids::HorseId;

    fn make_report(race: u64, cycle: u64, exposure: i64) -> RiskReport {
        let mut exposures = BTreeMap::new();
        exposures.insert(HorseId::new(1), Decimal::from(exposure));
        RiskReport::new(RaceId::new(race), exposures, 1, cycle, 0, Utc::now())
    }

    #[test]
    fn test_publish_replaces_previous() {
        let sink = RiskReportSink::new(StoreBackend::Local.open());
        sink.publish(make_report(1, 1, 10));
        let held = sink.latest(RaceId::new(1)).unwrap();

        sink.publish(make_report(1, 2, 25));

        // A reader's handle to the old report is unaffected
        assert_eq!(held.cycle, 1);
        let latest = sink.latest(RaceId::new(1)).unwrap();
        assert_eq!(latest.cycle, 2);
        assert_eq!(latest.exposure_for(HorseId::new(1)), Decimal::from(25));
    }

    #[test]
    fn test_mark_stale_keeps_values() {
        let sink = RiskReportSink::new(StoreBackend::Partitioned.open());
        sink.publish(make_report(1, 1, 10));
        sink.publish(make_report(2, 1, 5));

        let stale = sink.mark_stale(RaceId::new(1)).unwrap();
        assert!(stale.stale);
        assert_eq!(stale.exposure_for(HorseId::new(1)), Decimal::from(10));
        assert_eq!(sink.stale_races(), vec![RaceId::new(1)]);
        assert!(sink.mark_stale(RaceId::new(9)).is_none());
        assert_eq!(sink.all().len(), 2);
    }
}
