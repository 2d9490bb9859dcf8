use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, json};

use crate::{
    core::{
        entity::{EntityId, StatusIdentity},
        host::{EntityRefresher, EntityState},
        throttle::Throttle,
    },
    prelude::*,
};

const UPDATED: &str = "updated";

/// Refreshes the consumption and production sensors of the same metering point.
pub struct StatusSensor {
    identity: StatusIdentity,
    refresher: Arc<dyn EntityRefresher>,
    throttle: Throttle,
    is_updated: bool,
}

impl StatusSensor {
    pub fn new(identity: StatusIdentity, refresher: Arc<dyn EntityRefresher>) -> Self {
        Self { identity, refresher, throttle: Throttle::default(), is_updated: false }
    }

    pub const fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn entity_id(&self) -> EntityId {
        self.identity.entity_id()
    }

    /// Dispatch the refresh of the related sensors unless throttled.
    ///
    /// Returns whether the refresh was dispatched.
    #[instrument(skip_all, fields(ean = %self.identity.0.ean))]
    pub fn update(&mut self, now: DateTime<Utc>) -> bool {
        if !self.throttle.try_acquire(now) {
            return false;
        }
        info!("updating related sensors…");
        for related in self.identity.related() {
            let entity_id = related.entity_id();
            debug!(%entity_id, "requesting refresh");
            self.refresher.request_refresh(entity_id);
        }
        self.is_updated = true;
        true
    }

    pub fn state(&self) -> EntityState {
        let mut attributes = Map::new();
        attributes.insert("friendly_name".to_owned(), json!(self.identity.name()));
        attributes.insert("unique_id".to_owned(), json!(self.identity.unique_id()));
        EntityState {
            entity_id: self.entity_id(),
            state: self.is_updated.then(|| UPDATED.to_owned()),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeDelta, TimeZone};

    use super::*;
    use crate::core::entity::MeteringPoint;

    #[derive(Default)]
    struct RecordingRefresher(Mutex<Vec<EntityId>>);

    impl EntityRefresher for RecordingRefresher {
        fn request_refresh(&self, entity_id: EntityId) {
            self.0.lock().unwrap().push(entity_id);
        }
    }

    #[test]
    fn update_ok() {
        let refresher = Arc::new(RecordingRefresher::default());
        let mut sensor = StatusSensor::new(
            MeteringPoint { ean: "859182400123456789".to_owned(), days: 2 }.status(),
            refresher.clone(),
        );
        assert_eq!(sensor.state().state, None);

        let now = Utc.with_ymd_and_hms(2024, 7, 16, 6, 0, 0).unwrap();
        assert!(sensor.update(now));
        assert_eq!(sensor.state().state.as_deref(), Some("updated"));
        let requested: Vec<_> =
            refresher.0.lock().unwrap().iter().map(|id| id.as_str().to_owned()).collect();
        assert_eq!(
            requested,
            [
                "sensor.egddistribuce_859182400123456789_2_icc1",
                "sensor.egddistribuce_859182400123456789_2_isc1",
            ]
        );

        assert!(!sensor.update(now + TimeDelta::hours(1)));
        assert_eq!(refresher.0.lock().unwrap().len(), 2);
    }
}
