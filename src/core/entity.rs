//! Identifiers under which the sensors are registered in Home Assistant.

use std::fmt::{Display, Formatter};

use crate::core::profile::Profile;

const DOMAIN: &str = "sensor";

const PREFIX: &str = "egddistribuce";

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct EntityId(String);

impl EntityId {
    fn from_object_id(object_id: &str) -> Self {
        Self(format!("{DOMAIN}.{object_id}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Entity ID without the domain.
    #[must_use]
    pub fn object_id(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(_, object_id)| object_id)
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metering point and day offset shared by all sensors of one configuration entry.
#[must_use]
#[derive(Clone, Debug)]
pub struct MeteringPoint {
    pub ean: String,
    pub days: u32,
}

impl MeteringPoint {
    pub fn status(&self) -> StatusIdentity {
        StatusIdentity(self.clone())
    }

    pub fn sensor(&self, profile: Profile) -> SensorIdentity {
        SensorIdentity { point: self.clone(), profile }
    }
}

/// Identity of a consumption or production sensor.
#[must_use]
#[derive(Clone, Debug)]
pub struct SensorIdentity {
    pub point: MeteringPoint,
    pub profile: Profile,
}

impl SensorIdentity {
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!(
            "{PREFIX}_{}_{}_{}",
            self.point.ean,
            self.point.days,
            self.profile.code().to_lowercase()
        )
    }

    pub fn entity_id(&self) -> EntityId {
        EntityId::from_object_id(&self.unique_id())
    }

    #[must_use]
    pub fn name(&self) -> String {
        format!("EGD Power Data Sensor {} {} {}", self.point.ean, self.point.days, self.profile)
    }

    /// External statistic ID, `<source>:<object ID>`.
    #[must_use]
    pub fn statistic_id(&self) -> String {
        format!("{DOMAIN}:{}", self.entity_id().object_id())
    }
}

/// Identity of the status sensor.
#[must_use]
#[derive(Clone, Debug)]
pub struct StatusIdentity(pub MeteringPoint);

impl StatusIdentity {
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!("{PREFIX}_status_{}_{}", self.0.ean, self.0.days)
    }

    pub fn entity_id(&self) -> EntityId {
        EntityId::from_object_id(&self.unique_id())
    }

    #[must_use]
    pub fn name(&self) -> String {
        format!("EGD Power Data Status Sensor {} {}", self.0.ean, self.0.days)
    }

    /// Data sensors refreshed by the status sensor.
    pub fn related(&self) -> [SensorIdentity; 2] {
        Profile::ALL.map(|profile| self.0.sensor(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> MeteringPoint {
        MeteringPoint { ean: "859182400123456789".to_owned(), days: 1 }
    }

    #[test]
    fn sensor_identity_ok() {
        let identity = point().sensor(Profile::Consumption);
        assert_eq!(identity.unique_id(), "egddistribuce_859182400123456789_1_icc1");
        assert_eq!(identity.entity_id().as_str(), "sensor.egddistribuce_859182400123456789_1_icc1");
        assert_eq!(identity.name(), "EGD Power Data Sensor 859182400123456789 1 ICC1");
        assert_eq!(identity.statistic_id(), "sensor:egddistribuce_859182400123456789_1_icc1");
    }

    #[test]
    fn status_identity_ok() {
        let identity = point().status();
        assert_eq!(
            identity.entity_id().as_str(),
            "sensor.egddistribuce_status_859182400123456789_1",
        );
        assert_eq!(identity.name(), "EGD Power Data Status Sensor 859182400123456789 1");
    }

    #[test]
    fn related_ok() {
        let [consumption, production] = point().status().related();
        assert_eq!(
            consumption.entity_id().as_str(),
            "sensor.egddistribuce_859182400123456789_1_icc1",
        );
        assert_eq!(
            production.entity_id().as_str(),
            "sensor.egddistribuce_859182400123456789_1_isc1",
        );
    }
}
