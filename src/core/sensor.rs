use std::sync::Arc;

use bon::Builder;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value, json};

use crate::{
    core::{
        aggregate::HourlyEnergy,
        entity::{EntityId, SensorIdentity},
        error::UpdateError,
        host::{
            EntityState,
            MeteringQuery,
            MeteringSource,
            StatisticMetadata,
            StatisticsSink,
            TokenProvider,
        },
        metering::MeteringData,
        throttle::Throttle,
        window::DayWindow,
    },
    prelude::*,
    quantity::energy::KilowattHours,
};

/// What an update attempt did to the sensor.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UpdateOutcome {
    /// Too early since the previous attempt.
    Throttled,

    /// Not configured.
    Skipped,

    /// The operator has no data for the day yet, the state is left as is.
    NoData,

    /// New total is available and the statistics are dispatched.
    Updated,

    /// The response could not be processed, the state is unknown now.
    Invalidated,
}

impl UpdateOutcome {
    /// Whether the state should be republished.
    #[must_use]
    pub const fn is_changed(self) -> bool {
        matches!(self, Self::Updated | Self::Invalidated)
    }
}

/// Extra state attributes of a metering sensor.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct MeteringAttributes {
    /// Local calendar date of the window.
    pub date: NaiveDate,

    pub total_energy: KilowattHours,

    /// Number of raw 15-minute samples.
    pub n_data_points: usize,
}

impl MeteringAttributes {
    fn insert_into(&self, attributes: &mut Map<String, Value>) {
        attributes.insert("date".to_owned(), json!(self.date.to_string()));
        attributes.insert("total_energy_kWh".to_owned(), json!(self.total_energy.0));
        attributes.insert("data_points".to_owned(), json!(self.n_data_points));
    }
}

/// Daily consumption or production of a metering point.
#[derive(Builder)]
pub struct MeteringSensor {
    identity: SensorIdentity,
    token_provider: Arc<dyn TokenProvider>,
    metering_source: Arc<dyn MeteringSource>,
    statistics_sink: Arc<dyn StatisticsSink>,

    #[builder(default)]
    throttle: Throttle,

    #[builder(skip)]
    total: Option<KilowattHours>,

    #[builder(skip)]
    attributes: Option<MeteringAttributes>,
}

impl MeteringSensor {
    pub fn entity_id(&self) -> EntityId {
        self.identity.entity_id()
    }

    #[must_use]
    pub const fn total(&self) -> Option<KilowattHours> {
        self.total
    }

    #[must_use]
    pub const fn attributes(&self) -> Option<&MeteringAttributes> {
        self.attributes.as_ref()
    }

    /// Run a polling cycle unless throttled.
    ///
    /// Authentication and fetch failures abandon the cycle and leave the state untouched,
    /// any processing failure resets the state to unknown.
    #[instrument(
        skip_all,
        fields(ean = %self.identity.point.ean, profile = %self.identity.profile),
    )]
    pub async fn update(&mut self, now: DateTime<Utc>) -> Result<UpdateOutcome, UpdateError> {
        if !self.throttle.try_acquire(now) {
            return Ok(UpdateOutcome::Throttled);
        }
        if self.identity.point.ean.is_empty() {
            warn!("EAN is not set, skipping the update");
            return Ok(UpdateOutcome::Skipped);
        }

        info!("updating…");
        let window =
            DayWindow::days_before(now, self.identity.point.days).map_err(UpdateError::Fetch)?;
        let token =
            self.token_provider.acquire_token().await.map_err(UpdateError::Authentication)?;
        let query =
            MeteringQuery { ean: &self.identity.point.ean, profile: self.identity.profile, window };
        let body = self
            .metering_source
            .fetch_metering_data(&token, query)
            .await
            .map_err(UpdateError::Fetch)?;

        let hourly = match MeteringData::parse(&body) {
            Ok(MeteringData::NoResults) => {
                info!(date = %window.date, "no data available for the requested period");
                return Ok(UpdateOutcome::NoData);
            }
            Ok(MeteringData::Samples(samples)) => HourlyEnergy::try_from_samples(&samples),
            Err(error) => Err(error),
        };
        match hourly {
            Ok(hourly) => {
                self.accept(window, &hourly);
                Ok(UpdateOutcome::Updated)
            }
            Err(error) => Ok(self.invalidate(&error)),
        }
    }

    fn accept(&mut self, window: DayWindow, hourly: &HourlyEnergy) {
        let points = hourly.statistic_points();
        if points.is_empty() {
            debug!("no statistics to import");
        } else {
            self.statistics_sink.add_external_statistics(self.statistic_metadata(), points);
        }

        let total = hourly.total();
        info!(date = %window.date, %total, n_samples = hourly.n_samples(), "updated");
        self.total = Some(total);
        self.attributes = Some(MeteringAttributes {
            date: window.date,
            total_energy: total,
            n_data_points: hourly.n_samples(),
        });
    }

    fn invalidate(&mut self, error: &Error) -> UpdateOutcome {
        error!("failed to process the metering data: {error:#}");
        self.total = None;
        UpdateOutcome::Invalidated
    }

    pub fn statistic_metadata(&self) -> StatisticMetadata {
        StatisticMetadata {
            has_mean: false,
            has_sum: true,
            name: self.identity.name(),
            source: "sensor",
            statistic_id: self.identity.statistic_id(),
            unit_of_measurement: "kWh",
        }
    }

    pub fn state(&self) -> EntityState {
        let mut attributes = Map::new();
        attributes.insert("friendly_name".to_owned(), json!(self.identity.name()));
        attributes.insert("unique_id".to_owned(), json!(self.identity.unique_id()));
        attributes.insert("device_class".to_owned(), json!("energy"));
        attributes.insert("state_class".to_owned(), json!("total_increasing"));
        attributes.insert("unit_of_measurement".to_owned(), json!("kWh"));
        if let Some(metering_attributes) = &self.attributes {
            metering_attributes.insert_into(&mut attributes);
        }
        EntityState {
            entity_id: self.entity_id(),
            state: self.total.map(|total| total.0.to_string()),
            attributes,
        }
    }
}
