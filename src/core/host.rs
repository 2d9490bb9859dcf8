//! Capabilities the sensors need from the outside world.

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    core::{
        aggregate::StatisticPoint,
        entity::EntityId,
        profile::Profile,
        window::DayWindow,
    },
    prelude::*,
};

/// Opaque OAuth2 bearer token.
#[derive(Clone)]
pub struct AccessToken(pub String);

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Metering data request.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct MeteringQuery<'a> {
    pub ean: &'a str,
    pub profile: Profile,
    pub window: DayWindow,
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_token(&self) -> Result<AccessToken>;
}

#[async_trait]
pub trait MeteringSource: Send + Sync {
    /// Fetch the raw response body.
    ///
    /// Only transport errors and non-success statuses are errors, the body is left to the caller.
    async fn fetch_metering_data(
        &self,
        token: &AccessToken,
        query: MeteringQuery<'_>,
    ) -> Result<String>;
}

/// Metadata of an external statistic.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatisticMetadata {
    pub has_mean: bool,
    pub has_sum: bool,
    pub name: String,
    pub source: &'static str,
    pub statistic_id: String,
    pub unit_of_measurement: &'static str,
}

/// External statistics ingestion.
pub trait StatisticsSink: Send + Sync {
    /// Schedule the import without waiting for it.
    fn add_external_statistics(&self, metadata: StatisticMetadata, points: Vec<StatisticPoint>);
}

/// Entity refresh trigger.
pub trait EntityRefresher: Send + Sync {
    /// Schedule an update of the entity without waiting for it.
    fn request_refresh(&self, entity_id: EntityId);
}

/// Entity state as seen by Home Assistant.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct EntityState {
    pub entity_id: EntityId,

    /// `None` is reported as unknown.
    pub state: Option<String>,

    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
pub trait StateSink: Send + Sync {
    async fn publish_state(&self, state: &EntityState) -> Result;
}
