//! Home Assistant REST API.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{
    Client,
    ClientBuilder,
    Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::{task::JoinSet, time::timeout};

use crate::{
    core::{
        aggregate::StatisticPoint,
        host::{EntityState, StateSink, StatisticMetadata, StatisticsSink},
    },
    prelude::*,
};

/// State of an entity whose value is not known.
const UNKNOWN: &str = "unknown";

#[derive(Clone)]
pub struct Api {
    client: Client,
    base_url: Url,

    /// Statistics imports that have not been awaited yet.
    imports: Arc<Mutex<JoinSet<()>>>,
}

impl Api {
    pub fn new(access_token: &str, base_url: Url) -> Result<Self> {
        let headers = HeaderMap::from_iter([(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {access_token}"))?,
        )]);
        let client =
            ClientBuilder::new().user_agent("egddistribuce").default_headers(headers).build()?;
        Ok(Self { client, base_url, imports: Arc::default() })
    }

    /// Wait for the pending statistics imports, giving up after `max_duration`.
    pub async fn drain(&self, max_duration: Duration) {
        let mut imports = std::mem::take(&mut *self.lock_imports());
        if imports.is_empty() {
            return;
        }
        info!(n_pending = imports.len(), "waiting for the statistics imports…");
        if timeout(max_duration, imports.join_all()).await.is_err() {
            warn!("timed out, the remaining imports are cancelled");
        }
    }

    fn lock_imports(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.imports.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("invalid base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    #[instrument(skip_all, fields(entity_id = %state.entity_id))]
    pub async fn set_state(&self, state: &EntityState) -> Result {
        #[derive(Serialize)]
        struct SetStateRequest<'a> {
            state: &'a str,
            attributes: &'a Map<String, Value>,
        }

        let request = SetStateRequest {
            state: state.state.as_deref().unwrap_or(UNKNOWN),
            attributes: &state.attributes,
        };
        debug!(state = request.state, "setting…");
        self.client
            .post(self.url(["states", state.entity_id.as_str()])?)
            .json(&request)
            .send()
            .await
            .context("failed to call the states endpoint")?
            .error_for_status()
            .context("failed to set the state")?;
        Ok(())
    }

    #[instrument(skip_all, fields(statistic_id = %metadata.statistic_id, n_points = points.len()))]
    pub async fn import_statistics(
        &self,
        metadata: &StatisticMetadata,
        points: &[StatisticPoint],
    ) -> Result {
        #[derive(Serialize)]
        struct ImportStatisticsRequest<'a> {
            #[serde(flatten)]
            metadata: &'a StatisticMetadata,

            stats: &'a [StatisticPoint],
        }

        info!("importing…");
        self.client
            .post(self.url(["services", "recorder", "import_statistics"])?)
            .json(&ImportStatisticsRequest { metadata, stats: points })
            .send()
            .await
            .context("failed to call the recorder service")?
            .error_for_status()
            .context("failed to import the statistics")?;
        Ok(())
    }
}

#[async_trait]
impl StateSink for Api {
    async fn publish_state(&self, state: &EntityState) -> Result {
        self.set_state(state).await
    }
}

impl StatisticsSink for Api {
    fn add_external_statistics(&self, metadata: StatisticMetadata, points: Vec<StatisticPoint>) {
        let this = self.clone();
        let mut imports = self.lock_imports();
        while imports.try_join_next().is_some() {}
        imports.spawn(async move {
            if let Err(error) = this.import_statistics(&metadata, &points).await {
                error!(statistic_id = %metadata.statistic_id, "failed to import: {error:#}");
            }
        });
    }
}
