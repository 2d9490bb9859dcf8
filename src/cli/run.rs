use std::{pin::pin, sync::Arc, time::Duration};

use bon::Builder;
use chrono::{DateTime, TimeDelta, Utc};
use clap::Parser;
use reqwest::Url;
use tokio::{
    select,
    signal::ctrl_c,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    time::{MissedTickBehavior, interval},
};

use crate::{
    api::heartbeat,
    cli::{EgdArgs, HomeAssistantConnectionArgs},
    core::{
        entity::EntityId,
        host::{EntityRefresher, EntityState, StateSink},
        profile::Profile,
        sensor::{MeteringSensor, UpdateOutcome},
        status::StatusSensor,
        throttle::Throttle,
    },
    prelude::*,
};

/// How long the pending statistics imports may take after the poller has stopped.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
pub struct RunArgs {
    #[clap(flatten)]
    pub egd: EgdArgs,

    #[clap(flatten)]
    pub home_assistant: HomeAssistantConnectionArgs,

    /// How often the sensors are polled.
    #[clap(long, env = "SCAN_INTERVAL", default_value = "30s")]
    pub scan_interval: humantime::Duration,

    /// Minimum time between two effective updates of the same sensor.
    #[clap(long, env = "MIN_TIME_BETWEEN_UPDATES", default_value = "6h")]
    pub min_time_between_updates: humantime::Duration,

    #[clap(long = "heartbeat-url", env = "HEARTBEAT_URL")]
    pub heartbeat_url: Option<Url>,
}

impl RunArgs {
    pub async fn run(self) -> Result {
        let min_interval = TimeDelta::from_std(self.min_time_between_updates.into())
            .context("the minimum time between updates is too long")?;
        let point = self.egd.metering_point();
        let home_assistant = Arc::new(self.home_assistant.new_client()?);

        let sensors = Profile::ALL
            .into_iter()
            .map(|profile| {
                let api = Arc::new(self.egd.new_api()?);
                Ok(MeteringSensor::builder()
                    .identity(point.sensor(profile))
                    .token_provider(api.clone())
                    .metering_source(api)
                    .statistics_sink(home_assistant.clone())
                    .throttle(Throttle::new(min_interval))
                    .build())
            })
            .collect::<Result<Vec<_>>>()?;
        let (refresher, refresh_rx) = ChannelRefresher::new();
        let status = StatusSensor::new(point.status(), Arc::new(refresher))
            .with_throttle(Throttle::new(min_interval));

        info!(ean = %point.ean, days = point.days, "polling…");
        let result = Poller::builder()
            .sensors(sensors)
            .status(status)
            .state_sink(home_assistant.clone())
            .refresh_rx(refresh_rx)
            .heartbeat(heartbeat::Client::new(self.heartbeat_url)?)
            .interval(self.scan_interval)
            .build()
            .run(shutdown_signal())
            .await;
        home_assistant.drain(DRAIN_TIMEOUT).await;
        result
    }
}

/// Resolve on Ctrl-C, or on `SIGTERM` where there is one.
async fn shutdown_signal() -> Result {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())
            .context("failed to listen for the termination signal")?;
        select! {
            result = ctrl_c() => {
                result.context("failed to listen for the interrupt signal")?;
                info!("interrupted");
            }
            _ = terminate.recv() => {
                info!("terminated");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await.context("failed to listen for the interrupt signal")?;
        info!("interrupted");
    }

    Ok(())
}

/// Forwards the refresh requests to the poller.
struct ChannelRefresher(UnboundedSender<EntityId>);

impl ChannelRefresher {
    fn new() -> (Self, UnboundedReceiver<EntityId>) {
        let (tx, rx) = unbounded_channel();
        (Self(tx), rx)
    }
}

impl EntityRefresher for ChannelRefresher {
    fn request_refresh(&self, entity_id: EntityId) {
        if let Err(error) = self.0.send(entity_id) {
            warn!(entity_id = %error.0, "the poller has stopped, dropping the refresh request");
        }
    }
}

#[derive(Builder)]
struct Poller {
    sensors: Vec<MeteringSensor>,
    status: StatusSensor,
    state_sink: Arc<dyn StateSink>,
    refresh_rx: UnboundedReceiver<EntityId>,
    heartbeat: heartbeat::Client,

    #[builder(into)]
    interval: Duration,
}

impl Poller {
    /// Poll until `shutdown` resolves.
    async fn run(mut self, shutdown: impl Future<Output = Result>) -> Result {
        let mut shutdown = pin!(shutdown);
        let mut interval = interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                _ = interval.tick() => self.scan(Utc::now()).await,
                Some(entity_id) = self.refresh_rx.recv() => {
                    self.refresh(&entity_id, Utc::now()).await;
                }
                result = &mut shutdown => {
                    result?;
                    info!("stopping…");
                    return Ok(());
                }
            }
        }
    }

    /// Give every sensor a chance to update.
    async fn scan(&mut self, now: DateTime<Utc>) {
        let mut has_completed = false;
        for sensor in &mut self.sensors {
            has_completed |= update_sensor(sensor, self.state_sink.as_ref(), now).await;
        }
        if self.status.update(now) {
            publish(self.state_sink.as_ref(), &self.status.state()).await;
            has_completed = true;
        }
        if has_completed {
            self.heartbeat.send().await;
        }
    }

    async fn refresh(&mut self, entity_id: &EntityId, now: DateTime<Utc>) {
        match self.sensors.iter_mut().find(|sensor| sensor.entity_id() == *entity_id) {
            Some(sensor) => {
                update_sensor(sensor, self.state_sink.as_ref(), now).await;
            }
            None => {
                warn!(%entity_id, "refresh requested for an unknown entity");
            }
        }
    }
}

/// Run the sensor cycle and publish the state if it changed.
///
/// Returns whether the cycle has completed.
async fn update_sensor(
    sensor: &mut MeteringSensor,
    state_sink: &dyn StateSink,
    now: DateTime<Utc>,
) -> bool {
    match sensor.update(now).await {
        Ok(outcome) => {
            if outcome.is_changed() {
                publish(state_sink, &sensor.state()).await;
            }
            !matches!(outcome, UpdateOutcome::Throttled | UpdateOutcome::Skipped)
        }
        Err(error) => {
            error!(entity_id = %sensor.entity_id(), "the update has failed: {error:#}");
            false
        }
    }
}

async fn publish(state_sink: &dyn StateSink, state: &EntityState) {
    if let Err(error) = state_sink.publish_state(state).await {
        error!(entity_id = %state.entity_id, "failed to publish the state: {error:#}");
    }
}
