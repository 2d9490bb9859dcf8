use std::collections::BTreeMap;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

/// Metering resolution of the distribution operator.
pub const SAMPLE_INTERVAL: TimeDelta = TimeDelta::minutes(15);

/// Raw 15-minute metering record.
#[must_use]
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,

    /// Average power over the 15-minute slot.
    pub value: Kilowatts,
}

/// Cumulative energy at the start of an hour, as ingested by the statistics recorder.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct StatisticPoint {
    pub start: DateTime<Utc>,

    /// Running total since the start of the window.
    pub sum: KilowattHours,
}

/// Hourly breakdown of a single fetch window.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct HourlyEnergy {
    buckets: BTreeMap<DateTime<Utc>, KilowattHours>,
    total: KilowattHours,
    n_samples: usize,
}

impl HourlyEnergy {
    pub fn try_from_samples(samples: &[Sample]) -> Result<Self> {
        let mut this = Self::default();
        for sample in samples {
            this.push(*sample)?;
        }
        Ok(this)
    }

    fn push(&mut self, sample: Sample) -> Result {
        let hour = sample
            .timestamp
            .duration_trunc(TimeDelta::hours(1))
            .with_context(|| format!("failed to truncate `{}` to the hour", sample.timestamp))?;
        let energy = sample.value * SAMPLE_INTERVAL;
        *self.buckets.entry(hour).or_insert(KilowattHours::ZERO) += energy;
        self.total += energy;
        self.n_samples += 1;
        Ok(())
    }

    /// Window total.
    pub const fn total(&self) -> KilowattHours {
        self.total
    }

    #[must_use]
    pub const fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Hourly energy in ascending time order.
    pub fn hours(&self) -> impl Iterator<Item = (DateTime<Utc>, KilowattHours)> + '_ {
        self.buckets.iter().map(|(start, energy)| (*start, *energy))
    }

    /// Running sums in ascending time order, one per hour.
    pub fn statistic_points(&self) -> Vec<StatisticPoint> {
        self.hours()
            .scan(KilowattHours::ZERO, |sum, (start, energy)| {
                *sum += energy;
                Some(StatisticPoint { start, sum: *sum })
            })
            .collect()
    }
}
