//! Metering data response of the distribution operator.

use serde::Deserialize;
use serde_json::Value;

use crate::{core::aggregate::Sample, prelude::*};

/// Error message the API uses for an empty period.
const NO_RESULTS: &str = "No results";

/// Parsed metering data response.
#[must_use]
#[derive(Debug)]
pub enum MeteringData {
    /// The operator has nothing for the requested period (yet).
    NoResults,

    /// Samples of the first series.
    Samples(Vec<Sample>),
}

#[derive(Deserialize)]
struct Series {
    data: Vec<Sample>,
}

impl MeteringData {
    pub fn parse(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body).context("the response is not valid JSON")?;
        if let Some(error) = value.as_object().and_then(|object| object.get("error")) {
            if error.as_str() == Some(NO_RESULTS) {
                return Ok(Self::NoResults);
            }
            bail!("the API responded with an error: {error}");
        }
        let series: Vec<Series> =
            serde_json::from_value(value).context("unexpected metering data structure")?;
        let series = series.into_iter().next().context("the response contains no series")?;
        Ok(Self::Samples(series.data))
    }
}
