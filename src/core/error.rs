/// Failure that abandons the current update cycle of a sensor.
///
/// Malformed responses are not listed here: the sensor absorbs them and goes unknown.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("failed to acquire the access token")]
    Authentication(#[source] anyhow::Error),

    #[error("failed to fetch the metering data")]
    Fetch(#[source] anyhow::Error),
}
