pub mod aggregate;
pub mod entity;
pub mod error;
pub mod host;
pub mod metering;
pub mod profile;
pub mod sensor;
pub mod status;
pub mod throttle;
pub mod window;
