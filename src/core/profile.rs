use std::fmt::{Display, Formatter};

/// Metering data stream selector.
#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    Eq,
    PartialEq,
    clap::ValueEnum,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Profile {
    /// Energy taken from the grid.
    #[serde(rename = "ICC1")]
    Consumption,

    /// Energy fed into the grid.
    #[serde(rename = "ISC1")]
    Production,
}

impl Profile {
    pub const ALL: [Self; 2] = [Self::Consumption, Self::Production];

    /// API-side profile code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Consumption => "ICC1",
            Self::Production => "ISC1",
        }
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_ok() {
        assert_eq!(Profile::Consumption.code(), "ICC1");
        assert_eq!(Profile::Production.code(), "ISC1");
    }

    #[test]
    fn serialize_ok() {
        assert_eq!(serde_json::to_string(&Profile::Production).unwrap(), r#""ISC1""#);
    }
}
