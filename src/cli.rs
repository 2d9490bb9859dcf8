mod burrow;
mod run;

use clap::{Parser, Subcommand};
use reqwest::Url;

pub use self::{burrow::BurrowArgs, run::RunArgs};
use crate::{
    api::{egd, home_assistant},
    core::entity::MeteringPoint,
    prelude::*,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: poll the metering data and keep the Home Assistant sensors up to date.
    #[clap(name = "run")]
    Run(Box<RunArgs>),

    /// Development tools.
    #[clap(name = "burrow")]
    Burrow(Box<BurrowArgs>),
}

#[derive(Parser)]
pub struct EgdArgs {
    #[clap(long = "egd-client-id", env = "EGD_CLIENT_ID")]
    pub client_id: String,

    #[clap(long = "egd-client-secret", env = "EGD_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Metering point EAN. Sensors with an empty EAN are never updated.
    #[clap(long, env = "EGD_EAN")]
    pub ean: String,

    /// How many days back from today the reported day is.
    #[clap(long, env = "EGD_DAYS", default_value = "1")]
    pub days: u32,

    #[clap(long = "egd-token-url", env = "EGD_TOKEN_URL", default_value = egd::TOKEN_URL)]
    pub token_url: Url,

    #[clap(long = "egd-data-url", env = "EGD_DATA_URL", default_value = egd::DATA_URL)]
    pub data_url: Url,

    /// Request timeout, unlimited by default.
    #[clap(long = "egd-http-timeout", env = "EGD_HTTP_TIMEOUT")]
    pub http_timeout: Option<humantime::Duration>,
}

impl EgdArgs {
    pub fn metering_point(&self) -> MeteringPoint {
        MeteringPoint { ean: self.ean.clone(), days: self.days }
    }

    pub fn new_api(&self) -> Result<egd::Api> {
        egd::Api::new(
            egd::Credentials {
                client_id: self.client_id.clone(),
                client_secret: self.client_secret.clone(),
            },
            egd::Endpoints { token_url: self.token_url.clone(), data_url: self.data_url.clone() },
            self.http_timeout.map(Into::into),
        )
    }
}

#[derive(Parser)]
pub struct HomeAssistantConnectionArgs {
    /// Home Assistant API access token.
    #[clap(
        long = "home-assistant-access-token",
        env = "HOME_ASSISTANT_ACCESS_TOKEN",
        hide_env_values = true
    )]
    pub access_token: String,

    /// Home Assistant API base URL. For example: `http://localhost:8123/api`.
    #[clap(long = "home-assistant-api-base-url", env = "HOME_ASSISTANT_API_BASE_URL")]
    pub base_url: Url,
}

impl HomeAssistantConnectionArgs {
    pub fn new_client(&self) -> Result<home_assistant::Api> {
        home_assistant::Api::new(&self.access_token, self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn args_ok() {
        Args::command().debug_assert();
    }

    #[test]
    fn run_defaults_ok() -> Result {
        let args = Args::try_parse_from([
            "egddistribuce",
            "run",
            "--egd-client-id",
            "id",
            "--egd-client-secret",
            "secret",
            "--ean",
            "859182400123456789",
            "--home-assistant-access-token",
            "token",
            "--home-assistant-api-base-url",
            "http://localhost:8123/api",
        ])?;
        let Command::Run(args) = args.command else {
            bail!("expected the run command");
        };
        assert_eq!(args.egd.days, 1);
        assert_eq!(args.egd.token_url.as_str(), egd::TOKEN_URL);
        assert_eq!(args.egd.data_url.as_str(), egd::DATA_URL);
        assert!(args.egd.http_timeout.is_none());
        Ok(())
    }
}
