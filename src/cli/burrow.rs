use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::{
    cli::EgdArgs,
    core::{
        aggregate::HourlyEnergy,
        host::{MeteringQuery, MeteringSource, TokenProvider},
        metering::MeteringData,
        profile::Profile,
        window::DayWindow,
    },
    prelude::*,
    tables::build_hourly_energy_table,
};

#[derive(Parser)]
pub struct BurrowArgs {
    #[command(subcommand)]
    command: BurrowCommand,
}

impl BurrowArgs {
    pub async fn run(self) -> Result {
        match self.command {
            BurrowCommand::Fetch(args) => args.run().await,
        }
    }
}

#[derive(Subcommand)]
enum BurrowCommand {
    /// Fetch and aggregate the metering data without touching Home Assistant.
    Fetch(BurrowFetchArgs),
}

#[derive(Parser)]
struct BurrowFetchArgs {
    #[clap(flatten)]
    egd: EgdArgs,

    #[clap(long, env = "EGD_PROFILE", value_enum, default_value = "consumption")]
    profile: Profile,
}

impl BurrowFetchArgs {
    #[instrument(skip_all, fields(profile = %self.profile))]
    async fn run(self) -> Result {
        ensure!(!self.egd.ean.is_empty(), "EAN is not set");
        let api = self.egd.new_api()?;
        let window = DayWindow::days_before(Utc::now(), self.egd.days)?;
        let token = api.acquire_token().await?;
        let query = MeteringQuery { ean: &self.egd.ean, profile: self.profile, window };
        let body = api.fetch_metering_data(&token, query).await?;

        match MeteringData::parse(&body)? {
            MeteringData::NoResults => {
                warn!(date = %window.date, "no data available for the requested period");
            }
            MeteringData::Samples(samples) => {
                let hourly = HourlyEnergy::try_from_samples(&samples)?;
                info!(
                    date = %window.date,
                    total = %hourly.total(),
                    n_samples = hourly.n_samples(),
                    "gotcha"
                );
                println!("{}", build_hourly_energy_table(&hourly));
            }
        }
        Ok(())
    }
}
