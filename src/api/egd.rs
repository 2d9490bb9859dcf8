//! [EGD Distribuce](https://www.egd.cz) metering data API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        host::{AccessToken, MeteringQuery, MeteringSource, TokenProvider},
        profile::Profile,
    },
    prelude::*,
};

pub const TOKEN_URL: &str = "https://idm.distribuce24.cz/oauth/token";

pub const DATA_URL: &str = "https://data.distribuce24.cz/rest/spotreby";

const SCOPE: &str = "namerena_data_openapi";

/// Maximum number of samples per response page. A day has at most 100 quarter-hours.
const PAGE_SIZE: u32 = 3000;

#[must_use]
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

#[must_use]
#[derive(Clone)]
pub struct Endpoints {
    pub token_url: Url,
    pub data_url: Url,
}

pub struct Api {
    client: Client,
    credentials: Credentials,
    endpoints: Endpoints,
}

impl Api {
    pub fn new(
        credentials: Credentials,
        endpoints: Endpoints,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder().user_agent("egddistribuce");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self { client: builder.build()?, credentials, endpoints })
    }
}

#[async_trait]
impl TokenProvider for Api {
    #[instrument(skip_all, fields(url = %self.endpoints.token_url))]
    async fn acquire_token(&self) -> Result<AccessToken> {
        #[derive(Serialize)]
        struct TokenRequest<'a> {
            grant_type: &'static str,
            client_id: &'a str,
            client_secret: &'a str,
            scope: &'static str,
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        debug!("requesting…");
        let response = self
            .client
            .post(self.endpoints.token_url.clone())
            .form(&TokenRequest {
                grant_type: "client_credentials",
                client_id: &self.credentials.client_id,
                client_secret: &self.credentials.client_secret,
                scope: SCOPE,
            })
            .send()
            .await
            .context("failed to call the token endpoint")?
            .error_for_status()
            .context("the token request failed")?
            .json::<TokenResponse>()
            .await
            .context("failed to deserialize the token response")?;
        info!("retrieved the access token");
        Ok(AccessToken(response.access_token))
    }
}

#[async_trait]
impl MeteringSource for Api {
    #[instrument(
        skip_all,
        fields(ean = query.ean, profile = %query.profile, date = %query.window.date),
    )]
    async fn fetch_metering_data(
        &self,
        token: &AccessToken,
        query: MeteringQuery<'_>,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct DataQuery<'a> {
            ean: &'a str,
            profile: Profile,
            from: String,
            to: String,

            #[serde(rename = "pageSize")]
            page_size: u32,
        }

        let params = DataQuery {
            ean: query.ean,
            profile: query.profile,
            from: query.window.from_param(),
            to: query.window.to_param(),
            page_size: PAGE_SIZE,
        };
        debug!(from = %params.from, to = %params.to, "fetching…");
        let response = self
            .client
            .get(self.endpoints.data_url.clone())
            .bearer_auth(&token.0)
            .query(&params)
            .send()
            .await
            .context("failed to call the data endpoint")?;
        debug!(status = %response.status(), "received");
        let body = response
            .error_for_status()
            .context("the metering data request failed")?
            .text()
            .await
            .context("failed to read the metering data")?;
        trace!(%body, "fetched");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use mockito::{Matcher, Server};

    use super::*;
    use crate::core::window::DayWindow;

    fn new_api(server: &Server) -> Result<Api> {
        Api::new(
            Credentials { client_id: "id".to_owned(), client_secret: "secret".to_owned() },
            Endpoints {
                token_url: format!("{}/oauth/token", server.url()).parse()?,
                data_url: format!("{}/rest/spotreby", server.url()).parse()?,
            },
            None,
        )
    }

    #[tokio::test]
    async fn acquire_token_ok() -> Result {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "id".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret".into()),
                Matcher::UrlEncoded("scope".into(), "namerena_data_openapi".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "t0k3n", "token_type": "Bearer", "expires_in": 3600}"#)
            .create_async()
            .await;

        let token = new_api(&server)?.acquire_token().await?;
        assert_eq!(token.0, "t0k3n");
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn acquire_token_unauthorized() -> Result {
        let mut server = Server::new_async().await;
        let _mock = server.mock("POST", "/oauth/token").with_status(401).create_async().await;
        assert!(new_api(&server)?.acquire_token().await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn acquire_token_missing_in_response() -> Result {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body(r#"{"error": "invalid_client"}"#)
            .create_async()
            .await;
        assert!(new_api(&server)?.acquire_token().await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn fetch_metering_data_ok() -> Result {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/spotreby")
            .match_header("authorization", "Bearer t0k3n")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ean".into(), "859182400123456789".into()),
                Matcher::UrlEncoded("profile".into(), "ISC1".into()),
                Matcher::UrlEncoded("from".into(), "2024-07-14T22:00:00.000Z".into()),
                Matcher::UrlEncoded("to".into(), "2024-07-15T21:45:00.000Z".into()),
                Matcher::UrlEncoded("pageSize".into(), "3000".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"error": "No results"}"#)
            .create_async()
            .await;

        let body = new_api(&server)?
            .fetch_metering_data(
                &AccessToken("t0k3n".to_owned()),
                MeteringQuery {
                    ean: "859182400123456789",
                    profile: Profile::Production,
                    window: DayWindow::on(NaiveDate::from_ymd_opt(2024, 7, 15).unwrap())?,
                },
            )
            .await?;
        assert_eq!(body, r#"{"error": "No results"}"#);
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn fetch_metering_data_server_error() -> Result {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/spotreby")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let result = new_api(&server)?
            .fetch_metering_data(
                &AccessToken("t0k3n".to_owned()),
                MeteringQuery {
                    ean: "859182400123456789",
                    profile: Profile::Consumption,
                    window: DayWindow::on(NaiveDate::from_ymd_opt(2024, 7, 15).unwrap())?,
                },
            )
            .await;
        assert!(result.is_err());
        Ok(())
    }
}
