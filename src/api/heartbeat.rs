use std::time::Duration;

use reqwest::{Client as HttpClient, Url};

use crate::prelude::*;

/// Optional liveness ping, for example, to [Healthchecks.io](https://healthchecks.io).
#[derive(Clone)]
pub struct Client {
    inner: HttpClient,
    url: Option<Url>,
}

impl Client {
    pub fn new(url: Option<Url>) -> Result<Self> {
        let inner = HttpClient::builder().timeout(Duration::from_secs(3)).build()?;
        Ok(Self { inner, url })
    }

    pub async fn send(&self) {
        if let Some(url) = &self.url
            && let Err(error) = self.send_fallible(url.clone()).await
        {
            warn!("failed to send the heartbeat: {error:#}");
        }
    }

    #[instrument(skip_all)]
    async fn send_fallible(&self, url: Url) -> Result {
        debug!("sending a heartbeat…");
        self.inner.post(url).send().await?.error_for_status()?;
        Ok(())
    }
}
