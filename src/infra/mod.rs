//! Network collaborators: the language model and the cloud spreadsheet store.

pub mod cache;
pub mod drive;
pub mod gemini;

use std::time::Duration;

use reqwest::{Client, Proxy};

use crate::domain::settings::NetworkSettings;
use crate::util::version::user_agent;

/// Shared client setup: user agent, request timeout and the optional local proxy.
pub(crate) fn http_client(
    network: &NetworkSettings,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().user_agent(user_agent()).timeout(timeout);
    if let Some(proxy) = network.proxy_url() {
        log::info!("[network] routing requests through {proxy}");
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }
    builder.build()
}
