use std::{
    ops::Deref,
    sync::{Arc, PoisonError},
};

use reqwest::{Client, ClientBuilder};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};
use url::Url;

use crate::error::DashcapResult;

/// A `reqwest` client with a shared cookie store.
///
/// Cloning is cheap and every clone talks through the same connection pool
/// and cookie jar, so one instance can be handed to any number of concurrent
/// fetch tasks.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    cookies_store: Arc<CookieStoreMutex>,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> DashcapResult<Self> {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = builder.cookie_provider(cookies_store.clone()).build()?;

        Ok(Self {
            client,
            cookies_store,
        })
    }

    /// Load `name=value` cookie strings for `url`. Unparseable cookies are
    /// ignored.
    pub fn add_cookies<I, S>(&self, cookies: I, url: &Url)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = self
            .cookies_store
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for cookie in cookies {
            if let Err(e) = store.parse(cookie.as_ref(), url) {
                tracing::warn!(url = %url, "Ignored invalid cookie: {e}");
            }
        }
    }

    /// Cookies that would be sent to `url`, as `name=value` strings.
    pub fn cookies(&self, url: &Url) -> Vec<String> {
        let store = self
            .cookies_store
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        store
            .matches(url)
            .into_iter()
            .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
            .collect()
    }
}

impl Deref for HttpClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
