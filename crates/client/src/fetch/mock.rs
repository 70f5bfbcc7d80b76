//! Scripted in-process network for tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use fixie_core::{CachedResponse, Error, FetchRequest};

use super::Network;

#[derive(Debug, Clone)]
enum Reply {
    Respond { status: u16, body: Bytes, delay: Option<Duration> },
    Fail,
    Hang,
}

/// A [`Network`] that replays canned replies keyed by URL.
///
/// Unknown URLs fail with `NetworkUnavailable`, as does every URL while
/// the mock is offline. Every call is recorded, including failed ones.
#[derive(Debug, Default)]
pub struct MockNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    offline: Mutex<bool>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, url: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), reply);
        self
    }

    /// Answer `url` with `status` and `body`.
    pub fn respond(&self, url: &str, status: u16, body: &str) -> &Self {
        self.script(url, Reply::Respond { status, body: Bytes::from(body.to_string()), delay: None })
    }

    /// Answer `url` after sleeping for `delay`.
    pub fn respond_after(&self, url: &str, delay: Duration, body: &str) -> &Self {
        self.script(url, Reply::Respond { status: 200, body: Bytes::from(body.to_string()), delay: Some(delay) })
    }

    /// Fail `url` with a network error.
    pub fn fail(&self, url: &str) -> &Self {
        self.script(url, Reply::Fail)
    }

    /// Never answer `url`.
    pub fn hang(&self, url: &str) -> &Self {
        self.script(url, Reply::Hang)
    }

    /// Fail every request while set.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    /// Total number of fetches attempted.
    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of fetches attempted for `url`.
    pub fn calls_for(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        let offline = *self.offline.lock().unwrap();
        let reply = self.replies.lock().unwrap().get(&url).cloned();
        let reply = if offline { Reply::Fail } else { reply.unwrap_or(Reply::Fail) };

        match reply {
            Reply::Respond { status, body, delay } => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(CachedResponse { url, status, headers: vec![("content-type".into(), "text/plain".into())], body })
            }
            Reply::Fail => Err(Error::NetworkUnavailable(format!("{url}: connection refused"))),
            Reply::Hang => std::future::pending().await,
        }
    }
}
