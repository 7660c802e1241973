use std::fmt;

use log::debug;
use rand::seq::SliceRandom;

use crate::error::{GolosError, Result};

/// Connection health of one endpoint as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Untried,
    Connected,
    NeedsReconnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEndpoint {
    url: String,
    secure: bool,
    state: EndpointState,
}

impl NodeEndpoint {
    /// Accepts `ws://` and `wss://` URLs only.
    pub fn new(url: &str) -> Result<NodeEndpoint> {
        let url = url.trim();
        let secure = if url.starts_with("wss://") {
            true
        } else if url.starts_with("ws://") {
            false
        } else {
            return Err(GolosError::Config(format!(
                "Node url must start with ws:// or wss://, got {url:?}"
            )));
        };
        Ok(NodeEndpoint {
            url: url.to_string(),
            secure,
            state: EndpointState::Untried,
        })
    }

    pub fn get_url(&self) -> &str {
        &self.url
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn get_state(&self) -> EndpointState {
        self.state
    }
}

impl fmt::Display for NodeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Ordered, de-duplicated endpoint list with a rotating cursor.
///
/// The cursor starts before the first endpoint, so the first [`NodePool::advance`]
/// yields endpoint 0 and later calls cycle through the list indefinitely.
#[derive(Debug, Clone)]
pub struct NodePool {
    endpoints: Vec<NodeEndpoint>,
    cursor: Option<usize>,
}

impl NodePool {
    pub fn new<S: AsRef<str>>(urls: &[S]) -> Result<NodePool> {
        let mut pool = NodePool {
            endpoints: Vec::new(),
            cursor: None,
        };
        for url in urls {
            pool.add_node(url.as_ref())?;
        }
        if pool.is_empty() {
            return Err(GolosError::Config("Node list is empty".to_string()));
        }
        Ok(pool)
    }

    /// Add an endpoint unless the same url is already known.
    pub fn add_node(&mut self, url: &str) -> Result<()> {
        let endpoint = NodeEndpoint::new(url)?;
        if !self.node_is_known(endpoint.get_url()) {
            self.endpoints.push(endpoint);
        }
        Ok(())
    }

    pub fn node_is_known(&self, url: &str) -> bool {
        self.endpoints.iter().any(|x| x.get_url() == url.trim())
    }

    pub fn shuffle(&mut self) {
        self.endpoints.shuffle(&mut rand::thread_rng());
        self.cursor = None;
        debug!("Node order after shuffle: {:?}", self.urls());
    }

    /// Move to the next endpoint, wrapping at the end of the list.
    pub fn advance(&mut self) -> &NodeEndpoint {
        let next = match self.cursor {
            Some(idx) => (idx + 1) % self.endpoints.len(),
            None => 0,
        };
        self.cursor = Some(next);
        &self.endpoints[next]
    }

    pub fn current(&self) -> Option<&NodeEndpoint> {
        self.cursor.and_then(|idx| self.endpoints.get(idx))
    }

    pub fn mark_current(&mut self, state: EndpointState) {
        if let Some(endpoint) = self.cursor.and_then(|idx| self.endpoints.get_mut(idx)) {
            endpoint.state = state;
        }
    }

    pub fn reset(&mut self) {
        self.cursor = None;
    }

    pub fn urls(&self) -> Vec<&str> {
        self.endpoints.iter().map(NodeEndpoint::get_url).collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
