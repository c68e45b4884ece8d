use std::time::Duration;

use num::bigint::BigUint;
use reqwest::blocking::Client;

use crate::arith::to_fixed_bytes;
use crate::cache::QueryCache;

use super::{Error, Oracle};

/// Default time allowed for one oracle round-trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Body the oracle service returns for conforming padding
const CONFORMING_BODY: &str = "1";

/// Padding oracle behind an HTTP service
///
/// Queries are `GET <server>/<hex>`, where hex is the lowercase, fixed-width
/// encoding of the ciphertext. A body of `1` is a conforming answer and any
/// other body is a negative one; 5xx statuses are transport errors and are
/// never cached. Answers are memoized in a `QueryCache`, so each
/// distinct ciphertext costs at most one request over the cache's lifetime.
pub struct RemoteOracle {
    client: Client,
    server: String,
    k: usize,
    cache: QueryCache,
}

impl RemoteOracle {
    /// Create an oracle for a k-byte modulus
    pub fn new(server: &str, k: usize, cache: QueryCache, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
            k,
            cache,
        })
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Canonical hex form of a ciphertext, also used as the cache key
    pub fn encode(&self, c: &BigUint) -> String {
        hex::encode(to_fixed_bytes(c, self.k))
    }
}

impl Oracle for RemoteOracle {
    fn conforming(&mut self, c: &BigUint) -> Result<bool, Error> {
        let data = self.encode(c);

        if let Some(answer) = self.cache.get(&data) {
            return Ok(answer);
        }

        let url = format!("{}/{}", self.server, data);
        let mut response = self.client.get(&url).send()?;
        // a failing server gave no answer at all
        if response.status().is_server_error() {
            response = response.error_for_status()?;
        }
        let status = response.status();
        let body = response.text()?;
        let answer = body == CONFORMING_BODY;

        tracing::debug!(%url, %status, %body, answer, "oracle response");

        if let Err(e) = self.cache.insert(data, answer) {
            tracing::warn!(error = %e, "failed to persist query cache");
        }

        Ok(answer)
    }
}
