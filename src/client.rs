use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClientConfig, load_config};
use crate::data::DataService;
use crate::error::Result;
use crate::jobs::{ResultIdExtractor, TrailingToken};
use crate::store::{FileStore, ResultStore};
use crate::transport::Transport;

/// Version of the wrapped GENESIS-Online web service.
pub const API_VERSION: &str = "4.3";

/// Client for the GENESIS-Online RESTful web service.
///
/// Holds the session parameters (`username`, `password`, `language`) sent
/// with every request and gives access to the data service. Configuration
/// comes from explicit arguments, `GENESIS_*` environment variables, or a
/// `.genesisrc` file (see [`Client::new`]).
pub struct Client {
    config: ClientConfig,
    transport: Transport,
    store: Arc<dyn ResultStore>,
    extractor: Arc<dyn ResultIdExtractor>,
    poll_interval: Duration,
    workers: usize,
    data: DataService,
}

impl Client {
    /// Creates a client using environment variables and/or `.genesisrc`.
    ///
    /// This is equivalent to `Client::new(None, None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `username`/`password`/`language` arguments
    /// - environment variables `GENESIS_USERNAME`, `GENESIS_PASSWORD`,
    ///   `GENESIS_LANGUAGE` (and `GENESIS_URL` for the base URL)
    /// - a config file from `GENESIS_RC`, `./.genesisrc`, or `~/.genesisrc`
    pub fn new(
        username: Option<String>,
        password: Option<String>,
        language: Option<String>,
    ) -> Result<Self> {
        let config = load_config(username, password, language)?;
        Self::with_config(config)
    }

    /// Creates a client from an already resolved configuration. Results of
    /// large-table batch jobs go to the default file store
    /// (`~/genesisonline`, created on the first batch-job write).
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = Transport::new(&config)?;
        let store: Arc<dyn ResultStore> = Arc::new(FileStore::default_location());
        let extractor: Arc<dyn ResultIdExtractor> = Arc::new(TrailingToken);
        let poll_interval = Duration::from_secs(30);
        let workers = 4;
        let data = DataService::new(
            transport.clone(),
            Arc::clone(&store),
            Arc::clone(&extractor),
            poll_interval,
            workers,
        );
        Ok(Client { config, transport, store, extractor, poll_interval, workers, data })
    }

    /// Per-request timeout (default 60 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport.set_timeout(timeout);
        self.rebuild()
    }

    /// Retry budget and maximum backoff for transient transport failures.
    pub fn with_retry(mut self, retry_max: usize, sleep_max: Duration) -> Self {
        self.transport.set_retry(retry_max, sleep_max);
        self.rebuild()
    }

    /// Interval between batch-job polls (default 30 seconds).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self.rebuild()
    }

    /// Number of background polling workers (default 4). Asynchronous table
    /// requests beyond this bound queue rather than spawning new threads.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self.rebuild()
    }

    /// Replaces the batch-job result store (default: one `{id}.json` per
    /// result under `~/genesisonline`).
    pub fn with_store(mut self, store: impl ResultStore + 'static) -> Self {
        self.store = Arc::new(store);
        self.rebuild()
    }

    /// Replaces the result-identifier extraction strategy (default:
    /// [`TrailingToken`]).
    pub fn with_extractor(mut self, extractor: impl ResultIdExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self.rebuild()
    }

    /// The data service: per-endpoint download methods and the deferred
    /// large-table flow.
    pub fn data(&self) -> &DataService {
        &self.data
    }

    /// The resolved configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn rebuild(mut self) -> Self {
        self.data = DataService::new(
            self.transport.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.extractor),
            self.poll_interval,
            self.workers,
        );
        self
    }
}
