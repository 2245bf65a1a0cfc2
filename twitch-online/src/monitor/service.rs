//! Stream Monitor service implementation.
//!
//! The StreamMonitor owns the poll loop: it checks once on start, then on
//! every tick of its interval and whenever a check is forced, until asked to
//! stop.

use std::sync::Arc;
use std::time::Duration;

use helix_api::{HelixClient, HelixError, Stream, StreamsParams};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::{MonitorConfig, Params, validate_interval};
use crate::{Error, Result};

use super::dispatcher::{CallbackDispatcher, CheckSummary, OfflineHandler, OnlineHandler};
use super::query::{QueryError, StreamQuery};
use super::rate_limiter::RateLimitGovernor;
use super::registry::ChannelRegistry;

/// Lifecycle of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorState {
    /// Never started.
    Idle,
    /// Loop is running.
    Running,
    /// Loop exited after a stop request; may be started again.
    Stopped,
}

/// Receiving ends of the control signals, owned by whichever call to
/// `start` is driving the loop.
struct Signals {
    stop_rx: mpsc::Receiver<()>,
    check_rx: mpsc::Receiver<()>,
}

/// Marks the monitor stopped when dropped, so a cancelled `start` future
/// does not leave it reporting `Running`.
struct RunningGuard<'a>(&'a Mutex<MonitorState>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock() = MonitorState::Stopped;
    }
}

/// The Stream Monitor service.
pub struct StreamMonitor<Q: StreamQuery> {
    /// Stream query service.
    query: Q,
    /// Tracked channels.
    registry: ChannelRegistry,
    /// Rate-limit backoff.
    governor: RateLimitGovernor,
    /// Online/offline handlers.
    dispatcher: CallbackDispatcher,
    /// Interval used by the next `start`.
    interval: Mutex<Duration>,
    /// Maximum channels per query.
    batch_size: usize,
    state: Mutex<MonitorState>,
    // Both channels hold a single pending signal.
    stop_tx: mpsc::Sender<()>,
    check_tx: mpsc::Sender<()>,
    signals: tokio::sync::Mutex<Signals>,
}

impl StreamMonitor<HelixClient> {
    /// Create a monitor backed by the Helix API.
    ///
    /// Fails if no params are given or the client ID is empty. The token is
    /// not checked; a bad one makes every check fail silently.
    pub fn new(params: Option<Params>) -> Result<Self> {
        let params = params.ok_or_else(|| Error::config("missing params"))?;
        let client =
            HelixClient::new(params.client_id, params.oauth_token).map_err(|e| match e {
                HelixError::Config(msg) => Error::Configuration(msg),
                other => Error::Helix(other),
            })?;
        Ok(Self::with_query(client))
    }
}

impl<Q: StreamQuery> StreamMonitor<Q> {
    /// Create a monitor over any stream query service, with default settings.
    pub fn with_query(query: Q) -> Self {
        Self::build(query, MonitorConfig::default())
    }

    /// Create a monitor with custom configuration.
    pub fn with_config(query: Q, config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(query, config))
    }

    fn build(query: Q, config: MonitorConfig) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let (check_tx, check_rx) = mpsc::channel(1);

        Self {
            query,
            registry: ChannelRegistry::new(),
            governor: RateLimitGovernor::new(),
            dispatcher: CallbackDispatcher::new(),
            interval: Mutex::new(config.interval),
            batch_size: config.batch_size,
            state: Mutex::new(MonitorState::Idle),
            stop_tx,
            check_tx,
            signals: tokio::sync::Mutex::new(Signals { stop_rx, check_rx }),
        }
    }

    /// The underlying stream query service.
    pub fn query(&self) -> &Q {
        &self.query
    }

    /// The channel registry.
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Number of queries held back by the rate limit so far.
    pub fn throttled_count(&self) -> u64 {
        self.governor.throttled_count()
    }

    pub fn state(&self) -> MonitorState {
        *self.state.lock()
    }

    fn set_state(&self, state: MonitorState) {
        *self.state.lock() = state;
    }

    /// Track more channels. Already tracked IDs are ignored.
    ///
    /// Waits while a check is querying the API.
    pub async fn add_channels<I, S>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry.add(ids).await
    }

    /// Tracked channel IDs in registration order.
    pub async fn channels(&self) -> Vec<String> {
        self.registry.snapshot().await
    }

    pub fn interval(&self) -> Duration {
        *self.interval.lock()
    }

    /// Set how often to check whether channels are live.
    ///
    /// The loop reads the interval when it starts: after `start` the new value
    /// only applies once the monitor is stopped and started again.
    pub fn set_interval(&self, interval: Duration) -> Result<()> {
        validate_interval(interval)?;
        *self.interval.lock() = interval;
        if self.state() == MonitorState::Running {
            debug!(
                interval = ?interval,
                "check interval changed; takes effect after restart"
            );
        }
        Ok(())
    }

    /// Register the handler called for every live channel.
    pub fn on_online<F>(&self, f: F)
    where
        F: Fn(&Stream) + Send + Sync + 'static,
    {
        self.dispatcher.set_online(Some(Arc::new(f)));
    }

    /// Register the handler called for every channel that is not live.
    pub fn on_offline<F>(&self, f: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.dispatcher.set_offline(Some(Arc::new(f)));
    }

    /// Replace or clear the online handler.
    pub fn set_online(&self, handler: Option<OnlineHandler>) {
        self.dispatcher.set_online(handler);
    }

    /// Replace or clear the offline handler.
    pub fn set_offline(&self, handler: Option<OfflineHandler>) {
        self.dispatcher.set_offline(handler);
    }

    /// Force a check without waiting for the next tick.
    ///
    /// Only one forced check can be pending: if one is already queued this
    /// waits until the loop picks it up.
    pub async fn check_now(&self) {
        // The receiver lives as long as `self`.
        let _ = self.check_tx.send(()).await;
    }

    /// Like [`check_now`](Self::check_now) but never waits.
    ///
    /// Returns `false` if a forced check was already pending.
    pub fn try_check_now(&self) -> bool {
        self.check_tx.try_send(()).is_ok()
    }

    /// Ask the running loop to stop.
    ///
    /// The request is picked up at the loop's next wait point; a check in
    /// progress runs to completion first. Returns `false` and does nothing if
    /// the loop is not running.
    pub fn stop(&self) -> bool {
        if self.state() != MonitorState::Running {
            debug!("stop requested while monitor is not running; ignoring");
            return false;
        }

        match self.stop_tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Closed(())) => false,
        }
    }

    /// Run the poll loop until [`stop`](Self::stop) is called.
    ///
    /// Checks immediately, then once per interval and on every forced check.
    /// Returns [`Error::AlreadyRunning`] if another call is driving the loop.
    pub async fn start(&self) -> Result<()> {
        let mut signals = self
            .signals
            .try_lock()
            .map_err(|_| Error::AlreadyRunning)?;
        let Signals { stop_rx, check_rx } = &mut *signals;

        // A stop that raced with the previous shutdown must not end this run.
        while stop_rx.try_recv().is_ok() {}

        let period = self.interval();
        self.set_state(MonitorState::Running);
        let _running = RunningGuard(&self.state);
        info!(interval = ?period, "Stream monitor starting");

        self.check().await;

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                Some(()) = stop_rx.recv() => {
                    debug!("Stream monitor received stop signal");
                    break;
                }
                _ = ticker.tick() => {
                    trace!("check timer fired");
                    self.check().await;
                }
                Some(()) = check_rx.recv() => {
                    debug!("forced check");
                    self.check().await;
                }
            }
        }

        info!("Stream monitor stopped");
        Ok(())
    }

    /// One check cycle as run by the loop: failures are dropped and the next
    /// tick starts over.
    async fn check(&self) {
        match self.check_once().await {
            Ok(summary) => debug!(
                checked = summary.checked,
                online = summary.online,
                offline = summary.offline,
                "check complete"
            ),
            Err(e) => debug!(error = %e, "check abandoned"),
        }
    }

    /// Query every tracked channel and fire the callbacks.
    ///
    /// The registry read guard is held while querying, including any
    /// rate-limit wait. If any query fails no callback fires and the error
    /// is returned.
    pub async fn check_once(&self) -> Result<CheckSummary> {
        let (ids, live) = {
            let guard = self.registry.read().await;
            if guard.is_empty() {
                trace!("no channels registered; skipping check");
                return Ok(CheckSummary::default());
            }
            let live = self.query_live(guard.as_slice()).await?;
            (guard.as_slice().to_vec(), live)
        };

        // Callbacks run after the guard is released.
        Ok(self.dispatcher.dispatch(&ids, &live))
    }

    async fn query_live(&self, channels: &[String]) -> Result<FxHashMap<String, Stream>> {
        let mut live =
            FxHashMap::with_capacity_and_hasher(channels.len(), Default::default());

        for batch in channels.chunks(self.batch_size) {
            let waited = self.governor.throttle(self.query.rate_limit()).await;
            if !waited.is_zero() {
                debug!("Rate limited for {:?}", waited);
            }

            let params = StreamsParams::live_for(batch.to_vec());
            let streams = self.query.live_streams(&params).await.inspect_err(|e| {
                if matches!(e, QueryError::Helix(h) if h.is_unauthorized()) {
                    warn!("stream query rejected as unauthorized; check the OAuth token");
                }
            })?;

            for stream in streams {
                live.insert(stream.user_id.clone(), stream);
            }
        }

        Ok(live)
    }
}
