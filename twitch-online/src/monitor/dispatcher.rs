//! Online/offline callback slots.

use std::fmt;
use std::sync::Arc;

use helix_api::Stream;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Handler invoked with the stream record of a live channel.
pub type OnlineHandler = Arc<dyn Fn(&Stream) + Send + Sync>;

/// Handler invoked with the ID of a channel that is not live.
pub type OfflineHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Outcome of dispatching one check cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    /// Channels checked.
    pub checked: usize,
    /// Channels found live.
    pub online: usize,
    /// Channels found offline.
    pub offline: usize,
}

/// Holds at most one online and one offline handler.
///
/// Setting a handler replaces the previous one; `None` silences that kind of
/// notification.
#[derive(Default)]
pub struct CallbackDispatcher {
    online: RwLock<Option<OnlineHandler>>,
    offline: RwLock<Option<OfflineHandler>>,
}

impl CallbackDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, handler: Option<OnlineHandler>) {
        *self.online.write() = handler;
    }

    pub fn set_offline(&self, handler: Option<OfflineHandler>) {
        *self.offline.write() = handler;
    }

    pub fn has_online(&self) -> bool {
        self.online.read().is_some()
    }

    pub fn has_offline(&self) -> bool {
        self.offline.read().is_some()
    }

    /// Fire one callback per channel, in `channels` order.
    ///
    /// Channels present in `live` get the online handler with their record,
    /// the rest get the offline handler. Records in `live` for channels not
    /// in `channels` are ignored. Handlers run on the caller's task.
    pub fn dispatch(&self, channels: &[String], live: &FxHashMap<String, Stream>) -> CheckSummary {
        // Handlers registered from inside a callback apply from the next cycle.
        let online = self.online.read().clone();
        let offline = self.offline.read().clone();

        let mut summary = CheckSummary {
            checked: channels.len(),
            ..Default::default()
        };

        for id in channels {
            match live.get(id) {
                Some(stream) => {
                    summary.online += 1;
                    trace!(channel = %id, user = %stream.user_name, "channel online");
                    if let Some(handler) = &online {
                        handler(stream);
                    }
                }
                None => {
                    summary.offline += 1;
                    trace!(channel = %id, "channel offline");
                    if let Some(handler) = &offline {
                        handler(id);
                    }
                }
            }
        }

        summary
    }
}

impl fmt::Debug for CallbackDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackDispatcher")
            .field("online", &self.has_online())
            .field("offline", &self.has_offline())
            .finish()
    }
}
