//! State shared by the reconnect loop and the caller-facing operations

use crate::arrival::ArrivalSignal;
use crate::byte_queue::ByteQueue;
use crate::notification::{ListenerSet, LogEvent};
use crate::slot::ConnectionSlot;
use crate::state::StateCell;
use crate::statistics::LinkStatistics;
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct LinkContext {
    pub(crate) queue: Arc<ByteQueue>,
    pub(crate) slot: Arc<ConnectionSlot>,
    pub(crate) arrivals: ArrivalSignal,
    pub(crate) listeners: ListenerSet,
    pub(crate) statistics: Arc<LinkStatistics>,
    pub(crate) state: StateCell,
}

impl LinkContext {
    pub(crate) fn new() -> Self {
        Self {
            queue: Arc::new(ByteQueue::new()),
            slot: Arc::new(ConnectionSlot::new()),
            arrivals: ArrivalSignal::new(),
            listeners: ListenerSet::new(),
            statistics: Arc::new(LinkStatistics::new()),
            state: StateCell::new(),
        }
    }

    pub(crate) fn emit(&self, event: LogEvent) {
        self.listeners.log(&event);
    }

    pub(crate) fn communicatable_changed(&self, communicatable: bool) {
        self.listeners.communicatable_changed(communicatable);
    }
}
