//! Feeds the host's event stream into the client's bus.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bus::EventBus;
use crate::event::EventReceiver;

pub struct Dispatcher {
    events: EventReceiver,
    bus: EventBus,
}

impl Dispatcher {
    #[must_use]
    pub fn new(events: EventReceiver, bus: EventBus) -> Self {
        Self { events, bus }
    }

    /// Drain pending events, up to `budget`.
    ///
    /// This is non-blocking: returns immediately if no events are available.
    pub fn poll_events(&mut self, budget: usize) -> usize {
        let mut count = 0;
        while count < budget {
            match self.events.try_recv() {
                Ok(event) => {
                    self.bus.dispatch(&event);
                    count += 1;
                }
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        count
    }

    /// Dispatch until every emitter has been dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            self.bus.dispatch(&event);
        }
        tracing::debug!("event stream closed; dispatcher stopping");
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
