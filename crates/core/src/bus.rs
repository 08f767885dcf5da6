//! Loop event bus: progress notifications for observers of a run.
//!
//! The controller publishes here as it appends to the history. Observers
//! (the CLI trace printer, tests) subscribe; they can never write back.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::event::Event;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEvent {
    RunStarted {
        run_id: String,
        task: String,
        max_iterations: u32,
    },
    ActionAppended {
        run_id: String,
        iteration: u32,
        event: Event,
    },
    ObservationAppended {
        run_id: String,
        iteration: u32,
        event: Event,
    },
    RunFinished {
        run_id: String,
        /// Terminal status label, e.g. "finished" or "aborted".
        status: String,
        iterations: u32,
        events: usize,
    },
}

impl LoopEvent {
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::ActionAppended { run_id, .. }
            | Self::ObservationAppended { run_id, .. }
            | Self::RunFinished { run_id, .. } => run_id,
        }
    }
}

/// Broadcast-based pub/sub for `LoopEvent`s.
pub struct LoopEventBus {
    sender: broadcast::Sender<Arc<LoopEvent>>,
}

impl LoopEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: LoopEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LoopEvent>> {
        self.sender.subscribe()
    }
}

impl Default for LoopEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
