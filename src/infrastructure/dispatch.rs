//! Channel-backed main context.
//!
//! Workers post closures through [`MainContextQueue`]; the owner of the UI
//! loop drains them with [`MainContextRunner`], on its own thread or task.

use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::domain::errors::MainContextClosed;
use crate::domain::ports::{MainContextPort, MainTask};

/// Creates a connected queue/runner pair.
#[must_use]
pub fn main_context() -> (MainContextQueue, MainContextRunner) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MainContextQueue { tx }, MainContextRunner { rx })
}

/// Posting side of the main context. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MainContextQueue {
    tx: mpsc::UnboundedSender<MainTask>,
}

impl MainContextPort for MainContextQueue {
    fn post(&self, task: MainTask) -> Result<(), MainContextClosed> {
        self.tx.send(task).map_err(|_| {
            warn!("Main context closed, dropping task");
            MainContextClosed
        })
    }
}

/// Executing side of the main context. Runs tasks in FIFO order.
#[derive(Debug)]
pub struct MainContextRunner {
    rx: mpsc::UnboundedReceiver<MainTask>,
}

impl MainContextRunner {
    /// Runs tasks until every queue handle has been dropped.
    pub async fn run(mut self) {
        while let Some(task) = self.rx.recv().await {
            task();
        }
        trace!("Main context queue closed");
    }

    /// Waits for and runs the next task. Returns false once the queue is closed.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs every task already queued without waiting. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }
}
