//! Quit tokens.
//!
//! A token is a semaphore permit that is consumed and never returned. The coordinator adds
//! exactly one per worker and each worker takes at most one, between two batch cycles.

use std::sync::Arc;

use tokio::sync::Semaphore;

/// Creates a quit channel holding no tokens.
pub fn create_quit_channel() -> (QuitTx, QuitRx) {
    let tokens = Arc::new(Semaphore::new(0));

    (
        QuitTx {
            tokens: tokens.clone(),
        },
        QuitRx { tokens },
    )
}

#[derive(Debug)]
pub struct QuitTx {
    tokens: Arc<Semaphore>,
}

impl QuitTx {
    /// Makes `count` more tokens available. Never blocks.
    pub fn send_tokens(&self, count: usize) {
        self.tokens.add_permits(count);
    }
}

#[derive(Debug, Clone)]
pub struct QuitRx {
    tokens: Arc<Semaphore>,
}

impl QuitRx {
    /// Consumes one token if one is available right now.
    pub fn try_take(&self) -> bool {
        match self.tokens.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    /// Waits for a token and consumes it.
    pub async fn take(&self) {
        // The semaphore is never closed, so acquisition only ends with a permit.
        if let Ok(permit) = self.tokens.acquire().await {
            permit.forget();
        }
    }

    pub fn available(&self) -> usize {
        self.tokens.available_permits()
    }
}
