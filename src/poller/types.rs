use crate::dates::Locale;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Intervalle de rafraîchissement par défaut (15 s).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(15_000);

/// Options du poller
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub interval: Duration,
    pub locale: Locale,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            locale: Locale::default(),
        }
    }
}

/// Issue d'un tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Données nouvelles, rendu effectué.
    Rendered,
    /// Même instantané qu'au tick précédent, pas de rendu.
    Unchanged,
    /// Échec contenu ; le poller continue.
    Failed,
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error("only an administrator can pause or resume updates")]
    NotAdmin,
    #[error("poller is no longer running")]
    Stopped,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug)]
pub(crate) enum PollCommand {
    Refresh,
    TogglePause(oneshot::Sender<Result<bool, PollError>>),
    Shutdown,
}
