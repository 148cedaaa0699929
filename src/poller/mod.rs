mod snapshot;
mod types;

pub use types::{PollError, PollOptions, TickOutcome, DEFAULT_POLL_INTERVAL};

use crate::model::ShiftPayload;
use crate::normalize::{decode_records, normalize};
use crate::render::{CalendarView, Renderer};
use crate::source::ShiftSource;
use crate::state::{ClientState, StateStore};
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use types::PollCommand;

/// Poller : récupère, normalise, compare et rend si besoin.
///
/// Un seul tick à la fois ; le dernier instantané n'est modifié que par
/// le tick en cours.
pub struct Poller {
    source: Box<dyn ShiftSource>,
    renderer: Box<dyn Renderer + Send>,
    store: Box<dyn StateStore + Send>,
    opts: PollOptions,
    state: ClientState,
    last_snapshot: Option<String>,
    last_update: Option<DateTime<Utc>>,
}

impl Poller {
    pub fn new(
        source: Box<dyn ShiftSource>,
        renderer: Box<dyn Renderer + Send>,
        store: Box<dyn StateStore + Send>,
        opts: PollOptions,
    ) -> Self {
        let mut state = store.load().unwrap_or_else(|err| {
            warn!(error = %err, "could not load client state, using defaults");
            ClientState::default()
        });
        // la pause n'est restaurée que pour l'administrateur
        if !state.is_admin {
            state.paused = false;
        }
        Self {
            source,
            renderer,
            store,
            opts,
            state,
            last_snapshot: None,
            last_update: None,
        }
    }

    pub fn options(&self) -> PollOptions {
        self.opts
    }
    pub fn state(&self) -> &ClientState {
        &self.state
    }
    pub fn is_paused(&self) -> bool {
        self.state.paused
    }
    /// Dernière récupération réussie.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Un cycle complet : fetch → normalise → compare → rend si changé.
    pub async fn tick(&mut self) -> TickOutcome {
        let payload = match self.source.fetch().await {
            Ok(payload) => payload,
            Err(err) => return self.fail(&err.to_string()),
        };
        if matches!(payload, ShiftPayload::Unrecognized) {
            warn!("unrecognized payload shape, rendering an empty calendar");
        }

        let rows = payload.rows();
        let normalized = normalize(&decode_records(rows), self.opts.locale);
        let snap = match snapshot::encode(rows, normalized.month.as_ref()) {
            Ok(snap) => snap,
            Err(err) => return self.fail(&err.to_string()),
        };
        let now = Utc::now();
        self.last_update = Some(now);

        if self.last_snapshot.as_deref() == Some(snap.as_str()) {
            debug!(updated_at = %now, "payload unchanged, skipping render");
            self.renderer.render_update(now);
            return TickOutcome::Unchanged;
        }

        let view = match CalendarView::build(normalized) {
            Ok(view) => view,
            Err(err) => return self.fail(&err.to_string()),
        };
        if let Err(err) = self.renderer.render(&view) {
            return self.fail(&format!("render failed: {err:#}"));
        }
        self.renderer.render_update(now);
        info!(
            rows = rows.len(),
            days = view.calendar.len(),
            updated_at = %now,
            "calendar rendered"
        );
        self.last_snapshot = Some(snap);
        TickOutcome::Rendered
    }

    fn fail(&mut self, message: &str) -> TickOutcome {
        error!(error = %message, "shift refresh failed");
        self.renderer.render_error(message);
        // l'erreur a remplacé l'affichage : le prochain lot valide doit être rendu
        self.last_snapshot = None;
        TickOutcome::Failed
    }

    /// Met en pause / reprend les rafraîchissements automatiques (admin).
    pub fn set_paused(&mut self, paused: bool) -> Result<bool, PollError> {
        if !self.state.is_admin {
            return Err(PollError::NotAdmin);
        }
        if self.state.paused == paused {
            return Ok(paused);
        }
        let prev = self.state.clone();
        self.state.paused = paused;
        if let Err(err) = self.store.save(&self.state) {
            self.state = prev; // rollback
            return Err(PollError::Other(err));
        }
        info!(paused, "auto-refresh toggled");
        Ok(paused)
    }

    pub fn toggle_pause(&mut self) -> Result<bool, PollError> {
        self.set_paused(!self.state.paused)
    }

    /// Boucle coopérative : tick initial, puis intervalle fixe et commandes.
    async fn run(mut self, mut commands: mpsc::Receiver<PollCommand>) {
        self.tick().await;
        let mut ticker = self.new_ticker();

        loop {
            tokio::select! {
                _ = next_tick(&mut ticker) => {
                    self.tick().await;
                }
                cmd = commands.recv() => match cmd {
                    Some(PollCommand::Refresh) => {
                        self.tick().await;
                    }
                    Some(PollCommand::TogglePause(reply)) => {
                        let result = self.toggle_pause();
                        let resumed = matches!(result, Ok(false));
                        if result.is_ok() {
                            ticker = self.new_ticker();
                        }
                        let _ = reply.send(result);
                        if resumed {
                            self.tick().await;
                        }
                    }
                    Some(PollCommand::Shutdown) | None => break,
                },
            }
        }
        info!("poller stopped");
    }

    /// Lance la boucle sur une tâche tokio.
    pub fn spawn(self) -> (PollerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(16);
        let join = tokio::spawn(self.run(rx));
        (PollerHandle { tx }, join)
    }

    fn new_ticker(&self) -> Option<Interval> {
        if self.state.paused {
            return None;
        }
        let period = self.opts.interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(ticker)
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Pilotage d'un poller lancé par [`Poller::spawn`].
#[derive(Debug, Clone)]
pub struct PollerHandle {
    tx: mpsc::Sender<PollCommand>,
}

impl PollerHandle {
    /// Rafraîchissement immédiat, hors intervalle.
    pub async fn refresh(&self) -> Result<(), PollError> {
        self.tx
            .send(PollCommand::Refresh)
            .await
            .map_err(|_| PollError::Stopped)
    }

    /// Bascule la pause ; renvoie le nouvel état.
    pub async fn toggle_pause(&self) -> Result<bool, PollError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PollCommand::TogglePause(reply))
            .await
            .map_err(|_| PollError::Stopped)?;
        rx.await.map_err(|_| PollError::Stopped)?
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(PollCommand::Shutdown).await;
    }
}
