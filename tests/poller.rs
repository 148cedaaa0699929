#![forbid(unsafe_code)]
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use escala::{
    CalendarView, ClientState, FetchError, JsonStateStore, PollError, PollOptions, Poller,
    Renderer, ShiftPayload, ShiftSource, StateStore, TickOutcome,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Rejoue une liste de réponses ; la dernière est répétée.
struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Value, u16>>>,
    last: Mutex<Option<Result<Value, u16>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(responses: Vec<Result<Value, u16>>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            calls: Arc::clone(&calls),
        };
        (source, calls)
    }
}

#[async_trait]
impl ShiftSource for ScriptedSource {
    async fn fetch(&self) -> Result<ShiftPayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        let response = match next {
            Some(r) => {
                *self.last.lock().unwrap() = Some(r.clone());
                r
            }
            None => self.last.lock().unwrap().clone().unwrap_or(Err(503)),
        };
        match response {
            Ok(body) => Ok(ShiftPayload::resolve(body, "turnos")),
            Err(code) => Err(FetchError::Status(code)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Render(CalendarView),
    Error(String),
}

#[derive(Clone, Default)]
struct RecordingRenderer {
    events: Arc<Mutex<Vec<Event>>>,
    updates: Arc<AtomicUsize>,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, view: &CalendarView) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(Event::Render(view.clone()));
        Ok(())
    }

    fn render_error(&mut self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Error(message.to_string()));
    }

    fn render_update(&mut self, _at: DateTime<Utc>) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

fn batch(name: &str) -> Value {
    json!({ "turnos": [{
        "fecha": "2025-11-03", "hora": "08:30:00", "sala": "Sala Azul",
        "titular": name, "titular_disponible": true
    }] })
}

fn store_in(dir: &Path, state: Option<ClientState>) -> Box<JsonStateStore> {
    let store = JsonStateStore::open(dir.join("state.json"));
    if let Some(state) = state {
        store.save(&state).unwrap();
    }
    Box::new(store)
}

fn admin() -> ClientState {
    ClientState {
        user_name: None,
        is_admin: true,
        paused: false,
    }
}

fn poller(
    responses: Vec<Result<Value, u16>>,
    dir: &Path,
    state: Option<ClientState>,
) -> (Poller, RecordingRenderer, Arc<AtomicUsize>) {
    let (source, calls) = ScriptedSource::new(responses);
    let renderer = RecordingRenderer::default();
    let poller = Poller::new(
        Box::new(source),
        Box::new(renderer.clone()),
        store_in(dir, state),
        PollOptions::default(),
    );
    (poller, renderer, calls)
}

#[tokio::test]
async fn identical_payloads_render_once() {
    let dir = tempdir().unwrap();
    let (mut p, renderer, calls) = poller(
        vec![Ok(batch("Ana García")), Ok(batch("Ana García"))],
        dir.path(),
        None,
    );

    assert_eq!(p.tick().await, TickOutcome::Rendered);
    assert_eq!(p.tick().await, TickOutcome::Unchanged);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(renderer.events.lock().unwrap().len(), 1);
    // l'heure de mise à jour suit chaque récupération réussie
    assert_eq!(renderer.updates.load(Ordering::SeqCst), 2);
    assert!(p.last_update().is_some());
}

#[tokio::test]
async fn changed_payload_renders_again() {
    let dir = tempdir().unwrap();
    let (mut p, renderer, _) = poller(
        vec![Ok(batch("Ana García")), Ok(batch("Luis Gómez"))],
        dir.path(),
        None,
    );

    assert_eq!(p.tick().await, TickOutcome::Rendered);
    assert_eq!(p.tick().await, TickOutcome::Rendered);

    let events = renderer.events.lock().unwrap();
    let Event::Render(view) = &events[1] else {
        panic!("expected a render, got {:?}", events[1]);
    };
    let occ = view.calendar[&3].occupancy("08:30", "Sala Azul").unwrap();
    assert_eq!(occ.assigned_names, vec!["Luis G."]);
}

#[tokio::test]
async fn wrapped_and_bare_shapes_share_a_snapshot() {
    let dir = tempdir().unwrap();
    let rows = batch("Ana García")["turnos"].clone();
    let (mut p, renderer, _) =
        poller(vec![Ok(batch("Ana García")), Ok(rows)], dir.path(), None);

    assert_eq!(p.tick().await, TickOutcome::Rendered);
    assert_eq!(p.tick().await, TickOutcome::Unchanged);
    assert_eq!(renderer.events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_tick_shows_error_and_keeps_polling() {
    let dir = tempdir().unwrap();
    let (mut p, renderer, _) = poller(
        vec![Ok(batch("Ana García")), Err(500), Ok(batch("Ana García"))],
        dir.path(),
        None,
    );

    assert_eq!(p.tick().await, TickOutcome::Rendered);
    assert_eq!(p.tick().await, TickOutcome::Failed);
    // même lot qu'avant l'erreur : il doit remplacer le message d'erreur
    assert_eq!(p.tick().await, TickOutcome::Rendered);

    let events = renderer.events.lock().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[1], Event::Error("unexpected status 500".to_string()));
    assert_eq!(events[0], events[2]);
    assert_eq!(renderer.updates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unrecognized_payload_renders_empty_calendar() {
    let dir = tempdir().unwrap();
    let (mut p, renderer, _) =
        poller(vec![Ok(json!({ "error": "db down" }))], dir.path(), None);

    assert_eq!(p.tick().await, TickOutcome::Rendered);
    assert_eq!(p.tick().await, TickOutcome::Unchanged);
    let events = renderer.events.lock().unwrap();
    assert_eq!(events[0], Event::Render(CalendarView::default()));
}

#[tokio::test]
async fn only_admin_can_pause() {
    let dir = tempdir().unwrap();
    let (mut p, _, _) = poller(vec![], dir.path(), None);
    assert!(matches!(p.set_paused(true), Err(PollError::NotAdmin)));
    assert!(!p.is_paused());
}

#[tokio::test]
async fn pause_state_persists_for_admin() {
    let dir = tempdir().unwrap();
    let (mut p, _, _) = poller(vec![], dir.path(), Some(admin()));
    assert_eq!(p.toggle_pause().unwrap(), true);
    drop(p);

    let stored = JsonStateStore::open(dir.path().join("state.json")).load().unwrap();
    assert!(stored.paused);

    let (restored, _, _) = poller(vec![], dir.path(), None);
    assert!(restored.is_paused());
}

#[tokio::test]
async fn stored_pause_is_ignored_for_non_admin() {
    let dir = tempdir().unwrap();
    let state = ClientState {
        user_name: Some("Ana".into()),
        is_admin: false,
        paused: true,
    };
    let (p, _, _) = poller(vec![], dir.path(), Some(state));
    assert!(!p.is_paused());
    assert_eq!(p.state().user_name.as_deref(), Some("Ana"));
}

#[tokio::test(start_paused = true)]
async fn spawned_loop_polls_pauses_and_resumes() {
    let dir = tempdir().unwrap();
    let (p, renderer, calls) =
        poller(vec![Ok(batch("Ana García"))], dir.path(), Some(admin()));
    let (handle, join) = p.spawn();

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert_eq!(handle.toggle_pause().await.unwrap(), true);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // reprise : fetch immédiat, sans attendre l'intervalle
    assert_eq!(handle.toggle_pause().await.unwrap(), false);
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    handle.refresh().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    handle.shutdown().await;
    join.await.unwrap();
    assert!(matches!(handle.refresh().await, Err(PollError::Stopped)));

    // un seul rendu : le lot n'a jamais changé
    assert_eq!(renderer.events.lock().unwrap().len(), 1);
}
