#![forbid(unsafe_code)]
//! Escala — calendrier mensuel de turnos (postes pourvus / vacants).
//!
//! - Normalisation des lignes `/api/turnos` en jour → heure → salle.
//! - Grille semaines × jours du mois.
//! - Polling avec détection de changement et pause persistée (admin).
//! - Prise d'un poste libre par l'utilisateur, libération par l'admin.
//! - Dates toujours locales : aucune conversion de fuseau.

pub mod assign;
pub mod config;
pub mod dates;
pub mod grid;
pub mod model;
pub mod normalize;
pub mod poller;
pub mod render;
pub mod source;
pub mod state;

pub use assign::{AssignError, Assigner, HttpAssigner, SlotRef, SlotStatus};
pub use config::Config;
pub use dates::{parse_record_date, Locale};
pub use grid::{build_weeks, GridError, Week, WeekGrid};
pub use model::{
    Calendar, CalendarDay, MonthContext, Occupancy, Position, PositionSlot, ShiftPayload,
    ShiftRecord,
};
pub use normalize::{decode_records, format_name, normalize, NormalizedCalendar};
pub use poller::{PollError, PollOptions, Poller, PollerHandle, TickOutcome};
pub use render::{CalendarView, JsonRenderer, Renderer, TextRenderer};
pub use source::{FetchError, FileSource, HttpSource, ShiftSource};
pub use state::{ClientState, JsonStateStore, StateStore};
