use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Marqueur textuel d'un poste non offert (convention de l'import CSV).
pub const NOT_OFFERED_MARKER: &str = "No disponible";

/// Les quatre postes d'un turno, dans l'ordre fixe d'affichage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Titular,
    Auxiliar1,
    Auxiliar2,
    Auxiliar3,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Titular,
        Position::Auxiliar1,
        Position::Auxiliar2,
        Position::Auxiliar3,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Position::Titular => "Titular",
            Position::Auxiliar1 => "Auxiliar 1",
            Position::Auxiliar2 => "Auxiliar 2",
            Position::Auxiliar3 => "Auxiliar 3",
        }
    }

    fn index(self) -> usize {
        match self {
            Position::Titular => 0,
            Position::Auxiliar1 => 1,
            Position::Auxiliar2 => 2,
            Position::Auxiliar3 => 3,
        }
    }
}

/// Un poste : identifiant d'assignation, nom éventuel et drapeau
/// `disponible` (tri-état).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionSlot {
    pub id: Option<String>,
    pub name: Option<String>,
    pub available: Option<bool>,
}

impl PositionSlot {
    pub fn new(name: Option<&str>, available: Option<bool>) -> Self {
        Self {
            id: None,
            name: name.map(str::to_owned),
            available,
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    /// `false` explicite ou marqueur "No disponible" : poste non offert.
    pub fn is_offered(&self) -> bool {
        if self.available == Some(false) {
            return false;
        }
        !self
            .name
            .as_deref()
            .is_some_and(|n| n.trim().eq_ignore_ascii_case(NOT_OFFERED_MARKER))
    }

    /// Nom brut, trimé ; vide si absent.
    pub fn trimmed_name(&self) -> &str {
        self.name.as_deref().map(str::trim).unwrap_or("")
    }
}

/// Ligne de turno telle que renvoyée par `/api/turnos`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "WireRecord")]
pub struct ShiftRecord {
    pub date: Option<String>,
    pub time: Option<String>,
    pub room: Option<String>,
    pub day_label: Option<String>,
    pub positions: [PositionSlot; 4],
}

impl ShiftRecord {
    pub fn new<D, T, R>(date: D, time: T, room: R) -> Self
    where
        D: Into<String>,
        T: Into<String>,
        R: Into<String>,
    {
        Self {
            date: Some(date.into()),
            time: Some(time.into()),
            room: Some(room.into()),
            ..Self::default()
        }
    }

    pub fn with_day_label<S: Into<String>>(mut self, label: S) -> Self {
        self.day_label = Some(label.into());
        self
    }

    pub fn with_position(
        mut self,
        position: Position,
        name: Option<&str>,
        available: Option<bool>,
    ) -> Self {
        self.positions[position.index()] = PositionSlot::new(name, available);
        self
    }

    pub fn with_slot(mut self, position: Position, slot: PositionSlot) -> Self {
        self.positions[position.index()] = slot;
        self
    }

    pub fn position(&self, position: Position) -> &PositionSlot {
        &self.positions[position.index()]
    }

    /// Date, heure et salle présentes et non vides.
    pub fn is_complete(&self) -> bool {
        [&self.date, &self.time, &self.room]
            .iter()
            .all(|f| f.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

#[derive(Deserialize)]
struct WireRecord {
    #[serde(default, deserialize_with = "loose_string")]
    fecha: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    hora: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    sala: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    dia: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    titular: Option<String>,
    #[serde(default, deserialize_with = "loose_flag")]
    titular_disponible: Option<bool>,
    #[serde(default, deserialize_with = "loose_string")]
    titular_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    auxiliar_1: Option<String>,
    #[serde(default, deserialize_with = "loose_flag")]
    aux1_disponible: Option<bool>,
    #[serde(default, deserialize_with = "loose_string")]
    auxiliar_1_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    auxiliar_2: Option<String>,
    #[serde(default, deserialize_with = "loose_flag")]
    aux2_disponible: Option<bool>,
    #[serde(default, deserialize_with = "loose_string")]
    auxiliar_2_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    auxiliar_3: Option<String>,
    #[serde(default, deserialize_with = "loose_flag")]
    aux3_disponible: Option<bool>,
    #[serde(default, deserialize_with = "loose_string")]
    auxiliar_3_id: Option<String>,
}

impl From<WireRecord> for ShiftRecord {
    fn from(w: WireRecord) -> Self {
        Self {
            date: w.fecha,
            time: w.hora,
            room: w.sala,
            day_label: w.dia,
            positions: [
                wire_slot(w.titular_id, w.titular, w.titular_disponible),
                wire_slot(w.auxiliar_1_id, w.auxiliar_1, w.aux1_disponible),
                wire_slot(w.auxiliar_2_id, w.auxiliar_2, w.aux2_disponible),
                wire_slot(w.auxiliar_3_id, w.auxiliar_3, w.aux3_disponible),
            ],
        }
    }
}

fn wire_slot(id: Option<String>, name: Option<String>, available: Option<bool>) -> PositionSlot {
    PositionSlot {
        id: id.filter(|id| !id.trim().is_empty()),
        name,
        available,
    }
}

fn loose_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn loose_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Bool(b)) => Some(b),
        _ => None,
    })
}

/// Occupation d'une salle pour un créneau.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    pub assigned_names: Vec<String>,
    pub vacancy_count: u32,
}

/// `HH:MM` → salle → occupation.
pub type TimeSlots = BTreeMap<String, BTreeMap<String, Occupancy>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub label: String,
    pub time_slots: TimeSlots,
}

impl CalendarDay {
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
            time_slots: TimeSlots::new(),
        }
    }

    pub fn occupancy(&self, time: &str, room: &str) -> Option<&Occupancy> {
        self.time_slots.get(time).and_then(|rooms| rooms.get(room))
    }
}

/// Jour du mois (1–31) → contenu du jour.
pub type Calendar = BTreeMap<u32, CalendarDay>;

/// Mois affiché, fixé par le premier enregistrement daté.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthContext {
    pub month_name: String,
    pub year: i32,
    /// 0 = janvier
    pub month_index: u32,
}

/// Forme de la réponse HTTP, résolue une seule fois à la frontière.
#[derive(Debug, Clone, PartialEq)]
pub enum ShiftPayload {
    /// `{ "<field>": [ ... ] }`
    Wrapped(Vec<Value>),
    /// `[ ... ]`
    Bare(Vec<Value>),
    Unrecognized,
}

impl ShiftPayload {
    pub fn resolve(value: Value, field: &str) -> Self {
        match value {
            Value::Array(rows) => ShiftPayload::Bare(rows),
            Value::Object(mut map) => match map.remove(field) {
                Some(Value::Array(rows)) => ShiftPayload::Wrapped(rows),
                _ => ShiftPayload::Unrecognized,
            },
            _ => ShiftPayload::Unrecognized,
        }
    }

    pub fn rows(&self) -> &[Value] {
        match self {
            ShiftPayload::Wrapped(rows) | ShiftPayload::Bare(rows) => rows,
            ShiftPayload::Unrecognized => &[],
        }
    }
}
