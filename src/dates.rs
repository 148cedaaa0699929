//! Parsing des dates de turnos et noms localisés.
//!
//! Aucune conversion de fuseau : une date `YYYY-MM-DD` donne toujours ses
//! composantes littérales, quel que soit le fuseau du processus.

use chrono::{DateTime, Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Langue des libellés (mois, jours, textes d'interface).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

const MONTHS_ES: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
    "octubre", "noviembre", "diciembre",
];
const MONTHS_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

// indexés depuis dimanche
const WEEKDAYS_ES: [&str; 7] = [
    "domingo", "lunes", "martes", "miércoles", "jueves", "viernes", "sábado",
];
const WEEKDAYS_EN: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];
const HEADERS_ES: [&str; 7] = ["Do", "Lu", "Ma", "Mi", "Ju", "Vi", "Sá"];
const HEADERS_EN: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

impl Locale {
    /// Nom long du mois (`month_index` 0-based), tel que rendu par la locale.
    pub fn month_name(self, month_index: u32) -> &'static str {
        let names = match self {
            Locale::Es => &MONTHS_ES,
            Locale::En => &MONTHS_EN,
        };
        names[(month_index % 12) as usize]
    }

    pub fn weekday_name(self, weekday: Weekday) -> &'static str {
        let idx = weekday.num_days_from_sunday() as usize;
        match self {
            Locale::Es => WEEKDAYS_ES[idx],
            Locale::En => WEEKDAYS_EN[idx],
        }
    }

    /// En-têtes de colonnes, dimanche en premier.
    pub fn weekday_headers(self) -> [&'static str; 7] {
        match self {
            Locale::Es => HEADERS_ES,
            Locale::En => HEADERS_EN,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Locale::Es => "Calendario de Turnos",
            Locale::En => "Shift Calendar",
        }
    }

    pub fn vacancy_marker(self) -> &'static str {
        match self {
            Locale::Es => "FALTA",
            Locale::En => "MISSING",
        }
    }

    pub fn empty_placeholder(self) -> &'static str {
        match self {
            Locale::Es => "No hay turnos cargados aún.",
            Locale::En => "No shifts loaded yet.",
        }
    }

    pub fn error_placeholder(self) -> &'static str {
        match self {
            Locale::Es => "No se pudieron cargar los turnos",
            Locale::En => "Could not load shifts",
        }
    }

    pub fn last_update_label(self) -> &'static str {
        match self {
            Locale::Es => "Última actualización",
            Locale::En => "Last update",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Es => "es",
            Locale::En => "en",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" | "es-es" | "es-ar" => Ok(Locale::Es),
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

/// Première lettre en majuscule, le reste inchangé.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parse la date d'un turno : ISO (partie date avant `T`), puis
/// `DD/MM/YYYY`, puis quelques formats génériques.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.contains('-') {
        let date_part = raw.split('T').next().unwrap_or(raw);
        if let Some(date) = parse_components(date_part, '-', [0, 1, 2]) {
            return Some(date);
        }
    } else if raw.contains('/') {
        if let Some(date) = parse_components(raw, '/', [2, 1, 0]) {
            return Some(date);
        }
    }
    parse_generic(raw)
}

/// `order` donne la position de [année, mois, jour] dans les morceaux.
/// Le troisième morceau peut être suivi d'une heure (`03/11/2025 08:30`).
fn parse_components(raw: &str, sep: char, order: [usize; 3]) -> Option<NaiveDate> {
    let mut parts: Vec<&str> = raw.split(sep).map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }
    parts[2] = leading_digits(parts[2]);
    let year: i32 = parts[order[0]].parse().ok()?;
    let month: u32 = parts[order[1]].parse().ok()?;
    let day: u32 = parts[order[2]].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn leading_digits(s: &str) -> &str {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    &s[..end]
}

fn parse_generic(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    ["%Y%m%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y", "%Y.%m.%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Vue dérivée d'une date de turno.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParts {
    pub day: u32,
    pub weekday: Weekday,
    pub month_index: u32,
    pub year: i32,
}

impl From<NaiveDate> for DateParts {
    fn from(d: NaiveDate) -> Self {
        Self {
            day: d.day(),
            weekday: d.weekday(),
            month_index: d.month0(),
            year: d.year(),
        }
    }
}
