//! Agrégation des lignes de turnos en calendrier jour → heure → salle.

use crate::dates::{capitalize, parse_record_date, DateParts, Locale};
use crate::model::{Calendar, CalendarDay, MonthContext, Occupancy, ShiftRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Résultat de la normalisation d'un lot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedCalendar {
    pub calendar: Calendar,
    pub month: Option<MonthContext>,
}

impl NormalizedCalendar {
    pub fn is_empty(&self) -> bool {
        self.calendar.is_empty() && self.month.is_none()
    }
}

/// `"Ana María García"` → `"Ana G."` ; un seul mot est rendu tel quel.
pub fn format_name(full_name: &str) -> Option<String> {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    match parts.as_slice() {
        [] => None,
        [single] => Some((*single).to_string()),
        [first, .., last] => {
            let initial = last.chars().next()?;
            Some(format!("{first} {}.", initial.to_uppercase()))
        }
    }
}

/// Décode les lignes brutes ; celles qui ne sont pas des objets sont ignorées.
pub fn decode_records(rows: &[Value]) -> Vec<ShiftRecord> {
    rows.iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let record = row
                .is_object()
                .then(|| ShiftRecord::deserialize(row).ok())
                .flatten();
            if record.is_none() {
                debug!(row = idx, "skipping undecodable shift row");
            }
            record
        })
        .collect()
}

/// Construit le calendrier à partir des enregistrements, dans l'ordre reçu.
///
/// - enregistrement incomplet ou date illisible : ignoré sans erreur ;
/// - le premier enregistrement daté fixe le [`MonthContext`] du lot ;
/// - le libellé d'un jour est celui de sa première occurrence ;
/// - deux enregistrements de même (jour, heure, salle) s'additionnent.
pub fn normalize(records: &[ShiftRecord], locale: Locale) -> NormalizedCalendar {
    let mut out = NormalizedCalendar::default();

    for (idx, record) in records.iter().enumerate() {
        if !record.is_complete() {
            debug!(record = idx, "skipping shift without date/time/room");
            continue;
        }
        let (Some(raw_date), Some(raw_time), Some(room)) =
            (&record.date, &record.time, &record.room)
        else {
            continue;
        };
        let Some(date) = parse_record_date(raw_date) else {
            debug!(record = idx, date = %raw_date, "skipping shift with unparseable date");
            continue;
        };
        let parts = DateParts::from(date);

        if out.month.is_none() {
            out.month = Some(MonthContext {
                month_name: capitalize(locale.month_name(parts.month_index)),
                year: parts.year,
                month_index: parts.month_index,
            });
        }

        let day = out.calendar.entry(parts.day).or_insert_with(|| {
            let label = record
                .day_label
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .unwrap_or_else(|| locale.weekday_name(parts.weekday).to_owned());
            CalendarDay::new(label)
        });

        let occupancy = day
            .time_slots
            .entry(time_key(raw_time))
            .or_default()
            .entry(room.clone())
            .or_default();
        fold_positions(occupancy, record);
    }

    out
}

/// Clé de créneau : les 5 premiers caractères (`HH:MM`).
pub fn time_key(raw: &str) -> String {
    raw.trim().chars().take(5).collect()
}

fn fold_positions(occupancy: &mut Occupancy, record: &ShiftRecord) {
    for slot in &record.positions {
        if !slot.is_offered() {
            continue;
        }
        let name = slot.trimmed_name();
        if name.is_empty() {
            occupancy.vacancy_count += 1;
            continue;
        }
        // un nom non vide qui se formate en rien n'est compté nulle part
        if let Some(formatted) = format_name(name) {
            occupancy.assigned_names.push(formatted);
        }
    }
}
