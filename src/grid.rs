use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use thiserror::Error;

/// Une semaine : 7 cases, dimanche = 0 … samedi = 6.
pub type Week = [Option<u32>; 7];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("month index out of range: {0} (expected 0..=11)")]
    MonthOutOfRange(u32),
    #[error("unrepresentable date: {year}-{month:02}")]
    InvalidDate { year: i32, month: u32 },
}

/// Grille mensuelle : nombre minimal de semaines, 7 colonnes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeekGrid {
    weeks: Vec<Week>,
}

impl WeekGrid {
    pub fn weeks(&self) -> &[Week] {
        &self.weeks
    }

    pub fn week_count(&self) -> usize {
        self.weeks.len()
    }

    /// Jours placés, dans l'ordre de lecture.
    pub fn days(&self) -> impl Iterator<Item = u32> + '_ {
        self.weeks.iter().flat_map(|w| w.iter().flatten().copied())
    }

    /// (semaine, colonne) d'un jour du mois.
    pub fn position_of(&self, day: u32) -> Option<(usize, usize)> {
        self.weeks.iter().enumerate().find_map(|(w, week)| {
            week.iter()
                .position(|cell| *cell == Some(day))
                .map(|col| (w, col))
        })
    }
}

/// Construit la grille de `month_index` (0-based) pour `year`.
pub fn build_weeks(month_index: u32, year: i32) -> Result<WeekGrid, GridError> {
    if month_index > 11 {
        return Err(GridError::MonthOutOfRange(month_index));
    }
    let month = month_index + 1;
    let invalid = || GridError::InvalidDate { year, month };

    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let first_weekday = first.weekday().num_days_from_sunday();
    let days_in_month = last_day_of_month(year, month).ok_or_else(invalid)?;

    let total_cells = first_weekday + days_in_month;
    let mut weeks = vec![[None; 7]; total_cells.div_ceil(7) as usize];

    for d in 1..=days_in_month {
        let date = NaiveDate::from_ymd_opt(year, month, d).ok_or_else(invalid)?;
        let col = date.weekday().num_days_from_sunday() as usize;
        let week = ((d - 1 + first_weekday) / 7) as usize;
        weeks[week][col] = Some(d);
    }

    Ok(WeekGrid { weeks })
}

/// Jour 0 du mois suivant.
fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    next.pred_opt().map(|d| d.day())
}
