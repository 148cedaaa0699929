use crate::dates::Locale;
use crate::grid::{build_weeks, GridError, WeekGrid};
use crate::model::{Calendar, MonthContext, Occupancy};
use crate::normalize::NormalizedCalendar;
use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::io::Write;

/// Ce que reçoit un renderer : calendrier, mois, grille.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalendarView {
    pub calendar: Calendar,
    pub month: Option<MonthContext>,
    pub weeks: Option<WeekGrid>,
}

impl CalendarView {
    pub fn build(normalized: NormalizedCalendar) -> Result<Self, GridError> {
        let weeks = normalized
            .month
            .as_ref()
            .map(|m| build_weeks(m.month_index, m.year))
            .transpose()?;
        Ok(Self {
            calendar: normalized.calendar,
            month: normalized.month,
            weeks,
        })
    }

    /// Rien à afficher : ni données, ni mois.
    pub fn is_empty(&self) -> bool {
        self.calendar.is_empty() && self.month.is_none()
    }
}

/// Permet de brancher le rendu (terminal, JSON, page web…).
pub trait Renderer {
    fn render(&mut self, view: &CalendarView) -> Result<()>;
    /// Remplace l'affichage par un message d'erreur visible.
    fn render_error(&mut self, message: &str);
    /// Heure de la dernière récupération réussie, même sans changement.
    fn render_update(&mut self, _at: DateTime<Utc>) {}
}

/// Rendu texte : titre, grille des semaines, puis détail des jours.
pub struct TextRenderer<W: Write> {
    out: W,
    locale: Locale,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, locale: Locale) -> Self {
        Self { out, locale }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, view: &CalendarView) -> Result<()> {
        let text = render_text(view, self.locale);
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn render_error(&mut self, message: &str) {
        let _ = writeln!(
            self.out,
            "{}: {message}",
            self.locale.error_placeholder()
        );
        let _ = self.out.flush();
    }

    fn render_update(&mut self, at: DateTime<Utc>) {
        let _ = writeln!(
            self.out,
            "{}: {}",
            self.locale.last_update_label(),
            at.with_timezone(&Local).format("%H:%M:%S")
        );
        let _ = self.out.flush();
    }
}

/// Texte complet d'une vue (sans effet de bord).
pub fn render_text(view: &CalendarView, locale: Locale) -> String {
    if view.is_empty() {
        return format!("{}\n", locale.empty_placeholder());
    }

    let mut lines: Vec<String> = Vec::new();
    match &view.month {
        Some(m) => lines.push(format!("{} - {} {}", locale.title(), m.month_name, m.year)),
        None => lines.push(locale.title().to_string()),
    }

    if let Some(grid) = &view.weeks {
        lines.extend(week_lines(grid, locale));
    }

    for (day_num, day) in &view.calendar {
        lines.push(String::new());
        lines.push(format!("{day_num:02} {}", day.label));
        for (time, rooms) in &day.time_slots {
            for (room, occupancy) in rooms {
                lines.push(room_line(time, room, occupancy, locale));
            }
        }
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// En-tête des jours puis une ligne par semaine (`..` pour une case vide).
pub fn render_weeks(grid: &WeekGrid, locale: Locale) -> String {
    let mut text = week_lines(grid, locale).join("\n");
    text.push('\n');
    text
}

fn week_lines(grid: &WeekGrid, locale: Locale) -> Vec<String> {
    let mut lines = vec![locale.weekday_headers().join(" ")];
    for week in grid.weeks() {
        let cells: Vec<String> = week
            .iter()
            .map(|cell| match cell {
                Some(d) => format!("{d:02}"),
                None => "..".to_string(),
            })
            .collect();
        lines.push(cells.join(" "));
    }
    lines
}

fn room_line(time: &str, room: &str, occupancy: &Occupancy, locale: Locale) -> String {
    let mut parts = vec![format!("{time} {room}:")];
    if !occupancy.assigned_names.is_empty() {
        parts.push(occupancy.assigned_names.join(", "));
    }
    for _ in 0..occupancy.vacancy_count {
        parts.push(locale.vacancy_marker().to_string());
    }
    parts.join(" ")
}

/// Une ligne JSON par rendu.
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render(&mut self, view: &CalendarView) -> Result<()> {
        serde_json::to_writer(&mut self.out, view)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }

    fn render_error(&mut self, message: &str) {
        let _ = serde_json::to_writer(&mut self.out, &serde_json::json!({ "error": message }));
        let _ = self.out.write_all(b"\n");
        let _ = self.out.flush();
    }
}
