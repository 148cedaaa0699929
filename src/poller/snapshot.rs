use crate::model::MonthContext;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct Snapshot<'a> {
    rows: &'a [Value],
    month: Option<&'a MonthContext>,
}

/// Instantané comparable d'un lot : lignes brutes + mois dérivé.
pub(super) fn encode(rows: &[Value], month: Option<&MonthContext>) -> serde_json::Result<String> {
    serde_json::to_string(&Snapshot { rows, month })
}
