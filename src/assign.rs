//! Prise et libération d'un poste depuis le client.
//!
//! Les vérifications faites côté client reprennent l'affichage des postes :
//! on ne s'inscrit que sur un poste offert et libre, et seul un
//! administrateur libère un poste occupé.

use crate::model::{Position, PositionSlot, ShiftRecord};
use crate::source::FetchError;
use crate::state::ClientState;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum AssignError {
    #[error("no user name in session (set one with `session --user NAME`)")]
    NoUser,
    #[error("only an administrator can release a position")]
    NotAdmin,
    #[error("no position with id {0} in the current batch")]
    UnknownSlot(String),
    #[error("position {0} is not offered")]
    NotOffered(String),
    #[error("position {id} is already taken by {name}")]
    Taken { id: String, name: String },
    #[error("position {0} is already free")]
    Vacant(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// État d'un poste tel que le voit l'utilisateur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    NotOffered,
    Open,
    Taken(String),
}

/// Un poste repéré dans le lot courant.
#[derive(Debug, Clone, Copy)]
pub struct SlotRef<'a> {
    pub record: &'a ShiftRecord,
    pub position: Position,
    pub slot: &'a PositionSlot,
}

impl SlotRef<'_> {
    pub fn status(&self) -> SlotStatus {
        if !self.slot.is_offered() {
            return SlotStatus::NotOffered;
        }
        match self.slot.trimmed_name() {
            "" => SlotStatus::Open,
            name => SlotStatus::Taken(name.to_string()),
        }
    }
}

/// Tous les postes du lot, dans l'ordre des lignes puis des positions.
pub fn slots(records: &[ShiftRecord]) -> impl Iterator<Item = SlotRef<'_>> {
    records.iter().flat_map(|record| {
        Position::ALL.into_iter().map(move |position| SlotRef {
            record,
            position,
            slot: record.position(position),
        })
    })
}

pub fn find_slot<'a>(records: &'a [ShiftRecord], id: &str) -> Option<SlotRef<'a>> {
    let id = id.trim();
    slots(records).find(|s| s.slot.id.as_deref().map(str::trim) == Some(id))
}

/// Actions d'assignation exposées par le serveur.
#[async_trait]
pub trait Assigner: Send + Sync {
    /// Inscrit `user_name` sur le poste ; renvoie le message du serveur.
    async fn claim(&self, slot_id: &str, user_name: &str) -> Result<String, FetchError>;
    /// Libère le poste ; renvoie le message du serveur.
    async fn release(&self, slot_id: &str, is_admin: bool) -> Result<String, FetchError>;
}

/// POST JSON sur `/api/asignar` et `/api/desasignar`.
#[derive(Debug, Clone)]
pub struct HttpAssigner {
    client: Client,
    claim_url: String,
    release_url: String,
}

#[derive(Deserialize, Default)]
struct Reply {
    #[serde(default)]
    mensaje: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpAssigner {
    pub fn new<C: Into<String>, R: Into<String>>(
        claim_url: C,
        release_url: R,
        timeout: Option<Duration>,
    ) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            claim_url: claim_url.into(),
            release_url: release_url.into(),
        })
    }

    /// Routes voisines de l'endpoint des turnos
    /// (`…/api/turnos` → `…/api/asignar`, `…/api/desasignar`).
    pub fn from_endpoint(endpoint: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let invalid = |reason: String| FetchError::InvalidUrl {
            url: endpoint.to_string(),
            reason,
        };
        let base = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
        let claim = base.join("asignar").map_err(|e| invalid(e.to_string()))?;
        let release = base.join("desasignar").map_err(|e| invalid(e.to_string()))?;
        Self::new(claim, release, timeout)
    }

    pub fn claim_url(&self) -> &str {
        &self.claim_url
    }
    pub fn release_url(&self) -> &str {
        &self.release_url
    }

    async fn post(&self, url: &str, body: Value) -> Result<String, FetchError> {
        let res = self.client.post(url).json(&body).send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        let reply: Reply = serde_json::from_slice(&bytes).unwrap_or_default();
        if !status.is_success() {
            return Err(match reply.error {
                Some(message) => FetchError::Rejected {
                    status: status.as_u16(),
                    message,
                },
                None => FetchError::Status(status.as_u16()),
            });
        }
        Ok(reply.mensaje.unwrap_or_default())
    }
}

#[async_trait]
impl Assigner for HttpAssigner {
    async fn claim(&self, slot_id: &str, user_name: &str) -> Result<String, FetchError> {
        let body = json!({ "asignacion_id": slot_id, "nombre_usuario": user_name });
        self.post(&self.claim_url, body).await
    }

    async fn release(&self, slot_id: &str, is_admin: bool) -> Result<String, FetchError> {
        let body = json!({ "asignacion_id": slot_id, "is_admin": is_admin });
        self.post(&self.release_url, body).await
    }
}

/// Inscrit l'utilisateur de la session sur un poste offert et libre.
pub async fn claim(
    assigner: &dyn Assigner,
    records: &[ShiftRecord],
    state: &ClientState,
    slot_id: &str,
) -> Result<String, AssignError> {
    let user = state
        .user_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(AssignError::NoUser)?;
    let slot = find_slot(records, slot_id)
        .ok_or_else(|| AssignError::UnknownSlot(slot_id.to_string()))?;
    match slot.status() {
        SlotStatus::NotOffered => return Err(AssignError::NotOffered(slot_id.to_string())),
        SlotStatus::Taken(name) => {
            return Err(AssignError::Taken {
                id: slot_id.to_string(),
                name,
            })
        }
        SlotStatus::Open => {}
    }

    let message = assigner.claim(slot_id.trim(), user).await?;
    info!(slot = slot_id, user, position = slot.position.label(), "position claimed");
    Ok(message)
}

/// Libère un poste occupé (admin).
pub async fn release(
    assigner: &dyn Assigner,
    records: &[ShiftRecord],
    state: &ClientState,
    slot_id: &str,
) -> Result<String, AssignError> {
    if !state.is_admin {
        return Err(AssignError::NotAdmin);
    }
    let slot = find_slot(records, slot_id)
        .ok_or_else(|| AssignError::UnknownSlot(slot_id.to_string()))?;
    match slot.status() {
        SlotStatus::NotOffered => return Err(AssignError::NotOffered(slot_id.to_string())),
        SlotStatus::Open => return Err(AssignError::Vacant(slot_id.to_string())),
        SlotStatus::Taken(_) => {}
    }

    let message = assigner.release(slot_id.trim(), true).await?;
    info!(slot = slot_id, position = slot.position.label(), "position released");
    Ok(message)
}
