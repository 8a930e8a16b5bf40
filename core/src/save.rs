//! Payloads handed to persistence and score-submission collaborators.
//!
//! The simulation only produces these values; deciding when to persist them
//! and validating submissions happen outside the core.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TowerTypeId;

const SAVE_DOMAIN: &str = "gridguard";
const SAVE_VERSION: &str = "v1";
const FIELD_DELIMITER: char = ':';

/// Tower placement captured in a save.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTower {
    /// Column of the tower cell.
    pub x: u32,
    /// Row of the tower cell.
    pub y: u32,
    /// Content identifier of the tower.
    pub tower_type_id: TowerTypeId,
    /// Upgrade level reached.
    pub level: u32,
}

/// Resumable state captured at a wave boundary.
///
/// In-flight creeps and projectiles are intentionally absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGame {
    /// Last wave started.
    pub wave: u32,
    /// Remaining lives.
    pub lives: i32,
    /// Available cash.
    pub cash: u32,
    /// Accumulated score.
    #[serde(default)]
    pub score: u64,
    /// Placed towers.
    pub towers: Vec<SavedTower>,
    /// Session seed.
    pub seed: String,
    /// Caller supplied timestamp, typically milliseconds since the epoch.
    pub timestamp: u64,
}

impl SaveGame {
    /// Encodes the save into a single line suitable for clipboard or storage transfer.
    pub fn encode(&self) -> Result<String, SaveError> {
        let json = serde_json::to_vec(self).map_err(SaveError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!("{SAVE_DOMAIN}{FIELD_DELIMITER}{SAVE_VERSION}{FIELD_DELIMITER}{encoded}"))
    }

    /// Decodes a save from the representation produced by [`SaveGame::encode`].
    pub fn decode(value: &str) -> Result<Self, SaveError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SaveError::EmptyPayload);
        }

        let mut parts = trimmed.splitn(3, FIELD_DELIMITER);
        let domain = parts.next().ok_or(SaveError::MissingPrefix)?;
        let version = parts.next().ok_or(SaveError::MissingVersion)?;
        let payload = parts.next().ok_or(SaveError::MissingPayload)?;

        if domain != SAVE_DOMAIN {
            return Err(SaveError::InvalidPrefix(domain.to_owned()));
        }
        if version != SAVE_VERSION {
            return Err(SaveError::UnsupportedVersion(version.to_owned()));
        }

        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(SaveError::InvalidEncoding)?;
        serde_json::from_slice(&bytes).map_err(SaveError::InvalidPayload)
    }
}

/// Errors that can occur while encoding or decoding saves.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The provided string was empty or contained only whitespace.
    #[error("save payload is empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("save payload is missing its prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("save payload is missing its version")]
    MissingVersion,
    /// The payload segment was missing.
    #[error("save payload is missing its body")]
    MissingPayload,
    /// The prefix did not identify a Gridguard save.
    #[error("unexpected save prefix `{0}`")]
    InvalidPrefix(String),
    /// The version is not understood by this build.
    #[error("unsupported save version `{0}`")]
    UnsupportedVersion(String),
    /// The base64 body could not be decoded.
    #[error("save body is not valid base64: {0}")]
    InvalidEncoding(base64::DecodeError),
    /// The JSON body could not be (de)serialised.
    #[error("save body is not a valid save: {0}")]
    InvalidPayload(serde_json::Error),
    /// The save references state the current content cannot reproduce.
    #[error("save is incompatible with the loaded content: {0}")]
    Incompatible(String),
}

/// Final-score payload handed to the submission collaborator.
///
/// The core neither signs nor validates it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    /// Final score.
    pub score: u64,
    /// Host defined game mode label.
    pub mode: String,
    /// Wave reached.
    pub wave: u32,
    /// Session duration in milliseconds.
    pub duration_ms: u64,
    /// Session seed.
    pub seed: String,
}
