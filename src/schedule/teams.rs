use crate::error::{config_error, Error, SyncResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Google Calendar event color id (`colorId`), 1 through 11
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "u8")]
pub struct ColorId(u8);

impl ColorId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 11;

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ColorId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(ColorId(value))
        } else {
            Err(format!(
                "color id {} is outside {}..={}",
                value,
                Self::MIN,
                Self::MAX
            ))
        }
    }
}

impl fmt::Display for ColorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lookup from team name to event color
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct TeamColors(BTreeMap<String, ColorId>);

impl TeamColors {
    /// Read a flat `"Team Name" = color` TOML table
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            config_error(&format!("Failed to read teams file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> SyncResult<Self> {
        let teams: TeamColors = toml::from_str(content)?;
        if teams.is_empty() {
            return Err(config_error("Teams file has no entries"));
        }
        Ok(teams)
    }

    /// Color for a home team, failing for names not in the table
    pub fn color_for(&self, team: &str) -> SyncResult<ColorId> {
        self.0
            .get(team.trim())
            .copied()
            .ok_or_else(|| Error::UnknownTeam(team.trim().to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn teams(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<(S, ColorId)> for TeamColors {
    fn from_iter<I: IntoIterator<Item = (S, ColorId)>>(iter: I) -> Self {
        TeamColors(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
