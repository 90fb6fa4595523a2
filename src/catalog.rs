//! Session catalog and driver roster.
//!
//! The catalog index is one JSON document per year listing every meeting and
//! its sessions; the roster is one JSON object per session keyed by racing
//! number. Resolution turns a (year, GP, session) selection into the data
//! paths the rest of the pipeline reads.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Deserialize;

use crate::PitviewError;

#[derive(Clone, Debug, Deserialize)]
pub struct CatalogIndex {
    #[serde(rename = "Meetings", default)]
    pub meetings: Vec<Meeting>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Meeting {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Sessions", default)]
    pub sessions: Vec<SessionEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SessionEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type", default)]
    pub session_type: String,
    #[serde(rename = "Path")]
    pub path: Option<String>,
}

/// Roster keyed by racing number, as stored in DriverList.json.
pub type DriverRoster = BTreeMap<String, DriverEntry>;

#[derive(Clone, Debug, Deserialize)]
pub struct DriverEntry {
    #[serde(rename = "RacingNumber")]
    pub racing_number: String,
    #[serde(rename = "Tla")]
    pub tla: String,
    #[serde(rename = "FirstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "LastName", default)]
    pub last_name: Option<String>,
}

impl DriverEntry {
    pub fn display_label(&self) -> String {
        format!(
            "{} {} ({}) - #{}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or(""),
            self.tla,
            self.racing_number
        )
        .trim()
        .to_string()
    }
}

/// A resolved session: the canonical path prefix plus the derived data paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionDescriptor {
    pub path_prefix: String,
}

impl SessionDescriptor {
    pub fn driver_list_path(&self) -> String {
        format!("{}json/DriverList.json", self.path_prefix)
    }

    pub fn car_data_path(&self) -> String {
        format!("{}jsonStream_processed/CarData.jsonl", self.path_prefix)
    }

    pub fn lap_stream_path(&self) -> String {
        format!("{}jsonStream/LapCount.jsonStream", self.path_prefix)
    }
}

/// Catalog index path for a year, relative to the data directory.
pub fn catalog_path(year: &str) -> String {
    format!("{year}_MeetingsIndex.json")
}

pub fn resolve_session(
    index: &CatalogIndex,
    year: &str,
    gp_name: &str,
    session_name: &str,
) -> Result<SessionDescriptor, PitviewError> {
    let meeting = index
        .meetings
        .iter()
        .find(|m| m.name == gp_name)
        .ok_or_else(|| PitviewError::MeetingNotFound {
            year: year.to_string(),
            name: gp_name.to_string(),
        })?;
    let session = meeting
        .sessions
        .iter()
        .find(|s| s.name == session_name)
        .ok_or_else(|| PitviewError::SessionNotFound {
            name: session_name.to_string(),
        })?;
    let path = session
        .path
        .as_ref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| PitviewError::SessionPathMissing {
            name: session_name.to_string(),
        })?;
    Ok(SessionDescriptor {
        path_prefix: path.clone(),
    })
}

pub fn find_driver<'r>(roster: &'r DriverRoster, tla: &str) -> Option<&'r DriverEntry> {
    roster.values().find(|d| d.tla == tla)
}

/// Sorted GP names for the dropdown.
pub fn meeting_options(index: &CatalogIndex) -> Vec<String> {
    index
        .meetings
        .iter()
        .map(|m| m.name.clone())
        .sorted()
        .collect()
}

/// Sorted "Name (Type)" labels paired with the session name.
pub fn session_options(index: &CatalogIndex, gp_name: &str) -> Vec<(String, String)> {
    index
        .meetings
        .iter()
        .find(|m| m.name == gp_name)
        .map(|m| {
            m.sessions
                .iter()
                .map(|s| {
                    (
                        s.name.clone(),
                        format!("{} ({})", s.name, s.session_type),
                    )
                })
                .sorted_by(|a, b| a.1.cmp(&b.1))
                .collect()
        })
        .unwrap_or_default()
}

/// Sorted driver labels paired with the TLA used as the selection value.
pub fn driver_options(roster: &DriverRoster) -> Vec<(String, String)> {
    roster
        .values()
        .map(|d| (d.tla.clone(), d.display_label()))
        .sorted_by(|a, b| a.1.cmp(&b.1))
        .collect()
}
