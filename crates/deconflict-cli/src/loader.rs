//! Mission file loading.
//!
//! Accepts both the wrapped layouts (`{"Primary flight": [...]}`,
//! `{"flights": [...]}`) and bare mission objects/arrays.

use anyhow::{bail, Context, Result};
use deconflict_core::{Mission, MissionRequest};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PrimaryFile {
    Wrapped {
        #[serde(rename = "Primary flight", alias = "primary")]
        primary: Vec<MissionRequest>,
    },
    Single(MissionRequest),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TrafficFile {
    Wrapped { flights: Vec<MissionRequest> },
    List(Vec<MissionRequest>),
}

/// Parse and validate the primary mission.
pub fn parse_primary(json: &str) -> Result<Mission> {
    let file: PrimaryFile = serde_json::from_str(json).context("malformed primary mission")?;
    let request = match file {
        PrimaryFile::Single(request) => request,
        PrimaryFile::Wrapped { primary } => {
            let count = primary.len();
            let Some(first) = primary.into_iter().next() else {
                bail!("primary file contains no missions");
            };
            if count > 1 {
                tracing::warn!(count, "primary file lists several missions, using the first");
            }
            first
        }
    };
    Ok(Mission::from_request(request)?)
}

/// Parse and validate every mission in a traffic file.
pub fn parse_traffic(json: &str) -> Result<Vec<Mission>> {
    let file: TrafficFile = serde_json::from_str(json).context("malformed traffic file")?;
    let requests = match file {
        TrafficFile::Wrapped { flights } => flights,
        TrafficFile::List(list) => list,
    };
    requests
        .into_iter()
        .map(|request| Mission::from_request(request).map_err(Into::into))
        .collect()
}

pub fn load_primary(path: &Path) -> Result<Mission> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_primary(&json).with_context(|| format!("in {}", path.display()))
}

pub fn load_traffic(path: &Path) -> Result<Vec<Mission>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let missions = parse_traffic(&json).with_context(|| format!("in {}", path.display()))?;
    tracing::info!(count = missions.len(), path = %path.display(), "loaded traffic");
    Ok(missions)
}
