//! Discovering snapshots in a folder.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::filename::parse_snapshot_path;

/// Which end of a day's (or a folder's) snapshots to pick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Age {
    #[default]
    Youngest,
    Oldest,
}

impl std::str::FromStr for Age {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "youngest" => Ok(Age::Youngest),
            "oldest" => Ok(Age::Oldest),
            other => Err(format!("`{other}` is not one of youngest, oldest")),
        }
    }
}

/// Open/close snapshots directly inside `folder`, ordered by basename.
///
/// Basenames start with a zero-padded timestamp, so this is also
/// chronological order.
pub fn list_snapshots(folder: &Path) -> io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        match parse_snapshot_path(&path) {
            Ok(name) if name.is_domain_file() => out.push(path),
            Ok(_) => log::debug!("skipping {}: no open/close state", path.display()),
            Err(e) => log::debug!("skipping {}: {e}", path.display()),
        }
    }
    out.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(out)
}

/// Pick the youngest or oldest snapshot, optionally restricted to one day.
pub fn select_by_age(paths: &[PathBuf], date: Option<NaiveDate>, age: Age) -> Option<&PathBuf> {
    let candidates = paths.iter().filter_map(|p| {
        let name = parse_snapshot_path(p).ok()?;
        date.is_none_or(|d| name.date() == d)
            .then_some((name.timestamp, p))
    });
    let picked = match age {
        Age::Youngest => candidates.max_by_key(|(ts, _)| *ts),
        Age::Oldest => candidates.min_by_key(|(ts, _)| *ts),
    };
    picked.map(|(_, p)| p)
}
