use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use sgp4::{Constants, Elements};

use crate::predict::error::PredictError;

pub struct TleEntry {
    pub name: String,
    pub norad_id: u32,
    pub elements: Elements,
    pub constants: Constants,
}

impl TleEntry {
    pub fn from_lines(
        name: Option<String>,
        line1: &str,
        line2: &str,
        source: &str,
    ) -> Result<Self, PredictError> {
        let invalid = |message: String| PredictError::InvalidTle {
            file: source.to_string(),
            message,
        };

        let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())
            .map_err(|e| invalid(e.to_string()))?;
        let constants = Constants::from_elements(&elements).map_err(|e| invalid(e.to_string()))?;

        let norad_id = elements.norad_id as u32;
        Ok(TleEntry {
            name: name.unwrap_or_else(|| format!("NORAD {}", norad_id)),
            norad_id,
            elements,
            constants,
        })
    }
}

/// Element sets read from a folder of TLE files, keyed by catalog id.
pub struct TleLoader {
    tle_dir: PathBuf,
    satellites: HashMap<u32, TleEntry>,
}

impl TleLoader {
    pub fn new(tle_dir: PathBuf) -> Self {
        Self {
            tle_dir,
            satellites: HashMap::new(),
        }
    }

    /// Load all TLE files from the directory
    pub fn load_all(&mut self) -> Result<(), PredictError> {
        if !self.tle_dir.exists() {
            return Err(PredictError::DirectoryNotFound(
                self.tle_dir.display().to_string(),
            ));
        }

        self.satellites.clear();

        for entry in fs::read_dir(&self.tle_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let is_tle = path
                .extension()
                .is_some_and(|ext| ext == "tle" || ext == "txt");
            if !is_tle {
                continue;
            }

            match parse_tle_file(&path) {
                Ok(entries) => {
                    for tle_entry in entries {
                        self.satellites.insert(tle_entry.norad_id, tle_entry);
                    }
                }
                Err(e) => log::warn!("Failed to parse TLE file {}: {}", path.display(), e),
            }
        }

        log::info!(
            "Loaded {} element sets from {}",
            self.satellites.len(),
            self.tle_dir.display()
        );
        Ok(())
    }

    #[cfg(test)]
    pub fn insert(&mut self, entry: TleEntry) {
        self.satellites.insert(entry.norad_id, entry);
    }

    pub fn elements(&self, norad_id: u32) -> Result<&TleEntry, PredictError> {
        self.satellites
            .get(&norad_id)
            .ok_or(PredictError::UnknownSatellite(norad_id))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.satellites.len()
    }
}

/// Parse a single TLE file (may contain multiple satellites)
fn parse_tle_file(path: &Path) -> Result<Vec<TleEntry>, PredictError> {
    let content = fs::read_to_string(path)?;
    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    parse_multi_tle(&content)
        .into_iter()
        .map(|(name, line1, line2)| TleEntry::from_lines(name, &line1, &line2, &filename))
        .collect()
}

/// Parse multi-satellite TLE content
pub fn parse_multi_tle(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            // 2-line TLE (no name)
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            // 3-line TLE (with name)
            result.push((
                Some(lines[i].to_string()),
                lines[i + 1].to_string(),
                lines[i + 2].to_string(),
            ));
            i += 3;
        } else {
            i += 1;
        }
    }

    result
}
