use std::fs;
use std::path::Path;

use sgp4::{Constants, Elements};

use crate::catalog::error::CatalogError;
use crate::predict::Satellite;

/// One satellite from the catalog, ready for propagation.
pub struct ElementSet {
    pub name: String,
    pub norad_id: u64,
    pub elements: Elements,
    pub constants: Constants,
}

impl Satellite for ElementSet {
    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for ElementSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementSet")
            .field("name", &self.name)
            .field("norad_id", &self.norad_id)
            .finish_non_exhaustive()
    }
}

/// Load every element set from a catalog file, in file order.
pub fn load_catalog(path: &Path) -> Result<Vec<ElementSet>, CatalogError> {
    let content = fs::read_to_string(path)?;
    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let sets = parse_catalog(&content, &filename);
    log::info!("Loaded {} element sets from {}", sets.len(), filename);
    Ok(sets)
}

/// Parse catalog text. Entries that fail to parse are logged and skipped.
pub fn parse_catalog(content: &str, source: &str) -> Vec<ElementSet> {
    let mut results = Vec::new();

    for (name, line1, line2) in parse_multi_tle(content) {
        match parse_entry(name, &line1, &line2) {
            Ok(set) => results.push(set),
            Err(message) => log::warn!("Skipping invalid TLE in {}: {}", source, message),
        }
    }

    results
}

fn parse_entry(name: Option<String>, line1: &str, line2: &str) -> Result<ElementSet, String> {
    let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())
        .map_err(|e| e.to_string())?;
    let constants = Constants::from_elements(&elements).map_err(|e| e.to_string())?;

    let name = name.unwrap_or_else(|| format!("NORAD {}", elements.norad_id));

    Ok(ElementSet {
        name,
        norad_id: elements.norad_id,
        elements,
        constants,
    })
}

/// Split multi-satellite TLE content into (name, line1, line2).
fn parse_multi_tle(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
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
