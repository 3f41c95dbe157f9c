use crate::models::CvRecord;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Side-channel mapping from employee id to total years of experience,
/// loaded from a semicolon-separated export.
#[derive(Debug, Clone, Default)]
pub struct ExperienceTable {
    entries: HashMap<String, f64>,
}

impl ExperienceTable {
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) => {
                warn!(
                    path = %path.display(),
                    %error,
                    "experience data not available, indexing continues without it"
                );
                return Self::default();
            }
        };
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Self {
        let content = content.trim_start_matches('\u{feff}');
        let mut lines = content.lines();
        let Some(header) = lines.next() else {
            return Self::default();
        };

        let columns: Vec<&str> = header.split(';').map(str::trim).collect();
        let id_column = columns.iter().position(|column| *column == "Ansatt-ID");
        let years_column = columns.iter().position(|column| *column == "Erfaring totalt");
        let (Some(id_column), Some(years_column)) = (id_column, years_column) else {
            warn!("experience data header is missing expected columns");
            return Self::default();
        };

        let mut entries = HashMap::new();
        for line in lines {
            let fields: Vec<&str> = line.split(';').map(str::trim).collect();
            let id = fields.get(id_column).copied().unwrap_or_default();
            let years = fields.get(years_column).copied().unwrap_or_default();
            if id.is_empty() || years.is_empty() || years.eq_ignore_ascii_case("nan") {
                continue;
            }

            match years.replace(',', ".").parse::<f64>() {
                Ok(value) => {
                    entries.insert(id.to_string(), value);
                }
                Err(_) => {
                    warn!(employee = id, value = years, "unparseable experience value");
                }
            }
        }

        info!(entries = entries.len(), "loaded experience data");
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, employee_id: &str) -> Option<f64> {
        self.entries.get(employee_id).copied()
    }

    /// Merges experience years into the record unless the record already
    /// carries an explicit value.
    pub fn enrich(&self, record: &mut CvRecord) {
        if record.years_of_experience.is_some() {
            return;
        }
        let Some(id) = &record.external_unique_id else {
            return;
        };
        if let Some(years) = self.get(&id.as_key()) {
            record.years_of_experience = Some(years);
        }
    }
}
