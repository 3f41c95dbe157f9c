use crate::config::LocalePreference;
use crate::enrichment::ExperienceTable;
use crate::error::ParseError;
use crate::models::{CvRecord, LocalizedValue, QualificationEntry, RecordMetadata};
use std::fs;
use std::path::Path;

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["json", "md", "txt", "markdown"];

#[derive(Debug, Default)]
pub struct CvExtractor {
    locales: LocalePreference,
    experience: ExperienceTable,
}

impl CvExtractor {
    pub fn new(locales: LocalePreference) -> Self {
        Self {
            locales,
            experience: ExperienceTable::default(),
        }
    }

    pub fn with_experience(mut self, experience: ExperienceTable) -> Self {
        self.experience = experience;
        self
    }

    /// Extracts (text, metadata) from one CV file. Empty content yields
    /// empty text, which callers treat as skip-and-warn, never index.
    pub fn extract_file(&self, path: &Path) -> Result<(String, RecordMetadata), ParseError> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok((String::new(), RecordMetadata::default()));
        }

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ParseError::MissingFileName(path.display().to_string()))?
            .to_string();
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();

        let is_structured = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_structured {
            let mut record: CvRecord = serde_json::from_str(&content)?;
            self.experience.enrich(&mut record);

            let display_name = record
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| display_name_from_stem(stem));

            let text = self.text_from_record(&record, &display_name);
            let metadata = RecordMetadata {
                source: file_name,
                file_path: path.display().to_string(),
                cv_name: display_name,
                office: record.user_metadata.office_name.trim().to_string(),
                years_of_experience: record.years_of_experience,
            };
            Ok((text, metadata))
        } else {
            let metadata = RecordMetadata {
                source: file_name,
                file_path: path.display().to_string(),
                cv_name: display_name_from_stem(stem),
                office: String::new(),
                years_of_experience: None,
            };
            Ok((content, metadata))
        }
    }

    /// Builds the retrievable text for a structured record. Section order is
    /// fixed; sections with no resolvable text are omitted entirely.
    pub fn text_from_record(&self, record: &CvRecord, display_name: &str) -> String {
        let mut lines: Vec<String> = Vec::new();

        if !display_name.is_empty() {
            lines.push(format!("# {display_name}"));
        }

        let office = record.user_metadata.office_name.trim();
        if !office.is_empty() {
            lines.push(format!("**Avdeling:** {office}"));
        }

        if let Some(summary) = self.first_summary(record) {
            lines.push(String::new());
            lines.push(summary.to_string());
        }

        let technologies = self.collect_technologies(record);
        if !technologies.is_empty() {
            lines.push(String::new());
            lines.push("## Technologies".to_string());
            lines.push(technologies.join(", "));
        }

        push_section(
            &mut lines,
            "## Work Experience",
            self.collect_work_experience(record),
        );
        push_section(&mut lines, "## Education", self.collect_education(record));
        push_section(
            &mut lines,
            "## Key Qualifications",
            self.collect_qualifications(record),
        );
        push_section(
            &mut lines,
            "## Project Experiences",
            self.collect_projects(record),
        );

        lines.join("\n")
    }

    fn resolve<'a>(&self, value: &'a Option<LocalizedValue>) -> &'a str {
        value
            .as_ref()
            .map(|value| value.resolve(&self.locales))
            .unwrap_or("")
    }

    fn first_summary<'a>(&self, record: &'a CvRecord) -> Option<&'a str> {
        [&record.summary, &record.profile, &record.description]
            .into_iter()
            .map(|field| self.resolve(field))
            .find(|text| !text.is_empty())
    }

    fn collect_technologies(&self, record: &CvRecord) -> Vec<String> {
        let mut skills = Vec::new();
        for category in &record.technologies {
            if category.disabled {
                continue;
            }

            if category.technology_skills.is_empty() {
                let name = self.resolve(&category.name);
                if !name.is_empty() {
                    skills.push(name.to_string());
                    continue;
                }
                let fallback = self.resolve(&category.category);
                if !fallback.is_empty() {
                    skills.push(fallback.to_string());
                }
                continue;
            }

            for skill in &category.technology_skills {
                let tag = self.resolve(&skill.tags);
                if !tag.is_empty() {
                    skills.push(tag.to_string());
                }
            }
        }
        skills
    }

    fn collect_work_experience(&self, record: &CvRecord) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in &record.work_experiences {
            let employer = self.resolve(&entry.employer);
            let role = match self.resolve(&entry.role) {
                "" => self.resolve(&entry.title),
                role => role,
            };
            let description = match self.resolve(&entry.description) {
                "" => self.resolve(&entry.long_description),
                description => description,
            };

            if !role.is_empty() || !employer.is_empty() {
                lines.push(String::new());
                lines.push(format!("### {role} at {employer}"));
            }
            if !description.is_empty() {
                lines.push(description.to_string());
            }
        }
        lines
    }

    fn collect_education(&self, record: &CvRecord) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in &record.educations {
            let school = self.resolve(&entry.school);
            let degree = match self.resolve(&entry.degree) {
                "" => self.resolve(&entry.title),
                degree => degree,
            };
            if !degree.is_empty() || !school.is_empty() {
                lines.push(format!("{degree} - {school}"));
            }
        }
        lines
    }

    fn collect_qualifications(&self, record: &CvRecord) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in &record.key_qualifications {
            match entry {
                QualificationEntry::Plain(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        lines.push(format!("- {text}"));
                    }
                }
                QualificationEntry::Structured(qualification) => {
                    if qualification.disabled {
                        continue;
                    }

                    let label = self.resolve(&qualification.label);
                    let mut description = self.resolve(&qualification.long_description);
                    if description.is_empty() {
                        description = self.resolve(&qualification.description);
                    }
                    if description.is_empty() {
                        description = self.resolve(&qualification.text);
                    }
                    if description.is_empty() {
                        continue;
                    }

                    if label.is_empty() {
                        lines.push(description.to_string());
                    } else {
                        lines.push(String::new());
                        lines.push(format!("### {label}"));
                        lines.push(description.to_string());
                    }
                }
            }
        }
        lines
    }

    fn collect_projects(&self, record: &CvRecord) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in &record.project_experiences {
            if entry.disabled {
                continue;
            }

            let customer = self.resolve(&entry.customer);
            let role = self.resolve(&entry.role);
            let long_description = self.resolve(&entry.long_description);
            let short_description = self.resolve(&entry.description);

            // the short description is header-only, never duplicated as body
            let mut header = String::new();
            if !short_description.is_empty() {
                header.push_str(short_description);
            } else if !role.is_empty() {
                header.push_str(role);
            }
            if !customer.is_empty() {
                if !header.is_empty() {
                    header.push(' ');
                }
                header.push_str("@ ");
                header.push_str(customer);
            }

            if !header.is_empty() {
                lines.push(String::new());
                lines.push(format!("### {header}"));
            }
            if !long_description.is_empty() {
                lines.push(long_description.to_string());
            }
        }
        lines
    }
}

fn push_section(lines: &mut Vec<String>, heading: &str, body: Vec<String>) {
    if body.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(heading.to_string());
    lines.extend(body);
}

pub fn display_name_from_stem(stem: &str) -> String {
    stem.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
