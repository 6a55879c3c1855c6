//! Typed write payloads for the content collections.
//!
//! Request bodies arrive as loose JSON. Each resource has an `*Input` shape that
//! tolerates missing fields and a normalized `*Fields` shape that the store
//! persists. Normalization applies the same defaults for create and update.

use serde::Deserialize;
use serde_json::Value;
use slug::slugify;

use super::error::DomainError;
use super::resource::Resource;

const DEFAULT_POST_CATEGORY: &str = "Jurnal & Catatan";
const DEFAULT_POST_STATUS: &str = "draft";
const DEFAULT_READING_TIME: i32 = 1;
const DEFAULT_EXPERIENCE_TYPE: &str = "work";
const DEFAULT_PROJECT_CATEGORY: &str = "Web Development";
const MAX_EXPERIENCE_IMAGES: usize = 10;

/// Identifies a single stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordId {
    Id(i64),
    Slug(String),
}

/// Parse a path identifier; only positive integers name a record.
pub fn parse_id(raw: &str) -> Result<i64, DomainError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(DomainError::invalid_id(raw)),
    }
}

/// A normalized payload ready to be persisted, tagged by resource.
#[derive(Debug, Clone, PartialEq)]
pub enum WritePayload {
    Settings(SettingsFields),
    Experience(ExperienceFields),
    Certification(CertificationFields),
    Project(ProjectFields),
    Post(PostFields),
}

impl WritePayload {
    /// Decode and normalize a JSON body for `resource`.
    pub fn parse(resource: Resource, body: Value) -> Result<Self, DomainError> {
        match resource {
            Resource::Settings => decode::<SettingsInput>(body)?
                .normalize()
                .map(WritePayload::Settings),
            Resource::Experiences => decode::<ExperienceInput>(body)?
                .normalize()
                .map(WritePayload::Experience),
            Resource::Certifications => decode::<CertificationInput>(body)?
                .normalize()
                .map(WritePayload::Certification),
            Resource::Projects => decode::<ProjectInput>(body)?
                .normalize()
                .map(WritePayload::Project),
            Resource::Posts => decode::<PostInput>(body)?
                .normalize()
                .map(WritePayload::Post),
        }
    }

    pub fn resource(&self) -> Resource {
        match self {
            WritePayload::Settings(_) => Resource::Settings,
            WritePayload::Experience(_) => Resource::Experiences,
            WritePayload::Certification(_) => Resource::Certifications,
            WritePayload::Project(_) => Resource::Projects,
            WritePayload::Post(_) => Resource::Posts,
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(body: Value) -> Result<T, DomainError> {
    serde_json::from_value(body)
        .map_err(|err| DomainError::validation(format!("malformed request body: {err}")))
}

fn required(value: Option<String>, field: &'static str) -> Result<String, DomainError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(DomainError::validation(format!("{field} is required"))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SettingsInput {
    pub settings: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsFields {
    pub entries: Vec<(String, String)>,
}

impl SettingsInput {
    pub fn normalize(self) -> Result<SettingsFields, DomainError> {
        let settings = self
            .settings
            .ok_or_else(|| DomainError::validation("settings object is required"))?;

        let entries = settings
            .into_iter()
            .map(|(key, value)| (key, setting_text(&value)))
            .collect();

        Ok(SettingsFields { entries })
    }
}

/// Settings are stored as text; falsy JSON values collapse to an empty string.
fn setting_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) if number.as_f64() == Some(0.0) => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// Posts
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub cover_image_url: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub reading_time: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFields {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub cover_image_url: Option<String>,
    pub category: String,
    pub status: String,
    pub reading_time: i32,
}

impl PostInput {
    pub fn normalize(self) -> Result<PostFields, DomainError> {
        let title = required(self.title, "title")?;
        let slug = match non_empty(self.slug) {
            Some(slug) => slug,
            None => slug_from_title(&title)?,
        };

        Ok(PostFields {
            slug,
            title,
            content: self.content.unwrap_or_default(),
            excerpt: self.excerpt.unwrap_or_default(),
            cover_image_url: non_empty(self.cover_image_url),
            category: non_empty(self.category).unwrap_or_else(|| DEFAULT_POST_CATEGORY.to_string()),
            status: non_empty(self.status).unwrap_or_else(|| DEFAULT_POST_STATUS.to_string()),
            reading_time: self
                .reading_time
                .filter(|minutes| *minutes > 0)
                .unwrap_or(DEFAULT_READING_TIME),
        })
    }
}

/// URL-safe slug for a post without an explicit one.
pub fn slug_from_title(title: &str) -> Result<String, DomainError> {
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(DomainError::validation(format!(
            "cannot derive a slug from title `{title}`; provide one explicitly"
        )));
    }
    Ok(slug)
}

// ============================================================================
// Experiences
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExperienceInput {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub period: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceFields {
    pub title: String,
    pub organization: String,
    pub period: String,
    pub description: String,
    pub kind: String,
    pub image: Option<String>,
    pub images: Vec<String>,
    pub start_date: Option<String>,
    pub tags: Vec<String>,
}

impl ExperienceInput {
    pub fn normalize(self) -> Result<ExperienceFields, DomainError> {
        let title = required(self.title, "title")?;
        let image = non_empty(self.image);
        let images = match self.images {
            Some(mut images) => {
                images.truncate(MAX_EXPERIENCE_IMAGES);
                images
            }
            None => image.iter().cloned().collect(),
        };

        Ok(ExperienceFields {
            title,
            organization: self.organization.unwrap_or_default(),
            period: self.period.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            kind: non_empty(self.kind).unwrap_or_else(|| DEFAULT_EXPERIENCE_TYPE.to_string()),
            image,
            images,
            start_date: non_empty(self.start_date),
            tags: self.tags.unwrap_or_default(),
        })
    }
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub link: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFields {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub link: Option<String>,
    pub category: String,
}

impl ProjectInput {
    pub fn normalize(self) -> Result<ProjectFields, DomainError> {
        Ok(ProjectFields {
            title: required(self.title, "title")?,
            description: self.description.unwrap_or_default(),
            image: non_empty(self.image),
            tags: self.tags.unwrap_or_default(),
            link: non_empty(self.link),
            category: non_empty(self.category)
                .unwrap_or_else(|| DEFAULT_PROJECT_CATEGORY.to_string()),
        })
    }
}

// ============================================================================
// Certifications
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CertificationInput {
    pub name: Option<String>,
    pub organization: Option<String>,
    #[serde(alias = "issueDate")]
    pub issue_date: Option<String>,
    #[serde(alias = "expiryDate")]
    pub expiry_date: Option<String>,
    #[serde(alias = "credentialId")]
    pub credential_id: Option<String>,
    #[serde(alias = "credentialUrl")]
    pub credential_url: Option<String>,
    pub image: Option<String>,
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificationFields {
    pub name: String,
    pub organization: String,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub credential_id: Option<String>,
    pub credential_url: Option<String>,
    pub image: Option<String>,
    pub skills: Vec<String>,
}

impl CertificationInput {
    pub fn normalize(self) -> Result<CertificationFields, DomainError> {
        Ok(CertificationFields {
            name: required(self.name, "name")?,
            organization: self.organization.unwrap_or_default(),
            issue_date: non_empty(self.issue_date).map(expand_month),
            expiry_date: non_empty(self.expiry_date).map(expand_month),
            credential_id: non_empty(self.credential_id),
            credential_url: non_empty(self.credential_url),
            image: non_empty(self.image),
            skills: self.skills.unwrap_or_default(),
        })
    }
}

/// Month pickers submit `YYYY-MM`; the store keeps full dates.
fn expand_month(date: String) -> String {
    if date.chars().count() == 7 {
        format!("{date}-01")
    } else {
        date
    }
}
