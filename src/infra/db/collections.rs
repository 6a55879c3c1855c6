use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::application::repos::{CollectionStore, RepoError, Row, WriteOp};
use crate::domain::inputs::{
    CertificationFields, ExperienceFields, PostFields, ProjectFields, RecordId, SettingsFields,
    WritePayload,
};
use crate::domain::resource::Resource;

use super::PostgresRepositories;
use super::util::{into_row, map_sqlx_error};

// Each listing selects whole rows as jsonb so shaping sees one uniform row type.
const SELECT_SETTINGS: &str = "SELECT jsonb_build_object('key', key, 'value', value) \
     FROM settings ORDER BY key";
const SELECT_EXPERIENCES: &str = "SELECT to_jsonb(e) FROM ( \
         SELECT id, title, organization, period, description, type, image, images, start_date, \
                array_to_string(tags, ',') AS tags \
         FROM experiences \
     ) e ORDER BY e.start_date DESC";
const SELECT_CERTIFICATIONS: &str = "SELECT to_jsonb(c) FROM ( \
         SELECT id, name, organization, issue_date, expiry_date, credential_id, credential_url, \
                image, skills \
         FROM certifications \
     ) c ORDER BY c.id";
const SELECT_PROJECTS: &str = "SELECT to_jsonb(p) FROM ( \
         SELECT id, title, description, image, tags, link, category FROM projects \
     ) p ORDER BY p.id";
const SELECT_POSTS: &str = "SELECT to_jsonb(p) FROM posts p ORDER BY p.created_at DESC";

fn table(resource: Resource) -> &'static str {
    match resource {
        Resource::Settings => "settings",
        Resource::Experiences => "experiences",
        Resource::Certifications => "certifications",
        Resource::Projects => "projects",
        Resource::Posts => "posts",
    }
}

fn listing(resource: Resource) -> &'static str {
    match resource {
        Resource::Settings => SELECT_SETTINGS,
        Resource::Experiences => SELECT_EXPERIENCES,
        Resource::Certifications => SELECT_CERTIFICATIONS,
        Resource::Projects => SELECT_PROJECTS,
        Resource::Posts => SELECT_POSTS,
    }
}

#[async_trait]
impl CollectionStore for PostgresRepositories {
    async fn fetch_all(&self, resource: Resource) -> Result<Vec<Row>, RepoError> {
        let rows = sqlx::query_scalar::<_, Value>(listing(resource))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        debug!(resource = %resource, rows = rows.len(), "Fetched collection from postgres");
        rows.into_iter().map(into_row).collect()
    }

    async fn fetch_one(
        &self,
        resource: Resource,
        id: &RecordId,
    ) -> Result<Option<Row>, RepoError> {
        let row = match (resource, id) {
            (Resource::Settings, _) => {
                return Err(RepoError::Unsupported {
                    resource,
                    operation: "fetch_one",
                });
            }
            (Resource::Posts, RecordId::Slug(slug)) => {
                sqlx::query_scalar::<_, Value>("SELECT to_jsonb(p) FROM posts p WHERE p.slug = $1")
                    .bind(slug)
                    .fetch_optional(self.pool())
                    .await
            }
            (_, RecordId::Slug(_)) => {
                return Err(RepoError::Unsupported {
                    resource,
                    operation: "fetch_one_by_slug",
                });
            }
            (_, RecordId::Id(id)) => {
                let sql = format!(
                    "SELECT to_jsonb(t) FROM {} t WHERE t.id = $1",
                    table(resource)
                );
                sqlx::query_scalar::<_, Value>(&sql)
                    .bind(*id)
                    .fetch_optional(self.pool())
                    .await
            }
        }
        .map_err(map_sqlx_error)?;

        row.map(into_row).transpose()
    }

    async fn write(&self, resource: Resource, op: WriteOp) -> Result<Option<Row>, RepoError> {
        match op {
            WriteOp::Create(payload) => {
                ensure_matches(resource, &payload)?;
                match payload {
                    WritePayload::Settings(fields) => {
                        self.upsert_settings(fields).await?;
                        Ok(None)
                    }
                    WritePayload::Experience(fields) => self.insert_experience(fields).await.map(Some),
                    WritePayload::Certification(fields) => {
                        self.insert_certification(fields).await.map(Some)
                    }
                    WritePayload::Project(fields) => self.insert_project(fields).await.map(Some),
                    WritePayload::Post(fields) => self.insert_post(fields).await.map(Some),
                }
            }
            WriteOp::Update { id, payload } => {
                ensure_matches(resource, &payload)?;
                let row = match payload {
                    WritePayload::Settings(_) => {
                        return Err(RepoError::Unsupported {
                            resource,
                            operation: "update",
                        });
                    }
                    WritePayload::Experience(fields) => self.update_experience(id, fields).await?,
                    WritePayload::Certification(fields) => {
                        self.update_certification(id, fields).await?
                    }
                    WritePayload::Project(fields) => self.update_project(id, fields).await?,
                    WritePayload::Post(fields) => self.update_post(id, fields).await?,
                };
                row.map(Some).ok_or(RepoError::NotFound)
            }
            WriteOp::Delete { id } => {
                if resource == Resource::Settings {
                    return Err(RepoError::Unsupported {
                        resource,
                        operation: "delete",
                    });
                }
                let sql = format!("DELETE FROM {} WHERE id = $1", table(resource));
                let result = sqlx::query(&sql)
                    .bind(id)
                    .execute(self.pool())
                    .await
                    .map_err(map_sqlx_error)?;
                debug!(
                    resource = %resource,
                    id,
                    deleted = result.rows_affected(),
                    "Deleted collection record"
                );
                Ok(None)
            }
        }
    }
}

fn ensure_matches(resource: Resource, payload: &WritePayload) -> Result<(), RepoError> {
    if payload.resource() == resource {
        Ok(())
    } else {
        Err(RepoError::invalid_input(format!(
            "{} payload cannot be written to {resource}",
            payload.resource()
        )))
    }
}

impl PostgresRepositories {
    async fn upsert_settings(&self, fields: SettingsFields) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        for (key, value) in fields.entries {
            sqlx::query(
                "INSERT INTO settings (key, value, updated_at) \
                 VALUES ($1, $2, CURRENT_TIMESTAMP) \
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = CURRENT_TIMESTAMP",
            )
            .bind(key)
            .bind(value)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;
        }
        tx.commit().await.map_err(map_sqlx_error)
    }

    // ========================================================================
    // Experiences
    // ========================================================================

    async fn insert_experience(&self, fields: ExperienceFields) -> Result<Row, RepoError> {
        let row = sqlx::query_scalar::<_, Value>(
            "INSERT INTO experiences AS e \
                 (title, organization, period, description, type, image, images, start_date, tags) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8::date, $9) \
             RETURNING to_jsonb(e)",
        )
        .bind(fields.title)
        .bind(fields.organization)
        .bind(fields.period)
        .bind(fields.description)
        .bind(fields.kind)
        .bind(fields.image)
        .bind(fields.images)
        .bind(fields.start_date)
        .bind(fields.tags)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        into_row(row)
    }

    async fn update_experience(
        &self,
        id: i64,
        fields: ExperienceFields,
    ) -> Result<Option<Row>, RepoError> {
        let row = sqlx::query_scalar::<_, Value>(
            "UPDATE experiences AS e SET title = $1, organization = $2, period = $3, \
                 description = $4, type = $5, image = $6, images = $7, start_date = $8::date, \
                 tags = $9 \
             WHERE e.id = $10 \
             RETURNING to_jsonb(e)",
        )
        .bind(fields.title)
        .bind(fields.organization)
        .bind(fields.period)
        .bind(fields.description)
        .bind(fields.kind)
        .bind(fields.image)
        .bind(fields.images)
        .bind(fields.start_date)
        .bind(fields.tags)
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        row.map(into_row).transpose()
    }

    // ========================================================================
    // Certifications
    // ========================================================================

    async fn insert_certification(&self, fields: CertificationFields) -> Result<Row, RepoError> {
        let row = sqlx::query_scalar::<_, Value>(
            "INSERT INTO certifications AS c \
                 (name, organization, issue_date, expiry_date, credential_id, credential_url, image, skills) \
             VALUES ($1, $2, $3::date, $4::date, $5, $6, $7, $8) \
             RETURNING to_jsonb(c)",
        )
        .bind(fields.name)
        .bind(fields.organization)
        .bind(fields.issue_date)
        .bind(fields.expiry_date)
        .bind(fields.credential_id)
        .bind(fields.credential_url)
        .bind(fields.image)
        .bind(fields.skills)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        into_row(row)
    }

    async fn update_certification(
        &self,
        id: i64,
        fields: CertificationFields,
    ) -> Result<Option<Row>, RepoError> {
        let row = sqlx::query_scalar::<_, Value>(
            "UPDATE certifications AS c SET name = $1, organization = $2, issue_date = $3::date, \
                 expiry_date = $4::date, credential_id = $5, credential_url = $6, image = $7, \
                 skills = $8 \
             WHERE c.id = $9 \
             RETURNING to_jsonb(c)",
        )
        .bind(fields.name)
        .bind(fields.organization)
        .bind(fields.issue_date)
        .bind(fields.expiry_date)
        .bind(fields.credential_id)
        .bind(fields.credential_url)
        .bind(fields.image)
        .bind(fields.skills)
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        row.map(into_row).transpose()
    }

    // ========================================================================
    // Projects
    // ========================================================================

    async fn insert_project(&self, fields: ProjectFields) -> Result<Row, RepoError> {
        let row = sqlx::query_scalar::<_, Value>(
            "INSERT INTO projects AS p (title, description, image, tags, link, category) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING to_jsonb(p)",
        )
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.image)
        .bind(fields.tags)
        .bind(fields.link)
        .bind(fields.category)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        into_row(row)
    }

    async fn update_project(
        &self,
        id: i64,
        fields: ProjectFields,
    ) -> Result<Option<Row>, RepoError> {
        let row = sqlx::query_scalar::<_, Value>(
            "UPDATE projects AS p SET title = $1, description = $2, image = $3, tags = $4, \
                 link = $5, category = $6 \
             WHERE p.id = $7 \
             RETURNING to_jsonb(p)",
        )
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.image)
        .bind(fields.tags)
        .bind(fields.link)
        .bind(fields.category)
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        row.map(into_row).transpose()
    }

    // ========================================================================
    // Posts
    // ========================================================================

    async fn insert_post(&self, fields: PostFields) -> Result<Row, RepoError> {
        let row = sqlx::query_scalar::<_, Value>(
            "INSERT INTO posts AS p \
                 (title, slug, content, excerpt, cover_image_url, category, status, reading_time, \
                  created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW()) \
             RETURNING to_jsonb(p)",
        )
        .bind(fields.title)
        .bind(fields.slug)
        .bind(fields.content)
        .bind(fields.excerpt)
        .bind(fields.cover_image_url)
        .bind(fields.category)
        .bind(fields.status)
        .bind(fields.reading_time)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        into_row(row)
    }

    async fn update_post(&self, id: i64, fields: PostFields) -> Result<Option<Row>, RepoError> {
        let row = sqlx::query_scalar::<_, Value>(
            "UPDATE posts AS p SET title = $1, slug = $2, content = $3, excerpt = $4, \
                 cover_image_url = $5, category = $6, status = $7, reading_time = $8, \
                 updated_at = NOW() \
             WHERE p.id = $9 \
             RETURNING to_jsonb(p)",
        )
        .bind(fields.title)
        .bind(fields.slug)
        .bind(fields.content)
        .bind(fields.excerpt)
        .bind(fields.cover_image_url)
        .bind(fields.category)
        .bind(fields.status)
        .bind(fields.reading_time)
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        row.map(into_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_resource_has_a_listing_query() {
        for resource in Resource::ALL {
            assert!(listing(resource).contains(table(resource)));
        }
    }

    #[test]
    fn experiences_list_tags_as_joined_text() {
        assert!(SELECT_EXPERIENCES.contains("array_to_string(tags, ',') AS tags"));
        assert!(SELECT_EXPERIENCES.ends_with("ORDER BY e.start_date DESC"));
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        let payload = WritePayload::Project(ProjectFields {
            title: "folio".to_string(),
            description: String::new(),
            image: None,
            tags: Vec::new(),
            link: None,
            category: "Web Development".to_string(),
        });
        assert!(ensure_matches(Resource::Projects, &payload).is_ok());
        assert!(matches!(
            ensure_matches(Resource::Posts, &payload),
            Err(RepoError::InvalidInput { .. })
        ));
    }
}
