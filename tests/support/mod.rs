//! In-memory collection store shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;

use folio::application::repos::{CollectionStore, RepoError, Row, WriteOp};
use folio::domain::inputs::{RecordId, WritePayload};
use folio::domain::resource::Resource;

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Pauses `fetch_all` until released, so tests can interleave writes with an in-flight fetch.
#[derive(Clone, Default)]
pub struct FetchGate {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<Resource, Vec<Row>>>,
    fetches: Mutex<HashMap<Resource, usize>>,
    writes: AtomicUsize,
    failing_fetches: Mutex<HashSet<Resource>>,
    failing_writes: AtomicBool,
    next_id: AtomicI64,
    gate: Mutex<Option<FetchGate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            ..Default::default()
        }
    }

    pub fn with_rows(self, resource: Resource, rows: Vec<Value>) -> Self {
        self.rows
            .lock()
            .expect("rows lock")
            .insert(resource, rows.into_iter().map(row).collect());
        self
    }

    pub fn fetch_count(&self, resource: Resource) -> usize {
        self.fetches
            .lock()
            .expect("fetches lock")
            .get(&resource)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().expect("fetches lock").values().sum()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_fetches(&self, resource: Resource) {
        self.failing_fetches
            .lock()
            .expect("failing lock")
            .insert(resource);
    }

    pub fn heal_fetches(&self, resource: Resource) {
        self.failing_fetches
            .lock()
            .expect("failing lock")
            .remove(&resource);
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    pub fn install_gate(&self) -> FetchGate {
        let gate = FetchGate::default();
        *self.gate.lock().expect("gate lock") = Some(gate.clone());
        gate
    }

    pub fn remove_gate(&self) {
        *self.gate.lock().expect("gate lock") = None;
    }

    pub fn push_row(&self, resource: Resource, value: Value) {
        self.rows
            .lock()
            .expect("rows lock")
            .entry(resource)
            .or_default()
            .push(row(value));
    }
}

fn payload_row(id: i64, payload: WritePayload) -> Row {
    let value = match payload {
        WritePayload::Post(post) => json!({
            "id": id,
            "title": post.title,
            "slug": post.slug,
            "content": post.content,
            "excerpt": post.excerpt,
            "category": post.category,
            "status": post.status,
            "reading_time": post.reading_time,
        }),
        WritePayload::Project(project) => json!({
            "id": id,
            "title": project.title,
            "description": project.description,
            "image": project.image,
            "tags": project.tags,
            "link": project.link,
            "category": project.category,
        }),
        WritePayload::Experience(experience) => json!({
            "id": id,
            "title": experience.title,
            "organization": experience.organization,
            "period": experience.period,
            "description": experience.description,
            "type": experience.kind,
            "image": experience.image,
            "images": experience.images,
            "start_date": experience.start_date,
            "tags": experience.tags.join(","),
        }),
        WritePayload::Certification(cert) => json!({
            "id": id,
            "name": cert.name,
            "organization": cert.organization,
            "issue_date": cert.issue_date,
            "expiry_date": cert.expiry_date,
            "credential_id": cert.credential_id,
            "credential_url": cert.credential_url,
            "image": cert.image,
            "skills": cert.skills,
        }),
        WritePayload::Settings(_) => json!({ "id": id }),
    };
    row(value)
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn fetch_all(&self, resource: Resource) -> Result<Vec<Row>, RepoError> {
        *self
            .fetches
            .lock()
            .expect("fetches lock")
            .entry(resource)
            .or_default() += 1;

        let gate = self.gate.lock().expect("gate lock").clone();
        if let Some(gate) = gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        if self
            .failing_fetches
            .lock()
            .expect("failing lock")
            .contains(&resource)
        {
            return Err(RepoError::from_persistence(format!(
                "connection refused while loading {resource}"
            )));
        }

        Ok(self
            .rows
            .lock()
            .expect("rows lock")
            .get(&resource)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_one(&self, resource: Resource, id: &RecordId) -> Result<Option<Row>, RepoError> {
        let rows = self.rows.lock().expect("rows lock");
        let found = rows.get(&resource).and_then(|rows| {
            rows.iter()
                .find(|row| match id {
                    RecordId::Id(id) => row.get("id") == Some(&json!(id)),
                    RecordId::Slug(slug) => row.get("slug") == Some(&json!(slug)),
                })
                .cloned()
        });
        Ok(found)
    }

    async fn write(&self, resource: Resource, op: WriteOp) -> Result<Option<Row>, RepoError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }

        let mut rows = self.rows.lock().expect("rows lock");
        let table = rows.entry(resource).or_default();
        match op {
            WriteOp::Create(WritePayload::Settings(settings)) => {
                for (key, value) in settings.entries {
                    table.retain(|row| row.get("key") != Some(&json!(key)));
                    table.push(row(json!({ "key": key, "value": value })));
                }
                Ok(None)
            }
            WriteOp::Create(payload) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let created = payload_row(id, payload);
                table.insert(0, created.clone());
                Ok(Some(created))
            }
            WriteOp::Update { id, payload } => {
                let position = table
                    .iter()
                    .position(|row| row.get("id") == Some(&json!(id)))
                    .ok_or(RepoError::NotFound)?;
                let updated = payload_row(id, payload);
                table[position] = updated.clone();
                Ok(Some(updated))
            }
            WriteOp::Delete { id } => {
                table.retain(|row| row.get("id") != Some(&json!(id)));
                Ok(None)
            }
        }
    }
}
