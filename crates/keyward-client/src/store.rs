//! Explicitly owned project list cache.
//!
//! The dashboard needs the project list in many places (project picker,
//! key-creation flow, billing limits). Instead of a process-wide singleton,
//! callers construct a [`ProjectStore`] and pass it where it is needed. The
//! cached list is served while younger than the staleness window; mutations
//! made through the store invalidate it and refresh immediately.

use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use keyward_core::models::{CreateProjectRequest, Project};

use crate::Keyward;
use crate::error::KeywardError;

struct Snapshot {
    projects: Vec<Project>,
    fetched_at: Instant,
}

/// Cached view of the signed-in account's projects.
pub struct ProjectStore {
    client: Keyward,
    ttl: Duration,
    snapshot: RwLock<Option<Snapshot>>,
}

impl std::fmt::Debug for ProjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ProjectStore {
    /// Store using the client's configured `cache_ttl` as staleness window.
    pub fn new(client: Keyward) -> Self {
        let ttl = client.cache_ttl();
        Self::with_ttl(client, ttl)
    }

    pub fn with_ttl(client: Keyward, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            snapshot: RwLock::new(None),
        }
    }

    /// The underlying API client.
    pub fn client(&self) -> &Keyward {
        &self.client
    }

    /// Fetch the project list and replace the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; the previous cache is kept.
    pub async fn refresh(&self) -> Result<Vec<Project>, KeywardError> {
        let projects = self.client.list_projects().await?;
        tracing::debug!(count = projects.len(), "project store refreshed");

        let mut snapshot = self.snapshot.write().await;
        *snapshot = Some(Snapshot {
            projects: projects.clone(),
            fetched_at: Instant::now(),
        });
        Ok(projects)
    }

    /// Cached projects if fresh, otherwise a refreshed list.
    ///
    /// # Errors
    ///
    /// Returns an error if a refresh is needed and the API request fails.
    pub async fn projects(&self) -> Result<Vec<Project>, KeywardError> {
        {
            let snapshot = self.snapshot.read().await;
            if let Some(snap) = snapshot.as_ref() {
                if snap.fetched_at.elapsed() < self.ttl {
                    return Ok(snap.projects.clone());
                }
            }
        }
        self.refresh().await
    }

    /// Whether the next [`projects`](Self::projects) call will hit the API.
    pub async fn is_stale(&self) -> bool {
        self.snapshot
            .read()
            .await
            .as_ref()
            .is_none_or(|snap| snap.fetched_at.elapsed() >= self.ttl)
    }

    /// Drop the cached list.
    pub async fn invalidate(&self) {
        *self.snapshot.write().await = None;
    }

    /// Look a project up by id or case-insensitive name.
    ///
    /// # Errors
    ///
    /// Returns an error if a refresh is needed and the API request fails.
    pub async fn find(&self, id_or_name: &str) -> Result<Option<Project>, KeywardError> {
        let needle = id_or_name.trim();
        let id = needle.parse::<Uuid>().ok();
        let projects = self.projects().await?;
        Ok(projects
            .into_iter()
            .find(|p| Some(p.id) == id || p.name.eq_ignore_ascii_case(needle)))
    }

    /// Create a project, then refresh the cache so it shows up.
    ///
    /// # Errors
    ///
    /// Returns an error if creation or the follow-up refresh fails.
    pub async fn create_project(
        &self,
        req: &CreateProjectRequest,
    ) -> Result<Project, KeywardError> {
        let project = self.client.create_project(req).await?;
        self.invalidate().await;
        self.refresh().await?;
        Ok(project)
    }

    /// Delete a project, then refresh the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion or the follow-up refresh fails.
    pub async fn delete_project(&self, project_id: Uuid) -> Result<(), KeywardError> {
        self.client.delete_project(project_id).await?;
        self.invalidate().await;
        self.refresh().await?;
        Ok(())
    }
}
