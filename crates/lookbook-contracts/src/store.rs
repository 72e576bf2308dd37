use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Processing => "processing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageCategory {
    Product,
    Style,
    Accessory,
    Result,
}

impl ImageCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageCategory::Product => "product",
            ImageCategory::Style => "style",
            ImageCategory::Accessory => "accessory",
            ImageCategory::Result => "result",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotType {
    Hero,
    FullBody,
    HalfBody,
    CloseUp,
}

impl ShotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShotType::Hero => "hero",
            ShotType::FullBody => "full_body",
            ShotType::HalfBody => "half_body",
            ShotType::CloseUp => "close_up",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: u64,
    pub created_at: String,
    pub updated_at: String,
    pub status: ProjectStatus,
    pub name: String,
    pub style_id: Option<String>,
    pub persona_id: Option<String>,
    pub body_type_id: Option<String>,
}

/// One stored image. Records are immutable after insert; regeneration deletes
/// the whole `result` category and inserts fresh rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: u64,
    pub project_id: u64,
    pub category: ImageCategory,
    pub data: String,
    pub mime_type: String,
    pub prompt: Option<String>,
    pub shot: Option<ShotType>,
    pub ordinal: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub category: ImageCategory,
    pub data: String,
    pub mime_type: String,
    pub prompt: Option<String>,
    pub shot: Option<ShotType>,
    pub ordinal: Option<u32>,
}

impl NewImage {
    pub fn new(category: ImageCategory, data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            category,
            data: data.into(),
            mime_type: mime_type.into(),
            prompt: None,
            shot: None,
            ordinal: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    next_project_id: u64,
    #[serde(default)]
    next_image_id: u64,
    #[serde(default)]
    projects: Vec<ProjectRecord>,
    #[serde(default)]
    images: Vec<ImageRecord>,
}

/// JSON-file-backed store for projects and their images. One writer per file;
/// every mutation rewrites the file.
#[derive(Debug)]
pub struct ShootStore {
    path: PathBuf,
    state: StoreState,
}

impl ShootStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("malformed store file {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn create_project(
        &mut self,
        name: &str,
        style_id: Option<&str>,
        persona_id: Option<&str>,
        body_type_id: Option<&str>,
    ) -> Result<ProjectRecord> {
        self.state.next_project_id += 1;
        let now = now_utc_iso();
        let project = ProjectRecord {
            id: self.state.next_project_id,
            created_at: now.clone(),
            updated_at: now,
            status: ProjectStatus::Pending,
            name: name.to_string(),
            style_id: style_id.map(str::to_string),
            persona_id: persona_id.map(str::to_string),
            body_type_id: body_type_id.map(str::to_string),
        };
        self.state.projects.push(project.clone());
        self.flush()?;
        Ok(project)
    }

    pub fn get_project(&self, id: u64) -> Option<&ProjectRecord> {
        self.state.projects.iter().find(|project| project.id == id)
    }

    pub fn projects(&self) -> &[ProjectRecord] {
        &self.state.projects
    }

    /// Moves a project to a new lifecycle status. Within one generation attempt
    /// the status only moves forward (pending -> processing -> completed or
    /// failed); a finished project may be reset to processing for regeneration.
    pub fn update_status(&mut self, id: u64, status: ProjectStatus) -> Result<()> {
        let project = self
            .state
            .projects
            .iter_mut()
            .find(|project| project.id == id)
            .with_context(|| format!("unknown project {id}"))?;

        let allowed = project.status == status
            || matches!(
                (project.status, status),
                (ProjectStatus::Pending, ProjectStatus::Processing)
                    | (ProjectStatus::Processing, ProjectStatus::Completed)
                    | (ProjectStatus::Processing, ProjectStatus::Failed)
                    | (ProjectStatus::Completed, ProjectStatus::Processing)
                    | (ProjectStatus::Failed, ProjectStatus::Processing)
            );
        if !allowed {
            bail!(
                "invalid status transition {} -> {} for project {id}",
                project.status.as_str(),
                status.as_str()
            );
        }

        project.status = status;
        project.updated_at = now_utc_iso();
        self.flush()
    }

    pub fn insert_image(&mut self, project_id: u64, image: NewImage) -> Result<ImageRecord> {
        if self.get_project(project_id).is_none() {
            bail!("unknown project {project_id}");
        }

        self.state.next_image_id += 1;
        let record = ImageRecord {
            id: self.state.next_image_id,
            project_id,
            category: image.category,
            data: image.data,
            mime_type: image.mime_type,
            prompt: image.prompt,
            shot: image.shot,
            ordinal: image.ordinal,
        };
        self.state.images.push(record.clone());
        self.flush()?;
        Ok(record)
    }

    pub fn images_for_project(&self, project_id: u64) -> Vec<&ImageRecord> {
        self.state
            .images
            .iter()
            .filter(|image| image.project_id == project_id)
            .collect()
    }

    pub fn images_by_category(
        &self,
        project_id: u64,
        category: ImageCategory,
    ) -> Vec<&ImageRecord> {
        self.state
            .images
            .iter()
            .filter(|image| image.project_id == project_id && image.category == category)
            .collect()
    }

    pub fn results_for_shot(&self, project_id: u64, shot: ShotType) -> Vec<&ImageRecord> {
        self.state
            .images
            .iter()
            .filter(|image| {
                image.project_id == project_id
                    && image.category == ImageCategory::Result
                    && image.shot == Some(shot)
            })
            .collect()
    }

    /// Bulk-deletes every image of one category for a project. Returns the
    /// number of removed records.
    pub fn delete_category(&mut self, project_id: u64, category: ImageCategory) -> Result<usize> {
        let before = self.state.images.len();
        self.state
            .images
            .retain(|image| !(image.project_id == project_id && image.category == category));
        let removed = before - self.state.images.len();
        if removed > 0 {
            self.flush()?;
        }
        Ok(removed)
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.state)?)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use super::{ImageCategory, NewImage, ProjectStatus, ShootStore, ShotType};

    fn product_image(data: &str) -> NewImage {
        NewImage::new(ImageCategory::Product, data, "image/jpeg")
    }

    #[test]
    fn create_project_assigns_sequential_ids() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = ShootStore::open(temp.path().join("store.json"))?;
        let first = store.create_project("Silk robe", None, Some("elena"), Some("slim"))?;
        let second = store.create_project("Lace set", None, None, None)?;
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.status, ProjectStatus::Pending);
        assert_eq!(first.persona_id.as_deref(), Some("elena"));
        Ok(())
    }

    #[test]
    fn store_round_trips_through_reload() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("store.json");
        let project_id = {
            let mut store = ShootStore::open(&path)?;
            let project = store.create_project("Silk robe", None, None, None)?;
            store.insert_image(project.id, product_image("AAAA"))?;
            project.id
        };

        let reloaded = ShootStore::open(&path)?;
        assert!(reloaded.get_project(project_id).is_some());
        let images = reloaded.images_by_category(project_id, ImageCategory::Product);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].data, "AAAA");
        Ok(())
    }

    #[test]
    fn insert_image_rejects_unknown_project() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = ShootStore::open(temp.path().join("store.json"))?;
        let err = store.insert_image(99, product_image("AAAA")).unwrap_err();
        assert!(err.to_string().contains("unknown project 99"));
        Ok(())
    }

    #[test]
    fn delete_category_leaves_other_categories_alone() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = ShootStore::open(temp.path().join("store.json"))?;
        let project = store.create_project("Silk robe", None, None, None)?;
        store.insert_image(project.id, product_image("AAAA"))?;
        let mut result = NewImage::new(ImageCategory::Result, "BBBB", "image/png");
        result.shot = Some(ShotType::Hero);
        result.ordinal = Some(0);
        store.insert_image(project.id, result)?;

        let removed = store.delete_category(project.id, ImageCategory::Result)?;
        assert_eq!(removed, 1);
        assert_eq!(
            store
                .images_by_category(project.id, ImageCategory::Product)
                .len(),
            1
        );
        assert!(store
            .results_for_shot(project.id, ShotType::Hero)
            .is_empty());
        Ok(())
    }

    #[test]
    fn status_moves_forward_within_one_attempt() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = ShootStore::open(temp.path().join("store.json"))?;
        let project = store.create_project("Silk robe", None, None, None)?;

        store.update_status(project.id, ProjectStatus::Processing)?;
        store.update_status(project.id, ProjectStatus::Completed)?;
        // Regeneration may reset a finished project.
        store.update_status(project.id, ProjectStatus::Processing)?;
        store.update_status(project.id, ProjectStatus::Failed)?;

        let err = store
            .update_status(project.id, ProjectStatus::Pending)
            .unwrap_err();
        assert!(err.to_string().contains("invalid status transition"));
        Ok(())
    }

    #[test]
    fn pending_project_cannot_complete_without_processing() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = ShootStore::open(temp.path().join("store.json"))?;
        let project = store.create_project("Silk robe", None, None, None)?;
        assert!(store
            .update_status(project.id, ProjectStatus::Completed)
            .is_err());
        Ok(())
    }
}
