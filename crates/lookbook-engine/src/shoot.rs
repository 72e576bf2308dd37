use anyhow::{bail, Context, Result};
use lookbook_contracts::events::{EventPayload, EventWriter};
use lookbook_contracts::store::{
    ImageCategory, ImageRecord, NewImage, ProjectStatus, ShootStore,
};
use serde_json::Value;
use uuid::Uuid;

use crate::gateway::{GenerateGateway, ImagePayload};
use crate::orchestrator::{Orchestrator, ProgressFn, ShootMode, ShootRequest, ShotResult};
use crate::prompt::ShotOverrides;

#[derive(Debug, Clone, Default)]
pub struct ShootOptions {
    pub mode: ShootMode,
    pub seed: Option<u64>,
    pub custom_prompts: ShotOverrides,
}

#[derive(Debug, Clone)]
pub struct ShootOutcome {
    pub run_id: String,
    pub status: ProjectStatus,
    pub results: Vec<ShotResult>,
    pub persisted: Vec<ImageRecord>,
}

/// Runs one generation attempt for a stored project: marks it processing,
/// discards the previous results, dispatches the shoot, persists every
/// successful shot, and settles the project status — completed when at least
/// one shot succeeded, failed when none did.
pub fn run_project_shoot(
    store: &mut ShootStore,
    project_id: u64,
    gateway: &dyn GenerateGateway,
    options: &ShootOptions,
    events: Option<&EventWriter>,
    on_progress: &mut ProgressFn,
) -> Result<ShootOutcome> {
    let project = store
        .get_project(project_id)
        .with_context(|| format!("unknown project {project_id}"))?
        .clone();

    let product_images = payloads(store, project_id, ImageCategory::Product);
    if product_images.is_empty() {
        bail!("project {project_id} has no product images");
    }

    let request = ShootRequest {
        product_images,
        style_images: payloads(store, project_id, ImageCategory::Style),
        accessory_images: payloads(store, project_id, ImageCategory::Accessory),
        persona_id: project.persona_id.clone(),
        body_type_id: project.body_type_id.clone(),
        custom_prompts: options.custom_prompts.clone(),
        mode: options.mode,
        seed: options.seed,
    };

    store.update_status(project_id, ProjectStatus::Processing)?;
    store.delete_category(project_id, ImageCategory::Result)?;

    let run_id = Uuid::new_v4().to_string();
    emit(events, "shoot_started", |payload| {
        payload.insert("run_id".to_string(), Value::String(run_id.clone()));
        payload.insert(
            "mode".to_string(),
            Value::String(options.mode.as_str().to_string()),
        );
    });

    let results = Orchestrator::new().run(gateway, &request, on_progress)?;

    let mut persisted = Vec::new();
    for result in &results {
        match &result.image {
            Some(image) => {
                let mut record = NewImage::new(
                    ImageCategory::Result,
                    image.data.clone(),
                    image.mime_type.clone(),
                );
                record.prompt = Some(result.prompt.clone());
                record.shot = Some(result.shot);
                record.ordinal = Some(result.ordinal);
                persisted.push(store.insert_image(project_id, record)?);
                emit(events, "shot_generated", |payload| {
                    payload.insert("run_id".to_string(), Value::String(run_id.clone()));
                    payload.insert(
                        "shot".to_string(),
                        Value::String(result.shot.as_str().to_string()),
                    );
                    payload.insert("ordinal".to_string(), Value::Number(result.ordinal.into()));
                });
            }
            None => emit(events, "shot_failed", |payload| {
                payload.insert("run_id".to_string(), Value::String(run_id.clone()));
                payload.insert(
                    "shot".to_string(),
                    Value::String(result.shot.as_str().to_string()),
                );
                payload.insert(
                    "error".to_string(),
                    Value::String(result.error.clone().unwrap_or_default()),
                );
            }),
        }
    }

    let status = if persisted.is_empty() {
        ProjectStatus::Failed
    } else {
        ProjectStatus::Completed
    };
    store.update_status(project_id, status)?;
    emit(events, "shoot_finished", |payload| {
        payload.insert("run_id".to_string(), Value::String(run_id.clone()));
        payload.insert(
            "status".to_string(),
            Value::String(status.as_str().to_string()),
        );
        payload.insert("generated".to_string(), Value::Number(persisted.len().into()));
        payload.insert(
            "failed".to_string(),
            Value::Number((results.len() - persisted.len()).into()),
        );
    });

    Ok(ShootOutcome {
        run_id,
        status,
        results,
        persisted,
    })
}

fn payloads(store: &ShootStore, project_id: u64, category: ImageCategory) -> Vec<ImagePayload> {
    store
        .images_by_category(project_id, category)
        .into_iter()
        .map(|record| ImagePayload::new(record.data.clone(), record.mime_type.clone()))
        .collect()
}

fn emit(events: Option<&EventWriter>, event_type: &str, fill: impl FnOnce(&mut EventPayload)) {
    let Some(writer) = events else {
        return;
    };
    let mut payload = EventPayload::new();
    fill(&mut payload);
    // Event logging never fails the run.
    let _ = writer.emit(event_type, payload);
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use lookbook_contracts::events::EventWriter;
    use lookbook_contracts::store::{
        ImageCategory, NewImage, ProjectStatus, ShootStore, ShotType,
    };

    use super::{run_project_shoot, ShootOptions};
    use crate::gateway::{CallResult, GenerateCall, GenerateGateway, ImagePayload};
    use crate::orchestrator::ShootMode;

    struct ScriptedGateway {
        script: RefCell<VecDeque<CallResult>>,
    }

    impl ScriptedGateway {
        fn new(script: Vec<CallResult>) -> Self {
            Self {
                script: RefCell::new(script.into()),
            }
        }
    }

    impl GenerateGateway for ScriptedGateway {
        fn generate(&self, _call: &GenerateCall) -> CallResult {
            self.script
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string()))
        }
    }

    fn seeded_project(store: &mut ShootStore) -> u64 {
        let project = store
            .create_project("Silk robe", None, Some("elena"), Some("slim"))
            .unwrap();
        store
            .insert_image(
                project.id,
                NewImage::new(ImageCategory::Product, "PRODUCT==", "image/jpeg"),
            )
            .unwrap();
        project.id
    }

    fn options(mode: ShootMode) -> ShootOptions {
        ShootOptions {
            mode,
            seed: Some(3),
            ..ShootOptions::default()
        }
    }

    #[test]
    fn composite_run_persists_one_hero_result() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = ShootStore::open(temp.path().join("store.json"))?;
        let project_id = seeded_project(&mut store);
        let gateway =
            ScriptedGateway::new(vec![Ok(ImagePayload::new("ABC123==", "image/png"))]);

        let outcome = run_project_shoot(
            &mut store,
            project_id,
            &gateway,
            &options(ShootMode::Composite),
            None,
            &mut |_, _| {},
        )?;

        assert_eq!(outcome.status, ProjectStatus::Completed);
        assert_eq!(outcome.persisted.len(), 1);
        let results = store.results_for_shot(project_id, ShotType::Hero);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].data, "ABC123==");
        assert!(results[0].prompt.as_deref().unwrap_or("").contains("contact sheet"));
        assert_eq!(
            store.get_project(project_id).unwrap().status,
            ProjectStatus::Completed
        );
        Ok(())
    }

    #[test]
    fn regeneration_discards_previous_results() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = ShootStore::open(temp.path().join("store.json"))?;
        let project_id = seeded_project(&mut store);

        let gateway = ScriptedGateway::new(vec![Ok(ImagePayload::new("OLD==", "image/png"))]);
        run_project_shoot(
            &mut store,
            project_id,
            &gateway,
            &options(ShootMode::Composite),
            None,
            &mut |_, _| {},
        )?;

        let gateway = ScriptedGateway::new(vec![Ok(ImagePayload::new("NEW==", "image/png"))]);
        run_project_shoot(
            &mut store,
            project_id,
            &gateway,
            &options(ShootMode::Composite),
            None,
            &mut |_, _| {},
        )?;

        let results = store.images_by_category(project_id, ImageCategory::Result);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].data, "NEW==");
        Ok(())
    }

    #[test]
    fn hero_failure_marks_the_project_failed() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = ShootStore::open(temp.path().join("store.json"))?;
        let project_id = seeded_project(&mut store);
        let gateway = ScriptedGateway::new(vec![Err("network failure: timeout".to_string())]);

        let outcome = run_project_shoot(
            &mut store,
            project_id,
            &gateway,
            &options(ShootMode::PerShot),
            None,
            &mut |_, _| {},
        )?;

        assert_eq!(outcome.status, ProjectStatus::Failed);
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.persisted.is_empty());
        assert!(store
            .images_by_category(project_id, ImageCategory::Result)
            .is_empty());
        assert_eq!(
            store.get_project(project_id).unwrap().status,
            ProjectStatus::Failed
        );
        Ok(())
    }

    #[test]
    fn partial_success_still_completes_the_project() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = ShootStore::open(temp.path().join("store.json"))?;
        let project_id = seeded_project(&mut store);

        let mut script: Vec<CallResult> = vec![Ok(ImagePayload::new("OK==", "image/png")); 7];
        script[4] = Err("generation request failed (503)".to_string());
        let gateway = ScriptedGateway::new(script);

        let outcome = run_project_shoot(
            &mut store,
            project_id,
            &gateway,
            &options(ShootMode::PerShot),
            None,
            &mut |_, _| {},
        )?;

        assert_eq!(outcome.status, ProjectStatus::Completed);
        assert_eq!(outcome.persisted.len(), 6);
        assert_eq!(
            store
                .images_by_category(project_id, ImageCategory::Result)
                .len(),
            6
        );
        // The failed shot was half_body #2; only one half_body result remains.
        assert_eq!(
            store
                .results_for_shot(project_id, ShotType::HalfBody)
                .len(),
            1
        );
        Ok(())
    }

    #[test]
    fn project_without_product_images_is_rejected_untouched() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = ShootStore::open(temp.path().join("store.json"))?;
        let project = store.create_project("Empty", None, None, None)?;
        let gateway = ScriptedGateway::new(Vec::new());

        let err = run_project_shoot(
            &mut store,
            project.id,
            &gateway,
            &options(ShootMode::Composite),
            None,
            &mut |_, _| {},
        )
        .unwrap_err();

        assert!(err.to_string().contains("no product images"));
        assert_eq!(
            store.get_project(project.id).unwrap().status,
            ProjectStatus::Pending
        );
        Ok(())
    }

    #[test]
    fn events_are_written_for_start_shots_and_finish() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut store = ShootStore::open(temp.path().join("store.json"))?;
        let project_id = seeded_project(&mut store);
        let events_path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&events_path, project_id);
        let gateway = ScriptedGateway::new(vec![Ok(ImagePayload::new("OK==", "image/png"))]);

        run_project_shoot(
            &mut store,
            project_id,
            &gateway,
            &options(ShootMode::Composite),
            Some(&writer),
            &mut |_, _| {},
        )?;

        let content = std::fs::read_to_string(&events_path)?;
        let types: Vec<String> = content
            .lines()
            .map(|line| {
                serde_json::from_str::<serde_json::Value>(line).unwrap()["type"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();
        assert_eq!(types, vec!["shoot_started", "shot_generated", "shoot_finished"]);
        Ok(())
    }
}
