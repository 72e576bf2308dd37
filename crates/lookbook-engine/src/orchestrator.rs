use anyhow::{bail, Result};
use lookbook_contracts::store::ShotType;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::gateway::{GenerateCall, GenerateGateway, ImagePayload, ResolutionTier};
use crate::prompt::{PromptAssembler, PromptInputs, ShotOverrides, ShotPrompt};

/// Strategy for one generation run, selected explicitly at the entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShootMode {
    /// One gateway call producing a contact-sheet image with all seven shots.
    #[default]
    Composite,
    /// Seven calls chained through the hero image as identity reference.
    PerShot,
}

impl ShootMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShootMode::Composite => "composite",
            ShootMode::PerShot => "per_shot",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShootRequest {
    pub product_images: Vec<ImagePayload>,
    pub style_images: Vec<ImagePayload>,
    pub accessory_images: Vec<ImagePayload>,
    pub persona_id: Option<String>,
    pub body_type_id: Option<String>,
    pub custom_prompts: ShotOverrides,
    pub mode: ShootMode,
    /// Seeds the scene draw; `None` draws from entropy.
    pub seed: Option<u64>,
}

/// One entry of the ordered result sequence. A failed entry has no payload
/// and a populated error; callers persist only entries that succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotResult {
    pub shot: ShotType,
    pub ordinal: u32,
    pub prompt: String,
    pub image: Option<ImagePayload>,
    pub error: Option<String>,
}

impl ShotResult {
    pub fn succeeded(&self) -> bool {
        self.image.is_some() && self.error.is_none()
    }
}

pub type ProgressFn<'a> = dyn FnMut(u32, u32) + 'a;

#[derive(Default)]
pub struct Orchestrator {
    assembler: PromptAssembler,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            assembler: PromptAssembler::new(),
        }
    }

    pub fn with_assembler(assembler: PromptAssembler) -> Self {
        Self { assembler }
    }

    /// Runs one shoot and returns the ordered shot results. Gateway failures
    /// come back as error entries, never as `Err`; the only `Err` here is the
    /// missing-product precondition, raised before any gateway call.
    pub fn run(
        &self,
        gateway: &dyn GenerateGateway,
        request: &ShootRequest,
        on_progress: &mut ProgressFn,
    ) -> Result<Vec<ShotResult>> {
        if request.product_images.is_empty() {
            bail!("at least one product image is required");
        }

        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let inputs = PromptInputs {
            persona_id: request.persona_id.as_deref(),
            body_type_id: request.body_type_id.as_deref(),
            has_style_references: !request.style_images.is_empty(),
        };

        match request.mode {
            ShootMode::Composite => {
                let plan = self.assembler.composite_prompt(&inputs, &mut rng);
                Ok(self.run_composite(gateway, request, plan, on_progress))
            }
            ShootMode::PerShot => {
                let plan = self
                    .assembler
                    .per_shot_prompts(&inputs, &request.custom_prompts, &mut rng);
                Ok(self.run_per_shot(gateway, request, plan, on_progress))
            }
        }
    }

    fn run_composite(
        &self,
        gateway: &dyn GenerateGateway,
        request: &ShootRequest,
        plan: ShotPrompt,
        on_progress: &mut ProgressFn,
    ) -> Vec<ShotResult> {
        on_progress(1, 1);
        let outcome = gateway.generate(&call_for(request, &plan, None));
        vec![shot_result(plan, outcome)]
    }

    fn run_per_shot(
        &self,
        gateway: &dyn GenerateGateway,
        request: &ShootRequest,
        plan: Vec<ShotPrompt>,
        on_progress: &mut ProgressFn,
    ) -> Vec<ShotResult> {
        let total = plan.len() as u32;
        let mut shots = plan.into_iter();
        let hero_plan = match shots.next() {
            Some(hero) => hero,
            None => return Vec::new(),
        };

        on_progress(1, total);
        let hero_outcome = gateway.generate(&call_for(request, &hero_plan, None));
        let hero = shot_result(hero_plan, hero_outcome);
        // Later shots need the hero as identity reference; without it the
        // batch cannot stay consistent, so the run stops here.
        let Some(identity) = hero.image.clone() else {
            return vec![hero];
        };

        let mut results = vec![hero];
        for (step, shot_plan) in shots.enumerate() {
            on_progress(step as u32 + 2, total);
            let outcome = gateway.generate(&call_for(request, &shot_plan, Some(identity.clone())));
            results.push(shot_result(shot_plan, outcome));
        }
        results
    }
}

fn call_for(
    request: &ShootRequest,
    plan: &ShotPrompt,
    identity_image: Option<ImagePayload>,
) -> GenerateCall {
    GenerateCall {
        prompt: plan.prompt.clone(),
        identity_image,
        product_images: request.product_images.clone(),
        style_images: request.style_images.clone(),
        accessory_images: request.accessory_images.clone(),
        aspect_ratio: Some(plan.aspect_ratio),
        image_size: Some(ResolutionTier::TwoK),
    }
}

fn shot_result(plan: ShotPrompt, outcome: crate::gateway::CallResult) -> ShotResult {
    let (image, error) = match outcome {
        Ok(image) => (Some(image), None),
        Err(error) => (None, Some(error)),
    };
    ShotResult {
        shot: plan.shot,
        ordinal: plan.ordinal,
        prompt: plan.prompt,
        image,
        error,
    }
}
