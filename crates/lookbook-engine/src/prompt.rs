use std::collections::HashMap;

use lookbook_contracts::catalog::{BodyTypeCatalog, PersonaCatalog, SceneCatalog};
use lookbook_contracts::store::ShotType;
use rand::Rng;

use crate::gateway::AspectRatio;

/// Fixed photographic suffix shared by every prompt of a run.
pub const FILM_SUFFIX: &str = "Photography: 35mm film aesthetic, Kodak Portra 400, soft grain, \
     high resolution, photorealistic, cinematic lighting.";

/// Scene clause used when the caller uploaded style references.
pub const STYLE_REFERENCE_SCENE: &str =
    "Background: Use the exact style and environment from the uploaded Style Reference images.";

const DEFAULT_PERSONA_CLAUSE: &str = "Model: Professional fashion model.";

/// Per-shot prompt override map. A hero override replaces the whole assembled
/// hero prompt; overrides for other shot types replace that shot's base clause.
pub type ShotOverrides = HashMap<ShotType, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotPrompt {
    pub shot: ShotType,
    pub ordinal: u32,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
}

/// What the assembler needs to know about one run before writing prompts.
#[derive(Debug, Clone, Default)]
pub struct PromptInputs<'a> {
    pub persona_id: Option<&'a str>,
    pub body_type_id: Option<&'a str>,
    pub has_style_references: bool,
}

pub struct PromptAssembler {
    personas: PersonaCatalog,
    body_types: BodyTypeCatalog,
    scenes: SceneCatalog,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptAssembler {
    pub fn new() -> Self {
        Self {
            personas: PersonaCatalog::new(None),
            body_types: BodyTypeCatalog::new(None),
            scenes: SceneCatalog::new(None),
        }
    }

    pub fn with_catalogs(
        personas: PersonaCatalog,
        body_types: BodyTypeCatalog,
        scenes: SceneCatalog,
    ) -> Self {
        Self {
            personas,
            body_types,
            scenes,
        }
    }

    /// One contact-sheet prompt covering all seven compositions.
    pub fn composite_prompt(&self, inputs: &PromptInputs, rng: &mut impl Rng) -> ShotPrompt {
        let description = self.model_description(inputs);
        let style = self.style_description(inputs, rng);
        let prompt = format!(
            "Create a high-fashion contact sheet (composite image) featuring 7 distinct shots \
             of a model wearing [Product Description].\n\n\
             {description}\n\n\
             {style}\n\n\
             Layout: A creative grid or collage containing:\n\
             - 1 Main Hero Shot (Large, lounging or sitting, relaxed)\n\
             - 2 Full Body Shots (Standing, walking, showing flow of fabric)\n\
             - 2 Half Body Shots (Leaning, posing)\n\
             - 2 Close-up Detail Shots (Focus on silk texture and accessories)\n\n\
             Ensure variety in poses and angles. High resolution, 8k.\n\
             Coherent lighting and color grading across all shots."
        );
        ShotPrompt {
            shot: ShotType::Hero,
            ordinal: 1,
            prompt,
            aspect_ratio: AspectRatio::Portrait,
        }
    }

    /// Seven prompts in dispatch order: hero first, then full-body, half-body
    /// and close-up pairs. The scene is drawn once so every shot of the run
    /// shares it.
    pub fn per_shot_prompts(
        &self,
        inputs: &PromptInputs,
        overrides: &ShotOverrides,
        rng: &mut impl Rng,
    ) -> Vec<ShotPrompt> {
        let description = self.model_description(inputs);
        let style = self.style_description(inputs, rng);

        let hero_prompt = overrides.get(&ShotType::Hero).cloned().unwrap_or_else(|| {
            format!("A cinematic hero shot. {description} {style} The model is in an elegant pose.")
        });
        let mut prompts = vec![ShotPrompt {
            shot: ShotType::Hero,
            ordinal: 1,
            prompt: hero_prompt,
            aspect_ratio: AspectRatio::Square,
        }];

        let bases: [(ShotType, u32, &str); 6] = [
            (
                ShotType::FullBody,
                1,
                "Full body shot, standing or walking, showing the drape of the silk.",
            ),
            (ShotType::FullBody, 2, "Full body shot, back view or side view."),
            (ShotType::HalfBody, 1, "Medium shot, upper body focus."),
            (
                ShotType::HalfBody,
                2,
                "Medium shot, interacting with a prop or furniture.",
            ),
            (
                ShotType::CloseUp,
                1,
                "Extreme close-up on fabric texture and details.",
            ),
            (ShotType::CloseUp, 2, "Close-up on face and neckline details."),
        ];

        for (shot, ordinal, base) in bases {
            let base = overrides
                .get(&shot)
                .map(String::as_str)
                .unwrap_or(base);
            prompts.push(ShotPrompt {
                shot,
                ordinal,
                prompt: format!("{base} {style} Different pose and angle."),
                aspect_ratio: AspectRatio::Portrait,
            });
        }

        prompts
    }

    fn model_description(&self, inputs: &PromptInputs) -> String {
        let persona_clause = inputs
            .persona_id
            .and_then(|id| self.personas.get(id))
            .map(|persona| format!("Model: {}", persona.prompt))
            .unwrap_or_else(|| DEFAULT_PERSONA_CLAUSE.to_string());

        let body_type = inputs
            .body_type_id
            .and_then(|id| self.body_types.get(id))
            .or_else(|| self.body_types.default_body_type());
        let body_clause = body_type
            .map(|body| format!("Body Type: {} Pose: {}", body.prompt, body.pose_modifier))
            .unwrap_or_default();

        format!("{persona_clause} {body_clause}").trim().to_string()
    }

    fn style_description(&self, inputs: &PromptInputs, rng: &mut impl Rng) -> String {
        let scene = if inputs.has_style_references {
            STYLE_REFERENCE_SCENE.to_string()
        } else {
            self.scenes
                .at(rng.gen_range(0..self.scenes.len()))
                .map(|scene| scene.prompt.clone())
                .unwrap_or_default()
        };
        format!("{scene} {FILM_SUFFIX}")
    }
}
