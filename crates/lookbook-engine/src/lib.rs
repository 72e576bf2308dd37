pub mod compress;
pub mod gateway;
pub mod orchestrator;
pub mod prompt;
pub mod shoot;

pub use compress::{compress_image, CompressedImage};
pub use gateway::{
    AspectRatio, CallResult, GatewayConfig, GeminiGateway, GenerateCall, GenerateGateway,
    ImagePayload, ResolutionTier,
};
pub use orchestrator::{Orchestrator, ShootMode, ShootRequest, ShotResult};
pub use prompt::{PromptAssembler, PromptInputs, ShotOverrides, ShotPrompt};
pub use shoot::{run_project_shoot, ShootOptions, ShootOutcome};
