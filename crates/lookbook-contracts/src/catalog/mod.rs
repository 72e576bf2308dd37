mod personas;
mod scenes;

pub use personas::{
    default_body_types, default_personas, BodyTypeCatalog, BodyTypeSpec, Gender, PersonaCatalog,
    PersonaSpec,
};
pub use scenes::{default_scenes, SceneCatalog, SceneSpec};
