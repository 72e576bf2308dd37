use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
}

/// A named model persona injected into prompts to keep one consistent "model"
/// across every shot of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaSpec {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    personas: IndexMap<String, PersonaSpec>,
}

impl PersonaCatalog {
    pub fn new(personas: Option<IndexMap<String, PersonaSpec>>) -> Self {
        Self {
            personas: personas.unwrap_or_else(default_personas),
        }
    }

    pub fn get(&self, id: &str) -> Option<&PersonaSpec> {
        self.personas.get(id)
    }

    pub fn list(&self) -> impl Iterator<Item = &PersonaSpec> {
        self.personas.values()
    }

    /// First persona in catalog order; used when the caller selects none.
    pub fn default_persona(&self) -> Option<&PersonaSpec> {
        self.personas.values().next()
    }
}

pub fn default_personas() -> IndexMap<String, PersonaSpec> {
    let mut map = IndexMap::new();

    let mut insert = |id: &str, name: &str, gender: Gender, prompt: &str| {
        map.insert(
            id.to_string(),
            PersonaSpec {
                id: id.to_string(),
                name: name.to_string(),
                gender,
                prompt: prompt.to_string(),
            },
        );
    };

    insert(
        "elena",
        "Elena",
        Gender::Female,
        "A sophisticated young Caucasian woman with glowing fair skin, soft wavy hair, \
         elegant posture. Classic beauty with a soft, premium skincare aesthetic.",
    );
    insert(
        "naomi",
        "Naomi",
        Gender::Female,
        "A stunning Black woman with deep rich skin tone, refined facial structure, \
         distinct cheekbones, and sleek hair. High-fashion supermodel vibe, confident and strong.",
    );
    insert(
        "julian",
        "Julian",
        Gender::Male,
        "A handsome Caucasian man with a lean athletic build, light stubble, and a relaxed \
         luxury vibe. \"Old money\" aesthetic, effortless and charming.",
    );
    insert(
        "marcus",
        "Marcus",
        Gender::Male,
        "A charismatic Black man with a well-groomed beard, deep skin tone, and a strong, \
         calm presence. Modern luxury style, mature and sophisticated.",
    );

    map
}

/// Body shape descriptor plus the pose cues that go with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyTypeSpec {
    pub id: String,
    pub name: String,
    pub prompt: String,
    pub pose_modifier: String,
}

#[derive(Debug, Clone)]
pub struct BodyTypeCatalog {
    body_types: IndexMap<String, BodyTypeSpec>,
}

impl BodyTypeCatalog {
    pub fn new(body_types: Option<IndexMap<String, BodyTypeSpec>>) -> Self {
        Self {
            body_types: body_types.unwrap_or_else(default_body_types),
        }
    }

    pub fn get(&self, id: &str) -> Option<&BodyTypeSpec> {
        self.body_types.get(id)
    }

    pub fn list(&self) -> impl Iterator<Item = &BodyTypeSpec> {
        self.body_types.values()
    }

    pub fn default_body_type(&self) -> Option<&BodyTypeSpec> {
        self.body_types.values().next()
    }
}

pub fn default_body_types() -> IndexMap<String, BodyTypeSpec> {
    let mut map = IndexMap::new();

    let mut insert = |id: &str, name: &str, prompt: &str, pose_modifier: &str| {
        map.insert(
            id.to_string(),
            BodyTypeSpec {
                id: id.to_string(),
                name: name.to_string(),
                prompt: prompt.to_string(),
                pose_modifier: pose_modifier.to_string(),
            },
        );
    };

    insert(
        "slim",
        "Slim",
        "Slim, athletic build with an elegant, elongated silhouette.",
        "Relaxed, natural posture. Avoid stiff or overly posed looks. Think \"candid moment \
         on a lazy Sunday morning\". Body language should feel effortless and casual.",
    );
    insert(
        "curvy",
        "Curvy",
        "Curvy, voluptuous body with fuller bust, defined waist, full hips and shapely \
         thighs. Sensual and confident.",
        "Confident, expressive poses that accentuate curves. Highlight the bust, \
         waist-to-hip ratio, and thigh contours. Alluring and self-assured body language.",
    );

    map
}

#[cfg(test)]
mod tests {
    use super::{BodyTypeCatalog, Gender, PersonaCatalog};

    #[test]
    fn default_persona_is_first_in_catalog_order() {
        let catalog = PersonaCatalog::new(None);
        let persona = catalog.default_persona().unwrap();
        assert_eq!(persona.id, "elena");
        assert_eq!(persona.gender, Gender::Female);
    }

    #[test]
    fn persona_lookup_by_id() {
        let catalog = PersonaCatalog::new(None);
        assert_eq!(catalog.get("marcus").map(|p| p.name.as_str()), Some("Marcus"));
        assert!(catalog.get("missing").is_none());
        assert_eq!(catalog.list().count(), 4);
    }

    #[test]
    fn default_body_type_is_slim() {
        let catalog = BodyTypeCatalog::new(None);
        assert_eq!(
            catalog.default_body_type().map(|b| b.id.as_str()),
            Some("slim")
        );
        assert!(catalog.get("curvy").is_some());
    }
}
