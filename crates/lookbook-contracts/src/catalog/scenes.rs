use indexmap::IndexMap;

/// A stock background scene used when the caller supplies no style references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSpec {
    pub id: String,
    pub name: String,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct SceneCatalog {
    scenes: IndexMap<String, SceneSpec>,
}

impl SceneCatalog {
    pub fn new(scenes: Option<IndexMap<String, SceneSpec>>) -> Self {
        Self {
            scenes: scenes.unwrap_or_else(default_scenes),
        }
    }

    pub fn get(&self, id: &str) -> Option<&SceneSpec> {
        self.scenes.get(id)
    }

    /// Scene at a catalog position. Callers draw the position from their own
    /// random source so scene choice stays seedable.
    pub fn at(&self, index: usize) -> Option<&SceneSpec> {
        self.scenes.values().nth(index)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn list(&self) -> impl Iterator<Item = &SceneSpec> {
        self.scenes.values()
    }
}

pub fn default_scenes() -> IndexMap<String, SceneSpec> {
    let mut map = IndexMap::new();

    let mut insert = |id: &str, name: &str, prompt: &str| {
        map.insert(
            id.to_string(),
            SceneSpec {
                id: id.to_string(),
                name: name.to_string(),
                prompt: prompt.to_string(),
            },
        );
    };

    insert(
        "open_window_garden",
        "The Open Window Garden",
        "Background: A vintage French apartment room with open french doors revealing a \
         lush, overgrown green garden. Natural sunlight streaming in. Furniture: A white \
         linen slipcover armchair. Vibe: Lazy afternoon, fresh, organic, 35mm film grain, \
         Kodak Portra 400 aesthetic.",
    );
    insert(
        "parquet_shadows",
        "The Parquet Floor & Shadows",
        "Background: An elegant room with warm wooden parquet floors and cream plaster \
         walls. Sunlight casting soft, geometric shadows through blinds or leaves. \
         Furniture: Minimalist antique wooden furniture. Vibe: Quiet luxury, intimate, \
         warm tones, high-fashion editorial style.",
    );
    insert(
        "garden_terrace",
        "The Garden Terrace",
        "Background: A semi-outdoor terrace with stone tiles, surrounded by rich greenery \
         and white hydrangeas. Soft, diffused lighting. Furniture: White wrought-iron \
         garden chair. Vibe: Vacation mode, breezy, romantic, soft focus, film photography.",
    );
    insert(
        "sun_drenched_nook",
        "The Sun-Drenched Nook",
        "Background: A cozy corner of a room with high ceilings and crown molding. Harsh \
         but artistic direct sunlight hitting the wall. Furniture: A vintage velvet ottoman \
         or daybed. Vibe: Dreamy, nostalgic, cinematic lighting, grain texture.",
    );

    map
}

#[cfg(test)]
mod tests {
    use super::SceneCatalog;

    #[test]
    fn catalog_positions_follow_insertion_order() {
        let catalog = SceneCatalog::new(None);
        assert_eq!(catalog.len(), 4);
        assert_eq!(
            catalog.at(0).map(|s| s.id.as_str()),
            Some("open_window_garden")
        );
        assert_eq!(
            catalog.at(3).map(|s| s.id.as_str()),
            Some("sun_drenched_nook")
        );
        assert!(catalog.at(4).is_none());
    }
}
