//! Style templates and the session template catalog

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Template-related errors
#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),
    #[error("Template id already exists: {0}")]
    DuplicateId(String),
    #[error("Style name and prompt cannot be empty")]
    EmptyField,
    #[error("Style name does not produce a usable id: {0}")]
    InvalidId(String),
}

/// A named, reusable style prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Template {
    /// Unique, lowercase snake_case identifier
    pub id: String,
    pub name: String,
    pub prompt: String,
    /// Thumbnail URL or data URI
    pub thumbnail: String,
}

/// Fields supplied when creating or editing a template
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TemplateDraft {
    pub name: String,
    pub prompt: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Placeholder thumbnail seeded by the template id
pub fn default_thumbnail(id: &str) -> String {
    format!("https://picsum.photos/seed/{}/200", id)
}

/// Derive a template id from a display name.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `_` and drops one trailing `_`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_gap = false;

    for ch in name.trim().to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            slug.push(ch);
            in_gap = false;
        } else if !in_gap {
            slug.push('_');
            in_gap = true;
        }
    }

    if slug.ends_with('_') {
        slug.pop();
    }
    slug
}

static BUILTIN_TEMPLATES: Lazy<Vec<Template>> = Lazy::new(|| {
    BUILTIN_PRESETS
        .iter()
        .map(|(id, name, prompt)| Template {
            id: id.to_string(),
            name: name.to_string(),
            prompt: prompt.to_string(),
            thumbnail: default_thumbnail(id),
        })
        .collect()
});

/// The preset styles every session starts with
pub fn builtin_templates() -> Vec<Template> {
    BUILTIN_TEMPLATES.clone()
}

/// Session-scoped, in-memory template collection
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        TemplateCatalog::new(builtin_templates())
    }
}

impl TemplateCatalog {
    pub fn new(templates: Vec<Template>) -> Self {
        TemplateCatalog { templates }
    }

    pub fn list(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Create a template from a draft; new templates go to the front
    pub fn create(&mut self, draft: TemplateDraft) -> Result<Template, TemplateError> {
        let (name, prompt) = validate_draft(&draft)?;
        let id = slugify(&name);
        if id.is_empty() {
            return Err(TemplateError::InvalidId(name));
        }
        if self.contains(&id) {
            return Err(TemplateError::DuplicateId(id));
        }

        let template = Template {
            thumbnail: draft.thumbnail.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| default_thumbnail(&id)),
            id,
            name,
            prompt,
        };
        self.templates.insert(0, template.clone());
        Ok(template)
    }

    /// Edit an existing template in place; the id never changes
    pub fn update(&mut self, id: &str, draft: TemplateDraft) -> Result<Template, TemplateError> {
        let (name, prompt) = validate_draft(&draft)?;
        let existing = self
            .templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;

        existing.name = name;
        existing.prompt = prompt;
        if let Some(thumbnail) = draft.thumbnail.filter(|t| !t.trim().is_empty()) {
            existing.thumbnail = thumbnail;
        }
        Ok(existing.clone())
    }

    pub fn delete(&mut self, id: &str) -> Result<Template, TemplateError> {
        let index = self
            .templates
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
        Ok(self.templates.remove(index))
    }

    /// Insert a model-suggested template at the front.
    ///
    /// Suggested ids are normalized and suffixed (`_2`, `_3`, ...) when they
    /// collide with an existing template.
    pub fn push_suggested(&mut self, mut template: Template) -> Result<Template, TemplateError> {
        let base = match slugify(&template.id) {
            id if id.is_empty() => slugify(&template.name),
            id => id,
        };
        if base.is_empty() {
            return Err(TemplateError::InvalidId(template.id));
        }
        if template.name.trim().is_empty() || template.prompt.trim().is_empty() {
            return Err(TemplateError::EmptyField);
        }

        let mut id = base.clone();
        let mut suffix = 2;
        while self.contains(&id) {
            id = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        template.id = id;
        if template.thumbnail.trim().is_empty() {
            template.thumbnail = default_thumbnail(&template.id);
        }
        self.templates.insert(0, template.clone());
        Ok(template)
    }
}

fn validate_draft(draft: &TemplateDraft) -> Result<(String, String), TemplateError> {
    let name = draft.name.trim();
    let prompt = draft.prompt.trim();
    if name.is_empty() || prompt.is_empty() {
        return Err(TemplateError::EmptyField);
    }
    Ok((name.to_string(), prompt.to_string()))
}

/// (id, name, prompt)
const BUILTIN_PRESETS: [(&str, &str, &str); 20] = [
    ("post_apocalyptic_figurine", "Post-Apocalyptic Figurine", "A hyper-realistic figurine of a person in a post-apocalyptic cityscape, a single, broken light fixture casting long, dramatic shadows. The figurine is in a heroic pose, with a shallow depth of field, and shot on a cinematic 50mm lens. The color palette is muted with a strong teal and orange contrast."),
    ("glowing_glass_sculpture", "Glowing Glass Sculpture", "A 3D render of a person as a translucent, glowing glass sculpture, floating in a dark, ethereal space. The light source is an internal, pulsating core, and the sculpture's form is a delicate, intricate lattice. The surrounding area is a subtle, foggy void. In 8K resolution."),
    ("steampunk_automaton", "Steampunk Automaton", "A macro photograph of a person as a miniature steampunk automaton, with intricate brass gears and copper plating. The automaton is sitting on a vintage leather-bound book, with soft, diffused golden-hour lighting from a nearby window."),
    ("marble_statue_painting", "Marble Statue Painting", "An oil painting of a person as a Greek marble statue, surrounded by overgrown, lush ivy in the style of a classical Roman ruin. The light is soft and hazy, with a gentle glow reminiscent of a sunrise. The painting should have visible, expressive brushstrokes."),
    ("shattered_mirror_sculpture", "Shattered Mirror Sculpture", "A high-concept, avant-garde fashion photograph of a person. They are transformed into a living sculpture made of reflective, shattered mirror shards. The background is a clean, minimalist studio, and the lighting is a harsh, focused spotlight that creates a dazzling array of refractions and shadows."),
    ("porcelain_doll", "Porcelain Doll", "A photo-realistic rendering of a person as an old-world porcelain doll with cracks and fine crazing on its surface, sitting on a weathered wooden table. The lighting is low-key, with a single, dramatic ray of light illuminating the doll's face, highlighting the detailed textures."),
    ("ice_frost_figurine", "Ice & Frost Figurine", "An ethereal figurine of a person made of crystallized ice and shimmering frost, suspended in a frozen, bioluminescent cave. The surroundings are lit by soft, glowing mushrooms and the figure has a magical, otherworldly aura."),
    ("living_wood_carving", "Living Wood Carving", "A person as a grotesque, living wood carving with roots and branches for hair, emerging from the trunk of an ancient, moss-covered tree. The scene is in a foggy forest, with mystical, soft light filtering through the canopy."),
    ("volcanic_rock_knight", "Volcanic Rock Knight", "A realistic figurine of a person as a medieval knight, forged from dark, volcanic rock, standing on a misty mountaintop. The sky is dark and stormy, with lightning strikes in the distance, casting dramatic, high-contrast light on the figure."),
    ("claymation_figurine", "Claymation Figurine", "A miniature claymation figurine of a person with exaggerated features, surrounded by whimsical, larger-than-life plants and fantastical creatures in a stop-motion style. The lighting is warm and slightly cinematic, with a soft, grainy texture."),
    ("stardust_spectral", "Stardust Spectral", "A figurine of a person as a ghostly, spectral being made of swirling stardust and nebula clouds, hovering in deep space. The figure's form is translucent, revealing a distant galaxy within. The colors are deep purples and blues."),
    ("graffiti_mural", "Graffiti Mural", "A detailed, graffiti-style illustration of a person on a brick wall in a gritty urban alleyway. The image is rendered with spray-painted textures, drips, and a bold, graphic art style. A single, stylized streetlamp provides a strong, high-contrast light source."),
    ("holographic_projection", "Holographic Projection", "A futuristic, holographic projection of a person. The figure is made of shimmering, digital data streams and light particles, hovering over a bustling, neon-lit cyberpunk street. The surrounding environment is a chaotic blur of motion."),
    ("skyscraper_model", "Skyscraper Model", "A high-angle drone shot of a person as a living, architectural model of a skyscraper, made of glass and steel. The figurine is placed on a sprawling, green city grid, with light reflecting off its polished surfaces."),
    ("e_waste_sculpture", "E-Waste Sculpture", "A person as a life-size sculpture made of discarded computer components and recycled electronics, standing in an abandoned warehouse. The sculpture is lit by the glow of a few remaining monitors and scattered ambient light, giving it a gritty, industrial feel."),
    ("90s_fashion_doll", "90s Fashion Doll", "A person from a photo turned into a photorealistic doll on a shelf. The style is 1990s Japanese fashion doll. Include a tiny doll box, with a clear window and an illustrated card backdrop with bright colors."),
    ("cubist_sculpture", "Cubist Sculpture", "A figurine of a person as a cubist sculpture, with fractured, disjointed planes and multiple perspectives. The sculpture is made of textured, colored paper and is displayed in a minimalist gallery with stark, directional lighting."),
    ("pointillism_painting", "Pointillism Painting", "A person as a pointillism-style painting, composed of countless small, vibrant dots of color. The image should have a soft, impressionistic quality, with a subtle glow around the figure and a blurred background."),
    ("paper_cutout", "Paper Cutout", "A figurine of a person as a paper cutout, with clean, sharp edges and layered sections that create a sense of depth. The backdrop is a simple, colored sheet, and the lighting is soft and shadowless, as if for a still-life photograph."),
    ("3d_printed_model", "3D Printed Model", "A high-resolution photograph of a person as a hyper-realistic, 3D printed model on a workbench. Show the model with visible, fine layer lines and a semi-gloss finish. The background is a cluttered workshop with tools and spools of filament."),
];
