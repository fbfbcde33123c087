//! Render-readiness: every font family referenced by text or caption overlays
//! must resolve in the font catalog before a project is handed to a renderer.
//! Run once on demand; catalog lookups are too slow to repeat on every edit.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{info, warn};

use crate::{Project, Result, TimelineError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FontEntry {
    pub family: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub weights: Vec<u16>,
}

/// Lookup of font families; `None` means not available.
pub trait FontCatalog {
    fn lookup(&self, family: &str) -> Option<FontEntry>;
}

/// Catalog held in memory, matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct MemoryFontCatalog {
    fonts: HashMap<String, FontEntry>,
}

impl MemoryFontCatalog {
    pub fn new(entries: impl IntoIterator<Item = FontEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            catalog.insert(entry);
        }
        catalog
    }

    pub fn insert(&mut self, entry: FontEntry) {
        self.fonts.insert(normalize(&entry.family), entry);
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

impl FontCatalog for MemoryFontCatalog {
    fn lookup(&self, family: &str) -> Option<FontEntry> {
        self.fonts.get(&normalize(family)).cloned()
    }
}

fn normalize(family: &str) -> String {
    family.trim().to_lowercase()
}

/// Distinct font families referenced by the project.
pub fn referenced_fonts(project: &Project) -> BTreeSet<String> {
    project
        .overlays()
        .filter_map(|o| o.font_family())
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Families the catalog cannot resolve; empty means render-ready.
pub fn unresolved_fonts(project: &Project, catalog: &impl FontCatalog) -> BTreeSet<String> {
    referenced_fonts(project)
        .into_iter()
        .filter(|family| catalog.lookup(family).is_none())
        .collect()
}

/// Project plus its resolved font table, as handed to the renderer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderRequest {
    pub project: Project,
    pub fonts: BTreeMap<String, FontEntry>,
}

/// Resolves every font or reports all missing families at once.
pub fn prepare_render(project: &Project, catalog: &impl FontCatalog) -> Result<RenderRequest> {
    project.validate()?;

    let mut fonts = BTreeMap::new();
    let mut missing = Vec::new();
    for family in referenced_fonts(project) {
        match catalog.lookup(&family) {
            Some(entry) => {
                fonts.insert(family, entry);
            }
            None => missing.push(family),
        }
    }

    if !missing.is_empty() {
        warn!(missing = ?missing, "project references unresolved fonts");
        return Err(TimelineError::UnresolvedAsset(missing));
    }

    info!(
        project = %project.name,
        tracks = project.tracks.len(),
        fonts = fonts.len(),
        "project is render-ready"
    );
    Ok(RenderRequest {
        project: project.clone(),
        fonts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CaptionWord, ErrorKind, Overlay, OverlayKind, TextStyle};

    fn font(family: &str) -> FontEntry {
        FontEntry {
            family: family.to_string(),
            source: None,
            weights: vec![400, 700],
        }
    }

    fn styled(family: &str) -> TextStyle {
        TextStyle {
            font_family: family.to_string(),
            ..TextStyle::default()
        }
    }

    fn project_with_fonts() -> Project {
        let mut project = Project::new("Fonts", 30, 300);
        let track = project.add_track("Text");
        let title = Overlay::new(
            track,
            0,
            30,
            OverlayKind::Text { content: "Title".into(), style: styled("Inter") },
        );
        let caption = Overlay::new(
            track,
            30,
            30,
            OverlayKind::Caption {
                words: vec![CaptionWord { text: "hi".into(), start_ms: 0, end_ms: 500 }],
                style: styled("Bebas Neue"),
            },
        );
        let other = Overlay::new(
            track,
            60,
            30,
            OverlayKind::Text { content: "Sub".into(), style: styled("Lobster") },
        );
        let image = Overlay::new(track, 90, 30, OverlayKind::Image { src: "logo.png".into() });
        project.tracks[0].overlays = vec![title, caption, other, image];
        project
    }

    #[test]
    fn test_referenced_fonts_are_distinct() {
        let mut project = project_with_fonts();
        let track = project.tracks[0].id;
        project.tracks[0].overlays.push(Overlay::new(
            track,
            120,
            30,
            OverlayKind::Text { content: "Again".into(), style: styled("Inter") },
        ));
        let fonts: Vec<String> = referenced_fonts(&project).into_iter().collect();
        assert_eq!(fonts, vec!["Bebas Neue", "Inter", "Lobster"]);
    }

    #[test]
    fn test_unresolved_reports_every_missing_family() {
        let project = project_with_fonts();
        let catalog = MemoryFontCatalog::new([font("inter")]);

        let missing: Vec<String> = unresolved_fonts(&project, &catalog).into_iter().collect();
        assert_eq!(missing, vec!["Bebas Neue", "Lobster"]);

        match prepare_render(&project, &catalog) {
            Err(TimelineError::UnresolvedAsset(list)) => assert_eq!(list.len(), 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_prepare_render_builds_font_table() {
        let project = project_with_fonts();
        let catalog = MemoryFontCatalog::new([font("Inter"), font("Bebas Neue"), font("Lobster")]);
        assert!(unresolved_fonts(&project, &catalog).is_empty());

        let request = prepare_render(&project, &catalog).unwrap();
        assert_eq!(request.fonts.len(), 3);
        assert_eq!(request.project, project);
    }

    #[test]
    fn test_project_without_text_is_ready_with_empty_catalog() {
        let mut project = Project::new("Silent", 30, 60);
        let track = project.add_track("V1");
        project.tracks[0]
            .overlays
            .push(Overlay::new(track, 0, 60, OverlayKind::Image { src: "a.png".into() }));
        let request = prepare_render(&project, &MemoryFontCatalog::default()).unwrap();
        assert!(request.fonts.is_empty());
    }

    #[test]
    fn test_prepare_render_rejects_invalid_project() {
        let mut project = project_with_fonts();
        project.duration_in_frames = 10;
        let catalog = MemoryFontCatalog::new([font("Inter"), font("Bebas Neue"), font("Lobster")]);
        let err = prepare_render(&project, &catalog).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
