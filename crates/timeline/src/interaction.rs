//! Short-lived interaction state: selection, pointer drags and the persisted
//! timeline panel height. None of it belongs to the project snapshot; callers
//! own these values and pass them around explicitly.
use std::collections::{BTreeSet, HashMap};

use crate::{EditCommand, Frame, Overlay, OverlayId, TimelineScale, TrackId};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionSet {
    selected: BTreeSet<OverlayId>,
    /// Primary selection (for operations requiring a single target)
    primary: Option<OverlayId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a single overlay, clearing previous selection
    pub fn select_single(&mut self, id: OverlayId) {
        self.selected.clear();
        self.selected.insert(id);
        self.primary = Some(id);
    }

    /// Add overlay to selection (Shift-click)
    pub fn add(&mut self, id: OverlayId) {
        self.selected.insert(id);
        if self.primary.is_none() {
            self.primary = Some(id);
        }
    }

    pub fn remove(&mut self, id: OverlayId) {
        self.selected.remove(&id);
        if self.primary == Some(id) {
            self.primary = self.selected.iter().next().copied();
        }
    }

    pub fn toggle(&mut self, id: OverlayId) {
        if self.selected.contains(&id) {
            self.remove(id);
        } else {
            self.add(id);
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.primary = None;
    }

    pub fn select_all(&mut self, ids: impl IntoIterator<Item = OverlayId>) {
        self.selected = ids.into_iter().collect();
        self.primary = self.selected.iter().next().copied();
    }

    /// Forget ids that no longer exist after an edit.
    pub fn retain_existing(&mut self, exists: impl Fn(OverlayId) -> bool) {
        self.selected.retain(|id| exists(*id));
        if self.primary.map_or(false, |id| !self.selected.contains(&id)) {
            self.primary = self.selected.iter().next().copied();
        }
    }

    pub fn contains(&self, id: OverlayId) -> bool {
        self.selected.contains(&id)
    }

    pub fn primary(&self) -> Option<OverlayId> {
        self.primary
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn ids(&self) -> Vec<OverlayId> {
        self.selected.iter().copied().collect()
    }

    pub fn duplicate_command(&self) -> Option<EditCommand> {
        (!self.is_empty()).then(|| EditCommand::Duplicate {
            overlay_ids: self.ids(),
        })
    }

    pub fn delete_command(&self) -> Option<EditCommand> {
        (!self.is_empty()).then(|| EditCommand::Delete {
            overlay_ids: self.ids(),
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DragMode {
    Move,
    TrimStart,
    TrimEnd,
}

/// Baseline captured when a drag starts. Every pointer update is resolved
/// against it, never against the previous update, so dropped events do not
/// accumulate error.
#[derive(Clone, Debug, PartialEq)]
pub struct DragSession {
    pub mode: DragMode,
    pub overlay_id: OverlayId,
    pub start_pointer_x: f64,
    pub orig_track: TrackId,
    pub orig_start: Frame,
    pub orig_duration: Frame,
}

impl DragSession {
    pub fn begin(mode: DragMode, overlay: &Overlay, pointer_x: f64) -> Self {
        Self {
            mode,
            overlay_id: overlay.id,
            start_pointer_x: pointer_x,
            orig_track: overlay.track_id,
            orig_start: overlay.start,
            orig_duration: overlay.duration_in_frames,
        }
    }

    /// Command for the pointer at `pointer_x` (and over `track`, for moves).
    pub fn command_at(
        &self,
        pointer_x: f64,
        track: Option<TrackId>,
        scale: &TimelineScale,
        fps: u32,
    ) -> EditCommand {
        let df = scale.px_delta_to_frames(pointer_x - self.start_pointer_x, fps);
        let orig_end = self.orig_start + self.orig_duration;
        match self.mode {
            DragMode::Move => EditCommand::Move {
                overlay_id: self.overlay_id,
                start: (self.orig_start + df).max(0),
                track_id: track.unwrap_or(self.orig_track),
            },
            DragMode::TrimStart => EditCommand::Resize {
                overlay_id: self.overlay_id,
                start: (self.orig_start + df).clamp(0, orig_end - 1),
                end: orig_end,
            },
            DragMode::TrimEnd => EditCommand::Resize {
                overlay_id: self.overlay_id,
                start: self.orig_start,
                end: (orig_end + df).max(self.orig_start + 1),
            },
        }
    }
}

/// What a click on an overlay means for the current tool.
#[derive(Clone, Debug, PartialEq)]
pub enum ClickAction {
    Select(OverlayId),
    Edit(EditCommand),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GestureRouting {
    pub splitting_enabled: bool,
}

impl GestureRouting {
    pub fn route_click(&self, overlay: &Overlay, frame: Frame) -> ClickAction {
        if self.splitting_enabled && frame > overlay.start && frame < overlay.end() {
            ClickAction::Edit(EditCommand::Split {
                overlay_id: overlay.id,
                frame,
            })
        } else {
            ClickAction::Select(overlay.id)
        }
    }
}

/// Key/value storage for UI preferences.
pub trait PreferenceStore {
    fn load(&self, key: &str) -> Option<f64>;
    fn save(&mut self, key: &str, value: f64);
}

#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    values: HashMap<String, f64>,
}

impl PreferenceStore for MemoryPreferences {
    fn load(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    fn save(&mut self, key: &str, value: f64) {
        self.values.insert(key.to_string(), value);
    }
}

pub const PANEL_HEIGHT_KEY: &str = "timeline.panel_height";

/// Height of the timeline panel, kept within `[min, max]`.
///
/// The maximum follows the content (e.g. track count) and may shrink after
/// load; the stored height is then pulled down to fit, but a later larger
/// maximum never pushes it back up.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelHeight {
    value: f64,
    min: f64,
    max: f64,
    drag: Option<(f64, f64)>, // (pointer y, height) at drag start
}

impl PanelHeight {
    pub fn load(store: &impl PreferenceStore, default: f64, min: f64, max: f64) -> Self {
        let max = max.max(min);
        let value = store.load(PANEL_HEIGHT_KEY).unwrap_or(default);
        Self {
            value: value.clamp(min, max),
            min,
            max,
            drag: None,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Applies a new maximum. A height pulled down to fit is saved right away
    /// so the next load does not bring back the old value.
    pub fn set_max(&mut self, max: f64, store: &mut impl PreferenceStore) {
        self.max = max.max(self.min);
        if self.value > self.max {
            self.value = self.max;
            store.save(PANEL_HEIGHT_KEY, self.value);
        }
    }

    pub fn begin_drag(&mut self, pointer_y: f64) {
        self.drag = Some((pointer_y, self.value));
    }

    /// Dragging up grows the panel.
    pub fn drag_to(&mut self, pointer_y: f64) -> f64 {
        if let Some((start_y, start_height)) = self.drag {
            self.value = (start_height + (start_y - pointer_y)).clamp(self.min, self.max);
        }
        self.value
    }

    /// Finishes a drag and persists the settled height.
    pub fn end_drag(&mut self, store: &mut impl PreferenceStore) -> f64 {
        if self.drag.take().is_some() {
            store.save(PANEL_HEIGHT_KEY, self.value);
        }
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OverlayKind, TextStyle};

    fn overlay(start: Frame, duration: Frame) -> Overlay {
        Overlay::new(
            TrackId::new(),
            start,
            duration,
            OverlayKind::Text {
                content: "x".into(),
                style: TextStyle::default(),
            },
        )
    }

    #[test]
    fn test_selection_primary_follows_changes() {
        let (a, b) = (OverlayId::new(), OverlayId::new());
        let mut selection = SelectionSet::new();
        selection.select_single(a);
        selection.add(b);
        assert_eq!(selection.primary(), Some(a));
        selection.toggle(a);
        assert_eq!(selection.primary(), Some(b));
        assert_eq!(selection.len(), 1);

        selection.retain_existing(|id| id != b);
        assert!(selection.is_empty());
        assert_eq!(selection.primary(), None);
        assert_eq!(selection.delete_command(), None);
    }

    #[test]
    fn test_selection_builds_group_commands() {
        let ids = [OverlayId::new(), OverlayId::new()];
        let mut selection = SelectionSet::new();
        selection.select_all(ids);
        match selection.duplicate_command() {
            Some(EditCommand::Duplicate { overlay_ids }) => assert_eq!(overlay_ids.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_drag_is_absolute_from_baseline() {
        // 100 px/s at 25 fps is 4 px per frame
        let scale = TimelineScale::default();
        let item = overlay(50, 20);
        let drag = DragSession::begin(DragMode::Move, &item, 400.0);

        // intermediate events can be skipped: only the baseline matters
        let first = drag.command_at(420.0, None, &scale, 25);
        let again = drag.command_at(420.0, None, &scale, 25);
        assert_eq!(first, again);
        assert_eq!(
            first,
            EditCommand::Move { overlay_id: item.id, start: 55, track_id: item.track_id }
        );
        match drag.command_at(0.0, None, &scale, 25) {
            EditCommand::Move { start, .. } => assert_eq!(start, 0),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_trim_drags_keep_one_frame() {
        let scale = TimelineScale::default();
        let item = overlay(50, 20);

        let trim_start = DragSession::begin(DragMode::TrimStart, &item, 0.0);
        assert_eq!(
            trim_start.command_at(1000.0, None, &scale, 25),
            EditCommand::Resize { overlay_id: item.id, start: 69, end: 70 }
        );

        let trim_end = DragSession::begin(DragMode::TrimEnd, &item, 0.0);
        assert_eq!(
            trim_end.command_at(-1000.0, None, &scale, 25),
            EditCommand::Resize { overlay_id: item.id, start: 50, end: 51 }
        );
        assert_eq!(
            trim_end.command_at(40.0, None, &scale, 25),
            EditCommand::Resize { overlay_id: item.id, start: 50, end: 80 }
        );
    }

    #[test]
    fn test_click_routing_depends_on_split_toggle() {
        let item = overlay(10, 30);
        let select = GestureRouting::default();
        assert_eq!(select.route_click(&item, 20), ClickAction::Select(item.id));

        let split = GestureRouting { splitting_enabled: true };
        assert_eq!(
            split.route_click(&item, 20),
            ClickAction::Edit(EditCommand::Split { overlay_id: item.id, frame: 20 })
        );
        // on an edge there is nothing to split
        assert_eq!(split.route_click(&item, 10), ClickAction::Select(item.id));
    }

    #[test]
    fn test_panel_height_clamps_down_only() {
        let mut store = MemoryPreferences::default();
        store.save(PANEL_HEIGHT_KEY, 500.0);

        let mut panel = PanelHeight::load(&store, 240.0, 120.0, 600.0);
        assert_eq!(panel.value(), 500.0);

        panel.set_max(300.0, &mut store);
        assert_eq!(panel.value(), 300.0);
        assert_eq!(store.load(PANEL_HEIGHT_KEY), Some(300.0));
        panel.set_max(800.0, &mut store);
        assert_eq!(panel.value(), 300.0);
        assert_eq!(store.load(PANEL_HEIGHT_KEY), Some(300.0));

        let reloaded = PanelHeight::load(&store, 240.0, 120.0, 600.0);
        assert_eq!(reloaded.value(), 300.0);
    }

    #[test]
    fn test_panel_drag_persists_on_release() {
        let mut store = MemoryPreferences::default();
        let mut panel = PanelHeight::load(&store, 240.0, 120.0, 600.0);
        assert_eq!(panel.value(), 240.0);

        panel.begin_drag(700.0);
        panel.drag_to(650.0);
        assert_eq!(store.load(PANEL_HEIGHT_KEY), None);
        assert_eq!(panel.drag_to(600.0), 340.0);
        assert_eq!(panel.drag_to(-1000.0), 600.0);
        assert_eq!(panel.drag_to(900.0), 120.0);
        panel.end_drag(&mut store);
        assert_eq!(store.load(PANEL_HEIGHT_KEY), Some(120.0));
    }
}
