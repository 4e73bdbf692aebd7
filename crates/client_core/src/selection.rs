//! Rectangle selection over a displayed scene image, used to scope a
//! natural-language edit instruction. Only the instruction text is ever sent;
//! the rectangle itself stays local.

use shared::domain::SelectionBox;

/// Boxes this wide or narrower are treated as accidental clicks.
pub const MIN_SELECTION_EXTENT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorPhase {
    Idle,
    Armed,
    Dragging,
    BoxReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub scene_index: usize,
    pub instruction: String,
}

#[derive(Debug, Clone, Default)]
pub struct EditRegionSelector {
    editing_index: Option<usize>,
    selection: Option<SelectionBox>,
    drag_start: Option<Point>,
    instruction: String,
}

impl EditRegionSelector {
    pub fn editing_index(&self) -> Option<usize> {
        self.editing_index
    }

    pub fn selection(&self) -> Option<SelectionBox> {
        self.selection
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_start.is_some()
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn set_instruction(&mut self, text: impl Into<String>) {
        self.instruction = text.into();
    }

    pub fn phase(&self) -> EditorPhase {
        match (self.editing_index, self.selection, self.drag_start) {
            (None, _, _) => EditorPhase::Idle,
            (Some(_), _, Some(_)) => EditorPhase::Dragging,
            (Some(_), Some(b), None) if b.width > MIN_SELECTION_EXTENT && b.height > 0.0 => {
                EditorPhase::BoxReady
            }
            (Some(_), _, None) => EditorPhase::Armed,
        }
    }

    /// Arms editing on `index`, or leaves editing when `index` is already armed.
    pub fn toggle_editing(&mut self, index: usize) {
        if self.editing_index == Some(index) {
            self.editing_index = None;
        } else {
            self.editing_index = Some(index);
        }
        self.selection = None;
        self.drag_start = None;
    }

    /// Starts a zero-size box. Ignored unless editing is armed on `index`.
    pub fn pointer_down(&mut self, index: usize, at: Point) -> bool {
        if self.editing_index != Some(index) {
            return false;
        }
        self.drag_start = Some(at);
        self.selection = Some(SelectionBox {
            start_x: at.x,
            start_y: at.y,
            width: 0.0,
            height: 0.0,
        });
        true
    }

    pub fn pointer_move(&mut self, at: Point) {
        let Some(start) = self.drag_start else {
            return;
        };
        self.selection = Some(SelectionBox {
            start_x: at.x.min(start.x),
            start_y: at.y.min(start.y),
            width: (at.x - start.x).abs(),
            height: (at.y - start.y).abs(),
        });
    }

    pub fn pointer_up(&mut self) {
        self.drag_start = None;
    }

    /// First press drops the box, a second press leaves editing.
    pub fn escape(&mut self) {
        if self.selection.is_some() {
            self.selection = None;
            self.drag_start = None;
        } else if self.editing_index.is_some() {
            self.exit();
        }
    }

    /// A press outside the image exits editing unless it landed on an element
    /// marked exempt, such as the toggle button itself.
    pub fn click_outside(&mut self, inside_image: bool, exempt: bool) {
        if self.editing_index.is_some() && !inside_image && !exempt {
            self.exit();
        }
    }

    pub fn edit_request(&self) -> Option<EditRequest> {
        if self.phase() != EditorPhase::BoxReady || self.instruction.trim().is_empty() {
            return None;
        }
        Some(EditRequest {
            scene_index: self.editing_index?,
            instruction: self.instruction.clone(),
        })
    }

    /// Back to idle after a successful edit; box and instruction are cleared.
    pub fn finish(&mut self) {
        self.exit();
        self.instruction.clear();
    }

    /// Keeps the editing index aligned after the scene at `removed` is deleted.
    pub fn on_scene_removed(&mut self, removed: usize) {
        match self.editing_index {
            Some(index) if index == removed => self.exit(),
            Some(index) if index > removed => self.editing_index = Some(index - 1),
            _ => {}
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn exit(&mut self) {
        self.editing_index = None;
        self.selection = None;
        self.drag_start = None;
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
