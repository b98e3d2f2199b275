use crate::cloud::UNLABELED;
use crate::persistence::ImportError;
use crate::selection::SelectionEngine;

/// Display color for unlabeled points.
pub const NEUTRAL_COLOR: [f32; 3] = [0.70, 0.75, 0.82];

/// Hue step between generated palette entries. The golden-angle increment
/// keeps consecutive labels maximally spread around the hue wheel.
const GOLDEN_ANGLE_DEGREES: f32 = 137.508;
const GENERATED_SATURATION: f32 = 0.9;
const GENERATED_LIGHTNESS: f32 = 0.55;

/// Append-only label→color mapping. Entry `i` is the color of label `i`;
/// entries are never removed or reordered, so label identity stays positional
/// across a session and across persisted files.
pub struct Palette {
    colors: Vec<[f32; 3]>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.4, 1.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 1.0],
                [1.0, 0.0, 1.0],
                [1.0, 0.5, 0.0],
                [0.6, 0.0, 1.0],
                [0.5, 0.5, 0.5],
                [1.0, 1.0, 1.0],
            ],
        }
    }
}

impl Palette {
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    /// Display color for a label: `colors[label mod len]` for real labels,
    /// the neutral color for the unlabeled sentinel.
    pub fn color_for(&self, label: i32) -> [f32; 3] {
        if label >= 0 && !self.colors.is_empty() {
            self.colors[label as usize % self.colors.len()]
        } else {
            NEUTRAL_COLOR
        }
    }

    /// Append one deterministically generated vivid color and return its
    /// label index.
    pub fn push_generated(&mut self) -> usize {
        let index = self.colors.len();
        self.colors.push(generate_vivid_color(index));
        index
    }

    /// Grow the palette until `label` has its own entry. Colors are
    /// generated, never requested from the operator, and existing entries
    /// are untouched; calling this with an already-covered label is a no-op.
    pub fn ensure_label(&mut self, label: i32) {
        if label < 0 {
            return;
        }
        while (label as usize) >= self.colors.len() {
            self.push_generated();
        }
    }
}

/// Hue-rotated vivid color for generated palette entry `index`.
fn generate_vivid_color(index: usize) -> [f32; 3] {
    let hue = (index as f32 * GOLDEN_ANGLE_DEGREES) % 360.0;
    hsl_to_rgb(hue, GENERATED_SATURATION, GENERATED_LIGHTNESS)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;
    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}

/// Owner of per-point labels and the persistent display colors derived from
/// them. All mutation funnels through the operations below so the
/// label↔color invariant (`color[j] == palette.color_for(label[j])`) is
/// enforced in one place; the transient selection highlight is composed on
/// top at buffer-write time and never stored here.
pub struct LabelStore {
    labels: Vec<i32>,
    colors: Vec<[f32; 3]>,
}

impl LabelStore {
    /// Fresh store with every point unlabeled.
    pub fn new(point_count: usize) -> Self {
        Self {
            labels: vec![UNLABELED; point_count],
            colors: vec![NEUTRAL_COLOR; point_count],
        }
    }

    /// Rebuild a store from previously persisted labels.
    pub fn from_labels(labels: Vec<i32>, palette: &Palette) -> Self {
        let colors = labels.iter().map(|&l| palette.color_for(l)).collect();
        Self { labels, colors }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, j: u32) -> i32 {
        self.labels[j as usize]
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Persistent per-point colors, highlight not applied.
    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    /// Assign `label` to every selected point, growing the palette first if
    /// the label has no entry yet. Consumes the selection: assignment is the
    /// end of the staging cycle, so the set is cleared afterwards. Returns
    /// the number of points written; the caller is responsible for
    /// persisting the result.
    pub fn assign(
        &mut self,
        selection: &mut SelectionEngine,
        label: i32,
        palette: &mut Palette,
    ) -> usize {
        palette.ensure_label(label);
        let color = palette.color_for(label);
        let mut written = 0;
        for j in selection.iter() {
            if let Some(slot) = self.labels.get_mut(j as usize) {
                *slot = label;
                self.colors[j as usize] = color;
                written += 1;
            }
        }
        selection.clear();
        written
    }

    /// Single-point write for the live brush stream. The caller ensures the
    /// palette covers `label` once per stroke rather than per point.
    pub fn paint(&mut self, j: u32, label: i32, palette: &Palette) {
        if let Some(slot) = self.labels.get_mut(j as usize) {
            *slot = label;
            self.colors[j as usize] = palette.color_for(label);
        }
    }

    /// Return every point to the unlabeled sentinel. Destructive and
    /// unrecoverable within the session; confirmation is the UI's concern.
    pub fn reset(&mut self) {
        self.labels.fill(UNLABELED);
        self.colors.fill(NEUTRAL_COLOR);
    }

    /// Snapshot of the label array in point order, for persistence.
    pub fn export(&self) -> Vec<i32> {
        self.labels.clone()
    }

    /// Replace all labels from a persisted array. Rejects (leaving the
    /// store untouched) any array whose length does not match the point
    /// count.
    pub fn import(&mut self, labels: &[i32], palette: &Palette) -> Result<(), ImportError> {
        if labels.len() != self.labels.len() {
            return Err(ImportError::LengthMismatch {
                expected: self.labels.len(),
                got: labels.len(),
            });
        }
        self.labels.copy_from_slice(labels);
        for (color, &label) in self.colors.iter_mut().zip(labels) {
            *color = palette.color_for(label);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectMode;

    #[test]
    fn palette_growth_is_monotonic_and_stable() {
        let mut palette = Palette::default();
        let seed: Vec<[f32; 3]> = palette.colors().to_vec();

        palette.ensure_label(14);
        assert_eq!(palette.len(), 15);
        assert_eq!(&palette.colors()[..seed.len()], &seed[..]);

        // Already covered: no-op.
        palette.ensure_label(14);
        palette.ensure_label(3);
        assert_eq!(palette.len(), 15);
    }

    #[test]
    fn generated_colors_are_deterministic() {
        let mut a = Palette::default();
        let mut b = Palette::default();
        a.ensure_label(20);
        b.ensure_label(20);
        assert_eq!(a.colors(), b.colors());
    }

    #[test]
    fn color_for_wraps_and_handles_sentinel() {
        let palette = Palette::default();
        assert_eq!(palette.color_for(0), palette.color_for(10));
        assert_eq!(palette.color_for(UNLABELED), NEUTRAL_COLOR);
    }

    #[test]
    fn assign_consumes_selection_and_keeps_colors_consistent() {
        let mut palette = Palette::default();
        let mut store = LabelStore::new(5);
        let mut selection = SelectionEngine::new();
        selection.toggle(SelectMode::Add, 1);
        selection.toggle(SelectMode::Add, 3);

        let written = store.assign(&mut selection, 2, &mut palette);
        assert_eq!(written, 2);
        assert!(selection.is_empty());
        assert_eq!(store.label(1), 2);
        assert_eq!(store.label(0), UNLABELED);

        for (&label, &color) in store.labels().iter().zip(store.colors()) {
            assert_eq!(color, palette.color_for(label));
        }
    }

    #[test]
    fn reset_returns_everything_to_neutral() {
        let mut palette = Palette::default();
        let mut store = LabelStore::new(3);
        let mut selection = SelectionEngine::new();
        selection.toggle(SelectMode::Add, 0);
        store.assign(&mut selection, 7, &mut palette);

        store.reset();
        assert!(store.labels().iter().all(|&l| l == UNLABELED));
        assert!(store.colors().iter().all(|&c| c == NEUTRAL_COLOR));
    }

    #[test]
    fn import_rejects_length_mismatch_without_corruption() {
        let palette = Palette::default();
        let mut store = LabelStore::from_labels(vec![0, 1, 2], &palette);
        assert_eq!(
            store.import(&[1, 2], &palette),
            Err(ImportError::LengthMismatch { expected: 3, got: 2 })
        );
        assert_eq!(store.labels(), &[0, 1, 2]);

        store.import(&[2, 2, UNLABELED], &palette).unwrap();
        assert_eq!(store.labels(), &[2, 2, UNLABELED]);
        assert_eq!(store.colors()[2], NEUTRAL_COLOR);
    }
}
