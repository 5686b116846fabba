use std::collections::BTreeMap;

use eframe::egui::Color32;

use super::ClusterLabel;

/// d3 `schemeCategory10`.
pub const CATEGORY10: [Color32; 10] = [
    Color32::from_rgb(0x1f, 0x77, 0xb4),
    Color32::from_rgb(0xff, 0x7f, 0x0e),
    Color32::from_rgb(0x2c, 0xa0, 0x2c),
    Color32::from_rgb(0xd6, 0x27, 0x28),
    Color32::from_rgb(0x94, 0x67, 0xbd),
    Color32::from_rgb(0x8c, 0x56, 0x4b),
    Color32::from_rgb(0xe3, 0x77, 0xc2),
    Color32::from_rgb(0x7f, 0x7f, 0x7f),
    Color32::from_rgb(0xbc, 0xbd, 0x22),
    Color32::from_rgb(0x17, 0xbe, 0xcf),
];

/// Label to color assignment for one render pass.
///
/// Palette entries are handed out in ascending label order, so labels `0..n`
/// keep the colors they would get from plain palette indexing while gaps and
/// text labels still get distinct entries until the palette wraps.
#[derive(Clone, Debug, Default)]
pub struct LabelColors {
    colors: BTreeMap<ClusterLabel, Color32>,
}

impl LabelColors {
    pub fn assign<'a>(labels: impl IntoIterator<Item = &'a ClusterLabel>) -> Self {
        let mut colors = BTreeMap::new();
        for label in labels {
            colors.entry(label.clone()).or_insert(Color32::TRANSPARENT);
        }
        for (index, color) in colors.values_mut().enumerate() {
            *color = CATEGORY10[index % CATEGORY10.len()];
        }
        Self { colors }
    }

    pub fn color(&self, label: &ClusterLabel) -> Color32 {
        self.colors
            .get(label)
            .copied()
            .unwrap_or(Color32::GRAY)
    }

    /// Distinct labels in ascending order with their colors.
    pub fn entries(&self) -> impl Iterator<Item = (&ClusterLabel, Color32)> {
        self.colors.iter().map(|(label, color)| (label, *color))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }
}
