use eframe::egui::{Align2, Color32, FontId, Painter, Rect, Stroke, vec2};

use crate::interaction::Tooltip;

pub(super) const BACKGROUND: Color32 = Color32::from_rgb(0x1f, 0x1f, 0x1f);
pub(super) const FOREGROUND: Color32 = Color32::WHITE;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, BACKGROUND);
}

pub(super) fn grid_stroke() -> Stroke {
    Stroke::new(1.0, Color32::from_rgba_unmultiplied(255, 255, 255, 26))
}

pub(super) fn draw_tooltip(painter: &Painter, tooltip: &Tooltip) {
    let font = FontId::proportional(13.0);
    let galley = painter.layout_no_wrap(tooltip.text.clone(), font, FOREGROUND);
    let padding = vec2(8.0, 6.0);
    let mut frame = Rect::from_min_size(tooltip.anchor, galley.size() + padding * 2.0);

    let clip = painter.clip_rect();
    if frame.right() > clip.right() {
        frame = frame.translate(vec2(clip.right() - frame.right(), 0.0));
    }
    if frame.top() < clip.top() {
        frame = frame.translate(vec2(0.0, clip.top() - frame.top()));
    }

    painter.rect_filled(frame, 4.0, Color32::from_rgba_unmultiplied(20, 20, 20, 235));
    painter.rect_stroke(
        frame,
        4.0,
        Stroke::new(1.0, Color32::from_gray(120)),
        eframe::egui::StrokeKind::Inside,
    );
    painter.galley(frame.min + padding, galley, FOREGROUND);
}

pub(super) fn draw_label(painter: &Painter, pos: eframe::egui::Pos2, anchor: Align2, text: &str, size: f32) {
    painter.text(pos, anchor, text, FontId::proportional(size), FOREGROUND);
}
