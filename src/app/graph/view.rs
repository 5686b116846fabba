use eframe::egui::{self, Align2, Color32, Painter, Sense, Stroke, Ui, pos2};

use crate::projection::{Margins, RenderDescriptor, render};
use crate::store::Lifecycle;

use super::super::render_utils::{
    FOREGROUND, blend_color, draw_background, draw_label, draw_tooltip, grid_stroke,
};
use super::super::ClusterLensApp;

const TICK_SIZE: f32 = 5.0;

impl ClusterLensApp {
    pub(in crate::app) fn draw_projection(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.heading("Document Visualization");
            let pending = self.projection.lifecycle().is_pending();
            if ui.add_enabled(!pending, egui::Button::new("Reload")).clicked() {
                self.projection.fetch();
            }
            if pending {
                ui.spinner();
            }
            if let Lifecycle::Failed(message) = self.projection.lifecycle()
                && self.projection.points().is_some()
            {
                ui.colored_label(Color32::from_rgb(240, 120, 110), format!("Error: {message}"));
            }
        });
        ui.separator();

        let Some(points) = self.projection.points() else {
            ui.vertical_centered(|ui| {
                ui.add_space(120.0);
                match self.projection.lifecycle() {
                    Lifecycle::Failed(message) => {
                        ui.label(format!("Error: {message}"));
                    }
                    _ => {
                        ui.label("Loading visualization...");
                        ui.spinner();
                    }
                }
            });
            return;
        };

        if points.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(120.0);
                ui.label("No documents available for visualization");
            });
            return;
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click());
        let descriptor = render(points, rect, Margins::default());

        let layout_key = (self.projection.revision(), rect);
        if self.projection_view.layout_key != Some(layout_key) {
            self.projection_view.interaction.reset();
            self.projection_view.layout_key = Some(layout_key);
        }

        let intent = self.projection_view.interaction.track(
            &descriptor,
            response.hover_pos(),
            response.clicked_by(egui::PointerButton::Primary),
        );
        if self.projection_view.interaction.hovered().is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect);
        draw_axes(&painter, &descriptor);
        self.draw_points(&painter, &descriptor);
        draw_legend(&painter, &descriptor);
        if let Some(tooltip) = self.projection_view.interaction.tooltip(&descriptor) {
            draw_tooltip(&painter, &tooltip);
        }

        if let Some(intent) = intent {
            self.open_document(intent.doc_id);
        }
    }

    fn draw_points(&self, painter: &Painter, descriptor: &RenderDescriptor) {
        let interaction = &self.projection_view.interaction;
        let hovered = interaction.hovered();

        for (index, point) in descriptor.points.iter().enumerate() {
            if hovered == Some(index) {
                continue;
            }
            painter.circle(
                point.center,
                interaction.radius(index),
                point.color,
                Stroke::new(1.0, FOREGROUND),
            );
        }

        // Drawn last so it sits on top of its neighbours.
        if let Some(index) = hovered
            && let Some(point) = descriptor.points.get(index)
        {
            painter.circle(
                point.center,
                interaction.radius(index),
                blend_color(point.color, Color32::WHITE, 0.15),
                Stroke::new(1.5, FOREGROUND),
            );
        }
    }
}

fn draw_axes(painter: &Painter, descriptor: &RenderDescriptor) {
    let Some(axes) = &descriptor.axes else {
        return;
    };
    let plot = descriptor.plot_rect();
    let canvas = descriptor.canvas;

    for tick in &axes.x.ticks {
        painter.line_segment(
            [pos2(tick.position, plot.top()), pos2(tick.position, plot.bottom())],
            grid_stroke(),
        );
        painter.line_segment(
            [
                pos2(tick.position, plot.bottom()),
                pos2(tick.position, plot.bottom() + TICK_SIZE),
            ],
            Stroke::new(1.0, FOREGROUND),
        );
        draw_label(
            painter,
            pos2(tick.position, plot.bottom() + TICK_SIZE + 4.0),
            Align2::CENTER_TOP,
            &tick.label,
            11.0,
        );
    }

    for tick in &axes.y.ticks {
        painter.line_segment(
            [pos2(plot.left(), tick.position), pos2(plot.right(), tick.position)],
            grid_stroke(),
        );
        painter.line_segment(
            [
                pos2(plot.left() - TICK_SIZE, tick.position),
                pos2(plot.left(), tick.position),
            ],
            Stroke::new(1.0, FOREGROUND),
        );
        draw_label(
            painter,
            pos2(plot.left() - TICK_SIZE - 4.0, tick.position),
            Align2::RIGHT_CENTER,
            &tick.label,
            11.0,
        );
    }

    painter.line_segment(
        [plot.left_bottom(), plot.right_bottom()],
        Stroke::new(2.0, FOREGROUND),
    );
    painter.line_segment([plot.left_top(), plot.left_bottom()], Stroke::new(1.0, FOREGROUND));

    draw_label(
        painter,
        pos2(canvas.center().x, canvas.bottom() - descriptor.margins.bottom / 4.0),
        Align2::CENTER_BOTTOM,
        axes.x.title,
        14.0,
    );
    draw_label(
        painter,
        pos2(canvas.left() + descriptor.margins.left / 3.0, plot.top() - 24.0),
        Align2::LEFT_BOTTOM,
        axes.y.title,
        14.0,
    );
}

fn draw_legend(painter: &Painter, descriptor: &RenderDescriptor) {
    for entry in &descriptor.legend {
        painter.circle_filled(entry.position, 6.0, entry.color);
        draw_label(
            painter,
            entry.position + egui::vec2(15.0, 0.0),
            Align2::LEFT_CENTER,
            &entry.text,
            13.0,
        );
    }
}
