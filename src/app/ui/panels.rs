use eframe::egui::{self, Align, Context, Layout};

use super::super::{ClusterLensApp, Tab};

impl ClusterLensApp {
    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("cluster-lens");
                    ui.separator();
                    ui.selectable_value(&mut self.tab, Tab::Clusters, "Clusters");
                    ui.selectable_value(&mut self.tab, Tab::Projection, "Visualize");
                    ui.selectable_value(&mut self.tab, Tab::Search, "Search");
                    if self.open_doc_id.is_some() {
                        ui.selectable_value(&mut self.tab, Tab::Document, "Document");
                    }
                    ui.separator();
                    ui.label(format!("backend: {}", self.config.backend_url));
                    ui.label(format!("clusters: {}", self.store.clusters().len()));
                    ui.label(format!("documents: {}", self.store.document_count()));
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(operation) = self.workflow.pending() {
                            ui.label(format!("{}...", operation.label()));
                            ui.spinner();
                        }
                    });
                });
            });

        egui::SidePanel::left("cluster_controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| match self.tab {
            Tab::Clusters => self.draw_clusters(ui),
            Tab::Projection => self.draw_projection(ui),
            Tab::Search => self.draw_search(ui),
            Tab::Document => self.draw_document(ui),
        });
    }
}
