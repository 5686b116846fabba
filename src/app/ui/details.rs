use eframe::egui::{self, Color32, Key, RichText, Ui};

use crate::store::Lifecycle;
use crate::util::format_similarity;

use super::super::ClusterLensApp;

impl ClusterLensApp {
    pub(in crate::app) fn draw_search(&mut self, ui: &mut Ui) {
        let mut submit = false;
        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.search_query)
                    .hint_text("Search documents (e.g., 'financial summary')...")
                    .desired_width(420.0),
            );
            submit |= response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
            submit |= ui.button("Search").clicked();
        });
        if submit && !self.search_query.trim().is_empty() {
            self.run_search();
        }
        ui.separator();

        match self.search.lifecycle() {
            Lifecycle::Pending => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Searching documents...");
                });
                return;
            }
            Lifecycle::Failed(message) => {
                ui.colored_label(Color32::from_rgb(240, 120, 110), message.as_str());
                return;
            }
            Lifecycle::Idle => {}
        }

        let Some(results) = self.search.value() else {
            ui.label("Start typing to search through your documents.");
            return;
        };
        if results.is_empty() {
            ui.label("No documents matched your query. Try a broader search.");
            return;
        }

        ui.label(format!("Showing results for: {}", self.search_query.trim()));
        let mut open = None;
        egui::ScrollArea::vertical()
            .id_salt("search_results")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for hit in results {
                    ui.group(|ui| {
                        ui.horizontal(|ui| {
                            ui.label(RichText::new(&hit.filename).strong());
                            ui.label(format!("⭐ {}", format_similarity(hit.similarity)));
                        });
                        ui.label(&hit.snippet);
                        if ui.small_button("View").clicked() {
                            open = Some(hit.doc_id.clone());
                        }
                    });
                }
            });

        if let Some(doc_id) = open {
            self.open_document(doc_id);
        }
    }

    pub(in crate::app) fn draw_document(&mut self, ui: &mut Ui) {
        let Some(doc_id) = self.open_doc_id.clone() else {
            ui.label("Open a document from a cluster, the visualization or search results.");
            return;
        };

        match self.document.lifecycle() {
            Lifecycle::Pending => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading document...");
                });
            }
            Lifecycle::Failed(message) => {
                ui.colored_label(Color32::from_rgb(240, 120, 110), message.as_str());
                if ui.button("Retry").clicked() {
                    self.open_document(doc_id);
                }
            }
            Lifecycle::Idle => {
                let Some(document) = self.document.value() else {
                    return;
                };
                let title = if document.filename.is_empty() {
                    doc_id.as_str()
                } else {
                    document.filename.as_str()
                };
                ui.heading(title);
                ui.small(doc_id.as_str());
                ui.separator();
                egui::ScrollArea::vertical()
                    .id_salt("document_content")
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        ui.label(RichText::new(&document.content).monospace());
                    });
            }
        }
    }
}
