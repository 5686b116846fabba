use eframe::egui::{self, RichText, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::store::Document;
use crate::util::excerpt;

use super::super::ClusterLensApp;

const EXCERPT_CHARS: usize = 140;

enum DocumentAction {
    View(String),
    Delete(String),
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

fn matches_filter(matcher: &SkimMatcherV2, document: &Document, query: &str) -> bool {
    query.is_empty() || fuzzy_match_score(matcher, &document.filename, query).is_some()
}

impl ClusterLensApp {
    pub(in crate::app) fn draw_clusters(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.label("Filter documents");
            ui.text_edit_singleline(&mut self.filter)
                .on_hover_text("Fuzzy match on file names inside the visible clusters.");
        });
        ui.separator();

        if self.store.clusters().is_empty() {
            ui.label(match self.store.lifecycle(crate::store::Operation::Load).failure() {
                Some(_) => "Clusters could not be loaded. Use Retry in the side panel.",
                None => "No clusters to show.",
            });
            return;
        }

        let busy = self.workflow.is_busy();
        let matcher = SkimMatcherV2::default();
        let query = self.filter.trim().to_owned();
        let mut action = None;

        egui::ScrollArea::vertical()
            .id_salt("cluster_documents")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for cluster in self.store.visible_clusters() {
                    ui.heading(format!("Cluster {}:", cluster.key));
                    if cluster.is_empty() {
                        ui.label("(no documents)");
                    }

                    let mut shown = 0usize;
                    for document in &cluster.documents {
                        if !matches_filter(&matcher, document, &query) {
                            continue;
                        }
                        shown += 1;

                        ui.horizontal(|ui| {
                            ui.label(RichText::new(format!("- {}", document.filename)).strong());
                            if ui.small_button("View").on_hover_text("View document").clicked() {
                                action = Some(DocumentAction::View(document.doc_id.clone()));
                            }
                            if ui
                                .add_enabled(!busy, egui::Button::new("Delete").small())
                                .clicked()
                            {
                                action = Some(DocumentAction::Delete(document.doc_id.clone()));
                            }
                        });
                        if !document.extracted_text.is_empty() {
                            ui.small(excerpt(&document.extracted_text, EXCERPT_CHARS));
                        }
                    }

                    if shown == 0 && !cluster.is_empty() {
                        ui.small("No documents in this cluster match the filter.");
                    }
                    ui.add_space(10.0);
                }
            });

        match action {
            Some(DocumentAction::View(doc_id)) => self.open_document(doc_id),
            Some(DocumentAction::Delete(doc_id)) => self.request_delete(doc_id),
            None => {}
        }
    }
}
