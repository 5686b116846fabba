use eframe::egui::{self, Color32, RichText, Ui};

use crate::store::{ClusterKey, Lifecycle, MAX_K, MIN_K, Operation};

use super::super::ClusterLensApp;

const ERROR_COLOR: Color32 = Color32::from_rgb(240, 120, 110);

enum Retry {
    Refresh,
    Recluster,
    Delete(String),
}

impl ClusterLensApp {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Clusters");
        ui.separator();

        let mut toggled: Option<ClusterKey> = None;
        egui::ScrollArea::vertical()
            .id_salt("cluster_list")
            .max_height(ui.available_height() * 0.55)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                if self.store.clusters().is_empty() {
                    ui.label("No clusters loaded yet.");
                }
                for cluster in self.store.clusters().clusters() {
                    let selected = self.store.selected() == Some(&cluster.key);
                    let label = format!("Cluster {} ({} docs)", cluster.key, cluster.len());
                    if ui.selectable_label(selected, label).clicked() {
                        toggled = Some(cluster.key.clone());
                    }
                }
            });
        if let Some(key) = toggled {
            self.store.select(&key);
        }

        if self.store.selected().is_some() {
            ui.small("Click the selected cluster again to show all.");
        }

        ui.separator();
        self.draw_recluster(ui);
        ui.separator();
        self.draw_status(ui);
    }

    fn draw_recluster(&mut self, ui: &mut Ui) {
        let busy = self.workflow.is_busy();

        ui.horizontal(|ui| {
            ui.label("Re-Cluster ( K =");
            let response = ui.add(
                egui::DragValue::new(&mut self.k_input)
                    .range(MIN_K as i64..=MAX_K as i64)
                    .speed(0.1),
            );
            if response.changed() {
                self.k_input = self.store.set_k(self.k_input) as i64;
            }
            ui.label("):");
        });

        let change = ui
            .add_enabled(!busy, egui::Button::new("Change"))
            .on_hover_text("Recompute clusters on the server with the chosen K.");
        if change.clicked() {
            self.request_recluster();
        }
    }

    fn draw_status(&mut self, ui: &mut Ui) {
        let mut retry = None;

        for operation in Operation::ALL {
            match self.store.lifecycle(operation) {
                Lifecycle::Idle => {}
                Lifecycle::Pending => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(format!("{}...", operation.label()));
                    });
                }
                Lifecycle::Failed(message) => {
                    ui.label(RichText::new(message).color(ERROR_COLOR));
                    let enabled = !self.workflow.is_busy();
                    if ui.add_enabled(enabled, egui::Button::new("Retry")).clicked() {
                        retry = Some(self.retry_for(operation));
                    }
                    ui.add_space(4.0);
                }
            }
        }

        if self.store.needs_refresh() {
            ui.label("The server has changes this view does not show yet.");
            if ui
                .add_enabled(!self.workflow.is_busy(), egui::Button::new("Refresh view"))
                .clicked()
            {
                retry = Some(Retry::Refresh);
            }
        }

        if let Some(notice) = &self.notice {
            ui.small(RichText::new(notice).color(ERROR_COLOR));
        }

        match retry {
            Some(Retry::Refresh) => self.refresh(),
            Some(Retry::Recluster) => self.request_recluster(),
            Some(Retry::Delete(doc_id)) => self.request_delete(doc_id),
            None => {}
        }
    }

    /// A failed refresh after a successful command is retried by refetching only.
    fn retry_for(&self, operation: Operation) -> Retry {
        if self.store.needs_refresh() {
            return Retry::Refresh;
        }
        match operation {
            Operation::Load => Retry::Refresh,
            Operation::Recluster => Retry::Recluster,
            Operation::Delete => self
                .last_delete
                .clone()
                .map(Retry::Delete)
                .unwrap_or(Retry::Refresh),
        }
    }
}
