use egui::{Color32, Frame, Layout, RichText, Vec2b};
use egui_plot::{Corner, Legend, Line, Plot, PlotPoints};

use lifestream::{DocumentStore, Metric, charts::ChartSeries};

use super::{MonitorApp, PALETTE_BPM, PALETTE_GSR, PALETTE_TEMPERATURE, RecordingState};

const CONTROL_SPACING: f32 = 8.;

fn metric_color(metric: Metric) -> Color32 {
    match metric {
        Metric::Temperature => PALETTE_TEMPERATURE,
        Metric::Conductance => PALETTE_GSR,
        Metric::HeartRate => PALETTE_BPM,
    }
}

impl<S: DocumentStore> MonitorApp<S> {
    pub(crate) fn monitor_view(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("controls")
            .frame(Frame::new().inner_margin(CONTROL_SPACING))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Write username:");
                    if ui.text_edit_singleline(&mut self.username).changed() {
                        self.username_changed();
                    }

                    let record_label = match self.recording {
                        RecordingState::Idle => "Start Recording",
                        RecordingState::Recording => "Stop Recording",
                    };
                    if ui.button(record_label).clicked() {
                        self.toggle_recording();
                    }
                });
                ui.add_space(CONTROL_SPACING);
                ui.horizontal(|ui| {
                    if ui.button("Start BLE Communication").clicked() {
                        self.start_session();
                    }
                    if ui.button("Restart").clicked() {
                        self.reset();
                    }
                    ui.with_layout(Layout::right_to_left(egui::Align::Center), |ui| {
                        if let Some(latest) = self.samples.latest() {
                            ui.label(format!(
                                "{:.1} °C   GSR {:.0}   {:.0} BPM",
                                latest.temperature, latest.conductance, latest.heart_rate
                            ));
                        }
                    });
                });
                ui.add_space(CONTROL_SPACING);
                ui.vertical_centered(|ui| {
                    ui.label(RichText::new(&self.status).color(Color32::LIGHT_GRAY));
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let plot_height = (ui.available_height() / Metric::ALL.len() as f32) - CONTROL_SPACING;
            let last = self.charts.series.len() - 1;
            for (i, series) in self.charts.series.iter().enumerate() {
                chart(ui, series, plot_height, i == last);
            }
        });
    }
}

fn chart(ui: &mut egui::Ui, series: &ChartSeries, height: f32, show_x_label: bool) {
    let metric = series.metric;
    let mut plot = Plot::new(metric.name())
        .height(height)
        .legend(Legend::default().position(Corner::LeftTop))
        .y_axis_label(metric.axis_label())
        .link_axis("sensor-charts", Vec2b::new(true, false))
        .allow_scroll(false);
    if show_x_label {
        plot = plot.x_axis_label("Time");
    }
    if let Some((min, max)) = series.value_range {
        plot = plot.include_y(min).include_y(max);
    }

    plot.show(ui, |plot_ui| {
        plot_ui.line(
            Line::new(metric.name(), PlotPoints::new(series.points.clone()))
                .color(metric_color(metric)),
        );
    });
}
