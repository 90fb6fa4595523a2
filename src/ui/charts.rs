//! Chart stack rendering and synchronization plumbing.
//!
//! Each frame: apply the patches queued for every chart, draw the charts,
//! collect at most one interaction event (range change wins over hover),
//! and feed it to the coordinator, which queues patches for the next frame.

use chrono::DateTime;
use egui::{Align2, Color32, Direction, Layout, RichText, Ui};
use egui_plot::{Legend, Line, PlotBounds, PlotPoints, Text, VLine};

use crate::axis::AxisDomain;
use crate::series::{BuiltChart, ChartSeries};
use crate::sync::{ChartPatch, SyncEvent, SyncPhase};

use super::{HoverMarker, PitviewApp};

const CHART_HEIGHT: f32 = 220.0;
const MARKER_COLOR: Color32 = Color32::from_gray(110);

fn series_color(channel: u32) -> Color32 {
    match channel {
        0 => Color32::RED,
        2 => Color32::from_rgb(0x1f, 0x77, 0xb4),
        3 => Color32::GREEN,
        4 => Color32::BLUE,
        5 => Color32::ORANGE,
        45 => Color32::from_rgb(128, 0, 128),
        _ => Color32::LIGHT_GRAY,
    }
}

fn format_reading(y: f64) -> String {
    if y.fract() == 0.0 {
        format!("{y:.0}")
    } else {
        format!("{y:.2}")
    }
}

fn format_x(x: f64, domain: AxisDomain) -> String {
    match domain {
        AxisDomain::Lap => format!("Lap {x:.0}"),
        AxisDomain::Time => DateTime::from_timestamp_millis(x as i64)
            .map(|t| t.format("%H:%M:%S%.3f").to_string())
            .unwrap_or_default(),
    }
}

fn axis_label(x: f64, domain: AxisDomain) -> String {
    match domain {
        AxisDomain::Lap => format!("{x:.0}"),
        AxisDomain::Time => DateTime::from_timestamp_millis(x as i64)
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_default(),
    }
}

/// Discrete channels hold their value until the next sample.
fn stepped_points(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut out = Vec::with_capacity(points.len() * 2);
    for window in points.windows(2) {
        out.push(window[0]);
        out.push([window[1][0], window[0][1]]);
    }
    if let Some(last) = points.last() {
        out.push(*last);
    }
    out
}

fn line_for(series: &ChartSeries, stepped: bool) -> Line<'static> {
    let points = if stepped {
        stepped_points(&series.points)
    } else {
        series.points.clone()
    };
    Line::new(series.name, PlotPoints::new(points)).color(series_color(series.channel))
}

fn marker_items(
    built: &BuiltChart,
    marker: &HoverMarker,
    domain: AxisDomain,
) -> (VLine, Vec<Text>) {
    let vline = VLine::new("hover-line", marker.x).color(MARKER_COLOR).width(1.0);
    let anchor = if marker.flip_left {
        Align2::RIGHT_BOTTOM
    } else {
        Align2::LEFT_BOTTOM
    };
    let labels = built
        .series
        .iter()
        .filter_map(|series| {
            // A series that dropped this sample contributes no label.
            let point = series.points.iter().find(|p| p[0] == marker.x)?;
            let label = format!(
                "{}: {} {}\n{}",
                series.name,
                format_reading(point[1]),
                series.unit,
                format_x(marker.x, domain)
            );
            Some(
                Text::new(
                    "hover-annotation",
                    egui_plot::PlotPoint::new(point[0], point[1]),
                    RichText::new(label).size(10.0).color(Color32::WHITE),
                )
                .anchor(anchor),
            )
        })
        .collect();
    (vline, labels)
}

impl PitviewApp {
    pub(crate) fn charts_view(&mut self, ui: &mut Ui) {
        let Some(view) = self.view.as_mut() else {
            return;
        };
        let domain = view.domain;

        let mut range_event: Option<SyncEvent> = None;
        let mut hover_x: Option<f64> = None;
        let mut any_hovered = false;

        for (index, chart) in view.charts.iter_mut().enumerate() {
            if !chart.built.has_data() {
                ui.allocate_ui(egui::vec2(ui.available_width(), 60.0), |ui| {
                    ui.with_layout(
                        Layout::centered_and_justified(Direction::TopDown),
                        |ui| {
                            ui.label(
                                RichText::new(format!(
                                    "No valid {} data for {}.",
                                    chart.built.kind.title(),
                                    view.driver_label
                                ))
                                .color(Color32::GRAY),
                            );
                        },
                    );
                });
                ui.separator();
                continue;
            }

            let patches: Vec<ChartPatch> = chart.pending.drain(..).collect();
            let mut set_range = None;
            let mut auto_range = false;
            for patch in &patches {
                match patch {
                    ChartPatch::SetRange { min, max } => set_range = Some((*min, *max)),
                    ChartPatch::AutoRange => auto_range = true,
                    ChartPatch::Marker { x, flip_left } => {
                        chart.marker = Some(HoverMarker {
                            x: *x,
                            flip_left: *flip_left,
                        })
                    }
                    ChartPatch::ClearMarker => chart.marker = None,
                }
            }

            let mut plot = egui_plot::Plot::new(("session-chart", index))
                .height(CHART_HEIGHT)
                .legend(Legend::default())
                .x_axis_formatter(move |mark, _range| axis_label(mark.value, domain));
            let fixed_y = chart.built.y_range;
            if let Some((min, max)) = fixed_y {
                plot = plot
                    .include_y(min)
                    .include_y(max)
                    .auto_bounds(egui::Vec2b::new(true, false));
            }

            let stepped = chart.built.kind.stepped();
            let built = &chart.built;
            let marker = &chart.marker;
            let response = plot.show(ui, |plot_ui| {
                if let Some((min, max)) = set_range {
                    let bounds = plot_ui.plot_bounds();
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                        [min, bounds.min()[1]],
                        [max, bounds.max()[1]],
                    ));
                }
                if auto_range {
                    plot_ui.set_auto_bounds(egui::Vec2b::new(true, fixed_y.is_none()));
                }
                for series in &built.series {
                    if !series.points.is_empty() {
                        plot_ui.line(line_for(series, stepped));
                    }
                }
                if let Some(marker) = marker {
                    let (vline, labels) = marker_items(built, marker, domain);
                    plot_ui.vline(vline);
                    for label in labels {
                        plot_ui.text(label);
                    }
                }
                plot_ui.pointer_coordinate()
            });

            let bounds = response.transform.bounds();
            let visible = (bounds.min()[0], bounds.max()[0]);
            view.coordinator.set_visible(index, visible);

            let patched = set_range.is_some() || auto_range;
            if response.response.double_clicked() {
                range_event = Some(SyncEvent::RangeChanged {
                    source: index,
                    range: None,
                });
            } else if !patched
                && chart.last_bounds.is_some_and(|b| b != visible)
                && (response.response.dragged() || response.response.hovered())
            {
                range_event = Some(SyncEvent::RangeChanged {
                    source: index,
                    range: Some(visible),
                });
            }
            chart.last_bounds = Some(visible);

            if response.response.hovered() {
                any_hovered = true;
                if let Some(pointer) = response.inner {
                    hover_x = Some(pointer.x);
                }
            }
            ui.separator();
        }

        let event = if let Some(event) = range_event {
            Some(event)
        } else if let Some(x) = hover_x {
            Some(SyncEvent::Hover { x })
        } else if !any_hovered && matches!(view.coordinator.phase(), SyncPhase::Hovering(_)) {
            Some(SyncEvent::Unhover)
        } else {
            None
        };
        if let Some(event) = event {
            for (target, patch) in view.coordinator.apply(domain, event) {
                view.charts[target].pending.push(patch);
            }
            ui.ctx().request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepped_points_hold_values_between_samples() {
        let points = vec![[0.0, 1.0], [2.0, 3.0], [4.0, 2.0]];
        assert_eq!(
            stepped_points(&points),
            vec![
                [0.0, 1.0],
                [2.0, 1.0],
                [2.0, 3.0],
                [4.0, 3.0],
                [4.0, 2.0],
            ]
        );
        assert!(stepped_points(&[]).is_empty());
        assert_eq!(stepped_points(&[[1.0, 1.0]]), vec![[1.0, 1.0]]);
    }

    #[test]
    fn readings_format_as_integers_when_whole() {
        assert_eq!(format_reading(280.0), "280");
        assert_eq!(format_reading(0.75), "0.75");
    }

    #[test]
    fn x_labels_follow_the_axis_domain() {
        assert_eq!(format_x(14.0, AxisDomain::Lap), "Lap 14");
        // 13:00:01.500 UTC on 2025-05-25.
        let ms = 1_748_178_001_500i64 as f64;
        assert!(format_x(ms, AxisDomain::Time).ends_with(".500"));
        assert_eq!(axis_label(14.0, AxisDomain::Lap), "14");
    }
}
