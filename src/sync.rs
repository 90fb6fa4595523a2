//! Cross-chart synchronization.
//!
//! Charts drop different samples per channel, so their x domains are not
//! identical; each chart keeps its own x sequence for hover lookup. The
//! coordinator is a pure function from (chart states, event) to per-chart
//! patches; the rendering layer applies them. No timers, no I/O.

use crate::axis::AxisDomain;

/// What the coordinator needs to know about one rendered chart.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartSyncState {
    /// The exact x sequence used to build the chart's series.
    pub xs: Vec<f64>,
    /// The chart's currently visible x range, used to place annotations.
    pub visible: (f64, f64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    /// A chart's x range changed; `range` is None when the master cleared
    /// back to auto-range.
    RangeChanged {
        source: usize,
        range: Option<(f64, f64)>,
    },
    Hover { x: f64 },
    Unhover,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChartPatch {
    SetRange { min: f64, max: f64 },
    AutoRange,
    /// Draw the synchronized marker at `x` (this chart's nearest sample).
    /// `flip_left` moves the annotation to the left of the marker when the
    /// hover sits in the right quarter of the visible range.
    Marker { x: f64, flip_left: bool },
    ClearMarker,
}

/// The ongoing interactive state: idle, hovering at an x value, or zoomed
/// to a range. Transitions are driven purely by chart events.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SyncPhase {
    #[default]
    Idle,
    Hovering(f64),
    Zoomed((f64, f64)),
}

/// Nearest sample by linear scan; ties keep the first match. In the lap
/// domain an exact hit short-circuits the scan.
pub fn nearest_x(xs: &[f64], target: f64, domain: AxisDomain) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for x in xs {
        if domain == AxisDomain::Lap && *x == target {
            return Some(*x);
        }
        let diff = (x - target).abs();
        if best.is_none_or(|(best_diff, _)| diff < best_diff) {
            best = Some((diff, *x));
        }
    }
    best.map(|(_, x)| x)
}

const ANNOTATION_FLIP_FRACTION: f64 = 0.75;

fn flip_left(hover_x: f64, visible: (f64, f64)) -> bool {
    let (start, end) = visible;
    let span = end - start;
    span > 0.0 && (hover_x - start) / span > ANNOTATION_FLIP_FRACTION
}

/// Computes the patch set for one event. Range changes go to every chart
/// except the master; hover markers go to every chart with at least one
/// sample to snap to.
pub fn compute_sync_update(
    charts: &[ChartSyncState],
    domain: AxisDomain,
    event: &SyncEvent,
) -> Vec<(usize, ChartPatch)> {
    match event {
        SyncEvent::RangeChanged { source, range } => charts
            .iter()
            .enumerate()
            .filter(|(i, _)| i != source)
            .map(|(i, _)| {
                let patch = match range {
                    Some((min, max)) => ChartPatch::SetRange {
                        min: *min,
                        max: *max,
                    },
                    None => ChartPatch::AutoRange,
                };
                (i, patch)
            })
            .collect(),
        SyncEvent::Hover { x } => charts
            .iter()
            .enumerate()
            .filter_map(|(i, chart)| {
                nearest_x(&chart.xs, *x, domain).map(|snapped| {
                    (
                        i,
                        ChartPatch::Marker {
                            x: snapped,
                            flip_left: flip_left(*x, chart.visible),
                        },
                    )
                })
            })
            .collect(),
        SyncEvent::Unhover => charts
            .iter()
            .enumerate()
            .map(|(i, _)| (i, ChartPatch::ClearMarker))
            .collect(),
    }
}

/// Owns the phase and the per-view chart states; rebuilt on every data load.
#[derive(Default)]
pub struct SyncCoordinator {
    charts: Vec<ChartSyncState>,
    phase: SyncPhase,
}

impl SyncCoordinator {
    pub fn new(charts: Vec<ChartSyncState>) -> Self {
        Self {
            charts,
            phase: SyncPhase::Idle,
        }
    }

    pub fn phase(&self) -> &SyncPhase {
        &self.phase
    }

    pub fn set_visible(&mut self, chart: usize, visible: (f64, f64)) {
        if let Some(state) = self.charts.get_mut(chart) {
            state.visible = visible;
        }
    }

    pub fn apply(&mut self, domain: AxisDomain, event: SyncEvent) -> Vec<(usize, ChartPatch)> {
        self.phase = match &event {
            SyncEvent::Hover { x } => SyncPhase::Hovering(*x),
            SyncEvent::Unhover => match self.phase {
                SyncPhase::Zoomed(range) => SyncPhase::Zoomed(range),
                _ => SyncPhase::Idle,
            },
            SyncEvent::RangeChanged { range, .. } => match range {
                Some(r) => SyncPhase::Zoomed(*r),
                None => SyncPhase::Idle,
            },
        };
        compute_sync_update(&self.charts, domain, &event)
    }
}
