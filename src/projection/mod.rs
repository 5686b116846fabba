use std::fmt;

use eframe::egui::{Color32, Pos2, Rect, pos2, vec2};
use serde_json::Value;
use tracing::warn;

use crate::error::{ClientError, ClientResult};
use crate::util::id_text;

mod feed;
mod palette;
mod scale;

pub use feed::ProjectionFeed;
pub use palette::LabelColors;
pub use scale::LinearScale;

use self::scale::{extent, tick_precision, tick_step};

pub const POINT_RADIUS: f32 = 8.0;
pub const HOVER_RADIUS_DELTA: f32 = 4.0;
pub const TICK_COUNT: usize = 10;
pub const LEGEND_ROW_PITCH: f32 = 25.0;
pub const LEGEND_OFFSET: f32 = 20.0;

/// Coloring label of a projected point. Integers order before text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterLabel {
    Int(i64),
    Text(String),
}

impl ClusterLabel {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(match number.as_i64() {
                Some(int) => Self::Int(int),
                None => match number.as_f64() {
                    Some(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => {
                        Self::Int(float as i64)
                    }
                    _ => Self::Text(number.to_string()),
                },
            }),
            Value::String(text) => Some(match text.trim().parse::<i64>() {
                Ok(int) => Self::Int(int),
                Err(_) => Self::Text(text.clone()),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionPoint {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub cluster: ClusterLabel,
}

impl ProjectionPoint {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Parses a `/tsne` payload. Entries without an id or label are dropped; missing
/// or non-numeric coordinates become NaN and are dropped later by [`render`].
pub fn parse_points(raw: &Value) -> ClientResult<Vec<ProjectionPoint>> {
    let entries = raw
        .as_array()
        .ok_or_else(|| ClientError::malformed("projection must be a list of points"))?;

    let coordinate = |entry: &Value, axis: &str| {
        entry.get(axis).and_then(Value::as_f64).unwrap_or(f64::NAN)
    };

    let mut points = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let id = entry.get("id").and_then(id_text);
        let cluster = entry.get("cluster").and_then(ClusterLabel::from_json);
        let (Some(id), Some(cluster)) = (id, cluster) else {
            warn!(index, "skipping projection entry without id or cluster");
            continue;
        };

        points.push(ProjectionPoint {
            id,
            x: coordinate(entry, "x"),
            y: coordinate(entry, "y"),
            cluster,
        });
    }

    Ok(points)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 80.0,
            right: 100.0,
            bottom: 80.0,
            left: 100.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderedPoint {
    /// Position of the point in the input slice.
    pub source: usize,
    pub id: String,
    pub cluster: ClusterLabel,
    pub center: Pos2,
    pub color: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
    pub label: ClusterLabel,
    pub color: Color32,
    pub position: Pos2,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    pub value: f64,
    /// Screen coordinate along the axis (x for the horizontal axis, y for the vertical one).
    pub position: f32,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Axis {
    pub scale: LinearScale,
    pub ticks: Vec<Tick>,
    pub title: &'static str,
}

impl Axis {
    fn new(scale: LinearScale, title: &'static str) -> Self {
        let (start, stop) = (scale.domain.0.min(scale.domain.1), scale.domain.0.max(scale.domain.1));
        let precision = tick_precision(tick_step(start, stop, TICK_COUNT));
        let ticks = scale
            .ticks(TICK_COUNT)
            .into_iter()
            .map(|value| Tick {
                value,
                position: scale.map(value),
                label: format!("{:.*}", precision, value + 0.0),
            })
            .collect();
        Self {
            scale,
            ticks,
            title,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Axes {
    pub x: Axis,
    pub y: Axis,
}

/// Everything needed to paint one frame of the projection view.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderDescriptor {
    pub canvas: Rect,
    pub margins: Margins,
    pub points: Vec<RenderedPoint>,
    pub legend: Vec<LegendEntry>,
    pub axes: Option<Axes>,
    pub excluded: usize,
}

impl RenderDescriptor {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Inner plotting area bounded by the margins.
    pub fn plot_rect(&self) -> Rect {
        Rect::from_min_max(
            pos2(self.canvas.left() + self.margins.left, self.canvas.top() + self.margins.top),
            pos2(
                self.canvas.right() - self.margins.right,
                self.canvas.bottom() - self.margins.bottom,
            ),
        )
    }
}

pub fn render(points: &[ProjectionPoint], canvas: Rect, margins: Margins) -> RenderDescriptor {
    let finite = points
        .iter()
        .enumerate()
        .filter(|(_, point)| point.is_finite())
        .collect::<Vec<_>>();
    let excluded = points.len() - finite.len();
    if excluded > 0 {
        warn!(excluded, "dropping projection points with non-finite coordinates");
    }

    let (Some(x_extent), Some(y_extent)) = (
        extent(finite.iter().map(|(_, point)| point.x)),
        extent(finite.iter().map(|(_, point)| point.y)),
    ) else {
        return RenderDescriptor {
            canvas,
            margins,
            points: Vec::new(),
            legend: Vec::new(),
            axes: None,
            excluded,
        };
    };

    let x_scale = LinearScale::symmetric(
        x_extent,
        (canvas.left() + margins.left, canvas.right() - margins.right),
    );
    let y_scale = LinearScale::symmetric(
        y_extent,
        (canvas.bottom() - margins.bottom, canvas.top() + margins.top),
    );

    let colors = LabelColors::assign(finite.iter().map(|(_, point)| &point.cluster));

    let rendered = finite
        .iter()
        .map(|(source, point)| RenderedPoint {
            source: *source,
            id: point.id.clone(),
            cluster: point.cluster.clone(),
            center: pos2(x_scale.map(point.x), y_scale.map(point.y)),
            color: colors.color(&point.cluster),
        })
        .collect();

    let legend_origin = pos2(
        canvas.right() - margins.right + LEGEND_OFFSET,
        canvas.top() + margins.top,
    );
    let legend = colors
        .entries()
        .enumerate()
        .map(|(row, (label, color))| LegendEntry {
            label: label.clone(),
            color,
            position: legend_origin + vec2(0.0, row as f32 * LEGEND_ROW_PITCH),
            text: format!("Cluster {label}"),
        })
        .collect();

    RenderDescriptor {
        canvas,
        margins,
        points: rendered,
        legend,
        axes: Some(Axes {
            x: Axis::new(x_scale, "t-SNE Dimension 1"),
            y: Axis::new(y_scale, "t-SNE Dimension 2"),
        }),
        excluded,
    }
}
