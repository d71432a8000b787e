use ratatui::{
    prelude::{Buffer, Rect},
    style::{Color, Style},
    symbols::{Marker, merge::MergeStrategy},
    widgets::{Axis, Block, Chart, Dataset, GraphType, Widget},
};

#[derive(Debug, Clone, Copy)]
pub struct Series<'a> {
    pub name: &'a str,
    pub data: &'a [(f64, f64)],
    pub color: Color,
    pub graph_type: GraphType,
}

impl<'a> Series<'a> {
    pub fn scatter(name: &'a str, data: &'a [(f64, f64)], color: Color) -> Self {
        Self {
            name,
            data,
            color,
            graph_type: GraphType::Scatter,
        }
    }

    pub fn line(name: &'a str, data: &'a [(f64, f64)], color: Color) -> Self {
        Self {
            name,
            data,
            color,
            graph_type: GraphType::Line,
        }
    }
}

/// Scatter plot or line chart with three labels per axis.
#[derive(Debug)]
pub struct SeriesChart<'a> {
    pub title: String,
    pub series: Vec<Series<'a>>,
    pub x_title: &'a str,
    pub x_bounds: [f64; 2],
    pub y_title: &'a str,
    pub y_bounds: [f64; 2],
}

/// Bounds covering every point with a little padding; `[0, 1]` without
/// data.
#[must_use]
pub fn bounds_of<'a, I>(points: I) -> ([f64; 2], [f64; 2])
where
    I: IntoIterator<Item = &'a (f64, f64)>,
{
    let mut x = [f64::INFINITY, f64::NEG_INFINITY];
    let mut y = [f64::INFINITY, f64::NEG_INFINITY];
    for &(px, py) in points {
        x = [x[0].min(px), x[1].max(px)];
        y = [y[0].min(py), y[1].max(py)];
    }
    (pad(x), pad(y))
}

fn pad([low, high]: [f64; 2]) -> [f64; 2] {
    if !low.is_finite() || !high.is_finite() {
        return [0.0, 1.0];
    }
    let margin = ((high - low) * 0.05).max(0.5);
    [low - margin, high + margin]
}

fn labels([low, high]: [f64; 2]) -> [String; 3] {
    [
        format!("{low:.1}"),
        format!("{:.1}", f64::midpoint(low, high)),
        format!("{high:.1}"),
    ]
}

impl Widget for SeriesChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        let datasets = self
            .series
            .iter()
            .map(|series| {
                let marker = match series.graph_type {
                    GraphType::Line => Marker::Braille,
                    _ => Marker::Dot,
                };
                Dataset::default()
                    .name(series.name)
                    .marker(marker)
                    .graph_type(series.graph_type)
                    .style(Style::default().fg(series.color))
                    .data(series.data)
            })
            .collect::<Vec<_>>();
        let x_axis = Axis::default()
            .title(self.x_title)
            .bounds(self.x_bounds)
            .labels(labels(self.x_bounds));
        let y_axis = Axis::default()
            .title(self.y_title)
            .bounds(self.y_bounds)
            .labels(labels(self.y_bounds));
        let chart = Chart::new(datasets)
            .block(
                Block::bordered()
                    .merge_borders(MergeStrategy::Exact)
                    .title(self.title),
            )
            .x_axis(x_axis)
            .y_axis(y_axis);

        Widget::render(chart, area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_cover_points() {
        let (x, y) = bounds_of(&[(1.0, 10.0), (3.0, 30.0)]);
        assert!(x[0] < 1.0 && x[1] > 3.0);
        assert!(y[0] < 10.0 && y[1] > 30.0);
        assert_eq!(bounds_of(&[]), ([0.0, 1.0], [0.0, 1.0]));
    }
}
