//! Visualization: render statistical cubes to **SVG** or **PNG**.
//!
//! - Distinct series colors (Microsoft Office palette)
//! - Axis magnitude scaling (thousands/millions/billions/…)
//! - Chart kinds: `Bar`, `Line`, `Heatmap`, `Treemap`, `Flow`
//! - Legend placement for line charts: `Inside`, `Right`, `Bottom`

pub mod text;
pub mod types;
pub mod util;

mod flow;
mod heatmap;
mod legend;
mod treemap;

pub use types::{ChartKind, DEFAULT_LEGEND_MODE, LegendMode};

use crate::cube::{Cube, Row};
use crate::hierarchy::build_hierarchy;
use anyhow::{Result, anyhow};
use num_format::Locale;

use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;

use plotters::style::FontFamily;

use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Once;

use legend::{draw_legend_panel, estimate_bottom_legend_height_px};
use text::estimate_text_width_px;
use util::{
    choose_axis_scale, compute_left_label_area_px, format_value, map_locale, office_color,
    parse_year_label,
};

/// One-time registration for a fallback "sans-serif" font when using the
/// `ab_glyph` text path. Required because `ab_glyph` doesn't discover OS
/// fonts.
static INIT_FONTS: Once = Once::new();

fn ensure_fonts_registered() {
    // Safe to call many times; only runs once.
    INIT_FONTS.call_once(|| {
        let _ = plotters::style::register_font(
            "sans-serif",
            plotters::style::FontStyle::Normal,
            include_bytes!("../../assets/DejaVuSans.ttf"),
        );
    });
}

/// What to draw and how to slice the cube for it.
///
/// `x_dim` is the primary dimension: bar categories, the time axis for
/// lines, heatmap rows, the treemap's first grouping level, or the flow
/// source. `series_dim` is the secondary dimension where the kind needs one
/// (line series, heatmap columns, treemap second level, flow target).
/// `fixed` pins dimensions to a single category before anything is drawn.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_dim: String,
    pub series_dim: Option<String>,
    pub fixed: Vec<(String, String)>,
    pub locale: String,
    pub legend: LegendMode,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, x_dim: impl Into<String>) -> Self {
        Self {
            kind,
            title: String::new(),
            x_dim: x_dim.into(),
            series_dim: None,
            fixed: Vec::new(),
            locale: "en".into(),
            legend: DEFAULT_LEGEND_MODE,
        }
    }

    pub fn series_dim(mut self, dim: impl Into<String>) -> Self {
        self.series_dim = Some(dim.into());
        self
    }

    pub fn fix(mut self, dim: impl Into<String>, category: impl Into<String>) -> Self {
        self.fixed.push((dim.into(), category.into()));
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn legend(mut self, legend: LegendMode) -> Self {
        self.legend = legend;
        self
    }
}

/// Render a chart of the cube to `out_path` (`.svg` or any bitmap extension
/// `BitMapBackend` understands, typically `.png`).
pub fn render_chart<P: AsRef<Path>>(
    cube: &Cube,
    spec: &ChartSpec,
    out_path: P,
    width: u32,
    height: u32,
) -> Result<()> {
    ensure_fonts_registered();
    let out_path = out_path.as_ref();
    let path_string = out_path.to_string_lossy().into_owned();

    if cube.axis(&spec.x_dim).is_none() {
        return Err(anyhow!("unknown dimension `{}`", spec.x_dim));
    }
    if let Some(series) = &spec.series_dim
        && cube.axis(series).is_none()
    {
        return Err(anyhow!("unknown dimension `{}`", series));
    }
    if matches!(spec.kind, ChartKind::Heatmap | ChartKind::Flow) && spec.series_dim.is_none() {
        return Err(anyhow!("this chart kind needs a series dimension"));
    }

    let fixed: Vec<(&str, &str)> = spec
        .fixed
        .iter()
        .map(|(d, c)| (d.as_str(), c.as_str()))
        .collect();
    let rows = cube.rows_where(&fixed)?;
    if rows.is_empty() {
        return Err(anyhow!("no data to plot"));
    }

    if out_path.extension().and_then(|s| s.to_str()) == Some("svg") {
        let root = SVGBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_chart(root, cube, spec, &rows)?;
    } else {
        let root = BitMapBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_chart(root, cube, spec, &rows)?;
    }
    Ok(())
}

fn draw_chart<DB>(
    root: DrawingArea<DB, Shift>,
    cube: &Cube,
    spec: &ChartSpec,
    rows: &[Row],
) -> Result<()>
where
    DB: DrawingBackend,
{
    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;
    let title = if spec.title.trim().is_empty() {
        cube.label().unwrap_or("MakStat dataset").to_string()
    } else {
        spec.title.clone()
    };
    let (locale, _dec_sep) = map_locale(&spec.locale);

    match spec.kind {
        ChartKind::Bar => draw_bar(&root, spec, rows, &title, locale)?,
        ChartKind::Line => draw_line(&root, cube, spec, rows, &title)?,
        ChartKind::Heatmap => {
            let series = spec.series_dim.as_deref().unwrap_or_default();
            let inner = root
                .titled(&title, (FontFamily::SansSerif, 20))
                .map_err(|e| anyhow!("{:?}", e))?;
            heatmap::draw_heatmap(&inner, rows, &spec.x_dim, series, locale)?;
        }
        ChartKind::Treemap => {
            let fixed: Vec<(&str, &str)> = spec
                .fixed
                .iter()
                .map(|(d, c)| (d.as_str(), c.as_str()))
                .collect();
            let mut groups: Vec<&str> = vec![spec.x_dim.as_str()];
            if let Some(series) = &spec.series_dim {
                groups.push(series.as_str());
            }
            let tree = build_hierarchy(cube, &title, &fixed, &groups)?;
            if tree.children.is_empty() {
                return Err(anyhow!("no positive values to lay out"));
            }
            let inner = root
                .titled(&title, (FontFamily::SansSerif, 20))
                .map_err(|e| anyhow!("{:?}", e))?;
            treemap::draw_treemap(&inner, &tree, locale)?;
        }
        ChartKind::Flow => {
            let series = spec.series_dim.as_deref().unwrap_or_default();
            let inner = root
                .titled(&title, (FontFamily::SansSerif, 20))
                .map_err(|e| anyhow!("{:?}", e))?;
            flow::draw_flow(&inner, rows, &spec.x_dim, series, locale)?;
        }
    }

    root.present().map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}

/// Horizontal bars, one per category of the primary dimension, value labels
/// at the bar ends.
fn draw_bar<DB>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    rows: &[Row],
    title: &str,
    locale: &Locale,
) -> Result<()>
where
    DB: DrawingBackend,
{
    // Aggregate per category in first-seen (category-index) order; zeros are
    // kept, nulls only count when a category has no numeric row at all.
    let mut cats: Vec<(String, f64)> = Vec::new();
    for r in rows {
        let Some(label) = r.label_for(&spec.x_dim) else {
            continue;
        };
        let v = r.value.unwrap_or(0.0);
        match cats.iter_mut().find(|(l, _)| l == label) {
            Some((_, sum)) => *sum += v,
            None => cats.push((label.to_string(), v)),
        }
    }
    if cats.is_empty() {
        return Err(anyhow!("no categories for dimension `{}`", spec.x_dim));
    }

    let max_val = cats.iter().map(|(_, v)| *v).fold(0.0f64, f64::max);
    let min_val = cats.iter().map(|(_, v)| *v).fold(0.0f64, f64::min);
    let max_abs = max_val.abs().max(min_val.abs());
    let (scale, scale_word) = choose_axis_scale(max_abs);
    let x_axis_title = if scale_word.is_empty() {
        "Value".to_string()
    } else {
        format!("Value ({scale_word})")
    };

    let label_font_px = 12u32;
    let left_px = cats
        .iter()
        .map(|(l, _)| estimate_text_width_px(l, label_font_px))
        .max()
        .unwrap_or(0)
        .saturating_add(12)
        .clamp(60, 280);

    let n = cats.len();
    let x_min = (min_val / scale).min(0.0);
    let x_max = (max_val / scale).max(0.0);
    let (x_min, x_max) = if (x_max - x_min).abs() < f64::EPSILON {
        (x_min - 1.0, x_max + 1.0)
    } else {
        (x_min, x_max * 1.05)
    };

    let mut chart = ChartBuilder::on(root)
        .margin(16)
        .caption(title, (FontFamily::SansSerif, 24))
        .set_label_area_size(LabelAreaPosition::Left, left_px)
        .set_label_area_size(LabelAreaPosition::Bottom, 48)
        .build_cartesian_2d(x_min..x_max, 0f64..n as f64)
        .map_err(|e| anyhow!("{:?}", e))?;

    let x_label_fmt = |v: &f64| {
        let a = v.abs();
        let prec = if a >= 100.0 {
            0
        } else if a >= 10.0 {
            1
        } else {
            2
        };
        format!("{:.*}", prec, *v)
    };

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc(x_axis_title)
        .x_labels(10)
        .y_labels(0)
        .x_label_formatter(&x_label_fmt)
        .label_style((FontFamily::SansSerif, label_font_px as i32))
        .axis_desc_style((FontFamily::SansSerif, 16))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    let color = office_color(0);
    let label_style = (FontFamily::SansSerif, label_font_px as i32);
    for (i, (label, v)) in cats.iter().enumerate() {
        let y0 = i as f64 + 0.15;
        let y1 = i as f64 + 0.85;
        let xv = *v / scale;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(0.0, y0), (xv, y1)],
                color.filled(),
            )))
            .map_err(|e| anyhow!("{:?}", e))?;

        // Category label, right-aligned to the axis in the left gutter.
        let shown = text::truncate_to_width(label, label_font_px, left_px.saturating_sub(8));
        let (bx, by) = chart.backend_coord(&(x_min, i as f64 + 0.5));
        root.draw(&Text::new(
            shown.clone(),
            (
                bx - estimate_text_width_px(&shown, label_font_px) as i32 - 6,
                by - label_font_px as i32 / 2,
            ),
            label_style,
        ))
        .map_err(|e| anyhow!("{:?}", e))?;

        // Value label just past the bar end.
        let (vx, vy) = chart.backend_coord(&(xv.max(0.0), i as f64 + 0.5));
        root.draw(&Text::new(
            format_value(*v, locale),
            (vx + 4, vy - label_font_px as i32 / 2),
            label_style,
        ))
        .map_err(|e| anyhow!("{:?}", e))?;
    }
    Ok(())
}

/// Multi-series lines over a time dimension. Series come from `series_dim`
/// when given, otherwise the whole slice is one series.
fn draw_line<DB>(
    root: &DrawingArea<DB, Shift>,
    cube: &Cube,
    spec: &ChartSpec,
    rows: &[Row],
    title: &str,
) -> Result<()>
where
    DB: DrawingBackend,
{
    let single_label = cube
        .axis(&spec.x_dim)
        .map(|a| a.label.clone())
        .unwrap_or_else(|| spec.x_dim.clone());

    // (series label -> sorted (year, value)); BTreeMap keeps series order
    // stable across runs.
    let mut groups: BTreeMap<String, Vec<(i32, f64)>> = BTreeMap::new();
    for r in rows {
        let Some(time_label) = r.label_for(&spec.x_dim) else {
            continue;
        };
        let Some(year) = parse_year_label(time_label) else {
            continue;
        };
        let Some(v) = r.value else {
            continue;
        };
        let series = match &spec.series_dim {
            Some(dim) => r.label_for(dim).unwrap_or("?").to_string(),
            None => single_label.clone(),
        };
        groups.entry(series).or_default().push((year, v));
    }
    if groups.is_empty() {
        return Err(anyhow!(
            "no plottable (year, value) pairs for dimension `{}`",
            spec.x_dim
        ));
    }
    for series in groups.values_mut() {
        series.sort_by_key(|(y, _)| *y);
    }

    let years: Vec<i32> = groups.values().flatten().map(|(y, _)| *y).collect();
    let (mut min_year, mut max_year) = (
        *years.iter().min().unwrap_or(&0),
        *years.iter().max().unwrap_or(&0),
    );
    if min_year == max_year {
        min_year -= 1;
        max_year += 1;
    }

    let values: Vec<f64> = groups.values().flatten().map(|(_, v)| *v).collect();
    let (mut min_val, mut max_val) = (
        values.iter().cloned().fold(f64::INFINITY, f64::min),
        values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
    );
    if (max_val - min_val).abs() < f64::EPSILON {
        min_val -= 1.0;
        max_val += 1.0;
    }

    let max_abs = min_val.abs().max(max_val.abs());
    let (scale, scale_word) = choose_axis_scale(max_abs);
    let y_axis_title = if scale_word.is_empty() {
        "Value".to_string()
    } else {
        format!("Value ({scale_word})")
    };

    let legend_items: Vec<(String, RGBAColor)> = groups
        .keys()
        .enumerate()
        .map(|(idx, label)| (label.clone(), office_color(idx)))
        .collect();

    let (root_w, root_h) = root.dim_in_pixel();
    let (plot_area, legend_area): (DrawingArea<DB, Shift>, Option<DrawingArea<DB, Shift>>) =
        match spec.legend {
            LegendMode::Right => {
                let (plot, legend) = root.split_horizontally((82).percent_width());
                (plot, Some(legend))
            }
            LegendMode::Bottom => {
                let needed = estimate_bottom_legend_height_px(&legend_items, root_w as i32 - 32);
                let h = needed.max(40);
                let (plot, legend) = root.split_vertically((root_h as i32 - h).max(40));
                (plot, Some(legend))
            }
            LegendMode::Inside => (root.clone(), None),
        };

    let left_px = compute_left_label_area_px(min_val / scale, max_val / scale, 10, 12);
    let mut chart = ChartBuilder::on(&plot_area)
        .margin(16)
        .caption(title, (FontFamily::SansSerif, 24))
        .set_label_area_size(LabelAreaPosition::Left, left_px)
        .set_label_area_size(LabelAreaPosition::Bottom, 56)
        .build_cartesian_2d(
            min_year as f64..max_year as f64,
            (min_val / scale)..(max_val / scale),
        )
        .map_err(|e| anyhow!("{:?}", e))?;

    let x_label_fmt = |x: &f64| (x.round() as i32).to_string();
    let y_label_fmt = |v: &f64| {
        let a = v.abs();
        let prec = if a >= 100.0 {
            0
        } else if a >= 10.0 {
            1
        } else {
            2
        };
        format!("{:.*}", prec, *v)
    };
    let x_label_count = ((max_year - min_year + 1) as usize).min(12);

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc(y_axis_title)
        .x_labels(x_label_count)
        .y_labels(10)
        .x_label_formatter(&x_label_fmt)
        .y_label_formatter(&y_label_fmt)
        .label_style((FontFamily::SansSerif, 12))
        .axis_desc_style((FontFamily::SansSerif, 16))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    let inside = matches!(spec.legend, LegendMode::Inside);
    for (idx, (series_label, series)) in groups.iter().enumerate() {
        let color = office_color(idx);
        let points: Vec<(f64, f64)> = series
            .iter()
            .map(|(y, v)| (*y as f64, *v / scale))
            .collect();
        let style = ShapeStyle {
            color,
            filled: false,
            stroke_width: 2,
        };
        let elem = chart
            .draw_series(LineSeries::new(points, style))
            .map_err(|e| anyhow!("{:?}", e))?;
        if inside {
            let legend_color = color;
            let legend_text = series_label.clone();
            elem.label(legend_text.clone()).legend(move |(x, y)| {
                EmptyElement::at((x, y))
                    + Circle::new((x + 8, y), 4, legend_color.filled())
                    + Text::new(legend_text.clone(), (x + 20, y), (FontFamily::SansSerif, 14))
            });
        }
    }

    if inside {
        chart
            .configure_series_labels()
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.85))
            .label_font((FontFamily::SansSerif, 14))
            .draw()
            .map_err(|e| anyhow!("{:?}", e))?;
    } else if let Some(area) = &legend_area {
        area.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;
        draw_legend_panel(
            area,
            &legend_items,
            matches!(spec.legend, LegendMode::Bottom),
        )?;
    }
    Ok(())
}
