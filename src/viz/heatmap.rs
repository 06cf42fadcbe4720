//! Two-dimension heatmap: rows × columns grid colored by value magnitude.

use anyhow::{Result, anyhow};
use num_format::Locale;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;

use crate::cube::Row;

use super::text::{estimate_text_width_px, truncate_to_width};
use super::util::{format_value, ramp_color};

const LABEL_FONT_PX: u32 = 12;
const CELL_FONT_PX: u32 = 11;

/// Draw a heatmap with `row_dim` categories down the side and `col_dim`
/// categories across the top. Values sharing a cell are summed; null-only
/// cells stay unfilled.
pub(crate) fn draw_heatmap<DB>(
    area: &DrawingArea<DB, Shift>,
    rows: &[Row],
    row_dim: &str,
    col_dim: &str,
    locale: &Locale,
) -> Result<()>
where
    DB: DrawingBackend,
{
    let row_labels = first_seen_labels(rows, row_dim);
    let col_labels = first_seen_labels(rows, col_dim);
    if row_labels.is_empty() || col_labels.is_empty() {
        return Err(anyhow!(
            "heatmap needs categories for both `{}` and `{}`",
            row_dim,
            col_dim
        ));
    }

    let mut cells: Vec<Option<f64>> = vec![None; row_labels.len() * col_labels.len()];
    for r in rows {
        let (Some(rl), Some(cl)) = (r.label_for(row_dim), r.label_for(col_dim)) else {
            continue;
        };
        let (Some(ri), Some(ci)) = (
            row_labels.iter().position(|l| l == rl),
            col_labels.iter().position(|l| l == cl),
        ) else {
            continue;
        };
        if let Some(v) = r.value {
            let cell = &mut cells[ri * col_labels.len() + ci];
            *cell = Some(cell.unwrap_or(0.0) + v);
        }
    }

    let max_abs = cells
        .iter()
        .flatten()
        .fold(0.0f64, |acc, v| acc.max(v.abs()));

    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);

    // Left gutter sized to the widest row label, top gutter one line high.
    let gutter_left = row_labels
        .iter()
        .map(|l| estimate_text_width_px(l, LABEL_FONT_PX))
        .max()
        .unwrap_or(0)
        .clamp(40, 220) as i32
        + 8;
    let gutter_top = LABEL_FONT_PX as i32 + 10;

    let grid_w = (w - gutter_left - 4).max(1);
    let grid_h = (h - gutter_top - 4).max(1);
    let cell_w = grid_w as f64 / col_labels.len() as f64;
    let cell_h = grid_h as f64 / row_labels.len() as f64;

    let label_style = (FontFamily::SansSerif, LABEL_FONT_PX as i32);

    for (ci, label) in col_labels.iter().enumerate() {
        let x = gutter_left + (ci as f64 * cell_w) as i32;
        let shown = truncate_to_width(label, LABEL_FONT_PX, (cell_w as u32).saturating_sub(4));
        area.draw(&Text::new(shown, (x + 2, 2), label_style))
            .map_err(|e| anyhow!("{:?}", e))?;
    }

    for (ri, label) in row_labels.iter().enumerate() {
        let y = gutter_top + (ri as f64 * cell_h + cell_h / 2.0) as i32;
        let shown = truncate_to_width(label, LABEL_FONT_PX, gutter_left.max(0) as u32);
        area.draw(&Text::new(
            shown,
            (2, y - LABEL_FONT_PX as i32 / 2),
            label_style,
        ))
        .map_err(|e| anyhow!("{:?}", e))?;
    }

    for ri in 0..row_labels.len() {
        for ci in 0..col_labels.len() {
            let x0 = gutter_left + (ci as f64 * cell_w) as i32;
            let y0 = gutter_top + (ri as f64 * cell_h) as i32;
            let x1 = gutter_left + ((ci + 1) as f64 * cell_w) as i32;
            let y1 = gutter_top + ((ri + 1) as f64 * cell_h) as i32;
            match cells[ri * col_labels.len() + ci] {
                Some(v) => {
                    let t = if max_abs > 0.0 { v.abs() / max_abs } else { 0.0 };
                    let fill = ramp_color(t);
                    area.draw(&Rectangle::new([(x0, y0), (x1, y1)], fill.filled()))
                        .map_err(|e| anyhow!("{:?}", e))?;
                    area.draw(&Rectangle::new(
                        [(x0, y0), (x1, y1)],
                        WHITE.stroke_width(1),
                    ))
                    .map_err(|e| anyhow!("{:?}", e))?;

                    let text = format_value(v, locale);
                    let text_w = estimate_text_width_px(&text, CELL_FONT_PX) as i32;
                    if text_w + 4 < x1 - x0 && (CELL_FONT_PX as i32) + 4 < y1 - y0 {
                        let color = if t > 0.55 { &WHITE } else { &BLACK };
                        let style = (FontFamily::SansSerif, CELL_FONT_PX as i32)
                            .into_font()
                            .color(color);
                        area.draw(&Text::new(
                            text,
                            (
                                x0 + (x1 - x0 - text_w) / 2,
                                y0 + (y1 - y0 - CELL_FONT_PX as i32) / 2,
                            ),
                            style,
                        ))
                        .map_err(|e| anyhow!("{:?}", e))?;
                    }
                }
                None => {
                    area.draw(&Rectangle::new(
                        [(x0, y0), (x1, y1)],
                        RGBColor(235, 235, 235).filled(),
                    ))
                    .map_err(|e| anyhow!("{:?}", e))?;
                }
            }
        }
    }
    Ok(())
}

/// Category labels of a dimension in first-seen (category-index) order.
pub(crate) fn first_seen_labels(rows: &[Row], dimension: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for r in rows {
        if let Some(label) = r.label_for(dimension)
            && !out.iter().any(|l| l == label)
        {
            out.push(label.to_string());
        }
    }
    out
}
