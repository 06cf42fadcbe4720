//! Squarified treemap layout and rendering.
//!
//! Layout follows Bruls/Huizing/van Wijk squarification: lay items into rows
//! along the shorter side of the free rectangle as long as adding the next
//! item does not worsen the row's worst aspect ratio.

use anyhow::Result;
use num_format::Locale;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;

use crate::hierarchy::HierarchyNode;

use super::text::{truncate_to_width, wrap_to_width};
use super::util::{format_value, office_color};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Lay out positive `values` inside `rect`, preserving input order.
/// Areas are proportional to the values; output rects tile `rect` exactly.
pub(crate) fn squarify(values: &[f64], rect: Rect) -> Vec<Rect> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 || values.is_empty() {
        return Vec::new();
    }
    let scale = rect.w * rect.h / total;
    let areas: Vec<f64> = values.iter().map(|v| v * scale).collect();

    let mut out = Vec::with_capacity(areas.len());
    let mut free = rect;
    let mut row: Vec<f64> = Vec::new();
    let mut i = 0;
    while i < areas.len() {
        let side = free.w.min(free.h);
        let mut candidate = row.clone();
        candidate.push(areas[i]);
        if row.is_empty() || worst_ratio(&candidate, side) <= worst_ratio(&row, side) {
            row = candidate;
            i += 1;
        } else {
            layout_row(&row, &mut free, &mut out);
            row.clear();
        }
    }
    if !row.is_empty() {
        layout_row(&row, &mut free, &mut out);
    }
    out
}

/// Worst (largest) aspect ratio a row of areas would have when laid out
/// against a side of the given length.
fn worst_ratio(row: &[f64], side: f64) -> f64 {
    let sum: f64 = row.iter().sum();
    if sum <= 0.0 || side <= 0.0 {
        return f64::INFINITY;
    }
    let max = row.iter().cloned().fold(f64::MIN, f64::max);
    let min = row.iter().cloned().fold(f64::MAX, f64::min);
    let sum2 = sum * sum;
    let side2 = side * side;
    f64::max(side2 * max / sum2, sum2 / (side2 * min))
}

fn layout_row(row: &[f64], free: &mut Rect, out: &mut Vec<Rect>) {
    let sum: f64 = row.iter().sum();
    if free.w >= free.h {
        // Column along the left edge.
        let w = if free.h > 0.0 { sum / free.h } else { 0.0 };
        let mut y = free.y;
        for a in row {
            let h = if w > 0.0 { a / w } else { 0.0 };
            out.push(Rect {
                x: free.x,
                y,
                w,
                h,
            });
            y += h;
        }
        free.x += w;
        free.w -= w;
    } else {
        // Row along the top edge.
        let h = if free.w > 0.0 { sum / free.w } else { 0.0 };
        let mut x = free.x;
        for a in row {
            let w = if h > 0.0 { a / h } else { 0.0 };
            out.push(Rect {
                x,
                y: free.y,
                w,
                h,
            });
            x += w;
        }
        free.y += h;
        free.h -= h;
    }
}

/// Draw a hierarchy as a treemap. Top-level children are laid out first
/// (largest-first, as the source pages sort) and each block is colored from
/// the palette; a two-level hierarchy nests its leaves inside the block.
pub(crate) fn draw_treemap<DB>(
    area: &DrawingArea<DB, Shift>,
    root: &HierarchyNode,
    locale: &Locale,
) -> Result<()>
where
    DB: DrawingBackend,
{
    let (w, h) = area.dim_in_pixel();
    let full = Rect {
        x: 0.0,
        y: 0.0,
        w: w as f64,
        h: h as f64,
    };

    let mut groups: Vec<&HierarchyNode> = root.children.iter().collect();
    groups.sort_by(|a, b| {
        b.total()
            .partial_cmp(&a.total())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let totals: Vec<f64> = groups.iter().map(|g| g.total()).collect();
    let rects = squarify(&totals, full);

    for (gi, (group, rect)) in groups.iter().zip(&rects).enumerate() {
        let color = office_color(gi);
        if group.children.is_empty() {
            draw_cell(area, rect, group, color, locale)?;
        } else {
            let mut leaves: Vec<&HierarchyNode> = group.children.iter().collect();
            leaves.sort_by(|a, b| {
                b.total()
                    .partial_cmp(&a.total())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let leaf_totals: Vec<f64> = leaves.iter().map(|l| l.total()).collect();
            for (leaf, leaf_rect) in leaves.iter().zip(squarify(&leaf_totals, *rect)) {
                draw_cell(area, &leaf_rect, leaf, color, locale)?;
            }
        }
    }
    Ok(())
}

fn draw_cell<DB>(
    area: &DrawingArea<DB, Shift>,
    rect: &Rect,
    node: &HierarchyNode,
    color: RGBAColor,
    locale: &Locale,
) -> Result<()>
where
    DB: DrawingBackend,
{
    let (x0, y0) = (rect.x.round() as i32, rect.y.round() as i32);
    let (x1, y1) = (
        (rect.x + rect.w).round() as i32,
        (rect.y + rect.h).round() as i32,
    );
    area.draw(&Rectangle::new([(x0, y0), (x1, y1)], color.filled()))
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    area.draw(&Rectangle::new(
        [(x0, y0), (x1, y1)],
        WHITE.stroke_width(1),
    ))
    .map_err(|e| anyhow::anyhow!("{:?}", e))?;

    let font_px = 12u32;
    let inner_w = (x1 - x0 - 8).max(0) as u32;
    let inner_h = y1 - y0 - 6;
    if inner_w < 3 * font_px || inner_h < font_px as i32 + 4 {
        return Ok(());
    }
    let max_lines = ((inner_h / (font_px as i32 + 2)) as usize).saturating_sub(1).max(1);
    let mut lines = wrap_to_width(&node.name, font_px, inner_w, max_lines);
    let value_line = format_value(node.total(), locale);
    if (lines.len() as i32 + 1) * (font_px as i32 + 2) <= inner_h {
        lines.push(truncate_to_width(&value_line, font_px, inner_w));
    }
    let style = (FontFamily::SansSerif, font_px as i32).into_font().color(&WHITE);
    for (li, line) in lines.iter().enumerate() {
        area.draw(&Text::new(
            line.clone(),
            (x0 + 4, y0 + 3 + li as i32 * (font_px as i32 + 2)),
            style.clone(),
        ))
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squarify_tiles_the_rectangle() {
        let rect = Rect {
            x: 0.0,
            y: 0.0,
            w: 600.0,
            h: 400.0,
        };
        let values = [6.0, 6.0, 4.0, 3.0, 2.0, 2.0, 1.0];
        let rects = squarify(&values, rect);
        assert_eq!(rects.len(), values.len());

        // Areas proportional to values, tiling the whole rectangle.
        let total_area: f64 = rects.iter().map(|r| r.w * r.h).sum();
        assert!((total_area - 600.0 * 400.0).abs() < 1e-6);
        let unit = 600.0 * 400.0 / values.iter().sum::<f64>();
        for (v, r) in values.iter().zip(&rects) {
            assert!((r.w * r.h - v * unit).abs() < 1e-6);
            assert!(r.x >= -1e-9 && r.y >= -1e-9);
            assert!(r.x + r.w <= 600.0 + 1e-6);
            assert!(r.y + r.h <= 400.0 + 1e-6);
        }
    }

    #[test]
    fn squarify_handles_degenerate_input() {
        let rect = Rect {
            x: 0.0,
            y: 0.0,
            w: 100.0,
            h: 100.0,
        };
        assert!(squarify(&[], rect).is_empty());
        assert!(squarify(&[0.0, 0.0], rect).is_empty());
        let single = squarify(&[42.0], rect);
        assert_eq!(single.len(), 1);
        assert!((single[0].w - 100.0).abs() < 1e-9);
        assert!((single[0].h - 100.0).abs() < 1e-9);
    }
}
