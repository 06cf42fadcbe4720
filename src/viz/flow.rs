//! Two-stage flow diagram: source categories on the left, target categories
//! on the right, link bands with widths proportional to value.

use anyhow::{Result, anyhow};
use num_format::Locale;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;

use crate::cube::Row;

use super::heatmap::first_seen_labels;
use super::text::{estimate_text_width_px, truncate_to_width};
use super::util::{format_value, office_color};

const NODE_W: i32 = 40;
const NODE_PAD: i32 = 10;
const LABEL_FONT_PX: u32 = 12;

struct Node {
    label: String,
    total: f64,
    y0: f64,
    y1: f64,
    /// Running y offset for attaching link bands.
    cursor: f64,
}

/// Positive values are aggregated into source → target links; zero, negative
/// and null rows carry no flow and are skipped.
pub(crate) fn draw_flow<DB>(
    area: &DrawingArea<DB, Shift>,
    rows: &[Row],
    source_dim: &str,
    target_dim: &str,
    locale: &Locale,
) -> Result<()>
where
    DB: DrawingBackend,
{
    let source_labels = first_seen_labels(rows, source_dim);
    let target_labels = first_seen_labels(rows, target_dim);

    // links[(si, ti)] summed in first-seen order
    let mut links: Vec<(usize, usize, f64)> = Vec::new();
    for r in rows {
        let v = r.value.unwrap_or(0.0);
        if v <= 0.0 {
            continue;
        }
        let (Some(sl), Some(tl)) = (r.label_for(source_dim), r.label_for(target_dim)) else {
            continue;
        };
        let (Some(si), Some(ti)) = (
            source_labels.iter().position(|l| l == sl),
            target_labels.iter().position(|l| l == tl),
        ) else {
            continue;
        };
        match links.iter_mut().find(|(s, t, _)| *s == si && *t == ti) {
            Some((_, _, total)) => *total += v,
            None => links.push((si, ti, v)),
        }
    }
    if links.is_empty() {
        return Err(anyhow!(
            "no positive flows between `{}` and `{}`",
            source_dim,
            target_dim
        ));
    }

    let grand: f64 = links.iter().map(|(_, _, v)| v).sum();

    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);

    let mut sources = build_column(&source_labels, &links, grand, h, |l, s| l.0 == s);
    let mut targets = build_column(&target_labels, &links, grand, h, |l, t| l.1 == t);

    let sx1 = 8 + NODE_W;
    let tx0 = w - 8 - NODE_W;

    // Link bands, ordered by source then target so bands attach without
    // crossing inside a node.
    let mut ordered = links.clone();
    ordered.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    for (si, ti, v) in &ordered {
        let src = &mut sources[*si];
        let sy0 = src.cursor;
        let band_s = (src.y1 - src.y0) * v / src.total.max(f64::EPSILON);
        src.cursor += band_s;
        let sy1 = src.cursor;

        let tgt = &mut targets[*ti];
        let ty0 = tgt.cursor;
        let band_t = (tgt.y1 - tgt.y0) * v / tgt.total.max(f64::EPSILON);
        tgt.cursor += band_t;
        let ty1 = tgt.cursor;

        let band = band_polygon(sx1, sy0, sy1, tx0, ty0, ty1);
        area.draw(&Polygon::new(band, office_color(*si).mix(0.35).filled()))
            .map_err(|e| anyhow!("{:?}", e))?;
    }

    draw_column(area, &sources, 8, office_color(0), true, w, locale)?;
    draw_column(area, &targets, tx0, office_color(1), false, w, locale)?;
    Ok(())
}

fn build_column(
    labels: &[String],
    links: &[(usize, usize, f64)],
    grand: f64,
    h: i32,
    belongs: impl Fn(&(usize, usize, f64), usize) -> bool,
) -> Vec<Node> {
    let totals: Vec<f64> = (0..labels.len())
        .map(|i| {
            links
                .iter()
                .filter(|l| belongs(l, i))
                .map(|(_, _, v)| v)
                .sum()
        })
        .collect();
    let active = totals.iter().filter(|t| **t > 0.0).count().max(1);
    let usable = (h - 16 - NODE_PAD * (active as i32 - 1)).max(active as i32) as f64;

    let mut out = Vec::with_capacity(labels.len());
    let mut y = 8.0f64;
    for (label, &total) in labels.iter().zip(&totals) {
        let height = if total > 0.0 {
            (usable * total / grand).max(1.0)
        } else {
            0.0
        };
        let node = Node {
            label: label.clone(),
            total,
            y0: y,
            y1: y + height,
            cursor: y,
        };
        if total > 0.0 {
            y += height + NODE_PAD as f64;
        }
        out.push(node);
    }
    out
}

fn draw_column<DB>(
    area: &DrawingArea<DB, Shift>,
    nodes: &[Node],
    x0: i32,
    color: RGBAColor,
    labels_right: bool,
    w: i32,
    locale: &Locale,
) -> Result<()>
where
    DB: DrawingBackend,
{
    let style = (FontFamily::SansSerif, LABEL_FONT_PX as i32);
    for node in nodes {
        if node.total <= 0.0 {
            continue;
        }
        let (y0, y1) = (node.y0.round() as i32, node.y1.round() as i32);
        area.draw(&Rectangle::new(
            [(x0, y0), (x0 + NODE_W, y1.max(y0 + 1))],
            color.filled(),
        ))
        .map_err(|e| anyhow!("{:?}", e))?;
        area.draw(&Rectangle::new(
            [(x0, y0), (x0 + NODE_W, y1.max(y0 + 1))],
            BLACK.mix(0.4).stroke_width(1),
        ))
        .map_err(|e| anyhow!("{:?}", e))?;

        let text = format!("{} {}", node.label, format_value(node.total, locale));
        let max_px = (w / 2 - NODE_W - 16).max(20) as u32;
        let shown = truncate_to_width(&text, LABEL_FONT_PX, max_px);
        let ty = (y0 + y1) / 2 - LABEL_FONT_PX as i32 / 2;
        let tx = if labels_right {
            x0 + NODE_W + 6
        } else {
            x0 - 6 - estimate_text_width_px(&shown, LABEL_FONT_PX) as i32
        };
        area.draw(&Text::new(shown, (tx, ty), style))
            .map_err(|e| anyhow!("{:?}", e))?;
    }
    Ok(())
}

/// Sampled smoothstep band between the two column edges: top edge forward,
/// bottom edge reversed.
fn band_polygon(sx: i32, sy0: f64, sy1: f64, tx: i32, ty0: f64, ty1: f64) -> Vec<(i32, i32)> {
    const STEPS: usize = 24;
    let mut pts = Vec::with_capacity((STEPS + 1) * 2);
    let ease = |t: f64| t * t * (3.0 - 2.0 * t);
    for k in 0..=STEPS {
        let t = k as f64 / STEPS as f64;
        let x = sx as f64 + (tx - sx) as f64 * t;
        let y = sy0 + (ty0 - sy0) * ease(t);
        pts.push((x.round() as i32, y.round() as i32));
    }
    for k in (0..=STEPS).rev() {
        let t = k as f64 / STEPS as f64;
        let x = sx as f64 + (tx - sx) as f64 * t;
        let y = sy1 + (ty1 - sy1) * ease(t);
        pts.push((x.round() as i32, y.round() as i32));
    }
    pts
}
