//! Legend layout and drawing for external legend placement.

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;

use super::text::{estimate_text_width_px, truncate_to_width};

const FONT_PX: u32 = 14;
const SWATCH_R: i32 = 5;
const ITEM_GAP_PX: i32 = 18;
const LINE_H: i32 = 22;

/// Height needed for a bottom legend band that flows `items` into rows no
/// wider than `avail_w` pixels.
pub fn estimate_bottom_legend_height_px(items: &[(String, RGBAColor)], avail_w: i32) -> i32 {
    let mut rows = 1;
    let mut x = 0i32;
    for (label, _) in items {
        let w = item_width_px(label);
        if x > 0 && x + w > avail_w {
            rows += 1;
            x = 0;
        }
        x += w + ITEM_GAP_PX;
    }
    rows * LINE_H + 8
}

fn item_width_px(label: &str) -> i32 {
    SWATCH_R * 2 + 8 + estimate_text_width_px(label, FONT_PX) as i32
}

/// Draw a legend into its own drawing area: a vertical list on the right, a
/// flowing band at the bottom.
pub fn draw_legend_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    items: &[(String, RGBAColor)],
    horizontal: bool,
) -> Result<()>
where
    DB: DrawingBackend,
{
    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);
    let style = (FontFamily::SansSerif, FONT_PX as i32);

    if horizontal {
        let mut x = 8i32;
        let mut y = 8i32;
        for (label, color) in items {
            let iw = item_width_px(label);
            if x > 8 && x + iw > w {
                x = 8;
                y += LINE_H;
            }
            if y + LINE_H > h {
                break;
            }
            draw_item(area, x, y + LINE_H / 2, label, *color, style)?;
            x += iw + ITEM_GAP_PX;
        }
    } else {
        let max_label_px = (w - (SWATCH_R * 2 + 16)).max(20) as u32;
        for (idx, (label, color)) in items.iter().enumerate() {
            let y = 8 + idx as i32 * LINE_H;
            if y + LINE_H > h {
                break;
            }
            let shown = truncate_to_width(label, FONT_PX, max_label_px);
            draw_item(area, 4, y + LINE_H / 2, &shown, *color, style)?;
        }
    }
    Ok(())
}

fn draw_item<DB>(
    area: &DrawingArea<DB, Shift>,
    x: i32,
    y: i32,
    label: &str,
    color: RGBAColor,
    style: (FontFamily<'static>, i32),
) -> Result<()>
where
    DB: DrawingBackend,
{
    area.draw(&Circle::new((x + SWATCH_R, y), SWATCH_R, color.filled()))
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    area.draw(&Text::new(
        label.to_string(),
        (x + SWATCH_R * 2 + 8, y - FONT_PX as i32 / 2),
        style,
    ))
    .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    Ok(())
}
