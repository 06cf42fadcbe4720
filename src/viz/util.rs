//! Utility functions for visualization: colors, scaling, locale mapping,
//! time-label parsing.

use num_format::{Locale, ToFormattedString};
use plotters::prelude::*;
use regex::Regex;
use std::sync::OnceLock;

use super::text::estimate_text_width_px;

/// Microsoft Office (2013+) chart series palette.
/// Order: Blue, Orange, Gray, Gold, Light Blue, Green, Dark Blue, Dark Orange, Dark Gray, Brownish Gold.
const OFFICE10: [RGBColor; 10] = [
    RGBColor(68, 114, 196),  // blue      (#4472C4)
    RGBColor(237, 125, 49),  // orange    (#ED7D31)
    RGBColor(165, 165, 165), // gray      (#A5A5A5)
    RGBColor(255, 192, 0),   // gold      (#FFC000)
    RGBColor(91, 155, 213),  // light blue(#5B9BD5)
    RGBColor(112, 173, 71),  // green     (#70AD47)
    RGBColor(38, 68, 120),   // dark blue (#264478)
    RGBColor(158, 72, 14),   // dark org. (#9E480E)
    RGBColor(99, 99, 99),    // dark gray (#636363)
    RGBColor(153, 115, 0),   // brownish  (#997300)
];

/// Get a color from the Office palette.
#[inline]
pub fn office_color(idx: usize) -> RGBAColor {
    OFFICE10[idx % OFFICE10.len()].to_rgba()
}

/// Endpoints of the sequential blue ramp used by the heatmap.
const RAMP_LOW: (u8, u8, u8) = (247, 251, 255);
const RAMP_HIGH: (u8, u8, u8) = (8, 48, 107);

/// Sequential color for a normalized value in `[0, 1]`.
pub fn ramp_color(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(
        lerp(RAMP_LOW.0, RAMP_HIGH.0),
        lerp(RAMP_LOW.1, RAMP_HIGH.1),
        lerp(RAMP_LOW.2, RAMP_HIGH.2),
    )
}

/// Pick a single axis scale and its human label based on the overall magnitude.
/// Returns (scale, label), e.g. (1e6, "millions").
pub fn choose_axis_scale(max_abs: f64) -> (f64, &'static str) {
    if max_abs >= 1.0e12 {
        (1.0e12, "trillions")
    } else if max_abs >= 1.0e9 {
        (1.0e9, "billions")
    } else if max_abs >= 1.0e6 {
        (1.0e6, "millions")
    } else if max_abs >= 1.0e3 {
        (1.0e3, "thousands")
    } else {
        (1.0, "")
    }
}

/// Map a user-provided locale tag to a `num_format::Locale` and its decimal
/// separator char.
///
/// Supported tags (case-insensitive): `mk`, `en`, `us`, `en_US`, `de`,
/// `de_DE`, `german`, `fr`, `es`, `it`, `pt`, `nl`. Defaults to English.
pub fn map_locale(tag: &str) -> (&'static Locale, char) {
    match tag.to_lowercase().as_str() {
        "mk" | "mk_mk" => (&Locale::mk, ','),
        "de" | "de_de" | "german" => (&Locale::de, ','),
        "fr" | "fr_fr" => (&Locale::fr, ','),
        "es" | "es_es" => (&Locale::es, ','),
        "it" | "it_it" => (&Locale::it, ','),
        "pt" | "pt_pt" | "pt_br" => (&Locale::pt, ','),
        "nl" | "nl_nl" => (&Locale::nl, ','),
        _ => (&Locale::en, '.'), // default
    }
}

/// Locale-aware value label: grouped integer for large magnitudes, short
/// decimal otherwise.
pub fn format_value(v: f64, locale: &Locale) -> String {
    if !v.is_finite() {
        return "NA".into();
    }
    if v.abs() >= 1000.0 {
        (v.round() as i64).to_formatted_string(locale)
    } else {
        let s = format!("{:.2}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Pull a 4-digit year out of a PxWeb time-category label.
///
/// MakStat time categories come in several spellings (`"2023"`, `"20251"`
/// for a quarter, `"202412"` for a month, or a long label that merely
/// contains the year); the leading 4-digit run is the year in all of them.
pub fn parse_year_label(label: &str) -> Option<i32> {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    let re = YEAR_RE.get_or_init(|| Regex::new(r"(\d{4})").expect("year regex"));
    re.captures(label)?.get(1)?.as_str().parse().ok()
}

/// Compute a tight left label area width (in pixels) from the formatted tick
/// labels that will appear. Mirrors the formatter used by the mesh.
pub fn compute_left_label_area_px(
    ymin_scaled: f64,
    ymax_scaled: f64,
    ticks: usize,
    font_px: u32,
) -> u32 {
    let y_label_fmt = |v: f64| {
        let a = v.abs();
        let prec = if a >= 100.0 {
            0
        } else if a >= 10.0 {
            1
        } else {
            2
        };
        format!("{:.*}", prec, v)
    };

    let mut max_px = 0u32;
    for i in 0..=ticks {
        let t = if ticks == 0 {
            0.0
        } else {
            i as f64 / ticks as f64
        };
        let v = ymin_scaled + (ymax_scaled - ymin_scaled) * t;
        max_px = max_px.max(estimate_text_width_px(&y_label_fmt(v), font_px));
    }

    // Padding for tick marks plus a little breathing room.
    max_px.saturating_add(18).clamp(48, 140)
}
