//! Text measurement and fitting helpers.
//!
//! Plotters has no built-in text measuring, so sizes are estimated from
//! character counts. Good enough for gutters and cell labels.

/// Estimate pixel width of text at the given font size.
pub fn estimate_text_width_px(text: &str, font_px: u32) -> u32 {
    ((text.chars().count() as f32) * (font_px as f32) * 0.60).ceil() as u32
}

/// Truncate to fit `max_px`, appending an ellipsis when anything was cut.
pub fn truncate_to_width(text: &str, font_px: u32, max_px: u32) -> String {
    if estimate_text_width_px(text, font_px) <= max_px {
        return text.to_string();
    }
    let ellipsis_px = estimate_text_width_px("…", font_px);
    let budget = max_px.saturating_sub(ellipsis_px);
    let mut out = String::new();
    let mut used = 0u32;
    for ch in text.chars() {
        let ch_px = estimate_text_width_px(&ch.to_string(), font_px);
        if used + ch_px > budget {
            break;
        }
        out.push(ch);
        used += ch_px;
    }
    if out.is_empty() {
        return out;
    }
    out.push('…');
    out
}

/// Greedy word wrap into at most `max_lines` lines of `max_px` width; the
/// last line is truncated if the text still does not fit.
pub fn wrap_to_width(text: &str, font_px: u32, max_px: u32, max_lines: usize) -> Vec<String> {
    if max_lines == 0 {
        return Vec::new();
    }
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if estimate_text_width_px(&candidate, font_px) <= max_px || current.is_empty() {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
            if lines.len() == max_lines {
                break;
            }
        }
    }
    if !current.is_empty() && lines.len() < max_lines {
        lines.push(current);
    }
    if lines.len() > max_lines {
        lines.truncate(max_lines);
    }
    if let Some(last) = lines.last_mut() {
        let fitted = truncate_to_width(last, font_px, max_px);
        *last = fitted;
    }
    lines
}
