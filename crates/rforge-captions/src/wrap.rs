//! Safe-zone aware caption wrapping.

/// Safe zone margins for a 1080x1920 frame, pixels.
pub const SAFE_TOP: u32 = 100;
pub const SAFE_BOTTOM: u32 = 150;
pub const SAFE_LEFT: u32 = 54;
pub const SAFE_RIGHT: u32 = 54;

/// Hard cap on rendered caption lines.
pub const MAX_LINES: usize = 2;

/// Box padding accounted for when estimating usable width.
const BOX_PADDING_PX: u32 = 28;

/// Average glyph width as a fraction of the font size.
const GLYPH_WIDTH_RATIO: f64 = 0.55;

/// Characters per line for a font size inside the safe zone.
fn chars_per_line(font_size: u32, frame_width: u32) -> usize {
    let usable = frame_width.saturating_sub(SAFE_LEFT + SAFE_RIGHT + BOX_PADDING_PX);
    ((usable as f64 / (font_size as f64 * GLYPH_WIDTH_RATIO)) as usize).max(10)
}

/// Greedy word-wrap within the safe zone, capped at [`MAX_LINES`] lines;
/// third-line overflow truncates with an ellipsis. Lines are joined with
/// embedded newlines for drawtext.
pub fn wrap_caption(text: &str, font_size: u32, frame_width: u32) -> String {
    let limit = chars_per_line(font_size, frame_width);
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return String::new();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in words {
        let candidate_len = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if candidate_len > limit && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        } else if current.is_empty() {
            current = word.to_string();
        } else {
            current.push(' ');
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > MAX_LINES {
        lines.truncate(MAX_LINES);
        let last = lines.last_mut().expect("at least one line");
        let keep = limit.saturating_sub(3).max(1);
        if last.chars().count() > keep {
            *last = last.chars().take(keep).collect();
        }
        let trimmed = last.trim_end().to_string();
        *last = format!("{trimmed}...");
    }

    lines.join("\n")
}
