//! Line measuring and word wrapping for the built-in Helvetica face.

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,      // 'p'..'~'
];

/// Width used for anything outside printable ASCII.
const FALLBACK_WIDTH: u16 = 556;

fn char_width(c: char) -> u16 {
    match c as u32 {
        code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` in points at `font_size`.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| char_width(c) as u32).sum();
    units as f32 * font_size / 1000.0
}

/// Greedy word wrap. Explicit newlines start a new line, words wider than
/// `max_width` are broken between characters. Always yields at least one line.
pub fn wrap_text(text: &str, font_size: f32, max_width: f32) -> Vec<String> {
    let space = text_width(" ", font_size);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_width = 0.0;
        for word in paragraph.split_whitespace() {
            for piece in split_long_word(word, font_size, max_width) {
                let piece_width = text_width(piece, font_size);
                if !line.is_empty() && line_width + space + piece_width > max_width {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0.0;
                }
                if !line.is_empty() {
                    line.push(' ');
                    line_width += space;
                }
                line.push_str(piece);
                line_width += piece_width;
            }
        }
        lines.push(line);
    }
    lines
}

fn split_long_word(word: &str, font_size: f32, max_width: f32) -> Vec<&str> {
    if text_width(word, font_size) <= max_width {
        return vec![word];
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut width = 0.0;
    for (idx, c) in word.char_indices() {
        let w = char_width(c) as f32 * font_size / 1000.0;
        if idx > start && width + w > max_width {
            pieces.push(&word[start..idx]);
            start = idx;
            width = 0.0;
        }
        width += w;
    }
    pieces.push(&word[start..]);
    pieces
}
