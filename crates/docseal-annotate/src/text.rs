//! Banner text preparation.
//!
//! The glyph rasterizer draws codepoints left to right with no shaping.
//! Arabic-script prefixes therefore have to be converted to their
//! presentation forms and put into visual order before drawing.

use unicode_bidi::BidiInfo;

/// Shape and reorder `text` for left-to-right glyph drawing.
///
/// Pure left-to-right text is returned unchanged.
pub fn shape_for_display(text: &str) -> String {
    if !text.chars().any(is_rtl) {
        return text.to_string();
    }
    let shaped = ar_reshaper::reshape_line(text);
    let info = BidiInfo::new(&shaped, None);
    info.paragraphs
        .iter()
        .map(|para| info.reorder_line(para, para.range.clone()).into_owned())
        .collect()
}

fn is_rtl(c: char) -> bool {
    matches!(c,
        '\u{0590}'..='\u{08FF}'
        | '\u{FB1D}'..='\u{FDFF}'
        | '\u{FE70}'..='\u{FEFF}')
}
