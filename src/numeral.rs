//! Chinese positional numerals as used in statute headings (第十二章, 第一百零五条).
//!
//! The resolver covers 0 through 9999, which is enough for any article number
//! that appears in practice. It is deliberately forgiving: characters outside
//! the digit alphabet contribute nothing, since callers hand it substrings
//! already bounded by the heading grammar.

/// Digit alphabet recognized by [`resolve`].
pub const DIGITS: &str = "零一二三四五六七八九十百千";

pub fn is_numeral_char(ch: char) -> bool {
    DIGITS.contains(ch)
}

/// Converts a Chinese positional numeral string to its integer value.
///
/// A multiplier without an explicit leading digit carries an implicit one,
/// so 十 is 10 and 十五 is 15 rather than 0 and 5.
pub fn resolve(numeral: &str) -> u32 {
    let mut result = 0_u32;
    let mut temp = 0_u32;

    for ch in numeral.chars() {
        match digit_value(ch) {
            Some(value) if value >= 10 => {
                let multiplicand = if temp == 0 { 1 } else { temp };
                result += multiplicand * value;
                temp = 0;
            }
            Some(value) => temp = value,
            None => {}
        }
    }

    result + temp
}

fn digit_value(ch: char) -> Option<u32> {
    match ch {
        '零' => Some(0),
        '一' => Some(1),
        '二' => Some(2),
        '三' => Some(3),
        '四' => Some(4),
        '五' => Some(5),
        '六' => Some(6),
        '七' => Some(7),
        '八' => Some(8),
        '九' => Some(9),
        '十' => Some(10),
        '百' => Some(100),
        '千' => Some(1000),
        _ => None,
    }
}
