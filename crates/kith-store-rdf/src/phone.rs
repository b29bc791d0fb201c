//! Phone number canonicalisation for locale-independent matching.
//!
//! Numbers are compared by their "local" form: visual separators and
//! Unicode format characters removed, digits converted to Latin, cut at the
//! first DTMF character and truncated to the trailing N digits.

/// Characters introducing DTMF tones: pause, wait and extension.
fn is_dtmf(c: char) -> bool { matches!(c.to_ascii_lowercase(), 'p' | 'w' | 'x') }

fn is_visual_separator(c: char) -> bool { matches!(c, '(' | ')' | ' ' | '.' | '-') }

/// Unicode general category `Cf`, restricted to the blocks phone numbers
/// pick up from rich-text sources.
fn is_format_char(c: char) -> bool {
  matches!(
    c,
    '\u{00ad}'
      | '\u{0600}'..='\u{0605}'
      | '\u{061c}'
      | '\u{06dd}'
      | '\u{070f}'
      | '\u{180e}'
      | '\u{200b}'..='\u{200f}'
      | '\u{202a}'..='\u{202e}'
      | '\u{2060}'..='\u{2064}'
      | '\u{2066}'..='\u{206f}'
      | '\u{feff}'
      | '\u{fff9}'..='\u{fffb}'
  )
}

/// First code point of each block whose ten consecutive code points are the
/// decimal digits zero to nine.
const DIGIT_BLOCKS: &[u32] = &[
  0x0660, // Arabic-Indic
  0x06f0, // Extended Arabic-Indic
  0x07c0, // NKo
  0x0966, // Devanagari
  0x09e6, // Bengali
  0x0a66, // Gurmukhi
  0x0ae6, // Gujarati
  0x0b66, // Oriya
  0x0be6, // Tamil
  0x0c66, // Telugu
  0x0ce6, // Kannada
  0x0d66, // Malayalam
  0x0e50, // Thai
  0x0ed0, // Lao
  0x0f20, // Tibetan
  0x1040, // Myanmar
  0x17e0, // Khmer
  0x1810, // Mongolian
  0xff10, // Fullwidth
];

/// The Latin digit for `c`, if `c` is a decimal digit of any supported
/// script.
fn latin_digit(c: char) -> Option<char> {
  if c.is_ascii_digit() {
    return Some(c);
  }
  let code = c as u32;
  DIGIT_BLOCKS
    .iter()
    .find(|start| (**start..**start + 10).contains(&code))
    .and_then(|start| char::from_digit(code - start, 10))
}

/// Strip visual separators and format characters and convert digits to
/// Latin; everything else is kept.
fn normalize_to_latin(number: &str) -> String {
  number
    .chars()
    .filter_map(|c| match latin_digit(c) {
      Some(digit) => Some(digit),
      None if is_visual_separator(c) || is_format_char(c) => None,
      None => Some(c),
    })
    .collect()
}

/// The trailing `length` characters before the first DTMF character.
pub fn local_number(number: &str, length: usize) -> String {
  let number: Vec<char> = normalize_to_latin(number).chars().collect();
  let last = number.iter().position(|c| is_dtmf(*c)).unwrap_or(number.len());
  let first = last.saturating_sub(length);
  number[first..last].iter().collect()
}
