//! Reserved separators used to pack several values into one result column,
//! and the helpers that unpack them.
//!
//! A multi-valued detail column reads
//! `item1<DETAIL>item2...`, each item `field1<FIELD>field2...`, each field
//! `value<LIST>value...` optionally followed by `<GRAPH>graph-iri`.

pub const GRAPH: char = '\u{1c}';
pub const LIST: char = '\u{1d}';
pub const DETAIL: char = '\u{1e}';
pub const FIELD: char = '\u{1f}';

pub fn separator(c: char) -> String { c.to_string() }

/// Non-empty detail items of an aggregate column.
pub fn detail_items(raw: &str) -> impl Iterator<Item = &str> {
  raw.split(DETAIL).filter(|item| !item.is_empty())
}

pub fn fields(item: &str) -> impl Iterator<Item = &str> { item.split(FIELD) }

/// Non-empty list items.
pub fn list_items(raw: &str) -> impl Iterator<Item = &str> {
  raw.split(LIST).filter(|item| !item.is_empty())
}

/// Split a value into its payload and the graph it came from.
///
/// Returns `None` when the graph separator is missing.
pub fn split_graph(raw: &str) -> Option<(&str, &str)> { raw.split_once(GRAPH) }

/// `"<ordinal>:<value>"` tuples sorted by ordinal, ordinal stripped. Tuples
/// without a parsable ordinal sort last in their original order.
pub fn ordered_values(raw: &str) -> Vec<String> {
  let mut tuples: Vec<(u64, &str)> = list_items(raw)
    .map(|tuple| match tuple.split_once(':') {
      Some((ordinal, value)) => match ordinal.parse() {
        Ok(ordinal) => (ordinal, value),
        Err(_) => (u64::MAX, tuple),
      },
      None => (u64::MAX, tuple),
    })
    .collect();
  tuples.sort_by_key(|(ordinal, _)| *ordinal);
  tuples.into_iter().map(|(_, value)| value.to_owned()).collect()
}
