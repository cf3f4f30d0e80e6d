//! Slug derivation for field labels and KPI names.

use deunicode::deunicode;

/// Transliterate `text` to ASCII, lower-case it and collapse every run of
/// non-alphanumeric characters into a single `-`. Leading and trailing
/// separators are dropped.
pub fn slugify(text: &str) -> String {
  let ascii = deunicode(text);
  let mut out = String::with_capacity(ascii.len());
  let mut pending_dash = false;
  for c in ascii.chars() {
    if c.is_ascii_alphanumeric() {
      if pending_dash && !out.is_empty() {
        out.push('-');
      }
      pending_dash = false;
      out.push(c.to_ascii_lowercase());
    } else {
      pending_dash = true;
    }
  }
  out
}
