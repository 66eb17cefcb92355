use std::error::Error;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

/// Lowercases and collapses runs of whitespace, so that `"Extra  Large"` and
/// `"extra large"` compare equal.
///
/// ```
/// assert_eq!(ordertree::utils::normalize_text(" Extra \t LARGE "), "extra large");
/// ```
pub fn normalize_text(s: &str) -> String {
  s.split_whitespace()
    .map(|w| w.to_lowercase())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Converts functional notation into the bracketed prefix notation used by
/// EXR strings, upper-casing every constructor on the way.
///
/// ```
/// assert_eq!(
///   ordertree::utils::to_prefix_notation("volume(2,LITER)"),
///   "(VOLUME 2 LITER )"
/// );
/// assert_eq!(
///   ordertree::utils::to_prefix_notation("A(B,C(D),E)"),
///   "(A B (C D ) E )"
/// );
/// ```
pub fn to_prefix_notation(s: &str) -> String {
  let spaced = s.replace(')', " )").replace('(', "( ").replace(',', " ");
  spaced
    .split_whitespace()
    .map(|word| match word.strip_suffix('(') {
      Some(head) => format!("({}", head.trim_matches('(').to_uppercase()),
      None => word.to_string(),
    })
    .collect::<Vec<_>>()
    .join(" ")
}
