//! Canonicalisation of raw operator / OCR input.
//!
//! Every identifier that reaches the extractor or the ledger has been through
//! [`normalize`]: trimmed, internal whitespace collapsed to single spaces,
//! uppercased. Comparison everywhere downstream is exact string equality on
//! that canonical form — the ledger itself does no further case-folding.

/// Canonicalise one raw value. Returns `None` for missing or effectively
/// empty input; absence of data is not an identifier.
pub fn normalize(raw: Option<&str>) -> Option<String> {
  let raw = raw?;
  let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
  if collapsed.is_empty() {
    return None;
  }
  Some(collapsed.to_uppercase())
}

/// Split a multi-valued field on `separator`, normalize each piece, drop
/// empties, and de-duplicate preserving first-seen order.
pub fn split_multi(raw: Option<&str>, separator: char) -> Vec<String> {
  let Some(joined) = normalize(raw) else {
    return Vec::new();
  };

  let mut out: Vec<String> = Vec::new();
  for piece in joined.split(separator) {
    if let Some(v) = normalize(Some(piece)) {
      if !out.contains(&v) {
        out.push(v);
      }
    }
  }
  out
}

/// Join normalized values back into the canonical stored form. Returns `None`
/// when nothing survives normalization. Inverse of [`split_multi`]:
/// `split_multi(join_multi(split_multi(x))) == split_multi(x)`.
pub fn join_multi<I, S>(values: I, separator: char) -> Option<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let vals: Vec<String> = values
    .into_iter()
    .filter_map(|v| normalize(Some(v.as_ref())))
    .collect();

  if vals.is_empty() {
    return None;
  }
  Some(vals.join(&separator.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_trims_collapses_and_uppercases() {
    assert_eq!(normalize(Some("  abc   123 ")), Some("ABC 123".to_owned()));
    assert_eq!(normalize(Some("x")), Some("X".to_owned()));
  }

  #[test]
  fn normalize_empty_is_none() {
    assert_eq!(normalize(None), None);
    assert_eq!(normalize(Some("")), None);
    assert_eq!(normalize(Some("   ")), None);
  }

  #[test]
  fn split_multi_normalizes_and_dedups_in_order() {
    assert_eq!(split_multi(Some("T1/ T1 /t2"), '/'), vec!["T1", "T2"]);
  }

  #[test]
  fn split_multi_drops_empty_pieces() {
    assert_eq!(split_multi(Some("//a//b/"), '/'), vec!["A", "B"]);
    assert!(split_multi(Some("  "), '/').is_empty());
    assert!(split_multi(None, '/').is_empty());
  }

  #[test]
  fn join_multi_joins_and_skips_blanks() {
    assert_eq!(
      join_multi(["T1", " ", "t2"], '/'),
      Some("T1/T2".to_owned())
    );
    assert_eq!(join_multi(Vec::<&str>::new(), '/'), None);
  }

  #[test]
  fn split_join_round_trip() {
    for raw in ["T1/ T1 /t2", "a/b/c", " x ", "", "q//q"] {
      let once = split_multi(Some(raw), '/');
      let joined = join_multi(once.iter().map(String::as_str), '/');
      let twice = split_multi(joined.as_deref(), '/');
      assert_eq!(once, twice, "round-trip failed for {raw:?}");
    }
  }
}
