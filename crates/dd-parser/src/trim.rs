//! Whitespace trimming that reports how many characters were removed, so
//! callers can keep column positions relative to the untrimmed text.

/// Strip leading whitespace; returns the rest and the number of chars removed.
pub fn trim_start_counted(s: &str) -> (&str, usize) {
    let rest = s.trim_start();
    let removed = s[..s.len() - rest.len()].chars().count();
    (rest, removed)
}

/// Strip trailing whitespace; returns the rest and the number of chars removed.
pub fn trim_end_counted(s: &str) -> (&str, usize) {
    let rest = s.trim_end();
    let removed = s[rest.len()..].chars().count();
    (rest, removed)
}

/// Strip both ends; returns the rest plus the (leading, trailing) counts.
pub fn trim_counted(s: &str) -> (&str, usize, usize) {
    let (rest, leading) = trim_start_counted(s);
    let (rest, trailing) = trim_end_counted(rest);
    (rest, leading, trailing)
}
