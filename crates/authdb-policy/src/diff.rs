//! Line-oriented context diff in the classic `*** / ---` layout.

/// Lines of unchanged text shown around the change.
pub const CONTEXT_LINES: usize = 3;

/// Renders the difference between `old` and `new` as a context diff.
///
/// Lines shared at the start and end of both texts are treated as unchanged,
/// and everything between them forms a single hunk. Returns an empty string
/// when the texts are identical.
pub fn context_diff(old: &str, new: &str, from_label: &str, to_label: &str) -> String {
    let a: Vec<&str> = old.split_inclusive('\n').collect();
    let b: Vec<&str> = new.split_inclusive('\n').collect();

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let max_suffix = a.len().min(b.len()) - prefix;
    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take(max_suffix)
        .take_while(|(x, y)| x == y)
        .count();

    let a_changed = prefix..a.len() - suffix;
    let b_changed = prefix..b.len() - suffix;
    if a_changed.is_empty() && b_changed.is_empty() {
        return String::new();
    }

    let first = prefix.saturating_sub(CONTEXT_LINES);
    let a_last = (a_changed.end + CONTEXT_LINES).min(a.len());
    let b_last = (b_changed.end + CONTEXT_LINES).min(b.len());

    let marker = match (a_changed.is_empty(), b_changed.is_empty()) {
        (false, false) => "! ",
        (false, true) => "- ",
        (true, false) => "+ ",
        (true, true) => unreachable!("identical texts return early"),
    };

    let mut out = String::new();
    out.push_str(&format!("*** {from_label}\n--- {to_label}\n***************\n"));

    out.push_str(&format!("*** {} ****\n", format_range(first, a_last)));
    if !a_changed.is_empty() {
        push_lines(&mut out, &a[first..a_changed.start], "  ");
        push_lines(&mut out, &a[a_changed.clone()], marker);
        push_lines(&mut out, &a[a_changed.end..a_last], "  ");
    }

    out.push_str(&format!("--- {} ----\n", format_range(first, b_last)));
    if !b_changed.is_empty() {
        push_lines(&mut out, &b[first..b_changed.start], "  ");
        push_lines(&mut out, &b[b_changed.clone()], marker);
        push_lines(&mut out, &b[b_changed.end..b_last], "  ");
    }

    out
}

/// One-based, inclusive line range; a single line prints as one number.
fn format_range(start: usize, stop: usize) -> String {
    let mut beginning = start + 1;
    let length = stop - start;
    if length == 0 {
        beginning -= 1;
    }
    if length <= 1 {
        return beginning.to_string();
    }
    format!("{},{}", beginning, beginning + length - 1)
}

fn push_lines(out: &mut String, lines: &[&str], marker: &str) {
    for line in lines {
        out.push_str(marker);
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push('\n');
        }
    }
}
