//! Free-text descriptors: roll widths in component names and label
//! dimensions in article names.

fn is_measure_char(c: char) -> bool {
    c.is_ascii_digit() || c == ',' || c == '.'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn run_end(chars: &[char], start: usize, pred: impl Fn(char) -> bool) -> usize {
    let mut i = start;
    while i < chars.len() && pred(chars[i]) {
        i += 1;
    }
    i
}

/// Matches a case-insensitive `mm` at `i`, returning the index after it.
fn match_mm(chars: &[char], i: usize) -> Option<usize> {
    match (chars.get(i), chars.get(i + 1)) {
        (Some(a), Some(b)) if a.eq_ignore_ascii_case(&'m') && b.eq_ignore_ascii_case(&'m') => {
            Some(i + 2)
        }
        _ => None,
    }
}

/// Roll width from a component name such as `LAMINADO FILM PETG 280 MM 45 MIC`.
///
/// The first run of digits followed by optional whitespace and `MM` (any
/// case), itself followed by whitespace or the end of the text, wins.
pub fn detect_roll_width_mm(component_name: &str) -> Option<f64> {
    let chars: Vec<char> = component_name.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let digits_end = run_end(&chars, i, |c| c.is_ascii_digit());
        let unit = skip_whitespace(&chars, digits_end);
        if let Some(after) = match_mm(&chars, unit)
            && chars.get(after).is_none_or(|c| c.is_whitespace())
        {
            let digits: String = chars[i..digits_end].iter().collect();
            return digits.parse::<f64>().ok();
        }
        i = digits_end;
    }
    None
}

/// Detected roll width, or `standard_mm` when the name carries none.
pub fn resolve_roll_width(component_name: Option<&str>, standard_mm: f64) -> f64 {
    component_name
        .and_then(detect_roll_width_mm)
        .unwrap_or(standard_mm)
}

/// Drops a stray dot in front of a number at the start of the text or after
/// whitespace: `.219.5x100` reads as `219.5x100`.
fn strip_stray_dots(s: &str) -> Vec<char> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    for (i, &c) in chars.iter().enumerate() {
        let at_boundary = i == 0 || chars[i - 1].is_whitespace();
        let before_digit = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
        if c == '.' && at_boundary && before_digit {
            continue;
        }
        out.push(c);
    }
    out
}

fn parse_measure(raw: &[char]) -> Option<f64> {
    let text: String = raw.iter().map(|&c| if c == ',' { '.' } else { c }).collect();
    text.trim_start_matches('.').parse::<f64>().ok()
}

fn find_pair(chars: &[char]) -> Option<(f64, f64)> {
    let mut i = 0;
    while i < chars.len() {
        if !is_measure_char(chars[i]) {
            i += 1;
            continue;
        }
        let first_end = run_end(chars, i, is_measure_char);
        let sep = skip_whitespace(chars, first_end);
        if matches!(chars.get(sep), Some('x' | 'X')) {
            let second_start = skip_whitespace(chars, sep + 1);
            let second_end = run_end(chars, second_start, is_measure_char);
            if second_end > second_start {
                return parse_measure(&chars[i..first_end])
                    .zip(parse_measure(&chars[second_start..second_end]));
            }
        }
        i = first_end;
    }
    None
}

fn find_single(chars: &[char]) -> Option<f64> {
    let mut i = 0;
    while i < chars.len() {
        if !is_measure_char(chars[i]) {
            i += 1;
            continue;
        }
        let end = run_end(chars, i, is_measure_char);
        let unit = skip_whitespace(chars, end);
        if let Some(after) = match_mm(chars, unit)
            && !chars.get(after).is_some_and(|&c| is_word_char(c))
        {
            return parse_measure(&chars[i..end]);
        }
        i = end;
    }
    None
}

/// Label `(height, width)` in mm from an article name.
///
/// Looks for an `A x B` pair first (`,` or `.` as decimal separator). Failing
/// that, a single `N mm` measure describes a square label.
pub fn parse_label_dimensions(article_name: &str) -> Option<(f64, f64)> {
    let chars = strip_stray_dots(article_name);
    if let Some(pair) = find_pair(&chars) {
        return Some(pair);
    }
    find_single(&chars).map(|m| (m, m))
}
