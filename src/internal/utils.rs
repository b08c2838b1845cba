use std::borrow::Cow;
use std::fmt::Write;

use crate::Label;

/// Escapes backslashes and newlines, and double quotes too when `quotes` is set. Returns the input untouched
/// when there is nothing to escape.
pub fn escape_str(s: &str, quotes: bool) -> Cow<'_, str> {
    let needs_escaping = s
        .chars()
        .any(|c| c == '\\' || c == '\n' || (quotes && c == '"'));
    if !needs_escaping {
        return Cow::Borrowed(s);
    }

    let mut escaped = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '"' if quotes => escaped.push_str("\\\""),
            c => escaped.push(c),
        }
    }

    Cow::Owned(escaped)
}

/// The inverse of `escape_str`. Any escape sequence other than `\\`, `\n` (and `\"` when `quotes` is set) is
/// rejected.
pub fn unescape_str(s: &str, quotes: bool) -> Result<String, String> {
    if !s.contains('\\') {
        return Ok(s.to_owned());
    }

    let mut unescaped = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }

        match chars.next() {
            Some('\\') => unescaped.push('\\'),
            Some('n') => unescaped.push('\n'),
            Some('"') if quotes => unescaped.push('"'),
            Some(other) => return Err(format!("invalid escape sequence '\\{}'", other)),
            None => return Err("unterminated escape sequence".to_owned()),
        }
    }

    Ok(unescaped)
}

/// Whether `name` fits `[a-zA-Z_:][a-zA-Z0-9_:]*`, the grammar that can be written without quoting.
pub fn is_valid_legacy_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Renders a float the way both exposition formats expect it: `NaN`, `+Inf` and `-Inf` as bare tokens, and
/// everything else as the shortest representation that parses back to the same value, switching to exponent
/// notation below 1e-4 and once the decimal exponent reaches the digit count (at least 6). A rendering that
/// would otherwise look like an integer gets a `.0` suffix.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_owned();
    }
    if f.is_infinite() {
        return if f > 0. { "+Inf" } else { "-Inf" }.to_owned();
    }
    if f == 0. {
        return "0.0".to_owned();
    }

    // `{:e}` yields the shortest round-tripping digits, e.g. `-1.2345e6`.
    let scientific = format!("{:e}", f);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => (scientific.as_str(), "0"),
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let negative = mantissa.starts_with('-');
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let num_digits = digits.len() as i32;
    let decimal_point = exponent + 1;

    let mut precision = 6;
    if precision > num_digits && num_digits >= decimal_point {
        precision = num_digits;
    }

    let mut rendered = String::with_capacity(digits.len() + 8);
    if negative {
        rendered.push('-');
    }

    if exponent < -4 || exponent >= precision {
        rendered.push_str(&digits[..1]);
        if num_digits > 1 {
            rendered.push('.');
            rendered.push_str(&digits[1..]);
        }
        let sign = if exponent < 0 { '-' } else { '+' };
        let _ = write!(rendered, "e{}{:02}", sign, exponent.abs());
        return rendered;
    }

    if decimal_point <= 0 {
        rendered.push_str("0.");
        for _ in 0..-decimal_point {
            rendered.push('0');
        }
        rendered.push_str(&digits);
    } else if decimal_point >= num_digits {
        rendered.push_str(&digits);
        for _ in 0..(decimal_point - num_digits) {
            rendered.push('0');
        }
        rendered.push_str(".0");
    } else {
        let (integral, fractional) = digits.split_at(decimal_point as usize);
        rendered.push_str(integral);
        rendered.push('.');
        rendered.push_str(fractional);
    }

    rendered
}

/// Parses a sample value, accepting the `+Inf`/`-Inf`/`NaN` spellings alongside plain decimals.
pub fn parse_float(s: &str) -> Option<f64> {
    match s {
        "+Inf" | "+inf" | "Inf" | "inf" => Some(f64::INFINITY),
        "-Inf" | "-inf" => Some(f64::NEG_INFINITY),
        "NaN" | "nan" => Some(f64::NAN),
        _ => {
            // Rust also accepts "infinity" and friends, which neither format allows.
            if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
                return None;
            }
            s.parse().ok()
        }
    }
}

/// Converts a value that has to be a count. Both `42` and `42.0` are accepted.
pub fn parse_count(s: &str) -> Option<u64> {
    if let Ok(count) = s.parse::<u64>() {
        return Some(count);
    }

    let f = parse_float(s)?;
    if f.is_finite() && f >= 0. && f.fract() == 0. && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

/// Writes a metric or label name, quoting it if it doesn't fit the legacy grammar.
pub fn write_name(out: &mut String, name: &str) {
    if is_valid_legacy_name(name) {
        out.push_str(name);
    } else {
        out.push('"');
        out.push_str(&escape_str(name, true));
        out.push('"');
    }
}

/// Finds the first label name that appears twice in a label set.
pub fn find_duplicate_label(labels: &[Label]) -> Option<&str> {
    labels
        .iter()
        .enumerate()
        .find(|(i, label)| labels[..*i].iter().any(|l| l.name == label.name))
        .map(|(_, label)| label.name.as_str())
}

/// Label sets are equal if they hold the same pairs, in any order.
pub fn same_labelset(a: &[Label], b: &[Label]) -> bool {
    a.len() == b.len() && a.iter().all(|label| b.contains(label))
}

/// Renders a label set the way it appears inside braces, for error messages.
pub fn render_label_values(labels: &[Label]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let labels: Vec<String> = labels
        .iter()
        .map(|l| format!("{}=\"{}\"", l.name, escape_str(&l.value, true)))
        .collect();

    format!("{{{}}}", labels.join(","))
}
