/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    // -0.004 rounds to 0.00 and should not print as negative
    if val < 0.0 && cents != "0.00" {
        format!("-${grouped}.{dec_part}")
    } else {
        format!("${grouped}.{dec_part}")
    }
}

/// A dash for an empty pivot cell, money otherwise.
pub fn cell(val: Option<f64>) -> String {
    match val {
        Some(v) => money(v),
        None => "\u{2014}".to_string(),
    }
}

pub fn percent(done: usize, total: usize) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.0}%", done as f64 / total as f64 * 100.0)
}
