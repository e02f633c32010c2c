//! Timescale exponents and their `1ns` / `10ps` / `100us` spellings.

/// Parses a timescale such as `"1ns"`, `"10ps"` or `"100 us"` into a
/// power-of-ten exponent relative to one second.
///
/// The first unit letter decides the exponent; a leading `10` or `100`
/// raises it by one or two. Returns `None` when no unit letter is present or
/// the multiplier is not 1, 10 or 100.
pub fn parse_timescale(text: &str) -> Option<i8> {
    let text = text.trim();
    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let bump = match &text[..digits_end] {
        "" | "1" => 0,
        "10" => 1,
        "100" => 2,
        _ => return None,
    };
    let unit = text[digits_end..].trim_start().chars().next()?;
    let exponent: i8 = match unit {
        's' => 0,
        'm' => -3,
        'u' => -6,
        'n' => -9,
        'p' => -12,
        'f' => -15,
        'a' => -18,
        'z' => -21,
        _ => return None,
    };
    Some(exponent + bump)
}

/// Splits an exponent into its multiplier and unit prefix for text dumps.
///
/// Seconds use a single space as their prefix; unsupported exponents fall
/// back to nanoseconds.
pub fn timescale_parts(exponent: i8) -> (u32, &'static str) {
    let unit = match exponent {
        0..=2 => " ",
        -3..=-1 => "m",
        -6..=-4 => "u",
        -12..=-10 => "p",
        -15..=-13 => "f",
        -18..=-16 => "a",
        -21..=-19 => "z",
        -9..=-7 => "n",
        _ => return (1, "n"),
    };
    let scale = match exponent.rem_euclid(3) {
        2 => 100,
        1 => 10,
        _ => 1,
    };
    (scale, unit)
}

/// Formats an exponent the way `$timescale` prints it, e.g. `10ps`.
pub fn timescale_text(exponent: i8) -> String {
    let (scale, unit) = timescale_parts(exponent);
    format!("{scale}{unit}s")
}
