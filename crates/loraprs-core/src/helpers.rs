//! Formatting helpers for log lines and CLI output.

/// Format a frequency in hertz as a human-readable MHz string.
///
/// Six decimal places keep single-hertz corrections visible.
///
/// # Example
///
/// ```
/// use loraprs_core::format_freq_mhz;
///
/// assert_eq!(format_freq_mhz(433_775_000), "433.775000 MHz");
/// assert_eq!(format_freq_mhz(433_774_850), "433.774850 MHz");
/// ```
pub fn format_freq_mhz(freq_hz: u64) -> String {
    let mhz = freq_hz as f64 / 1_000_000.0;
    format!("{mhz:.6} MHz")
}

/// Format bytes as space-separated upper-case hex pairs.
///
/// # Example
///
/// ```
/// use loraprs_core::format_hex;
///
/// assert_eq!(format_hex(&[0xC0, 0x00, 0x41]), "C0 00 41");
/// assert_eq!(format_hex(&[]), "");
/// ```
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex text such as `"C0 00 41"`, `"c00041"` or `"0xC0,0x00"`.
///
/// Whitespace, commas, colons and `0x` prefixes are ignored. Returns `None`
/// for an odd number of digits or any non-hex character.
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: String = text
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .map(|tok| {
            tok.strip_prefix("0x")
                .or_else(|| tok.strip_prefix("0X"))
                .unwrap_or(tok)
        })
        .collect();

    if digits.len() % 2 != 0 {
        return None;
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok())
        .collect()
}
