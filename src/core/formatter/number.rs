/// Formats a figure reported in thousands with a `T`/`B`/`M` suffix.
pub fn format_number(value: f64, is_currency: bool) -> String {
    let abs = value.abs();
    let scaled = if abs >= 1e9 {
        format!("{:.2}T", abs / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}B", abs / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}M", abs / 1e3)
    } else {
        format!("{abs:.2}")
    };

    let sign = if value < 0.0 { "-" } else { "" };
    let currency = if is_currency { "$" } else { "" };
    format!("{sign}{currency}{scaled}")
}
