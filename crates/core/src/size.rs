const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;
const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Render a byte count the way upload responses show it.
///
/// The value is scaled to the largest unit (up to GB) that keeps it at or
/// above one, rounded to two decimals, with trailing zeros dropped:
/// `500_000` renders as `"488.28 KB"`, `1024` as `"1 KB"`.
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_owned();
    }

    let mut unit = 0;
    let mut scale = 1u64;
    while unit < UNITS.len() - 1 && bytes >= scale * KIB {
        scale *= KIB;
        unit += 1;
    }

    let value = bytes as f64 / scale as f64;
    format!("{} {}", trim_fraction(&format!("{value:.2}")), UNITS[unit])
}

/// Render a byte total in unrounded megabytes (`"<n> MB"`).
#[allow(clippy::cast_precision_loss)]
pub fn format_megabytes(bytes: u64) -> String {
    format!("{} MB", bytes as f64 / MIB as f64)
}

/// Render a byte average in unrounded kilobytes (`"<n> KB"`).
#[allow(clippy::cast_precision_loss)]
pub fn format_kilobytes(bytes: f64) -> String {
    format!("{} KB", bytes / KIB as f64)
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bytes() {
        assert_eq!(format_file_size(0), "0 Bytes");
    }

    #[test]
    fn small_values_stay_in_bytes() {
        assert_eq!(format_file_size(100), "100 Bytes");
        assert_eq!(format_file_size(1023), "1023 Bytes");
    }

    #[test]
    fn scales_and_trims() {
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(500_000), "488.28 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn caps_at_gigabytes() {
        assert_eq!(format_file_size(2048 * 1024 * 1024 * 1024), "2048 GB");
    }

    #[test]
    fn stats_renderings_are_unrounded() {
        assert_eq!(format_megabytes(1_048_576), "1 MB");
        assert_eq!(format_megabytes(524_288), "0.5 MB");
        assert_eq!(format_kilobytes(200.0), "0.1953125 KB");
        assert_eq!(format_kilobytes(0.0), "0 KB");
    }
}
