//! Rendering spreadsheet cells as CSV field text.

use calamine::{Data, ExcelDateTime};

/// Largest magnitude at which every integer is exactly representable in f64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Converts one cell to the text written into the CSV field.
///
/// - Empty cells become empty fields
/// - Whole floats print without a fractional part (`3.0` → `3`)
/// - Booleans print as `TRUE` / `FALSE`
/// - Date serials print as ISO-8601
/// - Error cells print their Excel code (`#DIV/0!`)
pub fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => render_float(*f),
        Data::Bool(true) => "TRUE".to_string(),
        Data::Bool(false) => "FALSE".to_string(),
        Data::DateTime(dt) => render_datetime(dt),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

/// Formats a float, dropping `.0` from whole numbers.
pub fn render_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        // Whole and within the exact range, so the cast is lossless.
        #[allow(clippy::cast_possible_truncation)]
        let whole = value as i64;
        whole.to_string()
    } else {
        value.to_string()
    }
}

fn render_datetime(value: &ExcelDateTime) -> String {
    if value.is_duration() {
        return render_float(value.as_f64());
    }

    match value.as_datetime() {
        Some(dt) if dt.time() == chrono::NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        // Serial outside chrono's range; keep the raw number
        None => render_float(value.as_f64()),
    }
}
