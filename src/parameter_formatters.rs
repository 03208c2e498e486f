use std::sync::Arc;

type V2SFormatter = dyn Fn(f32) -> String + Send + Sync;
type S2VFormatter = dyn Fn(&str) -> Option<f32> + Send + Sync;

/// Format a millisecond value with a fixed number of decimals, e.g. `12.5 ms`. Attack and release
/// never reach a full second so there's no switch to seconds.
pub(crate) fn v2s_f32_ms(digits: usize) -> Arc<V2SFormatter> {
    Arc::new(move |value| format!("{value:.digits$} ms"))
}

/// Parse the output of [`v2s_f32_ms()`]. Bare numbers are milliseconds, a trailing `s` without
/// the `m` means seconds.
pub(crate) fn s2v_f32_ms() -> Arc<S2VFormatter> {
    Arc::new(move |string| {
        let string = string.trim();
        let value: f32 = string
            .trim_end_matches([' ', 'm', 'M', 's', 'S'])
            .parse()
            .ok()?;

        let lower = string.to_ascii_lowercase();
        if lower.ends_with("ms") {
            Some(value)
        } else if lower.ends_with('s') {
            Some(value * 1000.0)
        } else {
            Some(value)
        }
    })
}

/// Format a decibel value with an explicit sign, e.g. `+3.0 dB` or `-12.5 dB`
pub(crate) fn v2s_f32_db_signed(digits: usize) -> Arc<V2SFormatter> {
    Arc::new(move |value| {
        // avoid printing `-0.0 dB`
        let value = if value == 0.0 { 0.0 } else { value };
        format!("{value:+.digits$} dB")
    })
}

/// Parse a decibel value, with or without the unit and sign
pub(crate) fn s2v_f32_db() -> Arc<S2VFormatter> {
    Arc::new(move |string| {
        string
            .trim()
            .trim_end_matches([' ', 'd', 'D', 'b', 'B'])
            .trim_start_matches('+')
            .parse()
            .ok()
    })
}
