//! Pure formatting helpers for presenting instrument readings.
//!
//! Nothing here touches the serial link; consumers feed these functions the
//! driver's outputs.

/// Readings at or beyond this magnitude are range overflows, not values.
pub const OVERLOAD_LIMIT: f64 = 1e9;

pub fn is_overload(value: f64) -> bool {
    value >= OVERLOAD_LIMIT
}

/// Human-readable name for a `FUNC?` token; `None` for tokens the
/// instrument is not known to report, so callers can treat those as errors.
pub fn function_name(func: &str) -> Option<&'static str> {
    match func {
        "RES" => Some("Resistance"),
        "CONT" => Some("Continuity"),
        "DIOD" => Some("Diode"),
        "CURR" => Some("Current"),
        "CURR AC" => Some("Current (AC)"),
        "VOLT" => Some("Voltage"),
        "VOLT AC" => Some("Voltage (AC)"),
        "CAP" => Some("Capacitance"),
        "FREQ" => Some("Frequency"),
        _ => None,
    }
}

/// Base unit symbol for a `FUNC?` token; empty for continuity and unknown
/// tokens.
pub fn function_unit(func: &str) -> &'static str {
    match func {
        "RES" => "Ω",
        "DIOD" => "V",
        "CURR" | "CURR AC" => "A",
        "VOLT" | "VOLT AC" => "V",
        "CAP" => "F",
        "FREQ" => "Hz",
        _ => "",
    }
}

/// Rescale to p/n/µ/m/K/M so the mantissa stays readable, keeping the sign.
pub fn scale_to_prefix(value: f64, base_unit: &str) -> (f64, String) {
    let mut unit = base_unit.to_string();
    let mut scaled = value.abs();

    if scaled < 0.001 {
        unit = format!("m{}", base_unit);
        scaled *= 1000.0;
        if scaled < 0.001 {
            unit = format!("µ{}", base_unit);
            scaled *= 1000.0;
            if scaled < 0.001 {
                unit = format!("n{}", base_unit);
                scaled *= 1000.0;
                if scaled < 0.001 {
                    unit = format!("p{}", base_unit);
                    scaled *= 1000.0;
                }
            }
        }
    } else if scaled > 1000.0 {
        unit = format!("K{}", base_unit);
        scaled /= 1000.0;
        if scaled > 1000.0 {
            unit = format!("M{}", base_unit);
            scaled /= 1000.0;
        }
    }

    (if value < 0.0 { -scaled } else { scaled }, unit)
}

/// Reading formatted for a label: `"overload"` beyond the display range,
/// otherwise the prefix-scaled value with two decimals and the unit
/// appended.
pub fn format_reading(func: &str, value: f64) -> String {
    if is_overload(value) {
        return "overload".to_string();
    }
    let (scaled, unit) = scale_to_prefix(value, function_unit(func));
    format!("{:.2}{}", scaled, unit)
}

/// Continuity judgement against the instrument's configured threshold.
pub fn continuity_state(value: f64, threshold: f64) -> &'static str {
    if value > threshold {
        "open"
    } else {
        "closed"
    }
}
