//! Value parsers for command-line arguments

use cashier_core::billing::PlanItem;

/// Parse a boolean flag value
///
/// Accepts `true/false`, `yes/no`, `on/off` and `1/0`, ignoring case.
pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "on" | "1" => Ok(true),
        "false" | "no" | "n" | "off" | "0" => Ok(false),
        other => Err(format!(
            "'{other}' is not a boolean (expected true/false, yes/no or 1/0)"
        )),
    }
}

/// Parse a batch size; zero and negative values are rejected
pub fn parse_chunk_size(value: &str) -> Result<i64, String> {
    let size: i64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not an integer"))?;
    if size <= 0 {
        return Err(format!("chunk size must be a positive integer, got {size}"));
    }
    Ok(size)
}

/// Tax percentage between 0 and 100
pub fn parse_tax_percentage(value: &str) -> Result<f64, String> {
    let percent: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if !(0.0..=100.0).contains(&percent) {
        return Err(format!("tax percentage must be between 0 and 100, got {percent}"));
    }
    Ok(percent)
}

/// Parse `PLAN` or `PLAN:QUANTITY`
pub fn parse_plan(value: &str) -> Result<PlanItem, String> {
    let (plan, quantity) = match value.rsplit_once(':') {
        Some((plan, quantity)) => {
            let quantity: u64 = quantity
                .parse()
                .map_err(|_| format!("invalid quantity '{quantity}' for plan '{plan}'"))?;
            (plan, quantity)
        }
        None => (value, 1),
    };

    if plan.is_empty() {
        return Err("plan id must not be empty".to_string());
    }

    Ok(PlanItem {
        plan: plan.to_string(),
        quantity,
    })
}

/// Parse `KEY=VALUE`
pub fn parse_key_value(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{value}'")),
    }
}
