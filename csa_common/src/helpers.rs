use crate::{Money, MoneyConversionError};

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Payment gateways express amounts as decimal strings, e.g. "12.34".
pub fn parse_money_str(price: &str) -> Result<Money, MoneyConversionError> {
    let negative = price.trim().starts_with('-');
    let price = price.trim().trim_start_matches('-');
    let mut parts = price.split('.');
    let invalid = || MoneyConversionError::new(format!("Invalid price value: {price}"));
    let whole_units = parts.next().ok_or_else(invalid)?.parse::<i64>().map_err(|_| invalid())?;
    let cents = match parts.next() {
        None => 0,
        Some(c) if c.len() <= 2 => {
            let v = c.parse::<i64>().map_err(|_| invalid())?;
            if c.len() == 1 {
                v * 10
            } else {
                v
            }
        },
        Some(_) => return Err(invalid()),
    };
    let total = 100 * whole_units + cents;
    Ok(Money::from_cents(if negative { -total } else { total }))
}
