//! Shared validation and normalization of request fields.

use chrono::{NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::{ServiceError, ServiceResult};

/// Distinguishes between a missing field (`None`) and an explicit `null` (`Some(None)`).
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Trimmed, non-empty text no longer than `max` characters.
pub fn required_text(field: &str, value: Option<&str>, max: usize) -> ServiceResult<String> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(ServiceError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value.to_string())
}

/// Normalize a price given as a JSON number or a numeric string
/// (`"1000"`, `" $1500.50 "`). Must be finite and non-negative.
pub fn normalize_price(value: &serde_json::Value) -> ServiceResult<f64> {
    let invalid = || ServiceError::validation("precio must be a non-negative number");
    let price = match value {
        serde_json::Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
        serde_json::Value::String(s) => {
            let cleaned: String = s
                .trim()
                .trim_start_matches('$')
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            if cleaned.is_empty() {
                return Err(ServiceError::validation("precio is required"));
            }
            cleaned.parse::<f64>().map_err(|_| invalid())?
        }
        _ => return Err(invalid()),
    };
    if !price.is_finite() || price < 0.0 {
        return Err(invalid());
    }
    Ok(price)
}

/// `YYYY-MM-DD`
pub fn validate_date(field: &str, value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.len() != 10 || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
        return Err(ServiceError::validation(format!(
            "{field} must use the YYYY-MM-DD format"
        )));
    }
    Ok(value.to_string())
}

/// `HH:mm`, 24-hour clock
pub fn validate_time(field: &str, value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.len() != 5 || NaiveTime::parse_from_str(value, "%H:%M").is_err() {
        return Err(ServiceError::validation(format!(
            "{field} must use the HH:mm format"
        )));
    }
    Ok(value.to_string())
}

pub fn parse_date(field: &str, value: &str) -> ServiceResult<NaiveDate> {
    let value = validate_date(field, value)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|_| ServiceError::validation(format!("{field} must use the YYYY-MM-DD format")))
}

/// Lowercase and strip common Spanish diacritics, for accent-insensitive
/// comparisons and sorting.
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_price_accepts_numbers_and_strings() {
        assert_eq!(normalize_price(&json!(1000)).unwrap(), 1000.0);
        assert_eq!(normalize_price(&json!("1000")).unwrap(), 1000.0);
        assert_eq!(normalize_price(&json!(" $1500.50 ")).unwrap(), 1500.5);
        assert_eq!(normalize_price(&json!("0")).unwrap(), 0.0);
    }

    #[test]
    fn test_normalize_price_rejects_garbage() {
        assert!(normalize_price(&json!("gratis")).is_err());
        assert!(normalize_price(&json!("")).is_err());
        assert!(normalize_price(&json!(-5)).is_err());
        assert!(normalize_price(&json!("NaN")).is_err());
        assert!(normalize_price(&json!("inf")).is_err());
        assert!(normalize_price(&json!(true)).is_err());
    }

    #[test]
    fn test_date_and_time_formats() {
        assert!(validate_date("fechaEvento", "2025-03-09").is_ok());
        assert!(validate_date("fechaEvento", "2025-3-9").is_err());
        assert!(validate_date("fechaEvento", "09/03/2025").is_err());
        assert!(validate_date("fechaEvento", "2025-02-30").is_err());

        assert!(validate_time("horaEvento", "18:30").is_ok());
        assert!(validate_time("horaEvento", "8:30").is_err());
        assert!(validate_time("horaEvento", "24:00").is_err());
    }

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("titulo", Some("  Feria "), 10).unwrap(), "Feria");
        assert!(required_text("titulo", Some("   "), 10).is_err());
        assert!(required_text("titulo", None, 10).is_err());
        assert!(required_text("titulo", Some("demasiado largo"), 5).is_err());
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("Árbol Ñandú"), "arbol nandu");
    }
}
