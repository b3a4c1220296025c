// Typed coercions over sanitized response values
//
// Values arrive as `serde_json::Value` leaves after `ResponseCodec`
// sanitization: booleans for yes/no, `null` for unlimited, text for
// everything else.

use serde_json::{Map, Value};

use crate::codec::UNLIMITED;
use crate::error::Error;

/// Config keys that accept the unlimited sentinel on `MODIFY_USER`.
///
/// Each has a companion `u<key>=ON` flag the panel checks instead of the value.
pub const UNLIMITED_OPTIONS: &[&str] = &[
    "bandwidth",
    "domainptr",
    "ftp",
    "mysql",
    "nemailf",
    "nemailml",
    "nemailr",
    "nemails",
    "nsubdomains",
    "quota",
    "vdomains",
];

/// Strict boolean coercion.
///
/// `yes`, `on`, `1` and JSON `true` are true; `no`, `off`, `0`, JSON
/// `false` and an absent value are false. Text comparison ignores ASCII case because the
/// panel mixes `yes` with `ON`. Anything else is a decode error.
pub fn to_bool(value: Option<&Value>) -> Result<bool, Error> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(Error::decode(format!("not a boolean: {n}"))),
        },
        Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "yes" | "on" | "1" => Ok(true),
            "no" | "off" | "0" => Ok(false),
            _ => Err(Error::decode(format!("not a boolean: {s:?}"))),
        },
        Some(other) => Err(Error::decode(format!("not a boolean: {other}"))),
    }
}

/// Parse a limit in megabytes. `None` means unlimited; zero stays zero.
pub fn to_limit(value: Option<&Value>) -> Result<Option<f64>, Error> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(other) => to_amount(Some(other)).map(Some),
    }
}

/// Parse a count limit. `None` means unlimited; zero stays zero.
pub fn to_count_limit(value: Option<&Value>) -> Result<Option<u64>, Error> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(other) => to_count(Some(other)).map(Some),
    }
}

/// Parse a measured amount (usage). Absent is zero.
pub fn to_amount(value: Option<&Value>) -> Result<f64, Error> {
    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| Error::decode(format!("not a number: {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::decode(format!("not a number: {s:?}"))),
        Some(other) => Err(Error::decode(format!("not a number: {other}"))),
    }
}

/// Parse a whole count (usage). Absent is zero.
pub fn to_count(value: Option<&Value>) -> Result<u64, Error> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| Error::decode(format!("not a count: {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::decode(format!("not a count: {s:?}"))),
        Some(other) => Err(Error::decode(format!("not a count: {other}"))),
    }
}

/// Optional text value; empty text reads as absent.
pub fn to_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// The panel's flag encoding.
pub fn on_off(value: bool) -> &'static str {
    if value { "ON" } else { "OFF" }
}

/// Rewrite unlimited limits into the panel's `u<key>=ON` form.
///
/// A `null` or `"unlimited"` value keeps the sentinel text as its value
/// and gains the companion flag; any stale flag is dropped otherwise.
pub fn process_unlimited_options(options: &mut Map<String, Value>) {
    for key in UNLIMITED_OPTIONS {
        let flag = format!("u{key}");
        options.remove(&flag);

        let unlimited = match options.get(*key) {
            Some(Value::Null) => true,
            Some(Value::String(s)) => s == UNLIMITED,
            _ => false,
        };
        if unlimited {
            options.insert((*key).to_owned(), Value::String(UNLIMITED.to_owned()));
            options.insert(flag, Value::String("ON".to_owned()));
        }
    }
}

/// Flatten a config map into form pairs.
///
/// Booleans go back to `yes`/`no`, lists are comma-joined, `null` becomes
/// the unlimited sentinel. Nested maps have no form encoding and are skipped.
pub fn to_form_pairs(options: &Map<String, Value>) -> Vec<(String, String)> {
    options
        .iter()
        .filter_map(|(key, value)| {
            let encoded = match value {
                Value::Null => UNLIMITED.to_owned(),
                Value::Bool(b) => (if *b { "yes" } else { "no" }).to_owned(),
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(|item| to_text(Some(item)))
                    .collect::<Vec<_>>()
                    .join(","),
                Value::Object(_) => return None,
            };
            Some((key.clone(), encoded))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn to_bool_accepts_documented_domain() {
        for truthy in [json!("yes"), json!("on"), json!("ON"), json!("1"), json!(true), json!(1)] {
            assert!(to_bool(Some(&truthy)).unwrap(), "{truthy}");
        }
        for falsy in [json!("no"), json!("off"), json!("OFF"), json!("0"), json!(false), json!(0)] {
            assert!(!to_bool(Some(&falsy)).unwrap(), "{falsy}");
        }
        assert!(!to_bool(None).unwrap());
    }

    #[test]
    fn to_bool_rejects_other_values() {
        assert!(to_bool(Some(&json!("maybe"))).is_err());
        assert!(to_bool(Some(&json!(2))).is_err());
        assert!(to_bool(Some(&json!(["yes"]))).is_err());
        for text in ["true", "false", ""] {
            assert!(to_bool(Some(&json!(text))).is_err(), "{text:?}");
        }
    }

    #[test]
    fn limits_distinguish_unlimited_from_zero() {
        assert_eq!(to_limit(Some(&Value::Null)).unwrap(), None);
        assert_eq!(to_limit(None).unwrap(), None);
        assert_eq!(to_limit(Some(&json!("0"))).unwrap(), Some(0.0));
        assert_eq!(to_limit(Some(&json!("1024.5"))).unwrap(), Some(1024.5));
        assert_eq!(to_count_limit(Some(&json!("10"))).unwrap(), Some(10));
        assert!(to_count_limit(Some(&json!("ten"))).is_err());
    }

    #[test]
    fn usage_defaults_to_zero() {
        assert_eq!(to_amount(None).unwrap(), 0.0);
        assert_eq!(to_count(Some(&json!(""))).unwrap(), 0);
        assert_eq!(to_count(Some(&json!("7"))).unwrap(), 7);
    }

    #[test]
    fn unlimited_options_gain_flag() {
        let mut options = json!({
            "bandwidth": null,
            "quota": "500",
            "uquota": "ON",
            "vdomains": "unlimited",
        })
        .as_object()
        .cloned()
        .unwrap();

        process_unlimited_options(&mut options);

        assert_eq!(options["bandwidth"], json!("unlimited"));
        assert_eq!(options["ubandwidth"], json!("ON"));
        assert_eq!(options["quota"], json!("500"));
        assert!(!options.contains_key("uquota"));
        assert_eq!(options["uvdomains"], json!("ON"));
    }

    #[test]
    fn form_pairs_reencode_sanitized_values() {
        let options = json!({
            "suspended": false,
            "ips": ["10.0.0.1", "10.0.0.2"],
            "quota": 250,
            "bandwidth": null,
            "nested": {"a": "b"},
        })
        .as_object()
        .cloned()
        .unwrap();

        let pairs = to_form_pairs(&options);

        assert!(pairs.contains(&("suspended".into(), "no".into())));
        assert!(pairs.contains(&("ips".into(), "10.0.0.1,10.0.0.2".into())));
        assert!(pairs.contains(&("quota".into(), "250".into())));
        assert!(pairs.contains(&("bandwidth".into(), "unlimited".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "nested"));
    }
}
