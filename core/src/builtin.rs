//! Built-in primitive formats.
//!
//! Every built-in accepts `null` and passes it through unchanged, so an
//! explicitly nulled property never fails validation. Numeric formats
//! coerce numeric strings (`"8080"`), and the string-shaped formats
//! (`url`, `ip`, `email`, ...) only accept JSON strings.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use uuid::{Uuid, Variant};

use crate::format::Format;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^
        (?:(?:https?|ftp)://)?
        (?:[^\s:@/]+(?::[^\s@/]*)?@)?
        (?:
            \[[0-9A-Fa-f:.]+\]
          | [A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?
            (?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*
        )
        (?::\d{1,5})?
        (?:[/?\#]\S*)?
        $",
    )
    .expect("static regex must compile")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("static regex must compile")
});

static HEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:0[xh])?[0-9a-f]+$").expect("static regex must compile")
});

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*([A-Za-z]*)\s*$").expect("static regex must compile")
});

const WINDOWS_PIPE_PREFIX: &str = r"\\.\pipe\";

/// The primitive formats available to every configuration.
///
/// # Examples
///
/// ```
/// use config_schema_core::{BuiltinFormat, Format};
/// use serde_json::json;
///
/// let duration = BuiltinFormat::from_name("duration").unwrap();
/// assert!(duration.validate(&json!("2 minutes")));
/// assert_eq!(duration.parse(json!("2 minutes")), json!(120_000));
///
/// let size = BuiltinFormat::from_name("bytesize").unwrap();
/// assert_eq!(size.parse(json!("4kb")), json!(4096));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFormat {
    Boolean,
    String,
    Number,
    Int,
    /// Integer `>= 0`.
    NatNum,
    /// Finite number `>= 0`.
    PosNum,
    Url,
    Ip,
    Port,
    /// Windows named pipe address (`\\.\pipe\name`).
    Wnp,
    Email,
    Uuid,
    Uuid3,
    Uuid4,
    Uuid5,
    Hex,
    /// Milliseconds, from an integer or `"<n> <unit>"`.
    Duration,
    /// Bytes, from an integer or `"<n><unit>"` with binary multiples.
    ByteSize,
}

impl BuiltinFormat {
    /// Every built-in, in registry order.
    pub const ALL: &'static [BuiltinFormat] = &[
        Self::Boolean,
        Self::String,
        Self::Number,
        Self::Int,
        Self::NatNum,
        Self::PosNum,
        Self::Url,
        Self::Ip,
        Self::Port,
        Self::Wnp,
        Self::Email,
        Self::Uuid,
        Self::Uuid3,
        Self::Uuid4,
        Self::Uuid5,
        Self::Hex,
        Self::Duration,
        Self::ByteSize,
    ];

    /// Registry name of this format.
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Number => "number",
            Self::Int => "int",
            Self::NatNum => "natnum",
            Self::PosNum => "posnum",
            Self::Url => "url",
            Self::Ip => "ip",
            Self::Port => "port",
            Self::Wnp => "wnp",
            Self::Email => "email",
            Self::Uuid => "uuid",
            Self::Uuid3 => "uuid3",
            Self::Uuid4 => "uuid4",
            Self::Uuid5 => "uuid5",
            Self::Hex => "hex",
            Self::Duration => "duration",
            Self::ByteSize => "bytesize",
        }
    }

    /// Looks up a built-in by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<&'static BuiltinFormat> {
        Self::ALL
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl Format for BuiltinFormat {
    fn validate(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            Self::Boolean => to_bool(value).is_some(),
            Self::String => matches!(value, Value::String(_)) || to_number(value).is_some(),
            Self::Number => to_number(value).is_some(),
            Self::Int => to_integer(value).is_some(),
            Self::NatNum => to_integer(value).is_some_and(|n| n >= 0),
            Self::PosNum => to_number(value).is_some_and(|n| n >= 0.0),
            Self::Url => value
                .as_str()
                .is_some_and(|s| s.is_empty() || URL_RE.is_match(s)),
            Self::Ip => value.as_str().is_some_and(|s| s.parse::<IpAddr>().is_ok()),
            Self::Port => to_integer(value).is_some_and(|n| (0..=65535).contains(&n)),
            Self::Wnp => value
                .as_str()
                .is_some_and(|s| s.starts_with(WINDOWS_PIPE_PREFIX)),
            Self::Email => value.as_str().is_some_and(|s| EMAIL_RE.is_match(s)),
            Self::Uuid => to_uuid(value).is_some(),
            Self::Uuid3 => to_uuid(value).is_some_and(|id| id.get_version_num() == 3),
            Self::Uuid4 => to_uuid(value).is_some_and(|id| is_rfc_version(&id, 4)),
            Self::Uuid5 => to_uuid(value).is_some_and(|id| is_rfc_version(&id, 5)),
            Self::Hex => value.as_str().is_some_and(|s| HEX_RE.is_match(s)),
            Self::Duration => to_duration_ms(value).is_some(),
            Self::ByteSize => to_bytes(value).is_some(),
        }
    }

    fn parse(&self, value: Value) -> Value {
        if value.is_null() {
            return value;
        }
        let parsed = match self {
            Self::Boolean => to_bool(&value).map(Value::Bool),
            Self::String => to_string_form(&value).map(Value::String),
            Self::Number | Self::PosNum => to_number(&value).map(number_value),
            Self::Int | Self::NatNum | Self::Port => to_integer(&value).map(Value::from),
            Self::Duration => to_duration_ms(&value).map(Value::from),
            Self::ByteSize => to_bytes(&value).map(Value::from),
            Self::Url
            | Self::Ip
            | Self::Wnp
            | Self::Email
            | Self::Uuid
            | Self::Uuid3
            | Self::Uuid4
            | Self::Uuid5
            | Self::Hex => None,
        };
        parsed.unwrap_or(value)
    }
}

/// Whole-string numeric coercion. Non-finite results are rejected.
pub(crate) fn to_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Numeric coercion that only accepts integral values representable as `i64`.
pub(crate) fn to_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = to_number(value)?;
    // 2^63 is exactly representable, so the bounds are exact.
    if f.fract() == 0.0 && f >= -9_223_372_036_854_775_808.0 && f < 9_223_372_036_854_775_808.0 {
        Some(f as i64)
    } else {
        None
    }
}

/// Produces a JSON integer for integral values, otherwise a float.
fn number_value(f: f64) -> Value {
    const SAFE: f64 = 9_007_199_254_740_992.0;
    if f.fract() == 0.0 && f.abs() <= SAFE {
        Value::from(f as i64)
    } else {
        serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(_) => to_integer(value).map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "t" | "yes" | "y" => Some(true),
            "false" | "0" | "f" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn to_string_form(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_f64() => {
            let f = to_number(value)?;
            match number_value(f) {
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses the canonical hyphenated 8-4-4-4-12 form, in either case.
fn to_uuid(value: &Value) -> Option<Uuid> {
    let s = value.as_str()?;
    // `parse_str` also takes the simple, braced and urn forms.
    if s.len() != 36 {
        return None;
    }
    Uuid::parse_str(s).ok()
}

fn is_rfc_version(id: &Uuid, version: usize) -> bool {
    id.get_version_num() == version && id.get_variant() == Variant::RFC4122
}

fn duration_unit_ms(unit: &str) -> Option<u64> {
    fn base(unit: &str) -> Option<u64> {
        let ms = match unit {
            "" | "ms" | "millisecond" => 1,
            "s" | "sec" | "second" => 1_000,
            "m" | "min" | "minute" => 60_000,
            "h" | "hour" => 3_600_000,
            "d" | "day" => 86_400_000,
            "w" | "week" => 604_800_000,
            "M" | "month" => 2_592_000_000,
            "y" | "year" => 31_536_000_000,
            _ => return None,
        };
        Some(ms)
    }
    base(unit).or_else(|| unit.strip_suffix('s').and_then(base))
}

fn bytesize_unit(unit: &str) -> Option<u64> {
    let factor = match unit.to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1 << 10,
        "mb" => 1 << 20,
        "gb" => 1 << 30,
        "tb" => 1 << 40,
        _ => return None,
    };
    Some(factor)
}

/// Splits `"<digits> <unit>"` and scales the amount by the unit factor.
fn scaled_amount(value: &Value, unit_factor: fn(&str) -> Option<u64>) -> Option<u64> {
    match value {
        Value::Number(_) => to_integer(value).and_then(|n| u64::try_from(n).ok()),
        Value::String(s) => {
            let caps = AMOUNT_RE.captures(s)?;
            let amount: u64 = caps[1].parse().ok()?;
            let factor = unit_factor(&caps[2])?;
            amount.checked_mul(factor)
        }
        _ => None,
    }
}

fn to_duration_ms(value: &Value) -> Option<u64> {
    scaled_amount(value, duration_unit_ms)
}

fn to_bytes(value: &Value) -> Option<u64> {
    scaled_amount(value, bytesize_unit)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn valid(format: BuiltinFormat, value: Value) -> bool {
        format.validate(&value)
    }

    fn parsed(format: BuiltinFormat, value: Value) -> Value {
        assert!(format.validate(&value), "{value} should be valid {format:?}");
        format.parse(value)
    }

    #[test]
    fn test_every_builtin_accepts_null() {
        for format in BuiltinFormat::ALL {
            assert!(format.validate(&Value::Null), "{format:?}");
            assert_eq!(format.parse(Value::Null), Value::Null);
        }
    }

    #[test]
    fn test_boolean() {
        assert_eq!(parsed(BuiltinFormat::Boolean, json!("Yes")), json!(true));
        assert_eq!(parsed(BuiltinFormat::Boolean, json!("f")), json!(false));
        assert_eq!(parsed(BuiltinFormat::Boolean, json!(2)), json!(true));
        assert_eq!(parsed(BuiltinFormat::Boolean, json!(0)), json!(false));
        assert!(!valid(BuiltinFormat::Boolean, json!("maybe")));
        assert!(!valid(BuiltinFormat::Boolean, json!(1.5)));
        assert!(!valid(BuiltinFormat::Boolean, json!({})));
    }

    #[test]
    fn test_string() {
        assert_eq!(parsed(BuiltinFormat::String, json!("-123.5")), json!("-123.5"));
        assert_eq!(parsed(BuiltinFormat::String, json!(123.5)), json!("123.5"));
        assert_eq!(parsed(BuiltinFormat::String, json!(8080)), json!("8080"));
        assert!(!valid(BuiltinFormat::String, json!({})));
        assert!(!valid(BuiltinFormat::String, json!(true)));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parsed(BuiltinFormat::Number, json!("-12.5")), json!(-12.5));
        assert_eq!(parsed(BuiltinFormat::Number, json!("80")), json!(80));
        assert!(!valid(BuiltinFormat::Number, json!("12abc")));
        assert!(!valid(BuiltinFormat::Number, json!("NaN")));
        assert!(!valid(BuiltinFormat::Number, json!("inf")));

        assert_eq!(parsed(BuiltinFormat::Int, json!("-7")), json!(-7));
        assert_eq!(parsed(BuiltinFormat::Int, json!(3.0)), json!(3));
        assert!(!valid(BuiltinFormat::Int, json!(1.5)));
        assert!(!valid(BuiltinFormat::Int, json!("text")));

        assert!(valid(BuiltinFormat::NatNum, json!(0)));
        assert!(!valid(BuiltinFormat::NatNum, json!(-1)));
        assert!(!valid(BuiltinFormat::NatNum, json!(1.2)));

        assert_eq!(parsed(BuiltinFormat::PosNum, json!("0.5")), json!(0.5));
        assert!(!valid(BuiltinFormat::PosNum, json!(-0.5)));
    }

    #[test]
    fn test_url_and_ip() {
        assert!(valid(BuiltinFormat::Url, json!("localhost")));
        assert!(valid(BuiltinFormat::Url, json!("127.0.0.1")));
        assert!(valid(BuiltinFormat::Url, json!("https://user:pw@example.com:8443/a?b=c#d")));
        assert!(valid(BuiltinFormat::Url, json!("http://[::1]:80/")));
        assert!(valid(BuiltinFormat::Url, json!("")));
        assert!(!valid(BuiltinFormat::Url, json!(123)));
        assert!(!valid(BuiltinFormat::Url, json!("not a url")));

        assert!(valid(BuiltinFormat::Ip, json!("192.168.0.1")));
        assert!(valid(BuiltinFormat::Ip, json!("fe80::1")));
        assert!(!valid(BuiltinFormat::Ip, json!("256.1.1.1")));
        assert!(!valid(BuiltinFormat::Ip, json!(1234)));
    }

    #[test]
    fn test_port() {
        assert_eq!(parsed(BuiltinFormat::Port, json!("8080")), json!(8080));
        assert!(valid(BuiltinFormat::Port, json!(0)));
        assert!(valid(BuiltinFormat::Port, json!(65535)));
        assert!(!valid(BuiltinFormat::Port, json!(65536)));
        assert!(!valid(BuiltinFormat::Port, json!(-1)));
        assert!(!valid(BuiltinFormat::Port, json!("http")));
    }

    #[test]
    fn test_windows_named_pipe() {
        assert!(valid(BuiltinFormat::Wnp, json!(r"\\.\pipe\app")));
        assert!(!valid(BuiltinFormat::Wnp, json!(r"\pipe\app")));
        assert!(!valid(BuiltinFormat::Wnp, json!(12)));
    }

    #[test]
    fn test_literal_validators() {
        assert!(valid(BuiltinFormat::Email, json!("my@email.com")));
        assert!(!valid(BuiltinFormat::Email, json!("my@email")));
        assert!(!valid(BuiltinFormat::Email, json!("email.com")));

        assert!(valid(BuiltinFormat::Uuid, json!("A987FBC9-4BED-3078-CF07-9141BA07C9F3")));
        assert!(valid(BuiltinFormat::Uuid3, json!("a3bb189e-8bf9-3888-9912-ace4e6543002")));
        assert!(!valid(BuiltinFormat::Uuid3, json!("cd4c9bf2-53db-408d-955a-eb3e2b93b8c3")));
        assert!(valid(BuiltinFormat::Uuid4, json!("cd4c9bf2-53db-408d-955a-eb3e2b93b8c3")));
        assert!(!valid(BuiltinFormat::Uuid4, json!("a3bb189e-8bf9-3888-9912-ace4e6543002")));
        assert!(valid(BuiltinFormat::Uuid5, json!("a6edc906-2f9f-5fb2-a373-efac406f0ef2")));
        assert!(!valid(BuiltinFormat::Uuid, json!("a6edc906-2f9f-5fb2-a373")));
        assert!(valid(BuiltinFormat::Uuid4, json!("CD4C9BF2-53DB-408D-955A-EB3E2B93B8C3")));
        assert!(!valid(BuiltinFormat::Uuid4, json!("cd4c9bf2-53db-408d-c55a-eb3e2b93b8c3")));
        assert!(!valid(BuiltinFormat::Uuid5, json!("a3bb189e-8bf9-3888-9912-ace4e6543002")));
        assert!(!valid(BuiltinFormat::Uuid, json!("cd4c9bf253db408d955aeb3e2b93b8c3")));
        assert!(!valid(BuiltinFormat::Uuid, json!("{cd4c9bf2-53db-408d-955a-eb3e2b93b8c3}")));
        assert!(!valid(BuiltinFormat::Uuid, json!("cd4c9bf2-53db-408d-955a-eb3e2b93b8cz")));
        assert!(!valid(BuiltinFormat::Uuid, json!(42)));

        assert!(valid(BuiltinFormat::Hex, json!("0130A1F5")));
        assert!(valid(BuiltinFormat::Hex, json!("0xff")));
        assert!(!valid(BuiltinFormat::Hex, json!("0130A1FZ")));
    }

    #[test]
    fn test_duration() {
        assert_eq!(parsed(BuiltinFormat::Duration, json!("1 sec")), json!(1000));
        assert_eq!(parsed(BuiltinFormat::Duration, json!("234")), json!(234));
        assert_eq!(parsed(BuiltinFormat::Duration, json!(500)), json!(500));
        assert_eq!(parsed(BuiltinFormat::Duration, json!("3 hours")), json!(10_800_000));
        assert_eq!(parsed(BuiltinFormat::Duration, json!("2m")), json!(120_000));
        assert_eq!(parsed(BuiltinFormat::Duration, json!("1 M")), json!(2_592_000_000u64));
        assert_eq!(parsed(BuiltinFormat::Duration, json!("1 year")), json!(31_536_000_000u64));
        assert!(!valid(BuiltinFormat::Duration, json!("1 fortnight")));
        assert!(!valid(BuiltinFormat::Duration, json!(-5)));
        assert!(!valid(BuiltinFormat::Duration, json!("1.5 h")));
    }

    #[test]
    fn test_bytesize() {
        assert_eq!(parsed(BuiltinFormat::ByteSize, json!("512")), json!(512));
        assert_eq!(parsed(BuiltinFormat::ByteSize, json!("10MB")), json!(10_485_760));
        assert_eq!(parsed(BuiltinFormat::ByteSize, json!("1 gb")), json!(1_073_741_824));
        assert_eq!(parsed(BuiltinFormat::ByteSize, json!(64)), json!(64));
        assert!(!valid(BuiltinFormat::ByteSize, json!("5 pb")));
        assert!(!valid(BuiltinFormat::ByteSize, json!("99999999999999999 tb")));
    }
}
