use std::{fmt::Display, str::FromStr};

/// Outcome of reading a typed attribute. Reading never fails: a missing or
/// unparseable value resolves to the caller's default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lenient<T> {
    Parsed(T),
    Missing(T),
    Fallback { value: T, raw: String, reason: String },
}

impl<T> Lenient<T> {
    pub fn into_value(self) -> T {
        match self {
            Lenient::Parsed(value) | Lenient::Missing(value) => value,
            Lenient::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Lenient::Fallback { .. })
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Lenient<U> {
        match self {
            Lenient::Parsed(value) => Lenient::Parsed(f(value)),
            Lenient::Missing(value) => Lenient::Missing(f(value)),
            Lenient::Fallback { value, raw, reason } => Lenient::Fallback {
                value: f(value),
                raw,
                reason,
            },
        }
    }
}

pub fn parse_attr<T>(raw: Option<&str>, default: T) -> Lenient<T>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = raw else {
        return Lenient::Missing(default);
    };

    match raw.trim().parse::<T>() {
        Ok(value) => Lenient::Parsed(value),
        Err(e) => Lenient::Fallback {
            value: default,
            raw: raw.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Like [`parse_attr`], for attributes without a meaningful default.
pub fn parse_optional_attr<T>(raw: Option<&str>) -> Lenient<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    parse_attr(raw, Optional(None)).map(|Optional(value)| value)
}

struct Optional<T>(Option<T>);

impl<T> FromStr for Optional<T>
where
    T: FromStr,
{
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(|value| Optional(Some(value)))
    }
}
