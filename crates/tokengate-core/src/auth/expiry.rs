//! Lenient parsing of credential expiry timestamps.
//!
//! The backend serializes a Java `Date`, which depending on its JSON
//! settings arrives as epoch milliseconds or as `yyyy-MM-dd HH:mm:ss` local
//! time. Values written by this crate are RFC 3339.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

const BACKEND_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawExpire {
    Millis(i64),
    Text(String),
}

/// Parse a textual expiry in any of the accepted forms.
pub fn parse_expire(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(millis) = text.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(text, BACKEND_DATE_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match RawExpire::deserialize(deserializer)? {
        RawExpire::Millis(millis) => Utc.timestamp_millis_opt(millis).single(),
        RawExpire::Text(text) => parse_expire(&text),
    };
    parsed.ok_or_else(|| serde::de::Error::custom("unrecognized expire timestamp"))
}
