//! Conversion of driver-native wrapper values into plain scalars.
//!
//! Graph drivers hand back 64-bit integers as `{low, high}` pairs and temporal values as
//! field structs. Everything that reaches the client goes through [`normalize_value`].

use serde_json::{Map, Value};
use time::macros::format_description;
use time::{Date, Month, Time, UtcOffset};

use super::model::{Properties, Scalar};

const LOCAL_DATE_TIME_KEYS: [&str; 7] = ["year", "month", "day", "hour", "minute", "second", "nanosecond"];

pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(normalize_value).collect()),
        Value::Object(map) => {
            if let Some(n) = wrapped_integer(map) {
                return Value::from(n);
            }
            if let Some(text) = temporal_text(map) {
                return Value::String(text);
            }
            Value::Object(map.iter().map(|(k, v)| (k.clone(), normalize_value(v))).collect())
        }
        other => other.clone(),
    }
}

/// Normalize a property object into a scalar map; anything that is not an object yields an empty map.
pub fn normalize_properties(value: &Value) -> Properties {
    match normalize_value(value) {
        Value::Object(map) => map.into_iter().map(|(k, v)| (k, Scalar::from_json(v))).collect(),
        _ => Properties::new(),
    }
}

fn wrapped_integer(map: &Map<String, Value>) -> Option<i64> {
    if map.len() != 2 {
        return None;
    }
    let low = map.get("low")?.as_i64()?;
    let high = map.get("high")?.as_i64()?;
    if !(i64::from(i32::MIN)..=i64::from(u32::MAX)).contains(&low) {
        return None;
    }
    let high = i32::try_from(high).ok()?;
    Some((i64::from(high) << 32) | i64::from(low as u32))
}

fn int_field(map: &Map<String, Value>, key: &str) -> Option<i64> {
    match map.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::Object(inner) => wrapped_integer(inner),
        _ => None,
    }
}

fn temporal_text(map: &Map<String, Value>) -> Option<String> {
    let has = |k: &str| map.contains_key(k);
    if map.len() == 3 && has("year") && has("month") && has("day") {
        return date_part(map);
    }
    if !LOCAL_DATE_TIME_KEYS.iter().all(|k| has(k)) {
        return None;
    }
    let extra: Vec<&String> = map.keys().filter(|k| !LOCAL_DATE_TIME_KEYS.contains(&k.as_str())).collect();
    if !extra.iter().all(|k| *k == "timeZoneOffsetSeconds" || *k == "timeZoneId") {
        return None;
    }
    let local = format!("{}T{}", date_part(map)?, time_part(map)?);
    if extra.is_empty() {
        return Some(local);
    }

    let mut out = local;
    if let Some(secs) = int_field(map, "timeZoneOffsetSeconds") {
        let offset = UtcOffset::from_whole_seconds(i32::try_from(secs).ok()?).ok()?;
        if offset.is_utc() {
            out.push('Z');
        } else {
            let fmt = format_description!("[offset_hour sign:mandatory]:[offset_minute]");
            out.push_str(&offset.format(&fmt).ok()?);
        }
    }
    if let Some(zone) = map.get("timeZoneId").and_then(Value::as_str) {
        out.push('[');
        out.push_str(zone);
        out.push(']');
    }
    Some(out)
}

fn date_part(map: &Map<String, Value>) -> Option<String> {
    let year = i32::try_from(int_field(map, "year")?).ok()?;
    let month = Month::try_from(u8::try_from(int_field(map, "month")?).ok()?).ok()?;
    let day = u8::try_from(int_field(map, "day")?).ok()?;
    let date = Date::from_calendar_date(year, month, day).ok()?;
    date.format(&format_description!("[year]-[month]-[day]")).ok()
}

fn time_part(map: &Map<String, Value>) -> Option<String> {
    let hour = u8::try_from(int_field(map, "hour")?).ok()?;
    let minute = u8::try_from(int_field(map, "minute")?).ok()?;
    let second = u8::try_from(int_field(map, "second")?).ok()?;
    let nanos = u32::try_from(int_field(map, "nanosecond")?).ok()?;
    let t = Time::from_hms_nano(hour, minute, second, nanos).ok()?;
    let mut s = t.format(&format_description!("[hour]:[minute]:[second]")).ok()?;
    if nanos != 0 {
        s.push_str(&format!(".{:09}", nanos));
    }
    Some(s)
}
