use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{PollutionRecord, is_country_code};
use crate::normalize::{Dated, LatestByKey, parse_number, parse_year};

impl Dated for PollutionRecord {
    fn key(&self) -> &str {
        &self.iso_code
    }

    fn year(&self) -> i32 {
        self.year
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pm25Parse {
    pub records: Vec<PollutionRecord>,
    pub diagnostic: Option<String>,
}

impl Pm25Parse {
    fn malformed(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(%message, "malformed World Bank payload");
        Self {
            records: Vec::new(),
            diagnostic: Some(message),
        }
    }
}

pub fn parse_pm25_json(content: &[u8]) -> Pm25Parse {
    let payload: Value = match serde_json::from_slice(content) {
        Ok(payload) => payload,
        Err(err) => return Pm25Parse::malformed(format!("invalid JSON: {err}")),
    };

    let Some(parts) = payload.as_array() else {
        return Pm25Parse::malformed("expected a top-level array of [metadata, data]");
    };
    if parts.len() < 2 {
        let detail = parts
            .first()
            .and_then(api_message)
            .map(|message| format!(": {message}"))
            .unwrap_or_default();
        return Pm25Parse::malformed(format!(
            "expected [metadata, data], got {} element(s){detail}",
            parts.len()
        ));
    }

    let series = match &parts[1] {
        Value::Array(series) => series,
        // The API sends `null` data when the indicator has no observations.
        Value::Null => return Pm25Parse::default(),
        _ => return Pm25Parse::malformed("data series is not an array"),
    };

    let mut latest = LatestByKey::new();
    let mut skipped = 0usize;
    for entry in series {
        match parse_entry(entry) {
            Some(record) => latest.offer(record),
            None => skipped += 1,
        }
    }

    debug!(retained = latest.len(), skipped, "World Bank PM2.5 normalized");
    Pm25Parse {
        records: latest.into_records(),
        diagnostic: None,
    }
}

fn parse_entry(entry: &Value) -> Option<PollutionRecord> {
    let iso_code = entry.get("countryiso3code")?.as_str()?;
    if !is_country_code(iso_code) {
        return None;
    }
    let year = match entry.get("date")? {
        Value::String(date) => parse_year(date)?,
        Value::Number(date) => i32::try_from(date.as_i64()?).ok()?,
        _ => return None,
    };
    let pm25 = match entry.get("value")? {
        Value::Number(value) => value.as_f64()?,
        Value::String(value) => parse_number(value)?,
        _ => return None,
    };
    Some(PollutionRecord {
        iso_code: iso_code.to_string(),
        year,
        pm25,
    })
}

fn api_message(metadata: &Value) -> Option<String> {
    metadata
        .get("message")?
        .as_array()?
        .first()?
        .get("value")?
        .as_str()
        .map(|value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_payload_message_is_reported() {
        let body = br#"[{"message":[{"id":"120","key":"Invalid value","value":"The provided parameter value is not valid"}]}]"#;
        let parsed = parse_pm25_json(body);
        assert!(parsed.records.is_empty());
        let diagnostic = parsed.diagnostic.unwrap();
        assert!(diagnostic.contains("1 element(s)"));
        assert!(diagnostic.contains("parameter value is not valid"));
    }

    #[test]
    fn null_series_is_empty_without_diagnostic() {
        let parsed = parse_pm25_json(br#"[{"page":1,"pages":0},null]"#);
        assert_eq!(parsed, Pm25Parse::default());
    }
}
