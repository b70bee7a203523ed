//! Clock tool
//!
//! Zones are IANA names from the tz database (DST included) or fixed
//! `±HH:MM` offsets.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};

use crate::core::{ToolError, ToolResult};
use crate::tools::schema::{ParameterSchema, ParameterSpec, ParameterType};
use crate::tools::tool::{optional_str, Tool, ToolContext};

/// Zone used when the call passes none
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";

/// A resolved `timezone` argument
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Zone {
    /// `YYYY/MM/DD HH:MM:SS` wall-clock time of `now` in this zone
    pub fn format(&self, now: DateTime<Utc>) -> String {
        const PATTERN: &str = "%Y/%m/%d %H:%M:%S";
        match self {
            Zone::Named(tz) => now.with_timezone(tz).format(PATTERN).to_string(),
            Zone::Fixed(offset) => now.with_timezone(offset).format(PATTERN).to_string(),
        }
    }
}

/// Clock tool
pub struct CurrentTimeTool;

/// Resolve a tz database name or `±HH:MM` offset
pub fn parse_timezone(name: &str) -> Option<Zone> {
    let name = name.trim();
    if let Ok(tz) = name.parse::<Tz>() {
        return Some(Zone::Named(tz));
    }
    parse_offset(name).map(Zone::Fixed)
}

fn parse_offset(name: &str) -> Option<FixedOffset> {
    let (sign, rest) = match name.as_bytes().first()? {
        b'+' => (1, &name[1..]),
        b'-' => (-1, &name[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Render `now` the way the tool reports it
pub fn describe_time(now: DateTime<Utc>, timezone: &str, zone: Zone) -> Value {
    json!({
        "iso": now.to_rfc3339_opts(SecondsFormat::Millis, true),
        "unix": now.timestamp(),
        "timezone": timezone,
        "formatted": zone.format(now),
    })
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new().optional(
            "timezone",
            ParameterSpec::new(
                ParameterType::String,
                "Time zone name or UTC offset such as +08:00",
            )
            .with_default(DEFAULT_TIMEZONE),
        )
    }

    async fn execute(&self, args: &Value, _ctx: &ToolContext) -> ToolResult<Value> {
        let timezone = optional_str(args, "timezone")?.unwrap_or(DEFAULT_TIMEZONE);
        let zone = parse_timezone(timezone).ok_or_else(|| {
            ToolError::InvalidArgument(format!("unknown timezone '{}'", timezone))
        })?;
        Ok(describe_time(Utc::now(), timezone, zone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn offset_of(zone: Zone) -> i32 {
        match zone {
            Zone::Fixed(offset) => offset.local_minus_utc(),
            Zone::Named(_) => panic!("expected a fixed offset"),
        }
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("UTC"), Some(Zone::Named(Tz::UTC)));
        assert_eq!(
            parse_timezone("Asia/Shanghai"),
            Some(Zone::Named(chrono_tz::Asia::Shanghai))
        );
        assert_eq!(offset_of(parse_timezone("+08:00").unwrap()), 8 * 3600);
        assert_eq!(offset_of(parse_timezone("-05:30").unwrap()), -19_800);
        assert_eq!(offset_of(parse_timezone("+3").unwrap()), 3 * 3600);
        assert!(parse_timezone("Mars/Olympus").is_none());
        assert!(parse_timezone("+25:00").is_none());
        assert!(parse_timezone("").is_none());
    }

    #[test]
    fn test_describe_time() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 6, 3, 9).unwrap();
        let zone = parse_timezone("Asia/Shanghai").unwrap();
        let value = describe_time(now, "Asia/Shanghai", zone);

        assert_eq!(value["iso"], "2024-01-05T06:03:09.000Z");
        assert_eq!(value["unix"], 1_704_434_589);
        assert_eq!(value["formatted"], "2024/01/05 14:03:09");
        assert_eq!(value["timezone"], "Asia/Shanghai");
    }

    #[test]
    fn test_daylight_saving_zone() {
        let zone = parse_timezone("America/New_York").unwrap();

        let winter = Utc.with_ymd_and_hms(2024, 1, 5, 6, 3, 9).unwrap();
        assert_eq!(zone.format(winter), "2024/01/05 01:03:09");

        let summer = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        assert_eq!(zone.format(summer), "2024/07/01 08:00:00");
    }

    #[test]
    fn test_fixed_offset_format() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 6, 3, 9).unwrap();
        assert_eq!(parse_timezone("-05:30").unwrap().format(now), "2024/01/05 00:33:09");
    }

    #[tokio::test]
    async fn test_default_and_unknown_zone() {
        let ctx = ToolContext::new("/", Duration::from_secs(1));
        let value = CurrentTimeTool.execute(&json!({}), &ctx).await.unwrap();
        assert_eq!(value["timezone"], DEFAULT_TIMEZONE);

        let err = CurrentTimeTool
            .execute(&json!({"timezone": "Nowhere/Land"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }
}
