use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Categories for activity log entries, mirroring the phases of an agent
/// run. The dashboard filters on these when rendering a trader's feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Trace,
    Agent,
    Function,
    Generation,
    Response,
    Error,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Trace => "trace",
            LogCategory::Agent => "agent",
            LogCategory::Function => "function",
            LogCategory::Generation => "generation",
            LogCategory::Response => "response",
            LogCategory::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<LogCategory> {
        match s {
            "trace" => Some(LogCategory::Trace),
            "agent" => Some(LogCategory::Agent),
            "function" => Some(LogCategory::Function),
            "generation" => Some(LogCategory::Generation),
            "response" => Some(LogCategory::Response),
            "error" => Some(LogCategory::Error),
            _ => None,
        }
    }
}

/// An append-only activity record. Ordered by timestamp, ties broken by
/// insertion sequence (the rowid).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub account: String,
    pub category: LogCategory,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrip() {
        let categories = [
            LogCategory::Trace,
            LogCategory::Agent,
            LogCategory::Function,
            LogCategory::Generation,
            LogCategory::Response,
            LogCategory::Error,
        ];
        for cat in categories {
            assert_eq!(LogCategory::parse(cat.as_str()), Some(cat));
            let json = serde_json::to_string(&cat).unwrap();
            let parsed: LogCategory = serde_json::from_str(&json).unwrap();
            assert_eq!(cat, parsed);
        }
    }

    #[test]
    fn unknown_category_rejected() {
        assert_eq!(LogCategory::parse("debug"), None);
    }

    #[test]
    fn roundtrip_log_entry() {
        let entry = LogEntry {
            id: 42,
            timestamp: Utc::now(),
            account: "Ray".to_string(),
            category: LogCategory::Trace,
            message: "Started: Ray-trading".to_string(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, deserialized);
    }
}
