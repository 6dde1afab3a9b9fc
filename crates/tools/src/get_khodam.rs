//! Khodam tool — a playful, deterministic "spirit companion" reading.
//!
//! The result depends only on the user ID and the calendar day in UTC+7,
//! so asking twice on the same day gives the same answer.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use parley_core::error::ToolError;
use parley_core::tool::Tool;

const CREATURES: [&str; 36] = [
    "Kucing", "Tikus", "Kadal", "Kuda Nil", "Bunglon", "Siput", "Koala", "Kodok", "Monyet",
    "Anjing", "Harimau", "Kuda", "Komodo", "Gajah", "Cicak", "Ular", "Kura-kura", "Lele",
    "Laba-laba", "Singa", "Zebra", "Bebek", "Ayam", "Buaya", "Gorila", "Naga", "Naga", "Ikan",
    "Ubur-ubur", "Cacing", "Semut", "Udang", "Musang", "Kecoak", "Kupu-kupu", "Laba-laba",
];

const TRAITS: [&str; 36] = [
    "Jawa", "Depresi", "Mekanik", "Metal", "Insom", "Skizo", "Klepto", "Bunting", "Birahi",
    "Sigma", "Raksasa", "Berkaki Seribu", "Skizo", "Sad boy", "Mewing", "Gyatt", "Yapper",
    "Yapper", "Skizo", "Ambis", "Sigma", "Dribble", "Dribble", "Jawa", "Sigma", "Ngesot", "Sunda",
    "Kalimantan", "Kutub", "Sumatera", "Sunda", "Sumatera", "Sunda", "Yapper", "Ngesot", "Ambis",
];

pub struct GetKhodamTool;

#[async_trait]
impl Tool for GetKhodamTool {
    fn name(&self) -> &str {
        "get_khodam"
    }

    fn description(&self) -> &str {
        "Get the khodam of the specified user ID. The user ID is NOT the username but the unique numeric identifier of the user."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "Numeric user ID"
                }
            },
            "required": ["user_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let user_id = arguments["user_id"]
            .as_str()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'user_id' argument".into()))?;

        let day = khodam_day(Utc::now());
        Ok(serde_json::json!({
            "user_id": user_id,
            "khodam": read_khodam(user_id, day),
            "khodam_day": day.to_string(),
        }))
    }

    fn describe(&self, arguments: &serde_json::Value) -> String {
        format!("Reading khodam <@{}>", arguments["user_id"].as_str().unwrap_or_default())
    }
}

/// The calendar day a reading belongs to (UTC+7).
fn khodam_day(now: DateTime<Utc>) -> NaiveDate {
    (now.naive_utc() + Duration::hours(7)).date()
}

/// 32-bit multiplicative string hash over UTF-16 code units.
fn hash_str(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

fn read_khodam(user_id: &str, day: NaiveDate) -> String {
    let seed = format!("{user_id}{day}");
    let creature = CREATURES[hash_str(&seed).unsigned_abs() as usize % CREATURES.len()];
    let quality = TRAITS[hash_str(&format!("{seed}salt")).unsigned_abs() as usize % TRAITS.len()];
    format!("{creature} {quality}")
}
