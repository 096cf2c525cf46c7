//! The data moat: a key → JSON blob table.
//!
//! Writes overwrite by key. Reads come back as parsed [`serde_json::Value`]s;
//! a stored blob that no longer parses is an error naming its key.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;

/// One key/value row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataEntry {
    pub key: String,
    pub value: Value,
}

/// Insert or overwrite the value stored under `key`.
pub fn add_data(conn: &Connection, key: &str, value: &Value) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let json = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO proprietary_data (key, value, updated_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, json, now],
    )?;
    tracing::debug!(key, bytes = json.len(), "data stored");
    Ok(())
}

/// Fetch the value stored under `key`.
pub fn get_data(conn: &Connection, key: &str) -> Result<Option<Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM proprietary_data WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;

    raw.map(|s| decode(key, &s)).transpose()
}

/// Values whose key contains `needle` (literal substring, ordered by key).
pub fn query(conn: &Connection, needle: &str) -> Result<Vec<Value>> {
    Ok(query_entries(conn, needle)?
        .into_iter()
        .map(|e| e.value)
        .collect())
}

/// Like [`query`] but keeps the keys.
pub fn query_entries(conn: &Connection, needle: &str) -> Result<Vec<DataEntry>> {
    let pattern = format!("%{}%", escape_like(needle));
    let mut stmt = conn.prepare(
        "SELECT key, value FROM proprietary_data WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key",
    )?;
    let rows = stmt
        .query_map(params![pattern], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(key, raw)| {
            let value = decode(&key, &raw)?;
            Ok(DataEntry { key, value })
        })
        .collect()
}

/// Delete a key. Returns `true` if a row was removed.
pub fn remove_data(conn: &Connection, key: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM proprietary_data WHERE key = ?1", params![key])?;
    Ok(rows > 0)
}

pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM proprietary_data", [], |r| r.get(0))?;
    Ok(n as u64)
}

fn decode(key: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("stored value for key {key:?} is not valid JSON"))
}

/// Escape LIKE wildcards so the needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_db() -> Connection {
        crate::db::open_memory_database().unwrap()
    }

    #[test]
    fn insert_then_get_returns_same_value() {
        let conn = test_db();
        let value = json!({"tip": "Use I-5 after 8pm.", "score": 3, "tags": ["a", "b"]});
        add_data(&conn, "traffic_insight", &value).unwrap();
        assert_eq!(get_data(&conn, "traffic_insight").unwrap(), Some(value));
    }

    #[test]
    fn get_missing_key_is_none() {
        let conn = test_db();
        assert_eq!(get_data(&conn, "nope").unwrap(), None);
    }

    #[test]
    fn insert_overwrites_by_key() {
        let conn = test_db();
        add_data(&conn, "k", &json!(1)).unwrap();
        add_data(&conn, "k", &json!({"v": 2})).unwrap();
        assert_eq!(get_data(&conn, "k").unwrap(), Some(json!({"v": 2})));
        assert_eq!(count(&conn).unwrap(), 1);
    }

    #[test]
    fn query_matches_key_substring() {
        let conn = test_db();
        add_data(&conn, "refined_trip", &json!("a")).unwrap();
        add_data(&conn, "trip_notes", &json!("b")).unwrap();
        add_data(&conn, "weather", &json!("c")).unwrap();

        let hits = query_entries(&conn, "trip").unwrap();
        let keys: Vec<&str> = hits.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["refined_trip", "trip_notes"]);
        assert_eq!(query(&conn, "trip").unwrap(), vec![json!("a"), json!("b")]);
    }

    #[test]
    fn query_does_not_match_on_value() {
        let conn = test_db();
        add_data(&conn, "k1", &json!("trip inside value")).unwrap();
        assert!(query(&conn, "trip").unwrap().is_empty());
    }

    #[test]
    fn query_treats_wildcards_literally() {
        let conn = test_db();
        add_data(&conn, "100%_done", &json!(1)).unwrap();
        add_data(&conn, "100x done", &json!(2)).unwrap();

        assert_eq!(query(&conn, "%_").unwrap(), vec![json!(1)]);
        assert_eq!(query(&conn, "0%").unwrap(), vec![json!(1)]);
    }

    #[test]
    fn empty_query_returns_everything() {
        let conn = test_db();
        add_data(&conn, "a", &json!(1)).unwrap();
        add_data(&conn, "b", &json!(2)).unwrap();
        assert_eq!(query(&conn, "").unwrap().len(), 2);
    }

    #[test]
    fn remove_reports_whether_a_row_existed() {
        let conn = test_db();
        add_data(&conn, "a", &json!(1)).unwrap();
        assert!(remove_data(&conn, "a").unwrap());
        assert!(!remove_data(&conn, "a").unwrap());
    }

    #[test]
    fn corrupt_blob_names_the_key() {
        let conn = test_db();
        conn.execute(
            "INSERT INTO proprietary_data (key, value, updated_at) VALUES ('bad', '{oops', 'now')",
            [],
        )
        .unwrap();
        let err = get_data(&conn, "bad").unwrap_err();
        assert!(err.to_string().contains("\"bad\""));
    }
}
