//! Macro files: the recorded sequence as a JSON array of records.
//!
//! Every record is written with all nine keys (`x`, `y`, `button`, `delay`,
//! `is_double_click`, `offset_x`, `offset_y`, `is_scroll`, `scroll_amount`).
//! On load only `x` and `y` are required; the rest default to no button,
//! no delay, no drift, single click.

use crate::error::{Error, Result};
use crate::record::ClickSequence;
use std::path::Path;

/// Longest accepted save-file name, before the extension is added.
pub const MAX_FILE_NAME_LEN: usize = 20;

/// Serialize a sequence to pretty-printed JSON.
pub fn to_json(sequence: &ClickSequence) -> Result<String> {
    serde_json::to_string_pretty(sequence).map_err(|e| Error::Io(e.into()))
}

/// Parse a sequence from JSON. `origin` is only used in the error.
///
/// A record with both `is_scroll` and `is_double_click` set, or with a
/// negative delay, rejects the whole document.
pub fn from_json(json: &str, origin: &Path) -> Result<ClickSequence> {
    let malformed = |reason: String| Error::MalformedData {
        path: origin.to_path_buf(),
        reason,
    };
    let sequence: ClickSequence =
        serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;
    for (index, record) in sequence.iter().enumerate() {
        record
            .validate()
            .map_err(|reason| malformed(format!("record {index}: {reason}")))?;
    }
    Ok(sequence)
}

/// Write `sequence` to `path`, replacing whatever was there.
pub fn save(sequence: &ClickSequence, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, to_json(sequence)?)?;
    log::info!("Recorded clicks saved to {}", path.display());
    Ok(())
}

/// Read a sequence from `path`. Any parse error fails the whole load.
pub fn load(path: impl AsRef<Path>) -> Result<ClickSequence> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let sequence = from_json(&json, path)?;
    log::info!(
        "Loaded {} recorded clicks from {}",
        sequence.len(),
        path.display()
    );
    Ok(sequence)
}

/// Clean up a user-typed save-file name: trim it, refuse empty or overlong
/// names, and add `.json` when missing.
pub fn normalize_file_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_FILE_NAME_LEN {
        return None;
    }
    if name.ends_with(".json") {
        Some(name.to_string())
    } else {
        Some(format!("{name}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ClickRecord, MouseButton};

    fn sample() -> ClickSequence {
        let mut double = ClickRecord::click(40, 50, MouseButton::Left).with_delay(0.25);
        double.set_double_click(true);
        vec![
            ClickRecord::click(10, 20, MouseButton::Left).with_offset(5, -2),
            double,
            ClickRecord::scroll(300, 400, -5).with_delay(1.0),
        ]
        .into()
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macro.json");

        save(&sample(), &path).unwrap();
        assert_eq!(load(&path).unwrap(), sample());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macro.json");
        save(&sample(), &path).unwrap();

        let single: ClickSequence = vec![ClickRecord::click(1, 1, MouseButton::Right)].into();
        save(&single, &path).unwrap();
        assert_eq!(load(&path).unwrap(), single);
    }

    #[test]
    fn test_every_key_is_written() {
        let seq = ClickSequence::from(vec![ClickRecord::scroll(1, 2, 3)]);
        let json = to_json(&seq).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let object = value[0].as_object().unwrap();
        for key in [
            "x",
            "y",
            "button",
            "delay",
            "is_double_click",
            "offset_x",
            "offset_y",
            "is_scroll",
            "scroll_amount",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert!(object["button"].is_null());
        assert_eq!(object.len(), 9);
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let seq = from_json(r#"[{"x": 5, "y": 6}]"#, Path::new("inline")).unwrap();
        let rec = seq.get(0).unwrap();
        assert_eq!((rec.x, rec.y), (5, 6));
        assert_eq!(rec.button, None);
        assert_eq!(rec.delay, 0.0);
        assert!(!rec.is_double_click);
        assert_eq!((rec.offset_x, rec.offset_y), (0, 0));
        assert!(!rec.is_scroll);
        assert_eq!(rec.scroll_amount, 0);
    }

    #[test]
    fn test_button_names() {
        let seq = from_json(
            r#"[{"x": 1, "y": 1, "button": "left"}, {"x": 2, "y": 2, "button": "middle"}]"#,
            Path::new("inline"),
        )
        .unwrap();
        assert_eq!(seq.get(0).unwrap().button, Some(MouseButton::Left));
        assert_eq!(seq.get(1).unwrap().button, Some(MouseButton::Middle));
    }

    #[test]
    fn test_malformed_documents_fail_whole_load() {
        for doc in [
            "not json",
            r#"[{"x": 1}]"#,
            r#"[{"x": 1, "y": 2}, {"x": "three", "y": 4}]"#,
            r#"{"x": 1, "y": 2}"#,
            r#"[{"x": 1, "y": 2, "button": "thumb"}]"#,
        ] {
            let err = from_json(doc, Path::new("bad.json")).unwrap_err();
            assert!(matches!(err, Error::MalformedData { .. }), "{doc}");
        }
    }

    #[test]
    fn test_inconsistent_records_are_rejected() {
        let both_flags = r#"[{"x": 1, "y": 1, "is_scroll": true, "is_double_click": true, "scroll_amount": 2}]"#;
        let err = from_json(both_flags, Path::new("bad.json")).unwrap_err();
        assert!(
            matches!(&err, Error::MalformedData { reason, .. } if reason.starts_with("record 0")),
            "{err}"
        );

        let negative_delay = r#"[{"x": 1, "y": 1}, {"x": 2, "y": 2, "delay": -3.0}]"#;
        let err = from_json(negative_delay, Path::new("bad.json")).unwrap_err();
        assert!(
            matches!(&err, Error::MalformedData { reason, .. } if reason.starts_with("record 1")),
            "{err}"
        );

        // Either flag on its own is fine.
        assert!(from_json(r#"[{"x": 1, "y": 1, "is_scroll": true}]"#, Path::new("ok.json")).is_ok());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_normalize_file_name() {
        assert_eq!(normalize_file_name(" run "), Some("run.json".into()));
        assert_eq!(normalize_file_name("run.json"), Some("run.json".into()));
        assert_eq!(normalize_file_name(""), None);
        assert_eq!(normalize_file_name("a-very-long-macro-name"), None);
    }
}
