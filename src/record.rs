//! Recorded actions and the ordered sequence they are replayed from.
//!
//! A [`ClickRecord`] is exactly one of three things: a single click, a double
//! click, or a scroll. The persisted shape keeps the two classification flags
//! (`is_double_click`, `is_scroll`) as separate booleans, so every mutation
//! path in this module keeps them mutually exclusive, and loaded records are
//! checked with [`ClickRecord::validate`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mouse button a click was captured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Wheel button.
    Middle,
}

impl MouseButton {
    /// Lowercase name, as written to macro files.
    pub fn name(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a record is performed during replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    /// One primary click.
    Single,
    /// Two primary clicks in quick succession.
    Double,
    /// Move there, then turn the wheel.
    Scroll,
}

/// One captured or authored action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickRecord {
    /// Screen X coordinate on the first cycle.
    pub x: i32,
    /// Screen Y coordinate on the first cycle.
    pub y: i32,
    /// Button the click was captured with; `None` for authored scrolls.
    #[serde(default)]
    pub button: Option<MouseButton>,
    /// Seconds to wait after performing this action.
    #[serde(default)]
    pub delay: f64,
    #[serde(default)]
    pub is_double_click: bool,
    /// Added to `x` once per completed cycle.
    #[serde(default)]
    pub offset_x: i32,
    /// Added to `y` once per completed cycle.
    #[serde(default)]
    pub offset_y: i32,
    #[serde(default)]
    pub is_scroll: bool,
    /// Wheel units; sign selects the direction.
    #[serde(default)]
    pub scroll_amount: i32,
}

impl ClickRecord {
    /// A single click with no delay and no drift.
    pub fn click(x: i32, y: i32, button: MouseButton) -> Self {
        Self {
            x,
            y,
            button: Some(button),
            delay: 0.0,
            is_double_click: false,
            offset_x: 0,
            offset_y: 0,
            is_scroll: false,
            scroll_amount: 0,
        }
    }

    /// A scroll action performed at `(x, y)`.
    pub fn scroll(x: i32, y: i32, amount: i32) -> Self {
        Self {
            x,
            y,
            button: None,
            delay: 0.0,
            is_double_click: false,
            offset_x: 0,
            offset_y: 0,
            is_scroll: true,
            scroll_amount: amount,
        }
    }

    /// Set the pause after this action, in seconds.
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    /// Set the per-cycle drift.
    pub fn with_offset(mut self, offset_x: i32, offset_y: i32) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    /// Classification used by the replay loop. Scroll wins if a hand-edited
    /// file sets both flags.
    pub fn kind(&self) -> ClickKind {
        if self.is_scroll {
            ClickKind::Scroll
        } else if self.is_double_click {
            ClickKind::Double
        } else {
            ClickKind::Single
        }
    }

    /// Position for a 1-based replay cycle: drift is zero on cycle 1 and grows
    /// linearly afterwards.
    pub fn position_at(&self, cycle: u32) -> (i32, i32) {
        let steps = cycle.saturating_sub(1) as i32;
        (
            self.x.saturating_add(self.offset_x.saturating_mul(steps)),
            self.y.saturating_add(self.offset_y.saturating_mul(steps)),
        )
    }

    /// Mark as a double click, clearing the scroll classification.
    pub fn set_double_click(&mut self, value: bool) {
        self.is_double_click = value;
        if value {
            self.is_scroll = false;
        }
    }

    /// Mark as a scroll, clearing the double-click classification.
    pub fn set_scroll(&mut self, value: bool) {
        self.is_scroll = value;
        if value {
            self.is_double_click = false;
        }
    }

    /// Check the invariants a deserialized record might violate: at most one
    /// classification flag, and a finite, non-negative delay.
    pub fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.is_scroll && self.is_double_click {
            return Err("is_scroll and is_double_click are both set");
        }
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err("delay must be a non-negative number of seconds");
        }
        Ok(())
    }

    /// Apply a textual edit to one field. On error the record is unchanged.
    pub fn apply_edit(&mut self, field: RecordField, text: &str) -> Result<()> {
        let text = text.trim();
        let invalid = |reason: &str| Error::InvalidFieldEdit {
            field: field.name().to_string(),
            value: text.to_string(),
            reason: reason.to_string(),
        };
        let int = || text.parse::<i32>().map_err(|e| invalid(&e.to_string()));
        let flag = || parse_bool(text).ok_or_else(|| invalid("expected true or false"));

        match field {
            RecordField::X => self.x = int()?,
            RecordField::Y => self.y = int()?,
            RecordField::OffsetX => self.offset_x = int()?,
            RecordField::OffsetY => self.offset_y = int()?,
            RecordField::ScrollAmount => self.scroll_amount = int()?,
            RecordField::Delay => {
                let delay = text.parse::<f64>().map_err(|e| invalid(&e.to_string()))?;
                if !delay.is_finite() || delay < 0.0 {
                    return Err(invalid("delay must be a non-negative number of seconds"));
                }
                self.delay = delay;
            }
            RecordField::Button => {
                self.button = match text.to_ascii_lowercase().as_str() {
                    "left" => Some(MouseButton::Left),
                    "right" => Some(MouseButton::Right),
                    "middle" => Some(MouseButton::Middle),
                    "none" | "" => None,
                    _ => return Err(invalid("expected left, right, middle or none")),
                }
            }
            RecordField::IsDoubleClick => self.set_double_click(flag()?),
            RecordField::IsScroll => self.set_scroll(flag()?),
        }
        Ok(())
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Editable fields of a [`ClickRecord`], named as in the persisted format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    X,
    Y,
    Button,
    Delay,
    IsDoubleClick,
    OffsetX,
    OffsetY,
    IsScroll,
    ScrollAmount,
}

impl RecordField {
    /// Field name as written in macro files.
    pub fn name(&self) -> &'static str {
        match self {
            RecordField::X => "x",
            RecordField::Y => "y",
            RecordField::Button => "button",
            RecordField::Delay => "delay",
            RecordField::IsDoubleClick => "is_double_click",
            RecordField::OffsetX => "offset_x",
            RecordField::OffsetY => "offset_y",
            RecordField::IsScroll => "is_scroll",
            RecordField::ScrollAmount => "scroll_amount",
        }
    }
}

impl FromStr for RecordField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "x" => RecordField::X,
            "y" => RecordField::Y,
            "button" => RecordField::Button,
            "delay" => RecordField::Delay,
            "is_double_click" => RecordField::IsDoubleClick,
            "offset_x" => RecordField::OffsetX,
            "offset_y" => RecordField::OffsetY,
            "is_scroll" => RecordField::IsScroll,
            "scroll_amount" => RecordField::ScrollAmount,
            other => {
                return Err(Error::InvalidFieldEdit {
                    field: other.to_string(),
                    value: String::new(),
                    reason: "unknown field".into(),
                });
            }
        })
    }
}

/// Ordered records; insertion order is replay order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClickSequence {
    records: Vec<ClickRecord>,
}

impl ClickSequence {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the sequence has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record; it is replayed last.
    pub fn push(&mut self, record: ClickRecord) {
        self.records.push(record);
    }

    /// Get the record at `index`.
    pub fn get(&self, index: usize) -> Option<&ClickRecord> {
        self.records.get(index)
    }

    /// The most recently appended record.
    pub fn last(&self) -> Option<&ClickRecord> {
        self.records.last()
    }

    /// Mutable access to the most recently appended record.
    pub fn last_mut(&mut self) -> Option<&mut ClickRecord> {
        self.records.last_mut()
    }

    /// Iterate records in replay order.
    pub fn iter(&self) -> std::slice::Iter<'_, ClickRecord> {
        self.records.iter()
    }

    /// The records as a slice.
    pub fn as_slice(&self) -> &[ClickRecord] {
        &self.records
    }

    /// Remove every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Edit one field of the record at `index`.
    pub fn edit(&mut self, index: usize, field: RecordField, text: &str) -> Result<()> {
        let len = self.records.len();
        self.records
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?
            .apply_edit(field, text)
    }

    /// Remove and return the record at `index`.
    pub fn remove(&mut self, index: usize) -> Result<ClickRecord> {
        if index >= self.records.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        Ok(self.records.remove(index))
    }
}

impl From<Vec<ClickRecord>> for ClickSequence {
    fn from(records: Vec<ClickRecord>) -> Self {
        Self { records }
    }
}

impl<'a> IntoIterator for &'a ClickSequence {
    type Item = &'a ClickRecord;
    type IntoIter = std::slice::Iter<'a, ClickRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_drifts_linearly() {
        let rec = ClickRecord::click(100, 50, MouseButton::Left).with_offset(10, -5);
        assert_eq!(rec.position_at(1), (100, 50));
        assert_eq!(rec.position_at(2), (110, 45));
        assert_eq!(rec.position_at(3), (120, 40));
    }

    #[test]
    fn test_kind_classification() {
        let mut rec = ClickRecord::click(1, 1, MouseButton::Left);
        assert_eq!(rec.kind(), ClickKind::Single);

        rec.set_double_click(true);
        assert_eq!(rec.kind(), ClickKind::Double);

        rec.set_scroll(true);
        assert_eq!(rec.kind(), ClickKind::Scroll);
        assert!(!rec.is_double_click);

        assert_eq!(ClickRecord::scroll(0, 0, -3).kind(), ClickKind::Scroll);
    }

    #[test]
    fn test_validate_rejects_conflicting_flags_and_bad_delay() {
        assert!(ClickRecord::scroll(0, 0, 1).validate().is_ok());

        let mut both = ClickRecord::scroll(0, 0, 1);
        both.is_double_click = true;
        assert!(both.validate().is_err());

        let late = ClickRecord::click(0, 0, MouseButton::Left).with_delay(-0.5);
        assert!(late.validate().is_err());
        let never = ClickRecord::click(0, 0, MouseButton::Left).with_delay(f64::INFINITY);
        assert!(never.validate().is_err());
    }

    #[test]
    fn test_edit_parses_field_types() {
        let mut rec = ClickRecord::click(1, 2, MouseButton::Left);
        rec.apply_edit(RecordField::X, " 42 ").unwrap();
        rec.apply_edit(RecordField::Delay, "0.5").unwrap();
        rec.apply_edit(RecordField::Button, "none").unwrap();
        rec.apply_edit(RecordField::IsScroll, "true").unwrap();
        rec.apply_edit(RecordField::ScrollAmount, "-120").unwrap();

        assert_eq!(rec.x, 42);
        assert_eq!(rec.delay, 0.5);
        assert_eq!(rec.button, None);
        assert_eq!(rec.kind(), ClickKind::Scroll);
        assert_eq!(rec.scroll_amount, -120);
    }

    #[test]
    fn test_invalid_edit_keeps_prior_value() {
        let mut rec = ClickRecord::click(7, 8, MouseButton::Left).with_delay(1.5);

        let err = rec.apply_edit(RecordField::Y, "abc").unwrap_err();
        assert!(matches!(err, Error::InvalidFieldEdit { ref field, .. } if field == "y"));
        assert_eq!(rec.y, 8);

        assert!(rec.apply_edit(RecordField::Delay, "-1").is_err());
        assert_eq!(rec.delay, 1.5);

        assert!(rec.apply_edit(RecordField::Button, "thumb").is_err());
        assert_eq!(rec.button, Some(MouseButton::Left));
    }

    #[test]
    fn test_sequence_edit_out_of_range() {
        let mut seq = ClickSequence::from(vec![ClickRecord::click(0, 0, MouseButton::Left)]);
        let err = seq.edit(3, RecordField::X, "1").unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 3, len: 1 }));
        assert!(seq.remove(1).is_err());
        assert_eq!(seq.remove(0).unwrap().x, 0);
        assert!(seq.is_empty());
    }

    #[test]
    fn test_field_names_round_trip() {
        for name in [
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
            assert_eq!(name.parse::<RecordField>().unwrap().name(), name);
        }
        assert!("speed".parse::<RecordField>().is_err());
    }
}
