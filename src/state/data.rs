/// Shared data structures for the application state
///
/// These types represent the per-file annotation that flows between
/// the database layer and the UI layer.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};

use super::error::Error;

/// Keep/delete decision for a single file.
///
/// `Unset` is what a freshly discovered file gets; wherever a yes/no answer
/// is needed it behaves like `Keep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteAction {
    #[default]
    Unset,
    Keep,
    Delete,
}

impl DeleteAction {
    /// Text stored in the `delete_action` column (NULL for `Unset`)
    pub fn as_db_str(self) -> Option<&'static str> {
        match self {
            DeleteAction::Unset => None,
            DeleteAction::Keep => Some("keep"),
            DeleteAction::Delete => Some("delete"),
        }
    }
}

impl ToSql for DeleteAction {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.as_db_str() {
            Some(text) => ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes())),
            None => ToSqlOutput::Owned(Value::Null),
        })
    }
}

impl FromSql for DeleteAction {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(DeleteAction::Unset),
            ValueRef::Text(b"keep") => Ok(DeleteAction::Keep),
            ValueRef::Text(b"delete") => Ok(DeleteAction::Delete),
            ValueRef::Text(other) => Err(FromSqlError::Other(Box::new(
                Error::InvalidDeleteAction(String::from_utf8_lossy(other).into_owned()),
            ))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// Viewing rotation in counter-clockwise degrees, always 0, 90, 180 or 270.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rotation(u16);

impl Rotation {
    pub const NONE: Rotation = Rotation(0);

    /// Snap any accumulated angle onto a quarter turn:
    /// `((raw / 90) mod 4) * 90`, with floor division and a non-negative modulus.
    pub fn normalized(raw: i64) -> Self {
        Rotation((raw.div_euclid(90).rem_euclid(4) * 90) as u16)
    }

    /// Add a signed delta (normally ±90) and normalize the result
    pub fn rotated_by(self, delta: i32) -> Self {
        Self::normalized(i64::from(self.0) + i64::from(delta))
    }

    pub fn degrees(self) -> u16 {
        self.0
    }
}

/// Represents the persisted annotation for one image file
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Absolute path of the containing folder
    pub folder: String,
    /// Filename only (e.g., "DSC_0001.JPG"), unique within `folder`
    pub filename: String,
    pub delete_action: DeleteAction,
    pub rotation: Rotation,
}

/// Keep/delete badge shown next to each file in the listing.
///
/// Purely derived from the record's `DeleteAction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    None,
    Keep,
    Delete,
}

impl Marker {
    pub fn label(self) -> &'static str {
        match self {
            Marker::None => " ",
            Marker::Keep => "✔",
            Marker::Delete => "✖",
        }
    }
}

impl From<DeleteAction> for Marker {
    fn from(action: DeleteAction) -> Self {
        match action {
            DeleteAction::Unset => Marker::None,
            DeleteAction::Keep => Marker::Keep,
            DeleteAction::Delete => Marker::Delete,
        }
    }
}
