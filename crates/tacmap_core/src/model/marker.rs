//! Marker domain model.
//!
//! # Responsibility
//! - Define the canonical record for a placed tactical symbol.
//! - Provide partial-update (`MarkerPatch`) semantics shared by all tools.
//!
//! # Invariants
//! - `unique_id` is assigned once and never reused for another marker.
//! - `size` is finite and strictly positive.
//! - A marker's symbol reference has at least one resolvable part.

use crate::geometry::MapPoint;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use uuid::Uuid;

/// Store-local marker identifier (SQLite rowid).
pub type MarkerId = i64;

/// Default marker size in map units.
pub const DEFAULT_MARKER_SIZE: f64 = 30.0;

/// Reference to the vector symbol drawn for a marker.
///
/// Placement from the symbol library fills both parts: the path it came from
/// and the inline content read at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SymbolRef {
    /// Path into the symbol library.
    pub path: Option<String>,
    /// Inline serialized vector graphic.
    pub content: Option<String>,
}

impl SymbolRef {
    /// Reference by library path; content is read on placement.
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            content: None,
        }
    }

    /// Reference by inline content only.
    pub fn inline(content: impl Into<String>) -> Self {
        Self {
            path: None,
            content: Some(content.into()),
        }
    }

    /// Returns non-blank inline content, if any.
    pub fn inline_content(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|content| !content.trim().is_empty())
    }

    /// Returns the non-blank path, if any.
    pub fn library_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|path| !path.trim().is_empty())
    }

    /// Display name derived from the path basename.
    pub fn display_name(&self) -> String {
        self.library_path()
            .and_then(|path| Path::new(path).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Canonical persisted marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Store-local id; only meaningful inside one store instance.
    pub id: MarkerId,
    /// Stable identity across stores and migrations.
    pub unique_id: Uuid,
    /// Point in the store CRS.
    pub position: MapPoint,
    /// Display name, defaults to the symbol basename.
    pub name: String,
    pub symbol: SymbolRef,
    /// Map units.
    pub size: f64,
    /// Persisted for the renderer; not interpreted by the engine.
    pub scale_with_view: bool,
    pub label_text: Option<String>,
    pub label_visible: bool,
}

impl Marker {
    /// Validates record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), MarkerValidationError> {
        validate_size(self.size)?;
        if !self.position.is_finite() {
            return Err(MarkerValidationError::NonFinitePosition);
        }
        if self.symbol.inline_content().is_none() && self.symbol.library_path().is_none() {
            return Err(MarkerValidationError::MissingSymbol);
        }
        Ok(())
    }

    /// Label text that the renderer should draw, if any.
    pub fn visible_label(&self) -> Option<&str> {
        if !self.label_visible {
            return None;
        }
        self.label_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Input for a marker that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMarker {
    pub position: MapPoint,
    pub name: String,
    pub symbol: SymbolRef,
    pub size: f64,
}

impl NewMarker {
    /// New marker named after the symbol basename.
    pub fn new(position: MapPoint, symbol: SymbolRef, size: f64) -> Self {
        Self {
            position,
            name: symbol.display_name(),
            symbol,
            size,
        }
    }
}

/// Partial attribute update. `None` fields are left untouched.
///
/// `label_text: Some(None)` clears the label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerPatch {
    pub position: Option<MapPoint>,
    pub name: Option<String>,
    pub size: Option<f64>,
    pub scale_with_view: Option<bool>,
    pub label_text: Option<Option<String>>,
    pub label_visible: Option<bool>,
    pub symbol: Option<SymbolRef>,
}

impl MarkerPatch {
    pub fn position(position: MapPoint) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn size(size: f64) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn label(text: Option<String>, visible: bool) -> Self {
        Self {
            label_text: Some(text),
            label_visible: Some(visible),
            ..Self::default()
        }
    }

    pub fn scale_with_view(enabled: bool) -> Self {
        Self {
            scale_with_view: Some(enabled),
            ..Self::default()
        }
    }

    /// Returns whether this patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the patch to a copy of `marker`.
    ///
    /// The result is not validated; callers validate before writing.
    pub fn apply_to(&self, marker: &Marker) -> Marker {
        let mut next = marker.clone();
        if let Some(position) = self.position {
            next.position = position;
        }
        if let Some(name) = &self.name {
            next.name = name.clone();
        }
        if let Some(size) = self.size {
            next.size = size;
        }
        if let Some(scale_with_view) = self.scale_with_view {
            next.scale_with_view = scale_with_view;
        }
        if let Some(label_text) = &self.label_text {
            next.label_text = label_text.clone();
        }
        if let Some(label_visible) = self.label_visible {
            next.label_visible = label_visible;
        }
        if let Some(symbol) = &self.symbol {
            next.symbol = symbol.clone();
        }
        next
    }
}

/// Marker invariant violations.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerValidationError {
    NonPositiveSize(f64),
    NonFinitePosition,
    MissingSymbol,
}

impl Display for MarkerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveSize(size) => {
                write!(f, "marker size must be finite and > 0, got {size}")
            }
            Self::NonFinitePosition => write!(f, "marker position must be finite"),
            Self::MissingSymbol => {
                write!(f, "marker symbol needs a library path or inline content")
            }
        }
    }
}

impl Error for MarkerValidationError {}

fn validate_size(size: f64) -> Result<(), MarkerValidationError> {
    if size.is_finite() && size > 0.0 {
        Ok(())
    } else {
        Err(MarkerValidationError::NonPositiveSize(size))
    }
}
