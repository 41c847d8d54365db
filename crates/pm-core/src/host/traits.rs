//! Host automation trait definitions
//!
//! These traits describe the slice of a CAD host's object model that the
//! macro drives. The macro never owns the model; it only calls into it.

use std::collections::BTreeSet;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Tolerance used when classifying segment orientation (metres)
pub const ORIENTATION_TOLERANCE: f64 = 1e-9;

/// Kind of document open in the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Single part
    #[default]
    Part,
    /// Assembly of parts
    Assembly,
    /// 2D drawing
    Drawing,
}

/// Entity type passed to selection by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// Reference plane
    Plane,
}

impl EntityKind {
    /// The host's type string for this entity kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Plane => "PLANE",
        }
    }
}

/// Creation and behaviour flags of a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfigOption {
    /// Do not make the new configuration the active one
    DontActivate,
    /// Link to the parent configuration
    LinkToParent,
}

/// A named variant of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Unique name, immutable once created
    pub name: String,
    /// Free-form description
    pub comment: String,
    /// Alternate name shown in bills of materials
    pub alternate_name: String,
    /// Options fixed at creation
    pub options: BTreeSet<ConfigOption>,
}

impl Configuration {
    /// Create a configuration with no comment, alternate name or options
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: String::new(),
            alternate_name: String::new(),
            options: BTreeSet::new(),
        }
    }

    /// Set the comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Set the alternate name
    pub fn with_alternate_name(mut self, alternate_name: impl Into<String>) -> Self {
        self.alternate_name = alternate_name.into();
        self
    }

    /// Add a creation option
    pub fn with_option(mut self, option: ConfigOption) -> Self {
        self.options.insert(option);
        self
    }

    /// Check whether an option is set
    pub fn has_option(&self, option: ConfigOption) -> bool {
        self.options.contains(&option)
    }
}

/// A straight segment of the active sketch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SketchSegment {
    /// Unique identifier
    pub id: Uuid,
    /// Start point in sketch coordinates
    pub start: DVec2,
    /// End point in sketch coordinates
    pub end: DVec2,
    /// Construction geometry does not bound a profile
    pub construction: bool,
}

impl SketchSegment {
    /// Create a new profile segment
    pub fn line(start: DVec2, end: DVec2) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            construction: false,
        }
    }

    /// Create a new construction segment
    pub fn construction(start: DVec2, end: DVec2) -> Self {
        Self {
            construction: true,
            ..Self::line(start, end)
        }
    }

    /// Length of the segment
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Whether the segment is parallel to the sketch X axis
    pub fn is_horizontal(&self) -> bool {
        (self.end.y - self.start.y).abs() <= ORIENTATION_TOLERANCE
            && (self.end.x - self.start.x).abs() > ORIENTATION_TOLERANCE
    }

    /// Whether the segment is parallel to the sketch Y axis
    pub fn is_vertical(&self) -> bool {
        (self.end.x - self.start.x).abs() <= ORIENTATION_TOLERANCE
            && (self.end.y - self.start.y).abs() > ORIENTATION_TOLERANCE
    }
}

/// A driving dimension created in a sketch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Short name, e.g. `D1@Sketch1`
    pub name: String,
    /// Document-qualified name used in equations, e.g. `D1@Sketch1@Part1.SLDPRT`
    pub full_name: String,
    /// Current value in metres
    pub value: f64,
}

/// Error type for unexpected host-side failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HostError {
    #[error("Equation index {index} out of range ({count} equations)")]
    EquationIndexOutOfRange { index: usize, count: usize },

    #[error("Configuration already exists: {0}")]
    ConfigurationExists(String),

    #[error("Configuration not found: {0}")]
    ConfigurationNotFound(String),

    #[error("No sketch is being edited")]
    NoActiveSketch,

    #[error("A sketch is already being edited")]
    SketchAlreadyActive,

    #[error("No plane is selected")]
    NoPlaneSelected,

    #[error("Host rejected the call: {0}")]
    Rejected(String),
}

/// Result type for host calls
pub type HostResult<T> = Result<T, HostError>;

/// The running host application
pub trait HostApplication {
    /// Document type exposed by this host
    type Doc: Document;

    /// Get the name of this host
    fn name(&self) -> &str;

    /// Check if the host process is running and reachable
    fn is_running(&self) -> bool;

    /// The currently active document, if any
    fn active_document(&mut self) -> Option<&mut Self::Doc>;

    /// Show a short status string to the user
    fn send_message(&mut self, message: &str);

    /// Advisory flag that suppresses unrelated host prompts
    fn command_in_progress(&self) -> bool;

    /// Set the advisory "command in progress" flag
    fn set_command_in_progress(&mut self, value: bool);
}

/// A document open in the host
pub trait Document {
    /// Document title, used to qualify dimension names
    fn title(&self) -> &str;

    /// Document kind
    fn kind(&self) -> DocumentKind;

    // ========== Equations ==========

    /// Number of equations
    fn equation_count(&self) -> usize;

    /// Equation text at `index`
    fn equation(&self, index: usize) -> HostResult<String>;

    /// Overwrite the equation at `index`
    fn set_equation(&mut self, index: usize, text: &str) -> HostResult<()>;

    /// Insert an equation
    ///
    /// # Arguments
    /// * `index` - Position to insert at, or `None` to append
    /// * `text` - Equation text
    ///
    /// Returns the index the equation landed at.
    fn add_equation(&mut self, index: Option<usize>, text: &str) -> HostResult<usize>;

    // ========== Configurations ==========

    /// Whether the document exposes a configuration manager
    fn has_configuration_manager(&self) -> bool;

    /// Look up a configuration by exact name
    fn configuration(&self, name: &str) -> Option<Configuration>;

    /// Names of all configurations in creation order
    fn configuration_names(&self) -> Vec<String>;

    /// Name of the active configuration
    fn active_configuration(&self) -> Option<String>;

    /// Create a configuration
    fn add_configuration(&mut self, configuration: Configuration) -> HostResult<()>;

    /// Overwrite the comment and alternate name of an existing configuration
    fn set_configuration_details(
        &mut self,
        name: &str,
        comment: &str,
        alternate_name: &str,
    ) -> HostResult<()>;

    // ========== Selection ==========

    /// Select an entity by name and type
    ///
    /// # Arguments
    /// * `name` - Entity name, e.g. `Front Plane`
    /// * `kind` - Entity type
    /// * `at` - Pick point in model space
    /// * `append` - Keep the existing selection
    fn select_by_id(&mut self, name: &str, kind: EntityKind, at: DVec3, append: bool) -> bool;

    /// Select a segment of the active sketch
    fn select_segment(&mut self, id: Uuid, append: bool) -> bool;

    /// Clear the current selection
    fn clear_selection(&mut self);

    // ========== Sketching ==========

    /// Open a new sketch on the selected plane
    fn enter_sketch(&mut self) -> HostResult<()>;

    /// Close the sketch being edited
    fn exit_sketch(&mut self) -> HostResult<()>;

    /// Whether a sketch is being edited
    fn is_editing_sketch(&self) -> bool;

    /// Create a center-point rectangle in the active sketch
    ///
    /// # Arguments
    /// * `center` - Rectangle center
    /// * `corner` - One corner; the half extents are its offsets from `center`
    fn create_center_rectangle(&mut self, center: DVec3, corner: DVec3) -> HostResult<()>;

    /// Segments of the active sketch in creation order
    fn sketch_segments(&self) -> Option<Vec<SketchSegment>>;

    /// Dimension the selected segment, placing the text at `at`
    fn add_dimension(&mut self, at: DVec2) -> Option<Dimension>;

    // ========== Rebuild ==========

    /// Rebuild the whole model
    fn rebuild(&mut self) -> HostResult<()>;
}
