//! In-memory host
//!
//! A self-contained implementation of `HostApplication` and `Document`.
//! Documents serialize to RON so a run can be replayed against saved state,
//! and `Faults` lets callers reproduce the host misbehaviour the macro has
//! to tolerate (missing configuration manager, short segment lists,
//! unselectable segments, dimensions that fail to materialize).

use std::collections::HashMap;
use std::path::Path;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::traits::{
    ConfigOption, Configuration, Dimension, Document, DocumentKind, EntityKind, HostApplication,
    HostError, HostResult, ORIENTATION_TOLERANCE, SketchSegment,
};
use crate::equation::{self, EquationKind};

/// Reference planes of a new part
const DEFAULT_PLANES: [&str; 3] = ["Front Plane", "Top Plane", "Right Plane"];

/// Configuration every new document starts with
const DEFAULT_CONFIGURATION: &str = "Default";

/// Limit when following `"A"="B"` chains during rebuild
const MAX_REFERENCE_DEPTH: usize = 16;

/// Injected host misbehaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Faults {
    /// Report no configuration manager
    pub no_configuration_manager: bool,
    /// Truncate segment lists to this many entries
    pub segment_limit: Option<usize>,
    /// Segment indices that refuse selection
    pub unselectable_segments: Vec<usize>,
    /// Segment indices whose dimension is never created
    pub rejected_dimensions: Vec<usize>,
}

/// A dimension attached to a sketch segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchDimension {
    /// The dimension as reported to callers
    pub dimension: Dimension,
    /// Dimensioned segment
    pub segment: Uuid,
    /// Text placement
    pub placement: DVec2,
}

/// A sketch stored in a memory document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySketch {
    /// Feature name, e.g. `Sketch1`
    pub name: String,
    /// Plane the sketch lies on
    pub plane: String,
    /// Segments in creation order
    pub segments: Vec<SketchSegment>,
    /// Dimensions in creation order
    pub dimensions: Vec<SketchDimension>,
}

impl MemorySketch {
    fn new(name: String, plane: String) -> Self {
        Self {
            name,
            plane,
            segments: Vec::new(),
            dimensions: Vec::new(),
        }
    }

    fn segment(&self, id: Uuid) -> Option<&SketchSegment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Drive a dimension to `value`, scaling the sketch about its origin
    /// along the dimensioned segment's axis.
    fn drive_dimension(&mut self, index: usize, value: f64) {
        let Some(segment) = self.segment(self.dimensions[index].segment).copied() else {
            return;
        };

        let current = segment.length();
        if current > ORIENTATION_TOLERANCE && value > 0.0 {
            let factor = value / current;
            let scale = if segment.is_horizontal() {
                DVec2::new(factor, 1.0)
            } else if segment.is_vertical() {
                DVec2::new(1.0, factor)
            } else {
                DVec2::splat(factor)
            };

            for s in &mut self.segments {
                s.start *= scale;
                s.end *= scale;
            }
        }

        // Re-measure every dimension against the new geometry
        let lengths: HashMap<Uuid, f64> =
            self.segments.iter().map(|s| (s.id, s.length())).collect();
        for dim in &mut self.dimensions {
            if let Some(length) = lengths.get(&dim.segment) {
                dim.dimension.value = *length;
            }
        }
    }
}

/// Transient editing state, never persisted
#[derive(Debug, Clone, Default)]
struct EditState {
    selection: Vec<Selected>,
    open_sketch: Option<usize>,
    rebuild_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Selected {
    Plane(String),
    Segment(Uuid),
}

/// A document held entirely in memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDocument {
    title: String,
    kind: DocumentKind,
    #[serde(default)]
    equations: Vec<String>,
    configurations: Vec<Configuration>,
    active_configuration: Option<String>,
    planes: Vec<String>,
    #[serde(default)]
    sketches: Vec<MemorySketch>,
    #[serde(default)]
    faults: Faults,
    #[serde(skip)]
    state: EditState,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new_part("Part1.SLDPRT")
    }
}

impl MemoryDocument {
    /// Create a new document of the given kind with the default planes and
    /// configuration
    pub fn new(title: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            title: title.into(),
            kind,
            equations: Vec::new(),
            configurations: vec![Configuration::new(DEFAULT_CONFIGURATION)],
            active_configuration: Some(DEFAULT_CONFIGURATION.to_string()),
            planes: DEFAULT_PLANES.iter().map(|p| p.to_string()).collect(),
            sketches: Vec::new(),
            faults: Faults::default(),
            state: EditState::default(),
        }
    }

    /// Create a new part document
    pub fn new_part(title: impl Into<String>) -> Self {
        Self::new(title, DocumentKind::Part)
    }

    /// Replace the reference plane names
    pub fn with_planes<I, S>(mut self, planes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.planes = planes.into_iter().map(Into::into).collect();
        self
    }

    /// Seed the equation list
    pub fn with_equations<I, S>(mut self, equations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.equations = equations.into_iter().map(Into::into).collect();
        self
    }

    /// Inject host faults
    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }

    /// Mutable access to the injected faults
    pub fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    /// All equations in order
    pub fn equations(&self) -> &[String] {
        &self.equations
    }

    /// All configurations in creation order
    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    /// All sketches in creation order
    pub fn sketches(&self) -> &[MemorySketch] {
        &self.sketches
    }

    /// Look up a dimension by its full name
    pub fn dimension(&self, full_name: &str) -> Option<&Dimension> {
        self.sketches
            .iter()
            .flat_map(|s| s.dimensions.iter())
            .map(|d| &d.dimension)
            .find(|d| d.full_name == full_name)
    }

    /// Number of rebuilds since the document was opened
    pub fn rebuild_count(&self) -> usize {
        self.state.rebuild_count
    }

    /// Number of selected entities
    pub fn selection_count(&self) -> usize {
        self.state.selection.len()
    }

    fn open_sketch(&self) -> HostResult<&MemorySketch> {
        self.state
            .open_sketch
            .map(|i| &self.sketches[i])
            .ok_or(HostError::NoActiveSketch)
    }

    fn open_sketch_mut(&mut self) -> HostResult<&mut MemorySketch> {
        match self.state.open_sketch {
            Some(i) => Ok(&mut self.sketches[i]),
            None => Err(HostError::NoActiveSketch),
        }
    }

    fn selected_plane(&self) -> Option<&str> {
        self.state.selection.iter().rev().find_map(|s| match s {
            Selected::Plane(name) => Some(name.as_str()),
            Selected::Segment(_) => None,
        })
    }

    fn select(&mut self, item: Selected, append: bool) {
        if !append {
            self.state.selection.clear();
        }
        self.state.selection.push(item);
    }

    // ============== File I/O ==============

    /// Save the document to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let content = self.to_bytes()?;
        std::fs::write(path.as_ref(), content).map_err(|e| DocumentError::Io(e.to_string()))?;
        Ok(())
    }

    /// Serialize the document to RON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| DocumentError::Serialize(e.to_string()))?;
        Ok(content.into_bytes())
    }

    /// Load a document from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| DocumentError::Io(e.to_string()))?;
        ron::from_str(&content).map_err(|e| DocumentError::Deserialize(e.to_string()))
    }
}

impl Document for MemoryDocument {
    fn title(&self) -> &str {
        &self.title
    }

    fn kind(&self) -> DocumentKind {
        self.kind
    }

    fn equation_count(&self) -> usize {
        self.equations.len()
    }

    fn equation(&self, index: usize) -> HostResult<String> {
        self.equations
            .get(index)
            .cloned()
            .ok_or(HostError::EquationIndexOutOfRange {
                index,
                count: self.equations.len(),
            })
    }

    fn set_equation(&mut self, index: usize, text: &str) -> HostResult<()> {
        let count = self.equations.len();
        let slot = self
            .equations
            .get_mut(index)
            .ok_or(HostError::EquationIndexOutOfRange { index, count })?;
        *slot = text.to_string();
        Ok(())
    }

    fn add_equation(&mut self, index: Option<usize>, text: &str) -> HostResult<usize> {
        let count = self.equations.len();
        match index {
            None => {
                self.equations.push(text.to_string());
                Ok(count)
            }
            Some(index) if index <= count => {
                self.equations.insert(index, text.to_string());
                Ok(index)
            }
            Some(index) => Err(HostError::EquationIndexOutOfRange { index, count }),
        }
    }

    fn has_configuration_manager(&self) -> bool {
        !self.faults.no_configuration_manager
    }

    fn configuration(&self, name: &str) -> Option<Configuration> {
        self.configurations.iter().find(|c| c.name == name).cloned()
    }

    fn configuration_names(&self) -> Vec<String> {
        self.configurations.iter().map(|c| c.name.clone()).collect()
    }

    fn active_configuration(&self) -> Option<String> {
        self.active_configuration.clone()
    }

    fn add_configuration(&mut self, configuration: Configuration) -> HostResult<()> {
        if self.configuration(&configuration.name).is_some() {
            return Err(HostError::ConfigurationExists(configuration.name));
        }

        if !configuration.has_option(ConfigOption::DontActivate) {
            self.active_configuration = Some(configuration.name.clone());
        }
        self.configurations.push(configuration);
        Ok(())
    }

    fn set_configuration_details(
        &mut self,
        name: &str,
        comment: &str,
        alternate_name: &str,
    ) -> HostResult<()> {
        let configuration = self
            .configurations
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| HostError::ConfigurationNotFound(name.to_string()))?;
        configuration.comment = comment.to_string();
        configuration.alternate_name = alternate_name.to_string();
        Ok(())
    }

    fn select_by_id(&mut self, name: &str, kind: EntityKind, _at: DVec3, append: bool) -> bool {
        tracing::debug!("Select {} ({})", name, kind.as_str());
        match kind {
            EntityKind::Plane if self.planes.iter().any(|p| p == name) => {
                self.select(Selected::Plane(name.to_string()), append);
                true
            }
            _ => false,
        }
    }

    fn select_segment(&mut self, id: Uuid, append: bool) -> bool {
        let Ok(sketch) = self.open_sketch() else {
            return false;
        };
        let Some(index) = sketch.segments.iter().position(|s| s.id == id) else {
            return false;
        };
        if self.faults.unselectable_segments.contains(&index) {
            return false;
        }

        self.select(Selected::Segment(id), append);
        true
    }

    fn clear_selection(&mut self) {
        self.state.selection.clear();
    }

    fn enter_sketch(&mut self) -> HostResult<()> {
        if self.state.open_sketch.is_some() {
            return Err(HostError::SketchAlreadyActive);
        }
        let plane = self
            .selected_plane()
            .ok_or(HostError::NoPlaneSelected)?
            .to_string();

        let name = format!("Sketch{}", self.sketches.len() + 1);
        tracing::debug!("Entering {} on {}", name, plane);
        self.sketches.push(MemorySketch::new(name, plane));
        self.state.open_sketch = Some(self.sketches.len() - 1);
        self.state.selection.clear();
        Ok(())
    }

    fn exit_sketch(&mut self) -> HostResult<()> {
        let index = self
            .state
            .open_sketch
            .take()
            .ok_or(HostError::NoActiveSketch)?;
        tracing::debug!("Exiting {}", self.sketches[index].name);
        self.state.selection.clear();
        Ok(())
    }

    fn is_editing_sketch(&self) -> bool {
        self.state.open_sketch.is_some()
    }

    fn create_center_rectangle(&mut self, center: DVec3, corner: DVec3) -> HostResult<()> {
        let c = center.truncate();
        let half = (corner - center).truncate().abs();
        if half.x <= ORIENTATION_TOLERANCE || half.y <= ORIENTATION_TOLERANCE {
            return Err(HostError::Rejected("degenerate rectangle".into()));
        }

        let top_left = c + DVec2::new(-half.x, half.y);
        let top_right = c + DVec2::new(half.x, half.y);
        let bottom_right = c + DVec2::new(half.x, -half.y);
        let bottom_left = c + DVec2::new(-half.x, -half.y);

        let sketch = self.open_sketch_mut()?;
        sketch.segments.extend([
            SketchSegment::line(top_left, top_right),
            SketchSegment::line(top_right, bottom_right),
            SketchSegment::line(bottom_right, bottom_left),
            SketchSegment::line(bottom_left, top_left),
            SketchSegment::construction(top_left, bottom_right),
            SketchSegment::construction(top_right, bottom_left),
        ]);
        Ok(())
    }

    fn sketch_segments(&self) -> Option<Vec<SketchSegment>> {
        let sketch = self.open_sketch().ok()?;
        let limit = self.faults.segment_limit.unwrap_or(usize::MAX);
        Some(sketch.segments.iter().take(limit).copied().collect())
    }

    fn add_dimension(&mut self, at: DVec2) -> Option<Dimension> {
        let [Selected::Segment(segment_id)] = self.state.selection.as_slice() else {
            return None;
        };
        let segment_id = *segment_id;

        let sketch = self.open_sketch().ok()?;
        let index = sketch.segments.iter().position(|s| s.id == segment_id)?;
        if self.faults.rejected_dimensions.contains(&index) {
            return None;
        }

        let name = format!("D{}@{}", sketch.dimensions.len() + 1, sketch.name);
        let dimension = Dimension {
            full_name: format!("{}@{}", name, self.title),
            name,
            value: sketch.segments[index].length(),
        };

        let sketch = self.open_sketch_mut().ok()?;
        sketch.dimensions.push(SketchDimension {
            dimension: dimension.clone(),
            segment: segment_id,
            placement: at,
        });
        Some(dimension)
    }

    fn rebuild(&mut self) -> HostResult<()> {
        self.state.rebuild_count += 1;

        let mut parameters: HashMap<String, String> = HashMap::new();
        let mut bindings = Vec::new();
        for text in &self.equations {
            match equation::classify(text) {
                EquationKind::ParameterDefinition { name, expression } => {
                    parameters.entry(name).or_insert(expression);
                }
                EquationKind::DimensionBinding {
                    dimension,
                    parameter,
                } => bindings.push((dimension, parameter)),
                EquationKind::Other => {}
            }
        }

        for (dimension, parameter) in bindings {
            let Some(value) = resolve_parameter(&parameters, &parameter, 0) else {
                tracing::warn!("Cannot evaluate {} bound to {}", parameter, dimension);
                continue;
            };

            let target = self.sketches.iter_mut().find_map(|sketch| {
                sketch
                    .dimensions
                    .iter()
                    .position(|d| d.dimension.full_name == dimension)
                    .map(|i| (sketch, i))
            });
            match target {
                Some((sketch, index)) => sketch.drive_dimension(index, value),
                None => tracing::warn!("Binding references unknown dimension {}", dimension),
            }
        }

        tracing::debug!("Rebuilt {} ({} equations)", self.title, self.equations.len());
        Ok(())
    }
}

fn resolve_parameter(
    parameters: &HashMap<String, String>,
    name: &str,
    depth: usize,
) -> Option<f64> {
    if depth > MAX_REFERENCE_DEPTH {
        return None;
    }
    let expression = parameters.get(name)?;
    match equation::unquote(expression) {
        Some(reference) => resolve_parameter(parameters, reference, depth + 1),
        None => equation::parse_length(expression),
    }
}

/// An in-memory host application
#[derive(Debug, Clone)]
pub struct MemoryHost {
    running: bool,
    document: Option<MemoryDocument>,
    messages: Vec<String>,
    command_in_progress: bool,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// A running host with no document open
    pub fn new() -> Self {
        Self {
            running: true,
            document: None,
            messages: Vec::new(),
            command_in_progress: false,
        }
    }

    /// A running host with `document` active
    pub fn with_document(document: MemoryDocument) -> Self {
        Self {
            document: Some(document),
            ..Self::new()
        }
    }

    /// A host that is not running
    pub fn not_running() -> Self {
        Self {
            running: false,
            ..Self::new()
        }
    }

    /// Close and return the active document
    pub fn close(&mut self) -> Option<MemoryDocument> {
        self.document.take()
    }

    /// The active document
    pub fn document(&self) -> Option<&MemoryDocument> {
        self.document.as_ref()
    }

    /// Status messages sent so far
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl HostApplication for MemoryHost {
    type Doc = MemoryDocument;

    fn name(&self) -> &str {
        "memory"
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn active_document(&mut self) -> Option<&mut MemoryDocument> {
        self.document.as_mut()
    }

    fn send_message(&mut self, message: &str) {
        tracing::debug!("Status: {}", message);
        self.messages.push(message.to_string());
    }

    fn command_in_progress(&self) -> bool {
        self.command_in_progress
    }

    fn set_command_in_progress(&mut self, value: bool) {
        self.command_in_progress = value;
    }
}

/// Document file errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sketching_document() -> MemoryDocument {
        let mut doc = MemoryDocument::default();
        assert!(doc.select_by_id("Front Plane", EntityKind::Plane, DVec3::ZERO, false));
        doc.enter_sketch().unwrap();
        doc.create_center_rectangle(DVec3::ZERO, DVec3::new(0.075, 0.08, 0.0))
            .unwrap();
        doc
    }

    #[test]
    fn test_add_equation_positions() {
        let mut doc = MemoryDocument::default();
        assert_eq!(doc.add_equation(None, "\"A\"=1").unwrap(), 0);
        assert_eq!(doc.add_equation(Some(0), "\"B\"=2").unwrap(), 0);
        assert_eq!(doc.equations(), ["\"B\"=2", "\"A\"=1"]);
        assert_eq!(
            doc.add_equation(Some(5), "\"C\"=3"),
            Err(HostError::EquationIndexOutOfRange { index: 5, count: 2 })
        );
    }

    #[test]
    fn test_configuration_activation() {
        let mut doc = MemoryDocument::default();
        doc.add_configuration(Configuration::new("quiet").with_option(ConfigOption::DontActivate))
            .unwrap();
        assert_eq!(doc.active_configuration().as_deref(), Some("Default"));

        doc.add_configuration(Configuration::new("loud")).unwrap();
        assert_eq!(doc.active_configuration().as_deref(), Some("loud"));

        assert_eq!(
            doc.add_configuration(Configuration::new("loud")),
            Err(HostError::ConfigurationExists("loud".into()))
        );
    }

    #[test]
    fn test_unknown_plane_is_not_selected() {
        let mut doc = MemoryDocument::default();
        assert!(!doc.select_by_id("Front", EntityKind::Plane, DVec3::ZERO, false));
        assert_eq!(doc.enter_sketch(), Err(HostError::NoPlaneSelected));
    }

    #[test]
    fn test_center_rectangle_segment_order() {
        let doc = sketching_document();
        let segments = doc.sketch_segments().unwrap();

        assert_eq!(segments.len(), 6);
        assert!(segments[0].is_horizontal());
        assert!(segments[1].is_vertical());
        assert!(segments[2].is_horizontal());
        assert!(segments[3].is_vertical());
        assert!(segments[4].construction && segments[5].construction);
        assert_relative_eq!(segments[0].length(), 0.15, epsilon = 1e-12);
        assert_relative_eq!(segments[1].length(), 0.16, epsilon = 1e-12);
    }

    #[test]
    fn test_dimension_requires_single_segment() {
        let mut doc = sketching_document();
        assert!(doc.add_dimension(DVec2::ZERO).is_none());

        let segments = doc.sketch_segments().unwrap();
        assert!(doc.select_segment(segments[0].id, false));
        let dim = doc.add_dimension(DVec2::new(0.0, 0.1)).unwrap();
        assert_eq!(dim.name, "D1@Sketch1");
        assert_eq!(dim.full_name, "D1@Sketch1@Part1.SLDPRT");

        assert!(doc.select_segment(segments[1].id, true));
        assert!(doc.add_dimension(DVec2::ZERO).is_none());
    }

    #[test]
    fn test_faults() {
        let mut doc = sketching_document();
        *doc.faults_mut() = Faults {
            segment_limit: Some(3),
            unselectable_segments: vec![0],
            rejected_dimensions: vec![1],
            ..Default::default()
        };

        let segments = doc.sketch_segments().unwrap();
        assert_eq!(segments.len(), 3);
        assert!(!doc.select_segment(segments[0].id, false));
        assert!(doc.select_segment(segments[1].id, false));
        assert!(doc.add_dimension(DVec2::ZERO).is_none());
    }

    #[test]
    fn test_rebuild_drives_bound_dimensions() {
        let mut doc = sketching_document();
        let segments = doc.sketch_segments().unwrap();
        doc.select_segment(segments[0].id, false);
        let width = doc.add_dimension(DVec2::ZERO).unwrap();
        doc.select_segment(segments[1].id, false);
        let height = doc.add_dimension(DVec2::ZERO).unwrap();
        doc.exit_sketch().unwrap();

        doc.add_equation(None, "\"BaseLength\"=150mm").unwrap();
        doc.add_equation(None, "\"BaseHeight\"=\"Other\"").unwrap();
        doc.add_equation(None, "\"Other\"=140mm").unwrap();
        doc.add_equation(None, &equation::dimension_binding(&width.full_name, "BaseLength"))
            .unwrap();
        doc.add_equation(None, &equation::dimension_binding(&height.full_name, "BaseHeight"))
            .unwrap();
        doc.rebuild().unwrap();

        assert_eq!(doc.rebuild_count(), 1);
        let width = doc.dimension(&width.full_name).unwrap();
        let height = doc.dimension(&height.full_name).unwrap();
        assert_relative_eq!(width.value, 0.15, epsilon = 1e-12);
        assert_relative_eq!(height.value, 0.14, epsilon = 1e-12);
        let right_edge = doc.sketches()[0].segments[1];
        assert_relative_eq!(right_edge.length(), 0.14, epsilon = 1e-12);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.ron");

        let doc = MemoryDocument::new_part("Bracket.SLDPRT").with_equations(["\"A\"=1mm"]);
        doc.save(&path).unwrap();

        let loaded = MemoryDocument::load(&path).unwrap();
        assert_eq!(loaded.title(), "Bracket.SLDPRT");
        assert_eq!(loaded.equations(), ["\"A\"=1mm"]);
        assert_eq!(loaded.configuration_names(), ["Default"]);
        assert_eq!(loaded.rebuild_count(), 0);
    }
}
