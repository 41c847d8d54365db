//! Sketch Binder
//!
//! Builds a center-point rectangle on the first selectable plane and binds
//! its width and height dimensions to named parameters through equations.

use std::fmt;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::host::{Dimension, Document, DocumentKind, EntityKind, HostError, SketchSegment};
use crate::ledger::{Ledger, LedgerError};

/// Minimum number of segments a center rectangle must report
pub const RECTANGLE_SEGMENTS: usize = 4;

/// Which edge of the rectangle a binding drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeRole {
    /// Horizontal edge, bound to the width parameter
    Width,
    /// Vertical edge, bound to the height parameter
    Height,
}

impl fmt::Display for EdgeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeRole::Width => write!(f, "width"),
            EdgeRole::Height => write!(f, "height"),
        }
    }
}

/// How the width and height edges are picked from the segment list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SegmentOrder {
    /// segment[0] is the width edge, segment[1] the height edge
    #[default]
    CreationIndex,
    /// First horizontal and first vertical profile segment by geometry
    Orientation,
}

/// Binder-related errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BinderError {
    #[error("Active document must be a part (found {0:?})")]
    NotAPart(DocumentKind),

    #[error("Could not select any sketch plane: {}", .candidates.join(", "))]
    NoPlaneSelected { candidates: Vec<String> },

    #[error("Sketch has {found} segments, expected at least {}", RECTANGLE_SEGMENTS)]
    TooFewSegments { found: usize },

    #[error("No {0} segment found in sketch")]
    SegmentNotFound(EdgeRole),

    #[error("Could not select {role} segment {index}")]
    SegmentNotSelected { role: EdgeRole, index: usize },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// Result type for binder operations
pub type BinderResult<T> = Result<T, BinderError>;

fn default_dimension_offset() -> f64 {
    1.5
}

/// Parameters of one constrained rectangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleSpec {
    /// Candidate sketch planes, tried in order
    pub planes: Vec<String>,
    /// Half of the initial width (metres)
    pub half_width: f64,
    /// Half of the initial height (metres)
    pub half_height: f64,
    /// Parameter driving the width
    pub width_parameter: String,
    /// Parameter driving the height
    pub height_parameter: String,
    /// Dimension text offset, as a multiple of `half_width`
    #[serde(default = "default_dimension_offset")]
    pub dimension_offset: f64,
    /// Edge picking strategy
    #[serde(default)]
    pub segment_order: SegmentOrder,
}

impl Default for RectangleSpec {
    fn default() -> Self {
        Self {
            planes: vec!["Front Plane".into(), "Front".into()],
            half_width: 0.075,
            half_height: 0.080,
            width_parameter: "BaseLength".into(),
            height_parameter: "BaseHeight".into(),
            dimension_offset: default_dimension_offset(),
            segment_order: SegmentOrder::CreationIndex,
        }
    }
}

impl RectangleSpec {
    /// Placement of the width dimension text
    pub fn width_placement(&self) -> DVec2 {
        DVec2::new(0.0, self.half_width * self.dimension_offset)
    }

    /// Placement of the height dimension text
    pub fn height_placement(&self) -> DVec2 {
        DVec2::new(self.half_width * self.dimension_offset, 0.0)
    }
}

/// Result of binding one edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindingOutcome {
    /// Dimension created and a binding equation appended
    Bound {
        /// Created dimension
        dimension: Dimension,
        /// Bound parameter
        parameter: String,
        /// Index of the binding equation
        equation_index: usize,
    },
    /// The host produced no dimension; nothing was added
    Skipped {
        /// Parameter that stays unbound
        parameter: String,
        /// Segment that was dimensioned
        segment_index: usize,
    },
}

impl BindingOutcome {
    /// Whether a binding equation was added
    pub fn is_bound(&self) -> bool {
        matches!(self, BindingOutcome::Bound { .. })
    }
}

/// Summary of a constrained rectangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingReport {
    /// Plane the sketch was placed on
    pub plane: String,
    /// Width edge outcome
    pub width: BindingOutcome,
    /// Height edge outcome
    pub height: BindingOutcome,
}

impl BindingReport {
    /// Number of binding equations added
    pub fn bound_count(&self) -> usize {
        [&self.width, &self.height]
            .iter()
            .filter(|o| o.is_bound())
            .count()
    }
}

/// Sketch binder over a borrowed document
pub struct SketchBinder<'d, D: Document + ?Sized> {
    document: &'d mut D,
}

impl<'d, D: Document + ?Sized> SketchBinder<'d, D> {
    /// Wrap a document
    pub fn new(document: &'d mut D) -> Self {
        Self { document }
    }

    /// Create a center rectangle and bind its width and height dimensions.
    ///
    /// Once a sketch has been opened it is always closed again and the model
    /// rebuilt, whether or not the bindings succeeded.
    pub fn create_constrained_rectangle(
        &mut self,
        spec: &RectangleSpec,
    ) -> BinderResult<BindingReport> {
        let kind = self.document.kind();
        if kind != DocumentKind::Part {
            return Err(BinderError::NotAPart(kind));
        }
        if spec.width_parameter.is_empty() || spec.height_parameter.is_empty() {
            return Err(LedgerError::EmptyName.into());
        }

        let plane = self
            .select_plane(&spec.planes)
            .ok_or_else(|| BinderError::NoPlaneSelected {
                candidates: spec.planes.clone(),
            })?;

        self.document.enter_sketch()?;
        let result = self.bind_in_sketch(spec);

        self.document.clear_selection();
        self.document.exit_sketch()?;
        self.document.rebuild()?;

        let (width, height) = result?;
        Ok(BindingReport {
            plane,
            width,
            height,
        })
    }

    /// Try each candidate plane in order
    fn select_plane(&mut self, candidates: &[String]) -> Option<String> {
        candidates
            .iter()
            .find(|name| {
                self.document
                    .select_by_id(name, EntityKind::Plane, DVec3::ZERO, false)
            })
            .cloned()
    }

    fn bind_in_sketch(
        &mut self,
        spec: &RectangleSpec,
    ) -> BinderResult<(BindingOutcome, BindingOutcome)> {
        let corner = DVec3::new(spec.half_width, spec.half_height, 0.0);
        self.document.create_center_rectangle(DVec3::ZERO, corner)?;
        self.document.clear_selection();

        let segments = self.document.sketch_segments().unwrap_or_default();
        let (width_index, height_index) = pick_segments(&segments, spec.segment_order)?;

        let width = self.bind_segment(
            &segments[width_index],
            width_index,
            EdgeRole::Width,
            spec.width_placement(),
            &spec.width_parameter,
        )?;
        self.document.clear_selection();

        let height = self.bind_segment(
            &segments[height_index],
            height_index,
            EdgeRole::Height,
            spec.height_placement(),
            &spec.height_parameter,
        )?;

        Ok((width, height))
    }

    fn bind_segment(
        &mut self,
        segment: &SketchSegment,
        index: usize,
        role: EdgeRole,
        at: DVec2,
        parameter: &str,
    ) -> BinderResult<BindingOutcome> {
        if !self.document.select_segment(segment.id, false) {
            return Err(BinderError::SegmentNotSelected { role, index });
        }

        let Some(dimension) = self.document.add_dimension(at) else {
            tracing::warn!("No dimension created for {} segment {}", role, index);
            return Ok(BindingOutcome::Skipped {
                parameter: parameter.to_string(),
                segment_index: index,
            });
        };

        let equation_index =
            Ledger::new(&mut *self.document).add_binding(&dimension.full_name, parameter)?;
        Ok(BindingOutcome::Bound {
            dimension,
            parameter: parameter.to_string(),
            equation_index,
        })
    }
}

/// Pick the width and height segment indices
fn pick_segments(
    segments: &[SketchSegment],
    order: SegmentOrder,
) -> BinderResult<(usize, usize)> {
    if segments.len() < RECTANGLE_SEGMENTS {
        return Err(BinderError::TooFewSegments {
            found: segments.len(),
        });
    }

    match order {
        SegmentOrder::CreationIndex => Ok((0, 1)),
        SegmentOrder::Orientation => {
            let find = |role: EdgeRole, test: fn(&SketchSegment) -> bool| {
                segments
                    .iter()
                    .position(|s| !s.construction && test(s))
                    .ok_or(BinderError::SegmentNotFound(role))
            };
            Ok((
                find(EdgeRole::Width, SketchSegment::is_horizontal)?,
                find(EdgeRole::Height, SketchSegment::is_vertical)?,
            ))
        }
    }
}
