//! Macro recipes
//!
//! A recipe lists the parameters, configuration and rectangle one run
//! establishes. Recipes are stored as RON; the default recipe carries the
//! macro's built-in values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::binder::RectangleSpec;
use crate::ledger::Parameter;

/// Configuration to ensure during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationRecipe {
    /// Configuration name
    pub name: String,
    /// Comment written on create and update
    #[serde(default)]
    pub comment: String,
    /// Alternate name written on create and update
    #[serde(default)]
    pub alternate_name: String,
}

impl ConfigurationRecipe {
    /// A configuration with empty comment and alternate name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: String::new(),
            alternate_name: String::new(),
        }
    }
}

/// Everything one macro run does, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRecipe {
    /// Parameters to define, in order
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Configuration to ensure after the parameters
    #[serde(default)]
    pub configuration: Option<ConfigurationRecipe>,
    /// Rectangle to sketch and bind last
    #[serde(default)]
    pub rectangle: Option<RectangleSpec>,
}

impl Default for MacroRecipe {
    fn default() -> Self {
        Self {
            parameters: vec![
                Parameter::new("BaseLength", "150mm"),
                Parameter::new("BaseHeight", "140mm"),
            ],
            configuration: Some(ConfigurationRecipe::new("pla")),
            rectangle: Some(RectangleSpec::default()),
        }
    }
}

impl MacroRecipe {
    /// A recipe that does nothing
    pub fn empty() -> Self {
        Self {
            parameters: Vec::new(),
            configuration: None,
            rectangle: None,
        }
    }

    /// Parse a recipe from RON text
    pub fn from_ron(content: &str) -> Result<Self, RecipeError> {
        ron::from_str(content).map_err(|e| RecipeError::Deserialize(e.to_string()))
    }

    /// Serialize the recipe to pretty RON
    pub fn to_ron(&self) -> Result<String, RecipeError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| RecipeError::Serialize(e.to_string()))
    }

    /// Load a recipe from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecipeError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| RecipeError::Io(e.to_string()))?;
        Self::from_ron(&content)
    }

    /// Save the recipe to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RecipeError> {
        let content = self.to_ron()?;
        std::fs::write(path.as_ref(), content).map_err(|e| RecipeError::Io(e.to_string()))
    }
}

/// Recipe file errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecipeError {
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
    use crate::binder::SegmentOrder;

    #[test]
    fn test_partial_recipe_uses_field_defaults() {
        let recipe = MacroRecipe::from_ron(
            r#"(
                parameters: [(name: "Width", expression: "80mm")],
                rectangle: Some((
                    planes: ["Top Plane"],
                    half_width: 0.04,
                    half_height: 0.02,
                    width_parameter: "Width",
                    height_parameter: "Depth",
                )),
            )"#,
        )
        .unwrap();

        assert_eq!(recipe.parameters, vec![Parameter::new("Width", "80mm")]);
        assert!(recipe.configuration.is_none());
        let rectangle = recipe.rectangle.unwrap();
        assert_eq!(rectangle.dimension_offset, 1.5);
        assert_eq!(rectangle.segment_order, SegmentOrder::CreationIndex);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipe.ron");

        let recipe = MacroRecipe::default();
        recipe.save(&path).unwrap();
        assert_eq!(MacroRecipe::load(&path).unwrap(), recipe);
    }

    #[test]
    fn test_malformed_recipe() {
        assert!(matches!(
            MacroRecipe::from_ron("(parameters: 3)"),
            Err(RecipeError::Deserialize(_))
        ));
    }
}
