//! Material configuration loader.
//!
//! Loads physical properties from YAML files, allowing easy configuration of
//! different ball sets, cloths, cushion rubbers, and table layouts without
//! recompiling.
//!
//! ## Directory Structure
//!
//! ```text
//! materials/
//! ├── balls/
//! │   └── aramith_tournament.yaml
//! ├── cloths/
//! │   ├── simonis_860.yaml
//! │   └── ...
//! ├── cushions/
//! │   └── k66_profile.yaml
//! └── tables/
//!     └── nine_foot.yaml
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{BallProperties, ClothProperties, CushionMaterial, TableLayout};

/// Error type for material loading operations.
#[derive(Debug)]
pub enum MaterialError {
    IoError(std::io::Error),
    ParseError(serde_yaml::Error),
    NotFound(String),
}

impl std::fmt::Display for MaterialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterialError::IoError(e) => write!(f, "IO error: {}", e),
            MaterialError::ParseError(e) => write!(f, "YAML parse error: {}", e),
            MaterialError::NotFound(name) => write!(f, "Material not found: {}", name),
        }
    }
}

impl std::error::Error for MaterialError {}

impl From<std::io::Error> for MaterialError {
    fn from(err: std::io::Error) -> Self {
        MaterialError::IoError(err)
    }
}

impl From<serde_yaml::Error> for MaterialError {
    fn from(err: serde_yaml::Error) -> Self {
        MaterialError::ParseError(err)
    }
}

/// Material loader with configurable base directory.
pub struct MaterialLoader {
    base_path: PathBuf,
}

impl MaterialLoader {
    /// Create a new loader with the given base path.
    ///
    /// The base path should contain `balls/`, `cloths/`, `cushions/`, and
    /// `tables/` subdirectories.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Load a ball set by name (without .yaml extension).
    ///
    /// # Example
    /// ```ignore
    /// let loader = MaterialLoader::new("materials");
    /// let balls = loader.load_ball("aramith_tournament")?;
    /// ```
    pub fn load_ball(&self, name: &str) -> Result<BallProperties, MaterialError> {
        let path = self.base_path.join("balls").join(format!("{}.yaml", name));
        if !path.exists() {
            return Err(MaterialError::NotFound(name.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        let props: BallProperties = serde_yaml::from_str(&contents)?;
        Ok(props)
    }

    /// Load a cloth by name.
    pub fn load_cloth(&self, name: &str) -> Result<ClothProperties, MaterialError> {
        let path = self.base_path.join("cloths").join(format!("{}.yaml", name));
        if !path.exists() {
            return Err(MaterialError::NotFound(name.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        let props: ClothProperties = serde_yaml::from_str(&contents)?;
        Ok(props)
    }

    /// Load a cushion rubber by name.
    pub fn load_cushion(&self, name: &str) -> Result<CushionMaterial, MaterialError> {
        let path = self
            .base_path
            .join("cushions")
            .join(format!("{}.yaml", name));
        if !path.exists() {
            return Err(MaterialError::NotFound(name.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        let props: CushionMaterial = serde_yaml::from_str(&contents)?;
        Ok(props)
    }

    /// Load a table layout by name.
    pub fn load_table(&self, name: &str) -> Result<TableLayout, MaterialError> {
        let path = self.base_path.join("tables").join(format!("{}.yaml", name));
        if !path.exists() {
            return Err(MaterialError::NotFound(name.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        let layout: TableLayout = serde_yaml::from_str(&contents)?;
        Ok(layout)
    }

    /// List all available ball sets.
    pub fn list_balls(&self) -> Result<Vec<String>, MaterialError> {
        self.list_materials("balls")
    }

    /// List all available cloths.
    pub fn list_cloths(&self) -> Result<Vec<String>, MaterialError> {
        self.list_materials("cloths")
    }

    /// List all available cushion rubbers.
    pub fn list_cushions(&self) -> Result<Vec<String>, MaterialError> {
        self.list_materials("cushions")
    }

    /// List all available table layouts.
    pub fn list_tables(&self) -> Result<Vec<String>, MaterialError> {
        self.list_materials("tables")
    }

    fn list_materials(&self, subdir: &str) -> Result<Vec<String>, MaterialError> {
        let path = self.base_path.join(subdir);
        if !path.exists() {
            return Ok(vec![]);
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if name.ends_with(".yaml") {
                names.push(name.trim_end_matches(".yaml").to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

// =============================================================================
// Tests
// =============================================================================
