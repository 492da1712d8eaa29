use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters used to procedurally generate a sandbox host world.
/// Stored with the world for reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxParams {
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_regions")]
    pub width_regions: u32,
    #[serde(default = "default_regions")]
    pub depth_regions: u32,
    #[serde(default = "default_base_height")]
    pub base_height: i32,
    #[serde(default = "default_sea_level")]
    pub sea_level: i32,
    #[serde(default = "default_roughness")]
    pub roughness: f64,
    /// Regions around the observer that receive simulation steps.
    #[serde(default = "default_simulation_distance")]
    pub simulation_distance: u32,
    #[serde(default)]
    pub observer_region: (i32, i32),
    #[serde(default = "default_collectors")]
    pub collectors: u32,
}

fn default_regions() -> u32 {
    8
}
fn default_base_height() -> i32 {
    64
}
fn default_sea_level() -> i32 {
    62
}
fn default_roughness() -> f64 {
    0.5
}
fn default_simulation_distance() -> u32 {
    4
}
fn default_collectors() -> u32 {
    2
}

impl Default for SandboxParams {
    fn default() -> Self {
        Self {
            seed: 0,
            width_regions: default_regions(),
            depth_regions: default_regions(),
            base_height: default_base_height(),
            sea_level: default_sea_level(),
            roughness: default_roughness(),
            simulation_distance: default_simulation_distance(),
            observer_region: (0, 0),
            collectors: default_collectors(),
        }
    }
}

impl SandboxParams {
    /// Load sandbox parameters from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        let params: Self = toml::from_str(&content)
            .map_err(|e| format!("Invalid TOML in {}: {}", path.display(), e))?;
        params.validate()?;
        Ok(params)
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=64).contains(&self.width_regions) || !(1..=64).contains(&self.depth_regions) {
            return Err(format!(
                "width_regions and depth_regions must be 1-64, got {}x{}",
                self.width_regions, self.depth_regions
            ));
        }
        if !(1..=255).contains(&self.base_height) {
            return Err(format!("base_height must be 1-255, got {}", self.base_height));
        }
        if !(0..=255).contains(&self.sea_level) {
            return Err(format!("sea_level must be 0-255, got {}", self.sea_level));
        }
        if !(0.0..=1.0).contains(&self.roughness) {
            return Err(format!("roughness must be 0.0-1.0, got {}", self.roughness));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(SandboxParams::default().validate().is_ok());
    }

    #[test]
    fn invalid_dimensions() {
        let params = SandboxParams {
            width_regions: 0,
            ..SandboxParams::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.contains("width_regions"), "Error: {}", err);
    }

    #[test]
    fn invalid_roughness() {
        let params = SandboxParams {
            roughness: 1.5,
            ..SandboxParams::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.contains("roughness"), "Error: {}", err);
    }

    #[test]
    fn from_toml_string() {
        let toml_str = r#"
seed = 42
width_regions = 4
depth_regions = 2
observer_region = [1, 1]
"#;
        let params: SandboxParams = toml::from_str(toml_str).unwrap();
        assert_eq!(params.seed, 42);
        assert_eq!(params.width_regions, 4);
        assert_eq!(params.depth_regions, 2);
        assert_eq!(params.observer_region, (1, 1));
        assert_eq!(params.sea_level, 62);
        params.validate().unwrap();
    }

    #[test]
    fn from_file_missing() {
        let err = SandboxParams::from_file(Path::new("/nonexistent/sandbox.toml")).unwrap_err();
        assert!(err.contains("Cannot read"), "Error: {}", err);
    }

    #[test]
    fn from_file_invalid_toml() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "this is not valid toml {{{{").unwrap();

        let err = SandboxParams::from_file(tmpfile.path()).unwrap_err();
        assert!(err.contains("Invalid TOML"), "Error: {}", err);
    }

    #[test]
    fn from_file_out_of_range() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "sea_level = 900").unwrap();

        let err = SandboxParams::from_file(tmpfile.path()).unwrap_err();
        assert!(err.contains("sea_level"), "Error: {}", err);
    }
}
