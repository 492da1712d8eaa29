use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct CycleConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_snapshot_directory")]
    pub snapshot_directory: String,
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u32,
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: u32,
    #[serde(default)]
    pub accumulation: AccumulationConfig,
    #[serde(default)]
    pub evaporation: EvaporationConfig,
    #[serde(default)]
    pub chunk: ChunkConfig,
    #[serde(default)]
    pub rain: RainConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccumulationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_intensity")]
    pub intensity_percent: f64,
    #[serde(default = "default_smoothness")]
    pub smoothness_percent: f64,
    #[serde(default = "default_max_height")]
    pub max_height: i32,
    #[serde(default = "default_blacklist")]
    pub blacklist: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaporationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_intensity")]
    pub intensity_percent: f64,
    #[serde(default = "default_smoothness")]
    pub smoothness_percent: f64,
    #[serde(default = "default_tenacity")]
    pub tenacity: u32,
    #[serde(default = "default_max_height")]
    pub max_height: i32,
    #[serde(default = "default_sun_coefficient")]
    pub sun_coefficient: f64,
}

/// Initial humidity of regions that have never been touched.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkConfig {
    #[serde(default = "default_enabled")]
    pub initial_humidity_vanilla: bool,
    #[serde(default = "default_initial_humidity_percent")]
    pub initial_humidity_percent: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RainConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_humidity_threshold")]
    pub humidity_threshold: i32,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_snapshot_directory() -> String {
    "./snapshots".to_string()
}
fn default_snapshot_interval() -> u32 {
    6000
}
fn default_max_snapshots() -> u32 {
    10
}
fn default_enabled() -> bool {
    true
}
fn default_intensity() -> f64 {
    10.0
}
fn default_smoothness() -> f64 {
    20.0
}
fn default_max_height() -> i32 {
    5
}
fn default_tenacity() -> u32 {
    30
}
fn default_sun_coefficient() -> f64 {
    0.7
}
fn default_initial_humidity_percent() -> f64 {
    50.0
}
fn default_humidity_threshold() -> i32 {
    5_000
}

/// Blocks that accumulated water would break or look wrong on.
pub fn default_blacklist() -> Vec<String> {
    [
        "lava",
        "farmland",
        "wheat",
        "carrots",
        "potatoes",
        "beetroots",
        "melon",
        "pumpkin",
        "melon_stem",
        "pumpkin_stem",
        "oak_fence",
        "spruce_fence",
        "birch_fence",
        "nether_brick_fence",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for AccumulationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            intensity_percent: default_intensity(),
            smoothness_percent: default_smoothness(),
            max_height: default_max_height(),
            blacklist: default_blacklist(),
        }
    }
}

impl Default for EvaporationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            intensity_percent: default_intensity(),
            smoothness_percent: default_smoothness(),
            tenacity: default_tenacity(),
            max_height: default_max_height(),
            sun_coefficient: default_sun_coefficient(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            initial_humidity_vanilla: default_enabled(),
            initial_humidity_percent: default_initial_humidity_percent(),
        }
    }
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            humidity_threshold: default_humidity_threshold(),
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            seed: 0,
            snapshot_directory: default_snapshot_directory(),
            snapshot_interval: default_snapshot_interval(),
            max_snapshots: default_max_snapshots(),
            accumulation: AccumulationConfig::default(),
            evaporation: EvaporationConfig::default(),
            chunk: ChunkConfig::default(),
            rain: RainConfig::default(),
        }
    }
}

impl CycleConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content, path)
    }

    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self, String> {
        let config: CycleConfig =
            toml::from_str(content).map_err(|e| format!("{}: {}", source_path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rain control needs both halves of the humidity feedback loop.
    pub fn rain_control_active(&self) -> bool {
        self.rain.enabled && self.accumulation.enabled && self.evaporation.enabled
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        let percents = [
            ("accumulation.intensity_percent", self.accumulation.intensity_percent, 10.0),
            ("accumulation.smoothness_percent", self.accumulation.smoothness_percent, 20.0),
            ("evaporation.intensity_percent", self.evaporation.intensity_percent, 10.0),
            ("evaporation.smoothness_percent", self.evaporation.smoothness_percent, 20.0),
        ];
        for (name, value, example) in percents {
            if !(0.0..=100.0).contains(&value) {
                errors.push(format!(
                    "{} must be 0-100, got {}. Example: {} = {}",
                    name, value, name, example
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.evaporation.sun_coefficient) {
            errors.push(format!(
                "evaporation.sun_coefficient must be 0.0-1.0, got {}. Example: sun_coefficient = 0.7",
                self.evaporation.sun_coefficient
            ));
        }

        if !self.chunk.initial_humidity_percent.is_finite() {
            errors.push(format!(
                "chunk.initial_humidity_percent must be a finite number, got {}. Example: initial_humidity_percent = 50.0",
                self.chunk.initial_humidity_percent
            ));
        }

        if self.rain.humidity_threshold <= 0 {
            errors.push(format!(
                "rain.humidity_threshold must be > 0, got {}. Example: humidity_threshold = 5000",
                self.rain.humidity_threshold
            ));
        }

        if self.snapshot_interval == 0 {
            errors.push(format!(
                "snapshot_interval must be > 0, got {}. Example: snapshot_interval = 6000",
                self.snapshot_interval
            ));
        }

        if self.max_snapshots == 0 {
            errors.push(format!(
                "max_snapshots must be > 0, got {}. Example: max_snapshots = 10",
                self.max_snapshots
            ));
        }

        if let Some(bad) = self.accumulation.blacklist.iter().find(|b| b.trim().is_empty()) {
            errors.push(format!(
                "accumulation.blacklist entries must be block ids, got '{}'. Example: blacklist = [\"lava\"]",
                bad
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            errors.push(format!(
                "log_level must be one of {:?}, got '{}'. Example: log_level = \"info\"",
                valid_levels, self.log_level
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn test_path() -> PathBuf {
        PathBuf::from("test-config.toml")
    }

    #[test]
    fn valid_config_loads_all_sections() {
        let toml = r#"
            log_level = "debug"
            seed = 99
            snapshot_directory = "./data/snapshots"
            snapshot_interval = 500
            max_snapshots = 3

            [accumulation]
            enabled = false
            intensity_percent = 25.0
            smoothness_percent = 60.0
            max_height = 2
            blacklist = ["lava", "sand"]

            [evaporation]
            enabled = true
            intensity_percent = 5.0
            smoothness_percent = 90.0
            tenacity = 12
            max_height = -1
            sun_coefficient = 0.25

            [chunk]
            initial_humidity_vanilla = false
            initial_humidity_percent = 80.0

            [rain]
            enabled = false
            humidity_threshold = 8000
        "#;
        let config = CycleConfig::from_toml_str(toml, &test_path()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.seed, 99);
        assert_eq!(config.snapshot_directory, "./data/snapshots");
        assert_eq!(config.snapshot_interval, 500);
        assert_eq!(config.max_snapshots, 3);
        assert!(!config.accumulation.enabled);
        assert_eq!(config.accumulation.intensity_percent, 25.0);
        assert_eq!(config.accumulation.smoothness_percent, 60.0);
        assert_eq!(config.accumulation.max_height, 2);
        assert_eq!(config.accumulation.blacklist, vec!["lava", "sand"]);
        assert_eq!(config.evaporation.intensity_percent, 5.0);
        assert_eq!(config.evaporation.smoothness_percent, 90.0);
        assert_eq!(config.evaporation.tenacity, 12);
        assert_eq!(config.evaporation.max_height, -1);
        assert_eq!(config.evaporation.sun_coefficient, 0.25);
        assert!(!config.chunk.initial_humidity_vanilla);
        assert_eq!(config.chunk.initial_humidity_percent, 80.0);
        assert!(!config.rain.enabled);
        assert_eq!(config.rain.humidity_threshold, 8000);
    }

    #[test]
    fn defaults_applied_for_empty_config() {
        let config = CycleConfig::from_toml_str("", &test_path()).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.seed, 0);
        assert!(config.accumulation.enabled);
        assert_eq!(config.accumulation.intensity_percent, 10.0);
        assert_eq!(config.accumulation.smoothness_percent, 20.0);
        assert_eq!(config.accumulation.max_height, 5);
        assert!(config.accumulation.blacklist.contains(&"lava".to_string()));
        assert_eq!(config.evaporation.tenacity, 30);
        assert_eq!(config.evaporation.sun_coefficient, 0.7);
        assert!(config.chunk.initial_humidity_vanilla);
        assert_eq!(config.chunk.initial_humidity_percent, 50.0);
        assert!(config.rain.enabled);
        assert_eq!(config.rain.humidity_threshold, 5000);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config =
            CycleConfig::from_toml_str("[evaporation]\ntenacity = 3", &test_path()).unwrap();
        assert_eq!(config.evaporation.tenacity, 3);
        assert!(config.evaporation.enabled);
        assert_eq!(config.evaporation.intensity_percent, 10.0);
    }

    #[test]
    fn out_of_range_percent_rejected() {
        let err = CycleConfig::from_toml_str(
            "[accumulation]\nintensity_percent = 150.0",
            &test_path(),
        )
        .unwrap_err();
        assert!(err.contains("accumulation.intensity_percent"));
        assert!(err.contains("0-100"));
    }

    #[test]
    fn out_of_range_sun_coefficient_rejected() {
        let err =
            CycleConfig::from_toml_str("[evaporation]\nsun_coefficient = 1.5", &test_path())
                .unwrap_err();
        assert!(err.contains("sun_coefficient"));
    }

    #[test]
    fn zero_humidity_threshold_rejected() {
        let err = CycleConfig::from_toml_str("[rain]\nhumidity_threshold = 0", &test_path())
            .unwrap_err();
        assert!(err.contains("humidity_threshold"));
    }

    #[test]
    fn negative_tenacity_is_a_parse_error() {
        let err = CycleConfig::from_toml_str("[evaporation]\ntenacity = -4", &test_path())
            .unwrap_err();
        assert!(err.contains("test-config.toml"));
    }

    #[test]
    fn multiple_errors_reported_together() {
        let toml = "log_level = \"loud\"\nsnapshot_interval = 0\n[evaporation]\nsmoothness_percent = -1.0";
        let err = CycleConfig::from_toml_str(toml, &test_path()).unwrap_err();
        assert!(err.contains("log_level"));
        assert!(err.contains("snapshot_interval"));
        assert!(err.contains("evaporation.smoothness_percent"));
    }

    #[test]
    fn rain_control_requires_both_halves() {
        let mut config = CycleConfig::default();
        assert!(config.rain_control_active());
        config.evaporation.enabled = false;
        assert!(!config.rain_control_active());
        config.evaporation.enabled = true;
        config.accumulation.enabled = false;
        assert!(!config.rain_control_active());
    }

    #[test]
    fn from_file_loads_valid_config() {
        let mut tmp = NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(tmp, "[rain]\nhumidity_threshold = 1234").unwrap();
        let config = CycleConfig::from_file(tmp.path()).unwrap();
        assert_eq!(config.rain.humidity_threshold, 1234);
    }

    #[test]
    fn from_file_missing_file_error() {
        let err = CycleConfig::from_file(Path::new("/nonexistent/watercycle.toml")).unwrap_err();
        assert!(err.contains("Cannot read"));
    }
}
