//! Configuration for field-type sizing

use serde::{Deserialize, Serialize};

/// Fields that always hold free text and are never VARCHAR-sized
pub const DEFAULT_LONG_TEXT_FIELDS: &[&str] = &[
    "descricaoClasse",
    "ementa",
    "decisao",
    "jurisprudenciaCitada",
    "notas",
    "informacoesComplementares",
    "termosAuxiliares",
    "teseJuridica",
    "referenciasLegislativas",
    "acordaosSimilares",
    "tema",
];

/// Configuration for type inference and DDL sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SizingConfig {
    /// Fields pinned to `string` and reported as TEXT
    pub long_text_fields: Vec<String>,

    /// VARCHAR size for strings with no sample and for unknown fields
    pub default_varchar: usize,

    /// Strings longer than this are reported as TEXT
    pub text_threshold: usize,

    /// Multiplier applied to the longest string before rounding
    pub safety_margin: f64,

    /// Total digits above which a float is reported as NUMERIC
    pub max_float_digits: usize,

    /// Fractional digits above which a float is reported as NUMERIC
    pub max_float_scale: usize,

    /// Extension of corpus documents
    pub file_extension: String,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            long_text_fields: DEFAULT_LONG_TEXT_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_varchar: 50,
            text_threshold: 255,
            safety_margin: 1.25,
            max_float_digits: 15,
            max_float_scale: 4,
            file_extension: ".json".to_string(),
        }
    }
}

impl SizingConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> SizingConfigBuilder {
        SizingConfigBuilder::default()
    }

    /// Whether `name` is in the long-text set
    pub fn is_long_text(&self, name: &str) -> bool {
        self.long_text_fields.iter().any(|f| f == name)
    }
}

/// Builder for SizingConfig
#[derive(Debug, Default)]
pub struct SizingConfigBuilder {
    config: SizingConfig,
}

impl SizingConfigBuilder {
    /// Replace the long-text set
    pub fn long_text_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.long_text_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add one field to the long-text set
    pub fn long_text_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.config.long_text_fields.contains(&field) {
            self.config.long_text_fields.push(field);
        }
        self
    }

    /// Set the fallback VARCHAR size
    pub fn default_varchar(mut self, size: usize) -> Self {
        self.config.default_varchar = size.max(1);
        self
    }

    /// Set the TEXT threshold
    pub fn text_threshold(mut self, threshold: usize) -> Self {
        self.config.text_threshold = threshold;
        self
    }

    /// Set the safety margin (at least 1.0)
    pub fn safety_margin(mut self, margin: f64) -> Self {
        self.config.safety_margin = margin.max(1.0);
        self
    }

    /// Set the NUMERIC thresholds
    pub fn float_limits(mut self, max_digits: usize, max_scale: usize) -> Self {
        self.config.max_float_digits = max_digits;
        self.config.max_float_scale = max_scale;
        self
    }

    /// Set the document extension
    pub fn file_extension(mut self, extension: impl Into<String>) -> Self {
        self.config.file_extension = extension.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> SizingConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SizingConfig::default();
        assert_eq!(config.long_text_fields.len(), 11);
        assert!(config.is_long_text("ementa"));
        assert!(!config.is_long_text("classe"));
        assert_eq!(config.default_varchar, 50);
        assert_eq!(config.text_threshold, 255);
        assert_eq!(config.file_extension, ".json");
    }

    #[test]
    fn test_builder() {
        let config = SizingConfig::builder()
            .long_text_fields(["ementa"])
            .long_text_field("inteiroTeor")
            .long_text_field("ementa")
            .default_varchar(80)
            .float_limits(18, 6)
            .build();

        assert_eq!(config.long_text_fields, vec!["ementa", "inteiroTeor"]);
        assert_eq!(config.default_varchar, 80);
        assert_eq!(config.max_float_digits, 18);
        assert_eq!(config.max_float_scale, 6);
    }

    #[test]
    fn test_safety_margin_clamping() {
        let config = SizingConfig::builder()
            .safety_margin(0.5) // Should clamp to 1.0
            .build();

        assert_eq!(config.safety_margin, 1.0);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: SizingConfig = serde_json::from_str(r#"{"defaultVarchar": 64}"#).unwrap();
        assert_eq!(config.default_varchar, 64);
        assert_eq!(config.text_threshold, 255);
        assert!(config.is_long_text("tema"));
    }
}
