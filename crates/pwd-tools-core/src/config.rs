use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

use crate::compute::deductions::DeductionSpec;
use crate::compute::stamp_duty::{Bracket, StampDutyTable};
use crate::error::Error;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: String,
    pub export_dir: String,
    pub default_interest_rate: f64,
    pub stamp_duty_brackets: Vec<Bracket>,
    pub deduction_presets: Vec<DeductionPreset>,
}

/// A deduction that is offered for every bill unless overridden.
#[derive(Debug, Clone, Deserialize)]
pub struct DeductionPreset {
    pub deduction_type: String,
    pub rate: f64,
    #[serde(default)]
    pub statutory: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: "pwd_tools.db".to_string(),
            export_dir: ".".to_string(),
            default_interest_rate: 6.0,
            stamp_duty_brackets: StampDutyTable::default().brackets().to_vec(),
            deduction_presets: vec![
                DeductionPreset {
                    deduction_type: "Income Tax".to_string(),
                    rate: 1.0,
                    statutory: true,
                },
                DeductionPreset {
                    deduction_type: "Security Deposit".to_string(),
                    rate: 5.0,
                    statutory: false,
                },
            ],
        }
    }
}

impl AppConfig {
    pub fn stamp_duty_table(&self) -> Result<StampDutyTable, Error> {
        StampDutyTable::new(self.stamp_duty_brackets.clone())
    }

    pub fn preset_deductions(&self) -> Vec<DeductionSpec> {
        self.deduction_presets
            .iter()
            .map(|p| DeductionSpec::percent(&p.deduction_type, p.rate, p.statutory))
            .collect()
    }
}

/// Reads `Config.toml` (optional) and `PWD_*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("PWD"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let config = AppConfig::default();
        assert_eq!(config.database_path, "pwd_tools.db");
        assert!(config.stamp_duty_table().is_ok());
        assert_eq!(config.preset_deductions().len(), 2);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(
                "database_path = \"ledger.db\"\ndefault_interest_rate = 7.5",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.database_path, "ledger.db");
        assert_eq!(config.default_interest_rate, 7.5);
        assert_eq!(config.export_dir, ".");
        assert_eq!(config.deduction_presets.len(), 2);
    }

    #[test]
    fn test_open_bracket_without_upper_bound() {
        let toml = "[[stamp_duty_brackets]]\n\
                    upper_bound = 100000.0\n\
                    rate = 0.5\n\
                    \n\
                    [[stamp_duty_brackets]]\n\
                    rate = 1.0\n";
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.stamp_duty_brackets.len(), 2);
        assert_eq!(config.stamp_duty_brackets[0].upper_bound, Some(100_000.0));
        assert_eq!(config.stamp_duty_brackets[1].upper_bound, None);

        let table = config.stamp_duty_table().unwrap();
        assert_eq!(table.duty(5_000_000.0).unwrap().rate, 1.0);
    }

    #[test]
    fn test_environment_overrides() {
        std::env::set_var("PWD_DEFAULT_INTEREST_RATE", "7.5");
        let config = load_configuration();
        std::env::remove_var("PWD_DEFAULT_INTEREST_RATE");

        let config = config.unwrap();
        assert_eq!(config.default_interest_rate, 7.5);
        assert_eq!(config.database_path, "pwd_tools.db");
    }
}
