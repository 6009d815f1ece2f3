//! JSON configuration mirrors of the library configs.

use eftem::{
    BorderMode, CorrelationMode, DriftConfig, EpsilonPreset, FitMethod, MappingConfig, Rect,
};
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModeConfig {
    Coefficient,
    Correlation,
}

impl From<ModeConfig> for CorrelationMode {
    fn from(value: ModeConfig) -> Self {
        match value {
            ModeConfig::Coefficient => CorrelationMode::Coefficient,
            ModeConfig::Correlation => CorrelationMode::Correlation,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BorderConfig {
    Crop,
    Nan,
    NanEq,
    Zero,
    ZeroEq,
    SmallNegative,
    SmallNegativeEq,
}

impl From<BorderConfig> for BorderMode {
    fn from(value: BorderConfig) -> Self {
        match value {
            BorderConfig::Crop => BorderMode::Crop,
            BorderConfig::Nan => BorderMode::NaN,
            BorderConfig::NanEq => BorderMode::NaNEq,
            BorderConfig::Zero => BorderMode::Zero,
            BorderConfig::ZeroEq => BorderMode::ZeroEq,
            BorderConfig::SmallNegative => BorderMode::SmallNegative,
            BorderConfig::SmallNegativeEq => BorderMode::SmallNegativeEq,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MethodConfig {
    Lse,
    Mle,
    Wlse,
    Lma,
}

impl From<MethodConfig> for FitMethod {
    fn from(value: MethodConfig) -> Self {
        match value {
            MethodConfig::Lse => FitMethod::Lse,
            MethodConfig::Mle => FitMethod::Mle,
            MethodConfig::Wlse => FitMethod::Wlse,
            MethodConfig::Lma => FitMethod::Lma,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EpsilonConfig {
    VeryLow,
    Low,
    Mid,
    High,
    VeryHigh,
}

impl From<EpsilonConfig> for EpsilonPreset {
    fn from(value: EpsilonConfig) -> Self {
        match value {
            EpsilonConfig::VeryLow => EpsilonPreset::VeryLow,
            EpsilonConfig::Low => EpsilonPreset::Low,
            EpsilonConfig::Mid => EpsilonPreset::Mid,
            EpsilonConfig::High => EpsilonPreset::High,
            EpsilonConfig::VeryHigh => EpsilonPreset::VeryHigh,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct RectConfig {
    pub x: isize,
    pub y: isize,
    pub width: usize,
    pub height: usize,
}

impl From<RectConfig> for Rect {
    fn from(value: RectConfig) -> Self {
        Rect::new(value.x, value.y, value.width, value.height)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Worker threads; 0 uses every available core.
    pub threads: usize,
    /// Stage timeout in seconds; `null` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            timeout_secs: Some(eftem::DEFAULT_TIMEOUT.as_secs()),
        }
    }
}

impl JobConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DriftConfigJson {
    pub stack_path: String,
    pub output_path: Option<String>,
    /// Path for the corrected stack; detection only when unset.
    pub corrected_stack_path: Option<String>,
    pub shift_x: usize,
    pub shift_y: usize,
    pub reference_index: usize,
    pub roi: RectConfig,
    pub mode: ModeConfig,
    pub invert: bool,
    pub optimise: bool,
    pub border: BorderConfig,
    pub job: JobConfig,
}

impl Default for DriftConfigJson {
    fn default() -> Self {
        let cfg = DriftConfig::default();
        Self {
            stack_path: String::new(),
            output_path: None,
            corrected_stack_path: None,
            shift_x: cfg.shift_x,
            shift_y: cfg.shift_y,
            reference_index: cfg.reference_index,
            roi: RectConfig::default(),
            mode: ModeConfig::Coefficient,
            invert: cfg.invert,
            optimise: cfg.optimise,
            border: BorderConfig::Crop,
            job: JobConfig::default(),
        }
    }
}

impl From<&DriftConfigJson> for DriftConfig {
    fn from(value: &DriftConfigJson) -> Self {
        DriftConfig {
            shift_x: value.shift_x,
            shift_y: value.shift_y,
            reference_index: value.reference_index,
            roi: value.roi.into(),
            mode: value.mode.into(),
            invert: value.invert,
            optimise: value.optimise,
            border: value.border.into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MapConfigJson {
    pub stack_path: String,
    pub output_path: Option<String>,
    /// Edge energy loss in eV; predicted from the stack when unset.
    pub edge_energy_loss: Option<f32>,
    pub method: MethodConfig,
    /// Explicit threshold; overrides `epsilon_preset`.
    pub epsilon: Option<f64>,
    pub epsilon_preset: EpsilonConfig,
    /// Divide counts by the per-frame exposure when they differ.
    pub normalise_exposure: bool,
    pub job: JobConfig,
}

impl Default for MapConfigJson {
    fn default() -> Self {
        Self {
            stack_path: String::new(),
            output_path: None,
            edge_energy_loss: None,
            method: MethodConfig::Mle,
            epsilon: None,
            epsilon_preset: EpsilonConfig::Low,
            normalise_exposure: true,
            job: JobConfig::default(),
        }
    }
}

impl MapConfigJson {
    pub fn epsilon(&self) -> f64 {
        self.epsilon
            .unwrap_or_else(|| EpsilonPreset::from(self.epsilon_preset).value())
    }

    pub fn to_mapping_config(
        &self,
        edge_energy_loss: f32,
        exposures: Option<Vec<f32>>,
    ) -> MappingConfig {
        MappingConfig {
            edge_energy_loss,
            epsilon: self.epsilon(),
            method: self.method.into(),
            exposures: if self.normalise_exposure {
                exposures
            } else {
                None
            },
        }
    }
}
