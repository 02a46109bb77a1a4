use std::time::Duration;
use serde::{Deserialize, Deserializer, Serialize};
use crate::error::{BackdropError, ValidationError};
use crate::Result;

pub const MIN_OPACITY: f32 = 0.1;
pub const MAX_OPACITY: f32 = 1.0;

/// The persisted settings record. Field names on disk are kept compatible
/// with existing data files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder of background images, relative to the vault root.
    #[serde(rename = "defaultFolder", deserialize_with = "lenient_folder")]
    pub folder_path: String,
    #[serde(rename = "transTime", deserialize_with = "lenient_trans_time")]
    pub fade_duration_ms: u64,
    /// 0 disables automatic rotation.
    #[serde(rename = "changeTime", deserialize_with = "lenient_change_time")]
    pub rotation_period_ms: u64,
    #[serde(deserialize_with = "lenient_opacity")]
    pub opacity: f32,
    #[serde(rename = "whetherrandom", deserialize_with = "lenient_flag")]
    pub random_order: bool,
}

fn default_folder() -> String {
    String::new()
}

fn default_fade_duration_ms() -> u64 {
    1000
}

fn default_rotation_period_ms() -> u64 {
    120_000
}

fn default_opacity() -> f32 {
    0.9
}

fn default_random_order() -> bool {
    false
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            folder_path: default_folder(),
            fade_duration_ms: default_fade_duration_ms(),
            rotation_period_ms: default_rotation_period_ms(),
            opacity: default_opacity(),
            random_order: default_random_order(),
        }
    }
}

impl Settings {
    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }

    /// `None` when automatic rotation is disabled.
    pub fn rotation_period(&self) -> Option<Duration> {
        (self.rotation_period_ms > 0).then(|| Duration::from_millis(self.rotation_period_ms))
    }

    pub fn is_valid_opacity(value: f32) -> bool {
        (MIN_OPACITY..=MAX_OPACITY).contains(&value)
    }

    /// Rejects out-of-range values and keeps the previous opacity.
    pub fn set_opacity(&mut self, value: f32) -> Result<()> {
        if !Self::is_valid_opacity(value) {
            return Err(BackdropError::Validation(ValidationError::OpacityOutOfRange { value }));
        }
        self.opacity = value;
        Ok(())
    }
}

/// Where the settings record lives. Implemented outside this crate.
pub trait ConfigStore {
    fn load(&self) -> Result<Settings>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

// Older data files hold raw text-field input ("1000"), minute conversions
// (1.5 * 60000) and 0/1 for the random flag. Anything unreadable falls back
// to the field default.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Flag(bool),
    Whole(u64),
    Fraction(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl Lenient {
    fn as_number(&self) -> Option<f64> {
        match self {
            Lenient::Whole(n) => Some(*n as f64),
            Lenient::Fraction(f) => Some(*f),
            Lenient::Text(s) => s.trim().parse::<f64>().ok(),
            Lenient::Flag(_) | Lenient::Other(_) => None,
        }
    }
}

fn fallback<T: std::fmt::Debug>(field: &str, default: T) -> T {
    log::warn!("Unreadable value for '{}' in settings, using default {:?}", field, default);
    default
}

fn millis_or<'de, D>(deserializer: D, field: &str, default: u64) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Lenient::deserialize(deserializer)?;
    Ok(match value.as_number() {
        Some(ms) if ms.is_finite() && ms >= 0.0 => ms.round() as u64,
        _ => fallback(field, default),
    })
}

fn lenient_trans_time<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    millis_or(deserializer, "transTime", default_fade_duration_ms())
}

fn lenient_change_time<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    millis_or(deserializer, "changeTime", default_rotation_period_ms())
}

fn lenient_opacity<'de, D>(deserializer: D) -> std::result::Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Lenient::deserialize(deserializer)?;
    Ok(match value.as_number() {
        Some(v) if Settings::is_valid_opacity(v as f32) => v as f32,
        _ => fallback("opacity", default_opacity()),
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Lenient::deserialize(deserializer)?;
    Ok(match value {
        Lenient::Flag(flag) => flag,
        Lenient::Whole(n) => n != 0,
        Lenient::Text(s) if s.eq_ignore_ascii_case("true") || s.trim() == "1" => true,
        Lenient::Text(s) if s.eq_ignore_ascii_case("false") || s.trim() == "0" => false,
        _ => fallback("whetherrandom", default_random_order()),
    })
}

fn lenient_folder<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Lenient::deserialize(deserializer)?;
    Ok(match value {
        Lenient::Text(s) => s,
        _ => fallback("defaultFolder", default_folder()),
    })
}
