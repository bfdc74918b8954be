use super::config::ConfigError;
use std::collections::BTreeMap;
use toml::Value;

/// Names of the recognised model parameters.
pub mod keys {
    pub const DIMENSIONS: &str = "DIMENSIONS";
    pub const BOUNDARY_CONDITIONS: &str = "BOUNDARY_CONDITIONS";
    pub const INITIAL_SPACING: &str = "INITIAL_SPACING";
    pub const INITIAL_SPACING_STDEV: &str = "INITIAL_SPACING_STDEV";
    pub const INITIAL_SPIN_ORIENTATION: &str = "INITIAL_SPIN_ORIENTATION";
    pub const INITIAL_SPIN_ORIENTATION_STDEV: &str = "INITIAL_SPIN_ORIENTATION_STDEV";
    pub const INITIAL_TEMPERATURE: &str = "INITIAL_TEMPERATURE";

    pub const POTENTIAL: &str = "POTENTIAL";
    pub const TWO_SPIN_POTENTIAL: &str = "TWO_SPIN_POTENTIAL";
    pub const EPSILON_0: &str = "EPSILON_0";
    pub const SIGMA_S: &str = "SIGMA_S";
    pub const KAPPA: &str = "KAPPA";
    pub const KAPPA_TAG: &str = "KAPPA_TAG";
    pub const MIU: &str = "MIU";
    pub const NI: &str = "NI";
    pub const DIPOLE_STRENGTH: &str = "DIPOLE_STRENGTH";
    pub const BOLTZMANN_CONSTANT: &str = "BOLTZMANN_CONSTANT";

    pub const NEAREST_NEIGHBOURS_MAX_RADIUS: &str = "NEAREST_NEIGHBOURS_MAX_RADIUS";
    pub const NEAREST_NEIGHBOURS_MAX_INDEX_RANGE: &str = "NEAREST_NEIGHBOURS_MAX_INDEX_RANGE";
    pub const NEAREST_NEIGHBOURS_UPDATE_CYCLES: &str = "NEAREST_NEIGHBOURS_UPDATE_CYCLES";

    pub const USE_MC_HEATER: &str = "USE_MC_HEATER";
    pub const USE_MC_COOLER: &str = "USE_MC_COOLER";
    pub const HEATER_PREFIX: &str = "MC_HEATER_";
    pub const COOLER_PREFIX: &str = "MC_COOLER_";

    pub const SPIN_STDEV: &str = "SPIN_STDEV";
    pub const SPACING_STDEV: &str = "SPACING_STDEV";
    pub const SPACING_FROM_ORIGINAL_LOCATION_CUTOFF: &str = "SPACING_FROM_ORIGINAL_LOCATION_CUTOFF";
    pub const METROPOLIS_NUM_STEPS: &str = "METROPOLIS_NUM_STEPS";
    pub const MAX_NON_IMPROVING_STEPS: &str = "MAX_NON_IMPROVING_STEPS";
    pub const MAX_STEPS: &str = "MAX_STEPS";
    pub const TEMPERATURES: &str = "TEMPERATURES";
    pub const SELECTOR: &str = "SELECTOR";
    pub const AVIZ_OUTPUT_PATH: &str = "AVIZ_OUTPUT_PATH";
    pub const STATE_PREFIX: &str = "STATE_PREFIX";

    pub const LCS_REPOSITORY_LOCATION: &str = "LCS_REPOSITORY_LOCATION";
    pub const LCS_REPOSITORY_SUFFIX: &str = "LCS_REPOSITORY_SUFFIX";
    pub const SEED: &str = "SEED";
}

/// A flat mapping of named model parameters.
///
/// Values keep their TOML type until a typed getter asks for them, so a
/// parameter set can be merged from several sources before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    values: BTreeMap<String, Value>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let table: toml::Table =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(Self::from_table(table))
    }

    pub fn from_table(table: toml::Table) -> Self {
        Self {
            values: table.into_iter().collect(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Overlays `other` on top of `self`; keys present in both take `other`'s value.
    pub fn merge(&mut self, other: ParameterSet) {
        self.values.extend(other.values);
    }

    fn required(&self, key: &str) -> Result<&Value, ConfigError> {
        self.values
            .get(key)
            .ok_or_else(|| ConfigError::MissingParameter(key.to_string()))
    }

    pub fn f64(&self, key: &str) -> Result<f64, ConfigError> {
        as_f64(key, self.required(key)?)
    }

    pub fn optional_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.values.get(key).map(|v| as_f64(key, v)).transpose()
    }

    pub fn usize(&self, key: &str) -> Result<usize, ConfigError> {
        as_usize(key, self.required(key)?)
    }

    pub fn optional_usize(&self, key: &str) -> Result<Option<usize>, ConfigError> {
        self.values.get(key).map(|v| as_usize(key, v)).transpose()
    }

    pub fn optional_u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        self.values
            .get(key)
            .map(|v| match v {
                Value::Integer(i) if *i >= 0 => Ok(*i as u64),
                other => Err(type_error(key, "a non-negative integer", other)),
            })
            .transpose()
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(Value::Boolean(b)) => Ok(*b),
            Some(other) => Err(type_error(key, "a boolean", other)),
        }
    }

    pub fn string(&self, key: &str) -> Result<&str, ConfigError> {
        as_str(key, self.required(key)?)
    }

    pub fn string_or<'a>(&'a self, key: &str, default: &'a str) -> Result<&'a str, ConfigError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(v) => as_str(key, v),
        }
    }

    pub fn usize_list(&self, key: &str) -> Result<Vec<usize>, ConfigError> {
        as_array(key, self.required(key)?)?
            .iter()
            .map(|v| as_usize(key, v))
            .collect()
    }

    pub fn string_list(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        as_array(key, self.required(key)?)?
            .iter()
            .map(|v| as_str(key, v).map(str::to_string))
            .collect()
    }

    /// A per-axis real list. A single number is broadcast to all `len` axes.
    pub fn f64_list(&self, key: &str, len: usize) -> Result<Vec<f64>, ConfigError> {
        match self.required(key)? {
            Value::Array(items) => items.iter().map(|v| as_f64(key, v)).collect(),
            scalar => Ok(vec![as_f64(key, scalar)?; len]),
        }
    }

    /// A temperature schedule, either an explicit array or a
    /// `{ start, stop, step }` table expanded to the half-open range
    /// `start, start + step, ...` that stops before reaching `stop`.
    pub fn temperatures(&self, key: &str) -> Result<Vec<f64>, ConfigError> {
        match self.required(key)? {
            Value::Array(items) => items.iter().map(|v| as_f64(key, v)).collect(),
            Value::Table(table) => {
                let field = |name: &str| -> Result<f64, ConfigError> {
                    let value = table.get(name).ok_or_else(|| {
                        ConfigError::MissingParameter(format!("{key}.{name}"))
                    })?;
                    as_f64(key, value)
                };
                frange(key, field("start")?, field("stop")?, field("step")?)
            }
            other => Err(type_error(key, "an array or a {start, stop, step} table", other)),
        }
    }
}

fn frange(key: &str, start: f64, stop: f64, step: f64) -> Result<Vec<f64>, ConfigError> {
    if step == 0.0 || !step.is_finite() {
        return Err(ConfigError::invalid(key, "step must be finite and non-zero"));
    }
    if !start.is_finite() || !stop.is_finite() {
        return Err(ConfigError::invalid(key, "start and stop must be finite"));
    }
    // Values within a hair of `stop` count as reaching it.
    let slack = step.abs() * 1e-9;
    let mut values = Vec::new();
    loop {
        let t = start + values.len() as f64 * step;
        let before_stop = if step > 0.0 { t < stop - slack } else { t > stop + slack };
        if !before_stop {
            break;
        }
        values.push(t);
    }
    Ok(values)
}

fn type_error(key: &str, expected: &str, found: &Value) -> ConfigError {
    ConfigError::invalid(key, format!("expected {expected}, found {}", found.type_str()))
}

fn as_f64(key: &str, value: &Value) -> Result<f64, ConfigError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Integer(i) => Ok(*i as f64),
        other => Err(type_error(key, "a number", other)),
    }
}

fn as_usize(key: &str, value: &Value) -> Result<usize, ConfigError> {
    match value {
        Value::Integer(i) if *i >= 0 => Ok(*i as usize),
        other => Err(type_error(key, "a non-negative integer", other)),
    }
}

fn as_str<'a>(key: &str, value: &'a Value) -> Result<&'a str, ConfigError> {
    value
        .as_str()
        .ok_or_else(|| type_error(key, "a string", value))
}

fn as_array<'a>(key: &str, value: &'a Value) -> Result<&'a Vec<Value>, ConfigError> {
    value
        .as_array()
        .ok_or_else(|| type_error(key, "an array", value))
}
