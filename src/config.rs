use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{TbError, TbResult};
use crate::item::CompareValidity;
use crate::model::{Backend, VALIDITY_LEN};
use crate::sim_if::Level;

pub const CREATE_ERRORS: &str = "CREATE_ERRORS";
pub const DISABLE_COVERAGE_ERRORS: &str = "DISABLE_COVERAGE_ERRORS";
pub const PHASE_STEP: &str = "PHASE_STEP";
pub const SEED: &str = "SEED";
pub const VALIDITY_LEN_KEY: &str = "VALIDITY_LEN";
pub const PRECALCULATE: &str = "PRECALCULATE";
pub const COMPARE_VALIDITY: &str = "COMPARE_VALIDITY";
pub const MAX_CYCLES: &str = "MAX_CYCLES";
pub const CLOCK_PERIOD_NS: &str = "CLOCK_PERIOD_NS";
pub const VERBOSITY: &str = "VERBOSITY";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigValue {
    Bool(bool),
    Int(u64),
    Str(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<u64> for ConfigValue {
    fn from(i: u64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

/// String keyed settings shared by all components of a run.
#[derive(Clone, Debug, Default)]
pub struct ConfigDb {
    values: BTreeMap<String, ConfigValue>,
}

impl ConfigDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) -> &mut Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> TbResult<bool> {
        match self.values.get(key) {
            None => Ok(default),
            Some(ConfigValue::Bool(b)) => Ok(*b),
            Some(ConfigValue::Int(i)) => Ok(*i != 0),
            Some(ConfigValue::Str(s)) => match s.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(config_error(key, format!("`{}` is not a boolean", s))),
            },
        }
    }

    pub fn get_int(&self, key: &str, default: u64) -> TbResult<u64> {
        match self.values.get(key) {
            None => Ok(default),
            Some(ConfigValue::Int(i)) => Ok(*i),
            Some(ConfigValue::Str(s)) => s
                .parse()
                .map_err(|_| config_error(key, format!("`{}` is not an integer", s))),
            Some(ConfigValue::Bool(_)) => Err(config_error(key, "expected an integer".into())),
        }
    }

    pub fn get_opt_int(&self, key: &str) -> TbResult<Option<u64>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(_) => self.get_int(key, 0).map(Some),
        }
    }

    pub fn get_parsed<T: FromStr>(&self, key: &str, default: T) -> TbResult<T> {
        match self.values.get(key) {
            None => Ok(default),
            Some(v) => {
                let s = v.to_string();
                s.parse()
                    .map_err(|_| config_error(key, format!("invalid value `{}`", s)))
            }
        }
    }
}

fn config_error(key: &str, msg: String) -> TbError {
    TbError::Config {
        key: key.to_string(),
        msg,
    }
}

impl FromStr for CompareValidity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "include" | "true" | "1" => Ok(CompareValidity::Include),
            "ignore" | "false" | "0" => Ok(CompareValidity::Ignore),
            _ => Err(format!("unknown validity comparison `{}`", s)),
        }
    }
}

/// Typed snapshot of a `ConfigDb`, taken when a test starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub create_errors: bool,
    pub disable_coverage_errors: bool,
    pub phase_step: u32,
    pub seed: u64,
    pub validity_len: usize,
    pub backend: Backend,
    pub compare_validity: CompareValidity,
    pub max_cycles: Option<u64>,
    pub clock_period_ns: u64,
    pub verbosity: Level,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            create_errors: false,
            disable_coverage_errors: false,
            phase_step: 1,
            seed: 0,
            validity_len: VALIDITY_LEN,
            backend: Backend::Direct,
            compare_validity: CompareValidity::Include,
            max_cycles: None,
            clock_period_ns: 10,
            verbosity: Level::Info,
        }
    }
}

impl RunConfig {
    pub fn from_db(db: &ConfigDb) -> TbResult<Self> {
        let d = Self::default();
        let phase_step = db.get_int(PHASE_STEP, d.phase_step as u64)?;
        if phase_step == 0 || phase_step > u32::MAX as u64 {
            return Err(config_error(PHASE_STEP, format!("step {} out of range", phase_step)));
        }
        let validity_len = db.get_int(VALIDITY_LEN_KEY, d.validity_len as u64)?;
        if validity_len == 0 {
            return Err(config_error(VALIDITY_LEN_KEY, "must be at least 1".into()));
        }
        let clock_period_ns = db.get_int(CLOCK_PERIOD_NS, d.clock_period_ns)?;
        if clock_period_ns < 2 || clock_period_ns % 2 != 0 {
            return Err(config_error(CLOCK_PERIOD_NS, "must be even and at least 2".into()));
        }
        let backend = if db.get_bool(PRECALCULATE, false)? {
            Backend::Lookup
        } else {
            Backend::Direct
        };
        Ok(Self {
            create_errors: db.get_bool(CREATE_ERRORS, d.create_errors)?,
            disable_coverage_errors: db
                .get_bool(DISABLE_COVERAGE_ERRORS, d.disable_coverage_errors)?,
            phase_step: phase_step as u32,
            seed: db.get_int(SEED, d.seed)?,
            validity_len: validity_len as usize,
            backend,
            compare_validity: db.get_parsed(COMPARE_VALIDITY, d.compare_validity)?,
            max_cycles: db.get_opt_int(MAX_CYCLES)?,
            clock_period_ns,
            verbosity: db.get_parsed(VERBOSITY, d.verbosity)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_db_gives_defaults() {
        let cfg = RunConfig::from_db(&ConfigDb::new()).unwrap();
        assert_eq!(cfg, RunConfig::default());
        assert_eq!(cfg.max_cycles, None);
    }

    #[test]
    fn typed_values_and_strings_are_accepted() {
        let mut db = ConfigDb::new();
        db.set(CREATE_ERRORS, "yes")
            .set(PHASE_STEP, 4u64)
            .set(SEED, "42")
            .set(PRECALCULATE, true)
            .set(COMPARE_VALIDITY, "ignore")
            .set(MAX_CYCLES, 100u64)
            .set(VERBOSITY, "warning");
        let cfg = RunConfig::from_db(&db).unwrap();
        assert!(cfg.create_errors);
        assert_eq!(cfg.phase_step, 4);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.backend, Backend::Lookup);
        assert_eq!(cfg.compare_validity, CompareValidity::Ignore);
        assert_eq!(cfg.max_cycles, Some(100));
        assert_eq!(cfg.verbosity, Level::Warning);
    }

    #[test]
    fn bad_values_name_the_key() {
        let mut db = ConfigDb::new();
        db.set(PHASE_STEP, 0u64);
        assert!(matches!(
            RunConfig::from_db(&db),
            Err(TbError::Config { key, .. }) if key == PHASE_STEP
        ));
        let mut db = ConfigDb::new();
        db.set(CREATE_ERRORS, "maybe");
        assert!(RunConfig::from_db(&db).is_err());
    }
}
