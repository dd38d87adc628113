//! Register assignment options, read from the `REGDEPS_OPTIONS` environment
//! variable.
//!
//! The variable holds a comma-separated list of option names. Prefixing a
//! name with `no` turns the option off. For example
//! `REGDEPS_OPTIONS=traceRA,noregisterAssociations`.

use std::{env};

use thiserror::{Error};

/** The environment variable read by [`Options::from_env()`]. */
pub const OPTIONS_VARIABLE: &str = "REGDEPS_OPTIONS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("unknown option '{0}' in {OPTIONS_VARIABLE}")]
    UnknownOption(String),
    #[error("{OPTIONS_VARIABLE} is not valid unicode")]
    NotUnicode,
}

/** Switches that change how dependencies are assigned. */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Options {
    /**
     * Ignore dependencies that say a value lives in its spill slot.
     * Set when no out-of-line code is being generated.
     */
    pub disable_ool: bool,
    /**
     * Track which virtual register was last bound to each real register,
     * and emit association directives when that changes.
     */
    pub enable_register_associations: bool,
    /** Log every move, exchange, spill and reload at `trace` level. */
    pub trace_register_assignment: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            disable_ool: false,
            enable_register_associations: true,
            trace_register_assignment: false,
        }
    }
}

impl Options {
    /** Reads [`OPTIONS_VARIABLE`]. An unset variable gives the defaults. */
    pub fn from_env() -> Result<Self, OptionsError> {
        match env::var(OPTIONS_VARIABLE) {
            Ok(s) => s.parse(),
            Err(env::VarError::NotPresent) => Ok(Self::default()),
            Err(env::VarError::NotUnicode(_)) => Err(OptionsError::NotUnicode),
        }
    }
}

impl std::str::FromStr for Options {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut options = Self::default();
        for name in s.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            let (name, value) = match name.strip_prefix("no") {
                // `noregisterAssociations`, but not a bare `no`.
                Some(rest) if !rest.is_empty() => (rest, false),
                _ => (name, true),
            };
            match name {
                "disableOOL" => { options.disable_ool = value; },
                "registerAssociations" => { options.enable_register_associations = value; },
                "traceRA" => { options.trace_register_assignment = value; },
                _ => return Err(OptionsError::UnknownOption(name.to_owned())),
            }
        }
        Ok(options)
    }
}

//-----------------------------------------------------------------------------
