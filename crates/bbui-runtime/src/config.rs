#![forbid(unsafe_code)]

//! Host configuration.
//!
//! Defaults can be overridden from the environment with `BBUI_*` variables;
//! `1`/`true` enables a flag and `0`/`false` disables it. Anything else is
//! ignored.

use std::env;

/// Enables hook-order verification.
pub const ENV_CHECK_HOOK_ORDER: &str = "BBUI_CHECK_HOOK_ORDER";
/// Enables the warning for components still mounted when the host drops.
pub const ENV_WARN_LEAKS: &str = "BBUI_WARN_LEAKS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Reject renders whose hook count differs from earlier renders.
    pub check_hook_order: bool,
    /// Log a warning when the host is dropped with components still mounted.
    pub warn_on_leaked_components: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            check_hook_order: true,
            warn_on_leaked_components: true,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `BBUI_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(val) = lookup(ENV_CHECK_HOOK_ORDER)
            && let Some(flag) = parse_flag(&val)
        {
            config.check_hook_order = flag;
        }
        if let Some(val) = lookup(ENV_WARN_LEAKS)
            && let Some(flag) = parse_flag(&val)
        {
            config.warn_on_leaked_components = flag;
        }
        config
    }

    #[must_use]
    pub fn with_check_hook_order(mut self, enabled: bool) -> Self {
        self.check_hook_order = enabled;
        self
    }

    #[must_use]
    pub fn with_warn_on_leaked_components(mut self, enabled: bool) -> Self {
        self.warn_on_leaked_components = enabled;
        self
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    if val == "1" || val.eq_ignore_ascii_case("true") {
        Some(true)
    } else if val == "0" || val.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
