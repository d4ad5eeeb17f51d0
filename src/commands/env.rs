//! Env action - renders the marker environment.

use crate::marker::MarkerEnvironment;

/// Text rendering of the environment, one `variable = "value"` per line,
/// in the order the grammar defines the variables.
pub fn environment_text(env: &MarkerEnvironment) -> String {
    let pairs = [
        ("os_name", env.os_name.as_str()),
        ("sys_platform", env.sys_platform.as_str()),
        ("platform_machine", env.platform_machine.as_str()),
        ("platform_system", env.platform_system.as_str()),
        ("platform_release", env.platform_release.as_str()),
        ("platform_version", env.platform_version.as_str()),
        ("python_version", env.python_version.as_str()),
        ("python_full_version", env.python_full_version.as_str()),
        ("implementation_name", env.implementation_name.as_str()),
        ("extra", env.extra.as_deref().unwrap_or("")),
    ];
    pairs
        .iter()
        .map(|(name, value)| format!("{} = \"{}\"\n", name, value))
        .collect()
}
