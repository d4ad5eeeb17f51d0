//! The set of marker variable values a manifest is evaluated against.

use serde::Serialize;

use super::MarkerVariable;

/// Marker variable values for one target environment.
///
/// [`MarkerEnvironment::detect`] fills in what the host can know
/// (platform names, machine); interpreter values default to a recent
/// CPython and can be overridden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerEnvironment {
    pub os_name: String,
    pub sys_platform: String,
    pub platform_machine: String,
    pub platform_system: String,
    pub platform_release: String,
    pub platform_version: String,
    pub python_version: String,
    pub python_full_version: String,
    pub implementation_name: String,
    /// The active extra, if any. Serialized as `""` when unset, which is
    /// also how it evaluates in markers.
    #[serde(serialize_with = "serialize_extra")]
    pub extra: Option<String>,
}

fn serialize_extra<S: serde::Serializer>(
    extra: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(extra.as_deref().unwrap_or(""))
}

/// Interpreter version assumed when none is given.
const DEFAULT_PYTHON: &str = "3.12.0";

impl MarkerEnvironment {
    /// Detect the host environment, mapping Rust target names to the
    /// Python-ecosystem spellings markers use.
    pub fn detect() -> Self {
        Self {
            os_name: Self::detect_os_name().to_string(),
            sys_platform: Self::detect_sys_platform(),
            platform_machine: Self::detect_machine(),
            platform_system: Self::detect_system(),
            // Kernel release/version are not knowable portably; both are
            // overridable via --marker-var.
            platform_release: String::new(),
            platform_version: String::new(),
            python_version: minor_version(DEFAULT_PYTHON),
            python_full_version: DEFAULT_PYTHON.to_string(),
            implementation_name: "cpython".to_string(),
            extra: None,
        }
    }

    fn detect_os_name() -> &'static str {
        #[cfg(windows)]
        {
            "nt"
        }
        #[cfg(not(windows))]
        {
            "posix"
        }
    }

    fn detect_sys_platform() -> String {
        #[cfg(target_os = "linux")]
        {
            "linux".to_string()
        }
        #[cfg(target_os = "macos")]
        {
            "darwin".to_string()
        }
        #[cfg(target_os = "windows")]
        {
            "win32".to_string()
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            std::env::consts::OS.to_string()
        }
    }

    fn detect_system() -> String {
        #[cfg(target_os = "linux")]
        {
            "Linux".to_string()
        }
        #[cfg(target_os = "macos")]
        {
            "Darwin".to_string()
        }
        #[cfg(target_os = "windows")]
        {
            "Windows".to_string()
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            std::env::consts::OS.to_string()
        }
    }

    fn detect_machine() -> String {
        #[cfg(all(target_arch = "aarch64", target_os = "macos"))]
        {
            // python's platform.machine() reports arm64 on Apple silicon
            "arm64".to_string()
        }
        #[cfg(all(target_arch = "aarch64", not(target_os = "macos")))]
        {
            "aarch64".to_string()
        }
        #[cfg(target_arch = "x86_64")]
        {
            "x86_64".to_string()
        }
        #[cfg(target_arch = "x86")]
        {
            "i686".to_string()
        }
        #[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64", target_arch = "x86")))]
        {
            std::env::consts::ARCH.to_string()
        }
    }

    /// Set the interpreter version ("3.10" or "3.10.8").
    pub fn with_python(mut self, version: &str) -> Self {
        let full = if version.matches('.').count() >= 2 {
            version.to_string()
        } else {
            format!("{}.0", version)
        };
        self.python_version = minor_version(&full);
        self.python_full_version = full;
        self
    }

    /// Override one variable by name, e.g. from `--marker-var KEY=VALUE`.
    pub fn set(&mut self, variable: MarkerVariable, value: &str) {
        let slot = match variable {
            MarkerVariable::OsName => &mut self.os_name,
            MarkerVariable::SysPlatform => &mut self.sys_platform,
            MarkerVariable::PlatformMachine => &mut self.platform_machine,
            MarkerVariable::PlatformSystem => &mut self.platform_system,
            MarkerVariable::PlatformRelease => &mut self.platform_release,
            MarkerVariable::PlatformVersion => &mut self.platform_version,
            MarkerVariable::PythonVersion => &mut self.python_version,
            MarkerVariable::PythonFullVersion => &mut self.python_full_version,
            MarkerVariable::ImplementationName => &mut self.implementation_name,
            MarkerVariable::Extra => {
                self.extra = Some(value.to_string());
                return;
            }
        };
        *slot = value.to_string();
    }

    pub fn value_of(&self, variable: MarkerVariable) -> &str {
        match variable {
            MarkerVariable::OsName => &self.os_name,
            MarkerVariable::SysPlatform => &self.sys_platform,
            MarkerVariable::PlatformMachine => &self.platform_machine,
            MarkerVariable::PlatformSystem => &self.platform_system,
            MarkerVariable::PlatformRelease => &self.platform_release,
            MarkerVariable::PlatformVersion => &self.platform_version,
            MarkerVariable::PythonVersion => &self.python_version,
            MarkerVariable::PythonFullVersion => &self.python_full_version,
            MarkerVariable::ImplementationName => &self.implementation_name,
            MarkerVariable::Extra => self.extra.as_deref().unwrap_or(""),
        }
    }

    /// Fixed environment for unit tests: linux / x86_64, CPython 3.10.8.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            os_name: "posix".to_string(),
            sys_platform: "linux".to_string(),
            platform_machine: "x86_64".to_string(),
            platform_system: "Linux".to_string(),
            platform_release: "6.1.0".to_string(),
            platform_version: String::new(),
            python_version: "3.10".to_string(),
            python_full_version: "3.10.8".to_string(),
            implementation_name: "cpython".to_string(),
            extra: None,
        }
    }
}

/// "3.10" from "3.10.8".
fn minor_version(full: &str) -> String {
    full.split('.').take(2).collect::<Vec<_>>().join(".")
}
