//! Suite configuration.
//!
//! A [`SuiteConfiguration`] is built once per process, from a YAML file
//! ([`SuiteConfigFile`]), command-line flags, or plain builder calls, and
//! never changes afterwards. All validation happens in
//! [`SuiteConfigurationBuilder::build`], before the page tree is touched.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::filter::SuiteFilter;
use crate::prelude::*;
use crate::wiki::loader::DEFAULT_ROOT_DIRECTORY;
use crate::wiki::PagePath;

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 80;
/// Test system used by pages that do not define `TEST_SYSTEM`.
pub const DEFAULT_TEST_SYSTEM: &str = "fit";

/// Validated, immutable run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteConfiguration {
    pub suite_name: PagePath,
    pub root_path: PathBuf,
    pub root_directory: String,
    pub output_dir: PathBuf,
    pub suite_filter: Option<String>,
    pub exclude_suite_filter: Option<String>,
    pub debug: bool,
    pub port: u16,
    pub default_test_system: String,
    pub backend_command: Vec<String>,
    pub timeout: Option<Duration>,
    pub parallelism: usize,
}

impl SuiteConfiguration {
    pub fn builder() -> SuiteConfigurationBuilder {
        SuiteConfigurationBuilder::default()
    }

    /// The include/exclude filter; expressions were validated by `build`.
    pub fn filter(&self) -> Result<SuiteFilter, SuiteError> {
        SuiteFilter::parse(self.suite_filter.as_deref(), self.exclude_suite_filter.as_deref())
    }
}

/// Where run artifacts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDirSetting {
    /// A path used as given (made absolute against the working directory).
    Path(PathBuf),
    /// The value of an environment variable plus an optional path extension.
    FromEnv { variable: String, extension: String },
}

/// Staging area for a [`SuiteConfiguration`]. Later calls override earlier ones.
#[derive(Debug, Clone, Default)]
pub struct SuiteConfigurationBuilder {
    suite_name: Option<String>,
    root_path: Option<PathBuf>,
    root_directory: Option<String>,
    output_dir: Option<OutputDirSetting>,
    suite_filter: Option<String>,
    exclude_suite_filter: Option<String>,
    debug: Option<bool>,
    port: Option<u16>,
    port_variable: Option<String>,
    test_system: Option<String>,
    backend_command: Option<Vec<String>>,
    timeout: Option<Duration>,
    parallelism: Option<usize>,
}

impl SuiteConfigurationBuilder {
    pub fn suite_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = Some(name.into());
        self
    }

    pub fn root_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_path = Some(path.into());
        self
    }

    pub fn root_directory(mut self, name: impl Into<String>) -> Self {
        self.root_directory = Some(name.into());
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(OutputDirSetting::Path(path.into()));
        self
    }

    pub fn output_dir_from_env(mut self, variable: impl Into<String>, extension: impl Into<String>) -> Self {
        self.output_dir = Some(OutputDirSetting::FromEnv {
            variable: variable.into(),
            extension: extension.into(),
        });
        self
    }

    pub fn suite_filter(mut self, expression: impl Into<String>) -> Self {
        self.suite_filter = Some(expression.into());
        self
    }

    pub fn exclude_suite_filter(mut self, expression: impl Into<String>) -> Self {
        self.exclude_suite_filter = Some(expression.into());
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Environment variable whose value, when set and valid, overrides the port.
    pub fn port_from_env(mut self, variable: impl Into<String>) -> Self {
        self.port_variable = Some(variable.into());
        self
    }

    pub fn test_system(mut self, name: impl Into<String>) -> Self {
        self.test_system = Some(name.into());
        self
    }

    pub fn backend_command(mut self, command: Vec<String>) -> Self {
        self.backend_command = Some(command);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Applies every value present in a configuration file. Relative paths
    /// in the file are resolved against `base_dir`.
    pub fn merge_file(mut self, file: SuiteConfigFile, base_dir: &Path) -> Self {
        if let Some(name) = file.name {
            self.suite_name = Some(name);
        }
        if let Some(root) = file.root {
            self.root_path = Some(base_dir.join(root));
        }
        if let Some(root_directory) = file.root_directory {
            self.root_directory = Some(root_directory);
        }
        if let Some(output) = file.output {
            if let Some(path) = output.path {
                self.output_dir = Some(OutputDirSetting::Path(base_dir.join(path)));
            } else if let Some(variable) = output.env {
                self.output_dir = Some(OutputDirSetting::FromEnv {
                    variable,
                    extension: output.extension.unwrap_or_default(),
                });
            }
        }
        if let Some(filter) = file.suite_filter {
            self.suite_filter = Some(filter);
        }
        if let Some(filter) = file.exclude_suite_filter {
            self.exclude_suite_filter = Some(filter);
        }
        if let Some(debug) = file.debug {
            self.debug = Some(debug);
        }
        if let Some(port) = file.port {
            if port.value.is_some() {
                self.port = port.value;
            }
            if port.env.is_some() {
                self.port_variable = port.env;
            }
        }
        if let Some(test_system) = file.test_system {
            self.test_system = Some(test_system);
        }
        if let Some(backend) = file.backend {
            if !backend.command.is_empty() {
                self.backend_command = Some(backend.command);
            }
            if let Some(ms) = backend.timeout_ms {
                self.timeout = Some(Duration::from_millis(ms));
            }
        }
        if let Some(parallelism) = file.parallelism {
            self.parallelism = Some(parallelism);
        }
        self
    }

    /// Validates against the process environment.
    pub fn build(self) -> Result<SuiteConfiguration, SuiteError> {
        self.build_with_env(|name| std::env::var(name).ok())
    }

    /// Validates using `env` for every environment lookup.
    pub fn build_with_env<F>(self, env: F) -> Result<SuiteConfiguration, SuiteError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_name = self
            .suite_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| config_err!("suite_name", "a suite name is mandatory"))?;
        let suite_name = PagePath::parse(&raw_name, "suite_name")?;

        let root_path = self
            .root_path
            .ok_or_else(|| config_err!("root_path", "the directory holding the page tree is mandatory"))?;

        let output_dir = match self.output_dir {
            Some(setting) => resolve_output_dir(setting, &env)?,
            None => return Err(config_err!("output_dir", "an output directory is mandatory")),
        };

        SuiteFilter::parse(self.suite_filter.as_deref(), self.exclude_suite_filter.as_deref())?;

        let mut port = self.port.unwrap_or(DEFAULT_PORT);
        if let Some(variable) = &self.port_variable {
            if let Some(value) = env(variable).and_then(|v| v.trim().parse::<u16>().ok()) {
                port = value;
            }
        }

        let parallelism = self.parallelism.unwrap_or(1);
        if parallelism == 0 {
            return Err(config_err!("parallelism", "must be at least 1"));
        }

        Ok(SuiteConfiguration {
            suite_name,
            root_path,
            root_directory: self
                .root_directory
                .unwrap_or_else(|| DEFAULT_ROOT_DIRECTORY.to_string()),
            output_dir,
            suite_filter: self.suite_filter,
            exclude_suite_filter: self.exclude_suite_filter,
            debug: self.debug.unwrap_or(true),
            port,
            default_test_system: self
                .test_system
                .unwrap_or_else(|| DEFAULT_TEST_SYSTEM.to_string()),
            backend_command: self.backend_command.unwrap_or_default(),
            timeout: self.timeout,
            parallelism,
        })
    }
}

fn resolve_output_dir<F>(setting: OutputDirSetting, env: &F) -> Result<PathBuf, SuiteError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = match setting {
        OutputDirSetting::Path(path) if path.as_os_str().is_empty() => {
            return Err(config_err!("output_dir", "specify either a path or an environment variable"));
        }
        OutputDirSetting::Path(path) => path,
        OutputDirSetting::FromEnv { variable, extension } => {
            let base = env(&variable)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| config_err!("output_dir", "environment variable {} is not set", variable))?;
            PathBuf::from(base).join(extension)
        }
    };
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir()
        .map_err(|e| config_err!("output_dir", "cannot resolve '{}': {}", path.display(), e))?;
    Ok(cwd.join(path))
}

// =============================================================================
// CONFIGURATION FILE
// =============================================================================

/// Output directory section of a configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    pub path: Option<PathBuf>,
    pub env: Option<String>,
    pub extension: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortSection {
    pub value: Option<u16>,
    pub env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendSection {
    #[serde(default)]
    pub command: Vec<String>,
    pub timeout_ms: Option<u64>,
}

/// On-disk form of a suite configuration; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfigFile {
    pub name: Option<String>,
    pub root: Option<PathBuf>,
    pub root_directory: Option<String>,
    pub output: Option<OutputSection>,
    pub suite_filter: Option<String>,
    pub exclude_suite_filter: Option<String>,
    pub debug: Option<bool>,
    pub port: Option<PortSection>,
    pub test_system: Option<String>,
    pub backend: Option<BackendSection>,
    pub parallelism: Option<usize>,
}

impl SuiteConfigFile {
    pub fn from_yaml(text: &str) -> Result<Self, SuiteError> {
        serde_yaml::from_str(text).map_err(|e| config_err!("config", "{}", e))
    }

    pub fn load(path: &Path) -> Result<Self, SuiteError> {
        let text = fs::read_to_string(path)
            .map_err(|e| config_err!("config", "failed to read '{}': {}", path.display(), e))?;
        Self::from_yaml(&text)
    }
}
