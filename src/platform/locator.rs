//! Relay executable locator
//!
//! Resolves where `hidusb-relay-cmd` lives. Candidates are probed in a fixed
//! order: bundled resource directory, program directory, working directory.
//! If none exists the bare file name is returned and the OS search path
//! resolves it at spawn time. A missing binary is never an error here; it
//! surfaces as a failed invocation later.

use super::HostPlatform;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Base name of the vendor relay tool
pub const EXECUTABLE_STEM: &str = "hidusb-relay-cmd";

/// Environment variable naming the bundled resource directory
pub const RESOURCE_DIR_ENV: &str = "HIDRELAY_RESOURCE_DIR";

/// Where a resolved executable came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatedFrom {
    /// Explicitly configured path
    Configured,
    /// Bundled resource directory
    Bundled,
    /// Directory containing the running program
    ProgramDir,
    /// Current working directory
    WorkingDir,
    /// Bare name, left to the process search path
    SearchPath,
}

impl std::fmt::Display for LocatedFrom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configured => write!(f, "configured path"),
            Self::Bundled => write!(f, "bundled resource directory"),
            Self::ProgramDir => write!(f, "program directory"),
            Self::WorkingDir => write!(f, "working directory"),
            Self::SearchPath => write!(f, "system PATH"),
        }
    }
}

/// A resolved executable path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// Path to hand to the process spawner
    pub path: PathBuf,
    /// Which candidate matched
    pub source: LocatedFrom,
}

/// Directories probed by the locator, in priority order
#[derive(Debug, Clone, Default)]
pub struct SearchRoots {
    /// Bundled resource directory
    pub resource_dir: Option<PathBuf>,
    /// Directory containing the running program
    pub program_dir: Option<PathBuf>,
    /// Current working directory
    pub working_dir: Option<PathBuf>,
}

impl SearchRoots {
    /// Collect roots from the running process.
    ///
    /// `resource_dir` wins over the `HIDRELAY_RESOURCE_DIR` environment
    /// variable. Roots that cannot be determined are left empty.
    pub fn from_environment(resource_dir: Option<PathBuf>) -> Self {
        // An empty path would resolve against the working directory.
        let resource_dir = resource_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .or_else(|| {
                std::env::var_os(RESOURCE_DIR_ENV)
                    .filter(|dir| !dir.is_empty())
                    .map(PathBuf::from)
            });

        let program_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        let working_dir = std::env::current_dir().ok();

        Self {
            resource_dir,
            program_dir,
            working_dir,
        }
    }
}

/// Executable locator
#[derive(Debug, Clone)]
pub struct Locator {
    platform: HostPlatform,
    roots: SearchRoots,
}

impl Locator {
    /// Create a locator for a platform and set of roots
    pub fn new(platform: HostPlatform, roots: SearchRoots) -> Self {
        Self { platform, roots }
    }

    /// Locator for the running process
    pub fn from_environment(resource_dir: Option<PathBuf>) -> Self {
        Self::new(
            HostPlatform::detect(),
            SearchRoots::from_environment(resource_dir),
        )
    }

    /// Executable file name for the platform
    pub fn executable_name(&self) -> String {
        executable_name(self.platform)
    }

    /// Candidate paths in probe order, excluding the bare-name fallback
    pub fn candidates(&self) -> Vec<(PathBuf, LocatedFrom)> {
        let name = self.executable_name();
        [
            (&self.roots.resource_dir, LocatedFrom::Bundled),
            (&self.roots.program_dir, LocatedFrom::ProgramDir),
            (&self.roots.working_dir, LocatedFrom::WorkingDir),
        ]
        .into_iter()
        .filter_map(|(dir, source)| dir.as_ref().map(|d| (d.join(&name), source)))
        .collect()
    }

    /// Resolve the executable, falling back to the bare name
    pub fn locate(&self) -> Located {
        for (path, source) in self.candidates() {
            debug!("Probing for relay executable at {:?}", path);
            if path.is_file() {
                info!("Found relay executable at: {} ({})", path.display(), source);
                return Located { path, source };
            }
        }

        let name = self.executable_name();
        info!(
            "Relay executable not found in local paths, will try system PATH: {}",
            name
        );
        Located {
            path: PathBuf::from(name),
            source: LocatedFrom::SearchPath,
        }
    }
}

/// Executable file name for a platform
pub fn executable_name(platform: HostPlatform) -> String {
    format!("{}{}", EXECUTABLE_STEM, platform.executable_suffix())
}

/// Resolve the executable, honouring an explicit override
pub fn resolve_executable(explicit: Option<&Path>, resource_dir: Option<PathBuf>) -> Located {
    match explicit {
        Some(path) => {
            info!("Using configured relay executable: {}", path.display());
            Located {
                path: path.to_path_buf(),
                source: LocatedFrom::Configured,
            }
        }
        None => Locator::from_environment(resource_dir).locate(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_executable_name() {
        assert_eq!(executable_name(HostPlatform::Windows), "hidusb-relay-cmd.exe");
        assert_eq!(executable_name(HostPlatform::Linux), "hidusb-relay-cmd");
        assert_eq!(executable_name(HostPlatform::MacOs), "hidusb-relay-cmd");
    }

    #[test]
    fn test_bundled_wins_over_working_dir() {
        let bundled = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        let expected = touch(bundled.path(), "hidusb-relay-cmd");
        touch(cwd.path(), "hidusb-relay-cmd");

        let locator = Locator::new(
            HostPlatform::Linux,
            SearchRoots {
                resource_dir: Some(bundled.path().to_path_buf()),
                program_dir: None,
                working_dir: Some(cwd.path().to_path_buf()),
            },
        );

        let located = locator.locate();
        assert_eq!(located.path, expected);
        assert_eq!(located.source, LocatedFrom::Bundled);
    }

    #[test]
    fn test_program_dir_before_working_dir() {
        let program = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        let expected = touch(program.path(), "hidusb-relay-cmd.exe");
        touch(cwd.path(), "hidusb-relay-cmd.exe");

        let locator = Locator::new(
            HostPlatform::Windows,
            SearchRoots {
                resource_dir: None,
                program_dir: Some(program.path().to_path_buf()),
                working_dir: Some(cwd.path().to_path_buf()),
            },
        );

        let located = locator.locate();
        assert_eq!(located.path, expected);
        assert_eq!(located.source, LocatedFrom::ProgramDir);
    }

    #[test]
    fn test_working_dir_used_last() {
        let empty = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        let expected = touch(cwd.path(), "hidusb-relay-cmd");

        let locator = Locator::new(
            HostPlatform::Linux,
            SearchRoots {
                resource_dir: Some(empty.path().to_path_buf()),
                program_dir: Some(empty.path().to_path_buf()),
                working_dir: Some(cwd.path().to_path_buf()),
            },
        );

        assert_eq!(locator.locate().path, expected);
    }

    #[test]
    fn test_falls_back_to_bare_name() {
        let empty = TempDir::new().unwrap();
        let locator = Locator::new(
            HostPlatform::Linux,
            SearchRoots {
                resource_dir: Some(empty.path().to_path_buf()),
                program_dir: Some(empty.path().to_path_buf()),
                working_dir: Some(empty.path().to_path_buf()),
            },
        );

        let located = locator.locate();
        assert_eq!(located.path, PathBuf::from("hidusb-relay-cmd"));
        assert_eq!(located.source, LocatedFrom::SearchPath);
    }

    #[test]
    fn test_directory_with_executable_name_is_skipped() {
        let bundled = TempDir::new().unwrap();
        fs::create_dir(bundled.path().join("hidusb-relay-cmd")).unwrap();

        let locator = Locator::new(
            HostPlatform::Linux,
            SearchRoots {
                resource_dir: Some(bundled.path().to_path_buf()),
                ..SearchRoots::default()
            },
        );

        assert_eq!(locator.locate().source, LocatedFrom::SearchPath);
    }

    #[test]
    fn test_candidates_order() {
        let locator = Locator::new(
            HostPlatform::Linux,
            SearchRoots {
                resource_dir: Some(PathBuf::from("/res")),
                program_dir: Some(PathBuf::from("/bin")),
                working_dir: Some(PathBuf::from("/work")),
            },
        );

        let sources: Vec<LocatedFrom> = locator.candidates().into_iter().map(|(_, s)| s).collect();
        assert_eq!(
            sources,
            vec![
                LocatedFrom::Bundled,
                LocatedFrom::ProgramDir,
                LocatedFrom::WorkingDir
            ]
        );
    }

    #[test]
    fn test_resolve_explicit_path() {
        let located = resolve_executable(Some(Path::new("/opt/relay/tool")), None);
        assert_eq!(located.path, PathBuf::from("/opt/relay/tool"));
        assert_eq!(located.source, LocatedFrom::Configured);
    }
}
