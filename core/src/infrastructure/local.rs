//! Local-directory container runtime.
//!
//! Each container is a directory under a common root; container paths are
//! resolved below it. Pushes write a sibling temp file and rename it over
//! the target so a file is never observed half-written. Commands run
//! through a `CommandRunner` with the container directory as cwd.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use super::runner::{CommandRunner, ProcessRunner};
use super::{ContainerRuntime, ExecOutput};
use crate::error::RuntimeError;

pub struct LocalRuntime {
    root: PathBuf,
    runner: Box<dyn CommandRunner>,
}

impl LocalRuntime {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_runner(root, Box::new(ProcessRunner))
    }

    pub fn with_runner(root: impl Into<PathBuf>, runner: Box<dyn CommandRunner>) -> Self {
        LocalRuntime { root: root.into(), runner }
    }

    pub fn container_dir(&self, container: &str) -> PathBuf {
        self.root.join(container)
    }

    /// Map an absolute container path onto the host, refusing anything that
    /// would escape the container directory.
    fn resolve(&self, container: &str, path: &str) -> Result<PathBuf, RuntimeError> {
        if container.is_empty() || container.contains(|c: char| c == '/' || c == '\\') || container == ".." {
            return Err(RuntimeError::UnknownContainer(container.to_string()));
        }
        let mut resolved = self.container_dir(container);
        for component in Path::new(path).components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                _ => {
                    return Err(RuntimeError::Failed(format!(
                        "path {} escapes container {}",
                        path, container
                    )))
                }
            }
        }
        Ok(resolved)
    }

    fn io_error(container: &str, path: &str, source: std::io::Error) -> RuntimeError {
        RuntimeError::Io {
            container: container.to_string(),
            path: path.to_string(),
            source,
        }
    }
}

impl ContainerRuntime for LocalRuntime {
    fn push(&mut self, container: &str, path: &str, content: &str) -> Result<(), RuntimeError> {
        let target = self.resolve(container, path)?;
        let parent = target
            .parent()
            .ok_or_else(|| RuntimeError::Failed(format!("{} has no parent directory", path)))?;
        fs::create_dir_all(parent).map_err(|e| Self::io_error(container, path, e))?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = parent.join(format!(".{}.tmp", file_name));
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &target)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Self::io_error(container, path, e)
        })
    }

    fn pull(&mut self, container: &str, path: &str) -> Result<Option<String>, RuntimeError> {
        let target = self.resolve(container, path)?;
        match fs::read_to_string(&target) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(container, path, e)),
        }
    }

    fn exec(&mut self, container: &str, argv: &[String]) -> Result<ExecOutput, RuntimeError> {
        let cwd = self.resolve(container, "/")?;
        fs::create_dir_all(&cwd).map_err(|e| Self::io_error(container, "/", e))?;
        self.runner.run(argv, &cwd).map_err(RuntimeError::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::runner::MockRunner;

    #[test]
    fn push_then_pull_round_trips_under_container_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = LocalRuntime::new(dir.path());
        runtime.push("cinder-api", "/etc/cinder/cinder.conf", "[DEFAULT]\n").unwrap();
        let on_disk = dir.path().join("cinder-api/etc/cinder/cinder.conf");
        assert_eq!(fs::read_to_string(on_disk).unwrap(), "[DEFAULT]\n");
        assert_eq!(
            runtime.pull("cinder-api", "/etc/cinder/cinder.conf").unwrap().as_deref(),
            Some("[DEFAULT]\n")
        );
        assert!(!dir.path().join("cinder-api/etc/cinder/.cinder.conf.tmp").exists());
    }

    #[test]
    fn pull_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = LocalRuntime::new(dir.path());
        assert_eq!(runtime.pull("cinder-api", "/etc/none").unwrap(), None);
    }

    #[test]
    fn escaping_paths_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = LocalRuntime::new(dir.path());
        assert!(runtime.push("cinder-api", "/etc/../../outside", "x").is_err());
        assert!(matches!(
            runtime.push("../x", "/etc/f", "x"),
            Err(RuntimeError::UnknownContainer(_))
        ));
    }

    #[test]
    fn exec_goes_through_runner() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockRunner::with_responses(vec![Ok(ExecOutput::failure(2, "nope"))]);
        let mut runtime = LocalRuntime::with_runner(dir.path(), Box::new(runner));
        let out = runtime.exec("cinder-api", &["a2ensite".to_string()]).unwrap();
        assert_eq!(out.exit_code, 2);
        assert!(dir.path().join("cinder-api").is_dir());
    }
}
