//! Locating the certificate generation tool.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::command::CommandRunner;

/// Finds an executable able to generate certificates.
#[async_trait]
pub trait ToolResolver: Send + Sync {
    /// Returns the program to invoke, or `None` if no usable tool exists.
    async fn resolve(&self) -> Option<PathBuf>;
}

/// Tries an ordered list of candidates with `<candidate> version` and picks the
/// first one that exits successfully.
pub struct SearchPathResolver {
    candidates: Vec<PathBuf>,
    runner: Arc<dyn CommandRunner>,
}

impl SearchPathResolver {
    pub fn new(candidates: Vec<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { candidates, runner }
    }
}

#[async_trait]
impl ToolResolver for SearchPathResolver {
    async fn resolve(&self) -> Option<PathBuf> {
        let args = [OsString::from("version")];

        for candidate in &self.candidates {
            match self.runner.run(candidate, &args).await {
                Ok(status) if status.success() => {
                    tracing::info!(path = %candidate.display(), "Found OpenSSL");
                    return Some(candidate.clone());
                }
                Ok(status) => {
                    tracing::debug!(
                        path = %candidate.display(),
                        code = ?status.code,
                        "OpenSSL candidate failed version check"
                    );
                }
                Err(e) => {
                    tracing::debug!(path = %candidate.display(), error = %e, "OpenSSL candidate not usable");
                }
            }
        }

        None
    }
}

/// Always resolves to the same answer; lets callers pin or disable the tool.
#[derive(Debug, Clone, Default)]
pub struct FixedResolver(pub Option<PathBuf>);

#[async_trait]
impl ToolResolver for FixedResolver {
    async fn resolve(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::command::CommandStatus;
    use std::io;
    use std::path::Path;
    use std::sync::Mutex;

    /// Answers per program name and records every call.
    struct ScriptedRunner {
        calls: Mutex<Vec<(PathBuf, Vec<OsString>)>>,
    }

    impl ScriptedRunner {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn programs(&self) -> Vec<PathBuf> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(p, _)| p.clone())
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, program: &Path, args: &[OsString]) -> io::Result<CommandStatus> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_path_buf(), args.to_vec()));
            match program.to_str() {
                Some("missing") => Err(io::Error::new(io::ErrorKind::NotFound, "not found")),
                Some("broken") => Ok(CommandStatus::with_code(127)),
                _ => Ok(CommandStatus::with_code(0)),
            }
        }
    }

    #[tokio::test]
    async fn test_first_working_candidate_wins() {
        let runner = Arc::new(ScriptedRunner::new());
        let resolver = SearchPathResolver::new(
            vec![
                PathBuf::from("missing"),
                PathBuf::from("broken"),
                PathBuf::from("good"),
                PathBuf::from("also-good"),
            ],
            runner.clone(),
        );

        assert_eq!(resolver.resolve().await, Some(PathBuf::from("good")));
        assert_eq!(
            runner.programs(),
            vec![
                PathBuf::from("missing"),
                PathBuf::from("broken"),
                PathBuf::from("good")
            ]
        );
    }

    #[tokio::test]
    async fn test_candidate_check_uses_version_argument() {
        let runner = Arc::new(ScriptedRunner::new());
        let resolver = SearchPathResolver::new(vec![PathBuf::from("good")], runner.clone());
        resolver.resolve().await;

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].1, vec![OsString::from("version")]);
    }

    #[tokio::test]
    async fn test_no_candidate_responds() {
        let runner = Arc::new(ScriptedRunner::new());
        let resolver = SearchPathResolver::new(
            vec![PathBuf::from("missing"), PathBuf::from("broken")],
            runner,
        );
        assert_eq!(resolver.resolve().await, None);
    }

    #[tokio::test]
    async fn test_fixed_resolver() {
        assert_eq!(FixedResolver(None).resolve().await, None);
        assert_eq!(
            FixedResolver(Some(PathBuf::from("openssl"))).resolve().await,
            Some(PathBuf::from("openssl"))
        );
    }
}
