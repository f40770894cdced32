use crate::domain::model::{SyncMode, SyncOutcome};
use crate::domain::ports::CacheSync;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Runs the external species-cache builder and reads its exit status:
/// `0` updated, `2` nothing to do, anything else is a failure.
#[derive(Debug, Clone)]
pub struct ProcessCacheSync {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl ProcessCacheSync {
    pub fn new(program: impl Into<String>, args: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
        }
    }

    fn command_line(&self, mode: SyncMode) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .chain(mode.flags().iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl CacheSync for ProcessCacheSync {
    async fn run(&self, mode: SyncMode) -> SyncOutcome {
        tracing::info!("Running cache builder: {}", self.command_line(mode));

        let output = Command::new(&self.program)
            .args(&self.args)
            .args(mode.flags())
            .current_dir(&self.working_dir)
            .kill_on_drop(true)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Failed to run cache builder: {}", e);
                return SyncOutcome::Failed;
            }
        };

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::info!("  [cache_builder] {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            tracing::warn!("  [cache_builder] {}", line);
        }

        let code = output.status.code();
        tracing::info!(mode = %mode, "Cache builder exit code: {:?}", code);
        SyncOutcome::from_exit_code(code)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> ProcessCacheSync {
        ProcessCacheSync::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "cache_builder".to_string()],
            ".",
        )
    }

    #[tokio::test]
    async fn test_exit_codes_map_to_outcomes() {
        assert_eq!(shell("exit 0").run(SyncMode::CheckOnly).await, SyncOutcome::Updated);
        assert_eq!(shell("exit 2").run(SyncMode::CheckOnly).await, SyncOutcome::NoOp);
        assert_eq!(shell("exit 1").run(SyncMode::CheckOnly).await, SyncOutcome::Failed);
        assert_eq!(shell("exit 7").run(SyncMode::CheckOnly).await, SyncOutcome::Failed);
    }

    #[tokio::test]
    async fn test_mode_flags_are_passed() {
        // $@ holds the mode flags after the script name
        let sync = shell(r#"[ "$*" = "--update-species --incremental --yes" ] && exit 0 || exit 1"#);
        assert_eq!(sync.run(SyncMode::UpdateSpecies).await, SyncOutcome::Updated);
        assert_eq!(sync.run(SyncMode::Incremental).await, SyncOutcome::Failed);
    }

    #[tokio::test]
    async fn test_missing_program_is_failure() {
        let sync = ProcessCacheSync::new("definitely-not-a-real-binary-xyz", vec![], ".");
        assert_eq!(sync.run(SyncMode::Incremental).await, SyncOutcome::Failed);
    }

    #[test]
    fn test_command_line() {
        let sync = ProcessCacheSync::new("python3", vec!["cache_builder.py".to_string()], ".");
        assert_eq!(
            sync.command_line(SyncMode::CheckOnly),
            "python3 cache_builder.py --check-only"
        );
    }
}
