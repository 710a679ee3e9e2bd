use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Resolves every file the loop persists relative to one state directory.
#[derive(Debug, Clone)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    /// `state_dir` is taken as-is when absolute, otherwise joined onto `project_root`.
    pub fn new(project_root: &Path, state_dir: &Path) -> Self {
        let root = if state_dir.is_absolute() {
            state_dir.to_path_buf()
        } else {
            project_root.join(state_dir)
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn trust_scores(&self) -> PathBuf {
        self.root.join("trust").join("scores.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn audit_file(&self, date: NaiveDate) -> PathBuf {
        self.logs_dir()
            .join(format!("execution-{}.jsonl", date.format("%Y-%m-%d")))
    }

    pub fn decisions_dir(&self) -> PathBuf {
        self.root.join("decisions")
    }

    pub fn decisions_file(&self, date: NaiveDate) -> PathBuf {
        self.decisions_dir()
            .join(format!("decisions-{}.jsonl", date.format("%Y-%m")))
    }

    pub fn approvals(&self) -> PathBuf {
        self.decisions_dir().join("approvals.json")
    }

    pub fn queue(&self) -> PathBuf {
        self.root.join("queue.json")
    }

    /// Create the directory skeleton. Used by `rein init`.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.root.join("trust"))?;
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.decisions_dir())?;
        Ok(())
    }
}
