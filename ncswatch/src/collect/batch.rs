//! The whole inventory, one device after another.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDateTime;
use log::{error, info, warn};

use super::device::run_device;
use super::output::OutputBuffer;
use super::plan::CommandPlan;
use crate::archive;
use crate::config::InventoryConfig;
use crate::driver::Connector;
use crate::error::{OutputError, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Name shared by every device's output file in one batch.
pub fn output_filename(started_at: NaiveDateTime) -> String {
    format!("Hourly-script-log-{}.txt", started_at.format(TIMESTAMP_FORMAT))
}

/// Where a batch writes and what it keeps.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Per-device directories are created here.
    pub work_dir: PathBuf,

    /// Zip file written at the end.
    pub archive_path: PathBuf,

    /// Leave `work_dir` in place after archiving.
    pub keep_work_dir: bool,

    /// File name used inside every device directory.
    pub output_filename: String,
}

impl BatchOptions {
    /// Defaults for a batch started at `started_at`: a fresh UUID-named
    /// working directory and `ncswatch-{timestamp}.zip`.
    pub fn new(started_at: NaiveDateTime) -> Self {
        Self {
            work_dir: PathBuf::from(uuid::Uuid::new_v4().to_string()),
            archive_path: PathBuf::from(format!(
                "ncswatch-{}.zip",
                started_at.format(TIMESTAMP_FORMAT)
            )),
            keep_work_dir: false,
            output_filename: output_filename(started_at),
        }
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_archive_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_path = path.into();
        self
    }

    pub fn keep_work_dir(mut self, keep: bool) -> Self {
        self.keep_work_dir = keep;
        self
    }
}

/// Why a device run stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFailure {
    pub kind: &'static str,
    pub message: String,
}

/// Result of one device run.
#[derive(Debug, Clone)]
pub struct DeviceOutcome {
    pub name: String,

    /// Blocks written to the device's file.
    pub blocks: usize,

    /// Output file path.
    pub path: PathBuf,

    pub failure: Option<DeviceFailure>,
}

impl DeviceOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Summary of a finished batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcomes: Vec<DeviceOutcome>,
    pub archive_path: PathBuf,
}

impl BatchReport {
    pub fn failed(&self) -> impl Iterator<Item = &DeviceOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Runs the collection plan against every inventory device.
pub struct Batch<C> {
    connector: C,
    inventory: InventoryConfig,
    plan: CommandPlan,
    options: BatchOptions,
}

impl<C: Connector> Batch<C> {
    pub fn new(connector: C, inventory: InventoryConfig, options: BatchOptions) -> Self {
        Self {
            connector,
            inventory,
            plan: CommandPlan::default(),
            options,
        }
    }

    /// Replace the default NCS-55xx command plan.
    pub fn with_plan(mut self, plan: CommandPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Run every device, archive the results and clean up.
    ///
    /// The working directory must not exist yet and must not contain the
    /// archive path, since it is removed at the end.
    ///
    /// Device-scoped failures are logged and recorded in the report; the
    /// device's file still gets whatever was captured. Any other error
    /// aborts the batch.
    pub async fn run(self) -> Result<BatchReport> {
        let work_dir = &self.options.work_dir;
        create_work_dir(work_dir, &self.options.archive_path)?;

        let mut outcomes = Vec::with_capacity(self.inventory.devices.len());
        for (name, device) in &self.inventory.devices {
            let mut buffer = OutputBuffer::new();

            let failure = match run_device(
                &self.connector,
                name,
                device,
                &self.inventory.globals,
                &self.plan,
                &mut buffer,
            )
            .await
            {
                Ok(()) => None,
                Err(e) if e.is_device_scoped() => {
                    error!("[{}] {}", name, e);
                    Some(DeviceFailure {
                        kind: e.kind(),
                        message: e.to_string(),
                    })
                }
                Err(e) => return Err(e),
            };

            let path = work_dir.join(name).join(&self.options.output_filename);
            buffer.write_to(&path)?;
            info!("[{}] Closed session", name);

            outcomes.push(DeviceOutcome {
                name: name.clone(),
                blocks: buffer.len(),
                path,
                failure,
            });
        }

        archive::create(&self.options.archive_path, work_dir)?;
        if !self.options.keep_work_dir {
            remove_work_dir(work_dir);
        }

        info!("Saved output to '{}'", self.options.archive_path.display());
        Ok(BatchReport {
            outcomes,
            archive_path: self.options.archive_path,
        })
    }
}

/// Create a fresh working directory, refusing one that already exists or
/// one the archive would be written into.
fn create_work_dir(work_dir: &Path, archive_path: &Path) -> Result<()> {
    let in_work_dir = || OutputError::ArchiveInWorkDir {
        archive: archive_path.to_path_buf(),
        work_dir: work_dir.to_path_buf(),
    };
    let lexical = !archive_path
        .components()
        .any(|c| matches!(c, Component::ParentDir));
    if lexical && archive_path.starts_with(work_dir) {
        return Err(in_work_dir().into());
    }

    let write_err = |source| OutputError::Write {
        path: work_dir.to_path_buf(),
        source,
    };
    if let Some(parent) = work_dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::create_dir(work_dir).map_err(|source| match source.kind() {
        ErrorKind::AlreadyExists => OutputError::WorkDirExists {
            path: work_dir.to_path_buf(),
        },
        _ => write_err(source),
    })?;

    // Paths with `..` or symlinks only compare once the directory exists
    if let (Ok(work), Some(Ok(archive_parent))) = (
        fs::canonicalize(work_dir),
        archive_dir(archive_path).map(fs::canonicalize),
    ) {
        if archive_parent.starts_with(&work) {
            let _ = fs::remove_dir(work_dir);
            return Err(in_work_dir().into());
        }
    }
    Ok(())
}

fn archive_dir(archive_path: &Path) -> Option<&Path> {
    match archive_path.parent() {
        Some(p) if p.as_os_str().is_empty() => Some(Path::new(".")),
        other => other,
    }
}

fn remove_work_dir(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        warn!("Could not remove '{}': {}", dir.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn started_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(9, 5, 3)
            .unwrap()
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(
            output_filename(started_at()),
            "Hourly-script-log-2026-10-16-090503.txt"
        );
    }

    #[test]
    fn test_default_options() {
        let options = BatchOptions::new(started_at());
        assert_eq!(
            options.archive_path,
            PathBuf::from("ncswatch-2026-10-16-090503.zip")
        );
        assert!(uuid::Uuid::parse_str(&options.work_dir.to_string_lossy()).is_ok());
        assert!(!options.keep_work_dir);
    }

    #[test]
    fn test_create_work_dir() {
        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("nested").join("work");
        create_work_dir(&work, &root.path().join("out.zip")).unwrap();
        assert!(work.is_dir());

        let err = create_work_dir(&work, &root.path().join("out.zip")).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Output(OutputError::WorkDirExists { .. })
        ));
    }

    #[test]
    fn test_archive_inside_work_dir() {
        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("work");

        let err = create_work_dir(&work, &work.join("out.zip")).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Output(OutputError::ArchiveInWorkDir { .. })
        ));
        assert!(!work.exists());

        // Same directory reached through `..`
        let sneaky = work.join("..").join("work").join("out.zip");
        let err = create_work_dir(&work, &sneaky).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Output(OutputError::ArchiveInWorkDir { .. })
        ));
        assert!(!work.exists());
    }
}
