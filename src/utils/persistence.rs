use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use tracing::{debug, info};

use crate::{
    errors::{PlannerError, Result},
    planner::PlanDocument,
};

use super::paths::{backups_dir_in, ensure_dir, plans_dir_in, resolve_base};

const PLAN_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3f";
const TMP_SUFFIX: &str = "tmp";
pub const DEFAULT_RETENTION: usize = 5;

/// Storage seam used by the CLI so alternative backends can stand in for disk.
pub trait PlanStorage {
    fn save_named(&self, document: &PlanDocument, name: &str) -> Result<PathBuf>;
    fn load_named(&self, name: &str) -> Result<PlanDocument>;
    fn list_plans(&self) -> Result<Vec<String>>;
    fn list_backups(&self, name: &str) -> Result<Vec<BackupInfo>>;
    fn restore_backup(&self, name: &str, backup_file: &str) -> Result<PlanDocument>;
}

/// A stored snapshot of a plan taken before it was overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub file_name: String,
    pub path: PathBuf,
}

/// Named plan documents on disk, with rolling backups of previous versions.
#[derive(Debug, Clone)]
pub struct PlanStore {
    root: PathBuf,
    plans_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl PlanStore {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let root = resolve_base(root);
        let plans_dir = plans_dir_in(&root);
        let backups_dir = backups_dir_in(&root);
        ensure_dir(&plans_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            root,
            plans_dir,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn plan_path(&self, name: &str) -> PathBuf {
        self.plans_dir
            .join(format!("{}.{}", canonical_name(name), PLAN_EXTENSION))
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    /// Saves under `name`, first copying any existing file into the backups folder.
    pub fn save_named(&self, document: &PlanDocument, name: &str) -> Result<PathBuf> {
        let path = self.plan_path(name);
        if path.exists() {
            self.backup_existing(name, &path)?;
        }
        save_to_path(document, &path)?;
        info!(plan = %canonical_name(name), path = %path.display(), "plan saved");
        Ok(path)
    }

    pub fn load_named(&self, name: &str) -> Result<PlanDocument> {
        let path = self.plan_path(name);
        if !path.exists() {
            return Err(PlannerError::NotFound(format!("plan `{}`", name)));
        }
        load_from_path(&path)
    }

    /// Names of stored plans, sorted alphabetically.
    pub fn list_plans(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.plans_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(PLAN_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Backups for `name`, newest first.
    pub fn list_backups(&self, name: &str) -> Result<Vec<BackupInfo>> {
        let dir = self.backup_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(PLAN_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                entries.push(BackupInfo {
                    file_name: file_name.to_string(),
                    path: path.clone(),
                });
            }
        }
        // Timestamps are fixed-width, so name order is chronological.
        entries.sort_by(|a, b| b.file_name.cmp(&a.file_name));
        Ok(entries)
    }

    /// Replaces the stored plan with a backup and returns the restored document.
    pub fn restore_backup(&self, name: &str, backup_file: &str) -> Result<PlanDocument> {
        let source = self.backup_dir(name).join(backup_file);
        if !source.exists() {
            return Err(PlannerError::NotFound(format!("backup `{}`", backup_file)));
        }
        let document = load_from_path(&source)?;
        save_to_path(&document, &self.plan_path(name))?;
        info!(plan = %canonical_name(name), backup = backup_file, "plan restored");
        Ok(document)
    }

    fn backup_existing(&self, name: &str, path: &Path) -> Result<()> {
        let dir = self.backup_dir(name);
        ensure_dir(&dir)?;
        let stamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT);
        let target = dir.join(format!(
            "{}_{}.{}",
            canonical_name(name),
            stamp,
            PLAN_EXTENSION
        ));
        fs::copy(path, &target)?;
        debug!(backup = %target.display(), "backed up previous plan");
        self.prune_backups(name)
    }

    fn prune_backups(&self, name: &str) -> Result<()> {
        for stale in self.list_backups(name)?.iter().skip(self.retention) {
            let _ = fs::remove_file(&stale.path);
        }
        Ok(())
    }
}

impl PlanStorage for PlanStore {
    fn save_named(&self, document: &PlanDocument, name: &str) -> Result<PathBuf> {
        PlanStore::save_named(self, document, name)
    }

    fn load_named(&self, name: &str) -> Result<PlanDocument> {
        PlanStore::load_named(self, name)
    }

    fn list_plans(&self) -> Result<Vec<String>> {
        PlanStore::list_plans(self)
    }

    fn list_backups(&self, name: &str) -> Result<Vec<BackupInfo>> {
        PlanStore::list_backups(self, name)
    }

    fn restore_backup(&self, name: &str, backup_file: &str) -> Result<PlanDocument> {
        PlanStore::restore_backup(self, name, backup_file)
    }
}

/// Writes the document next to `path` first, then renames it into place.
pub fn save_to_path(document: &PlanDocument, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    let json = document.to_json()?;
    let tmp = tmp_path(path);
    write_file(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<PlanDocument> {
    let data = fs::read_to_string(path)?;
    Ok(PlanDocument::from_json(&data)?)
}

fn write_file(path: &Path, data: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Lower-case slug safe for file names; empty input becomes `plan`.
pub fn canonical_name(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '_',
        })
        .collect();
    if slug.trim_matches('_').is_empty() {
        "plan".into()
    } else {
        slug
    }
}
