//! Question bank: a flat JSON array of `BankEntry` on disk.
//!
//! Reads are lock-free; appends are serialized so concurrent writers never lose entries.

use std::path::{Path, PathBuf};

use rand::{seq::SliceRandom, Rng};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::domain::BankEntry;
use crate::error::{AppError, Result};
use crate::protocol::BankQuery;

pub struct QuestionBank {
  path: PathBuf,
  write_lock: Mutex<()>,
}

impl QuestionBank {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), write_lock: Mutex::new(()) }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// All entries; a missing file is an empty bank.
  pub async fn load(&self) -> Result<Vec<BankEntry>> {
    match tokio::fs::read_to_string(&self.path).await {
      Ok(s) if s.trim().is_empty() => Ok(Vec::new()),
      Ok(s) => Ok(serde_json::from_str(&s)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
      Err(e) => Err(e.into()),
    }
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn pick(&self, query: &BankQuery) -> Result<Option<BankEntry>> {
    let entries = self.load().await?;
    let mut rng = rand::thread_rng();
    Ok(select(&entries, query, &mut rng).cloned())
  }

  /// Append one entry and return the new size of the bank.
  #[instrument(level = "info", skip(self, entry), fields(title = %entry.title))]
  pub async fn append(&self, entry: BankEntry) -> Result<usize> {
    check_entry(&entry)?;
    let _guard = self.write_lock.lock().await;
    let mut entries = self.load().await?;
    entries.push(entry);
    let body = serde_json::to_string_pretty(&entries)?;

    if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(dir).await?;
    }
    let tmp = self.path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, &self.path).await?;
    info!(target: "bank", path = %self.path.display(), count = entries.len(), "Question bank updated");
    Ok(entries.len())
  }
}

pub fn check_entry(entry: &BankEntry) -> Result<()> {
  if entry.title.trim().is_empty() {
    return Err(AppError::BadRequest("entry title must not be empty".into()));
  }
  if entry.kind.trim().is_empty() || entry.difficulty.trim().is_empty() {
    return Err(AppError::BadRequest("entry type and difficulty are required".into()));
  }
  Ok(())
}

/// Uniform pick among entries matching every given filter; uniform over all entries
/// when no filter is given or nothing matches.
pub fn select<'a, R: Rng + ?Sized>(entries: &'a [BankEntry], query: &BankQuery, rng: &mut R) -> Option<&'a BankEntry> {
  let wanted = |f: &Option<String>| f.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
  let (kind, category, difficulty) = (wanted(&query.kind), wanted(&query.category), wanted(&query.difficulty));

  if kind.is_none() && category.is_none() && difficulty.is_none() {
    return entries.choose(rng);
  }

  let matching: Vec<&BankEntry> = entries
    .iter()
    .filter(|e| kind.as_deref().map_or(true, |k| e.kind.eq_ignore_ascii_case(k)))
    .filter(|e| difficulty.as_deref().map_or(true, |d| e.difficulty.eq_ignore_ascii_case(d)))
    .filter(|e| category.as_deref().map_or(true, |c| e.category.iter().any(|ec| ec.eq_ignore_ascii_case(c))))
    .collect();

  match matching.choose(rng) {
    Some(e) => Some(*e),
    None => entries.choose(rng),
  }
}
