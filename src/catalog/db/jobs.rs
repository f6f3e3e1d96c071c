use rusqlite::params;
use serde::Serialize;

use super::util::{map_sql_error, now_epoch_seconds};
use super::{CatalogError, CatalogStore};

/// Row id of a job log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobId(pub i64);

/// Kind of operation recorded in the job log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobKind {
    Scan,
    Import,
    Diff,
    Report,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Scan => "scan",
            JobKind::Import => "import",
            JobKind::Diff => "diff",
            JobKind::Report => "report",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "scan" => Some(JobKind::Scan),
            "import" => Some(JobKind::Import),
            "diff" => Some(JobKind::Diff),
            "report" => Some(JobKind::Report),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// One entry of the operation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub kind: JobKind,
    pub source_name: Option<String>,
    /// Epoch seconds.
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub status: JobStatus,
    pub detail: Option<String>,
}

impl CatalogStore {
    /// Record the start of an operation. Written in its own implicit transaction.
    pub fn start_job(&self, kind: JobKind, source_name: Option<&str>) -> Result<JobId, CatalogError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO jobs (job_type, source_name, started_at, status) VALUES (?1, ?2, ?3, ?4)",
            params![kind.as_str(), source_name, now_epoch_seconds(), JobStatus::Running.as_str()],
        )
        .map_err(map_sql_error)?;
        Ok(JobId(conn.last_insert_rowid()))
    }

    /// Mark a job finished with its outcome.
    pub fn finish_job(
        &self,
        id: JobId,
        status: JobStatus,
        detail: Option<&str>,
    ) -> Result<(), CatalogError> {
        self.connection()?
            .execute(
                "UPDATE jobs SET completed_at = ?1, status = ?2, detail = ?3 WHERE id = ?4",
                params![now_epoch_seconds(), status.as_str(), detail, id.0],
            )
            .map_err(map_sql_error)?;
        Ok(())
    }

    /// Most recent jobs first.
    pub fn recent_jobs(&self, limit: usize) -> Result<Vec<JobRecord>, CatalogError> {
        let mut stmt = self
            .connection()?
            .prepare(
                "SELECT id, job_type, source_name, started_at, completed_at, status, detail
                 FROM jobs ORDER BY id DESC LIMIT ?1",
            )
            .map_err(map_sql_error)?;
        let raw = stmt
            .query_map(params![limit.min(i64::MAX as usize) as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        raw.into_iter()
            .map(|(id, kind, source_name, started_at, completed_at, status, detail)| {
                let invalid = |detail: String| CatalogError::InvalidRow {
                    table: "jobs",
                    key: id.to_string(),
                    detail,
                };
                Ok(JobRecord {
                    id: JobId(id),
                    kind: JobKind::parse(&kind).ok_or_else(|| invalid(format!("unknown job type {kind:?}")))?,
                    source_name,
                    started_at,
                    completed_at,
                    status: JobStatus::parse(&status)
                        .ok_or_else(|| invalid(format!("unknown job status {status:?}")))?,
                    detail,
                })
            })
            .collect()
    }
}
