use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::RecruitError;
use crate::models::{format_date, RecruitApplication};

pub const HEADERS: [&str; 7] = [
    "성명",
    "이메일",
    "연락처",
    "지원분야",
    "희망급여(만원)",
    "심사상태",
    "제출일",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn row(app: &RecruitApplication) -> [String; 7] {
    [
        app.user_name.clone(),
        app.email.clone(),
        app.phone.clone(),
        app.desired_field.clone(),
        app.expected_salary.clone(),
        app.status.export_label().to_string(),
        format_date(app.created_at),
    ]
}

/// CSV bytes for `apps`: UTF-8 with a BOM so spreadsheet tools detect the
/// encoding, header row first, one row per record in the given order.
pub fn to_csv(apps: &[&RecruitApplication]) -> Result<Vec<u8>> {
    if apps.is_empty() {
        return Err(RecruitError::NothingSelected.into());
    }
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(HEADERS)?;
    for app in apps {
        writer.write_record(row(app))?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to finish CSV: {}", e.error()))
}

/// `{organization}_입사지원서_명단_{YYYY-MM-DD}.csv`
pub fn default_filename(organization: &str, date: chrono::NaiveDate) -> String {
    format!("{}_입사지원서_명단_{}.csv", organization, date.format("%Y-%m-%d"))
}

/// Date stamped into the default filename. Taken in UTC, so an export made
/// just after local midnight can carry the previous day.
pub fn export_date() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Writes the export into `dir` (or to `output` if given) and returns the path.
pub fn write_export(
    apps: &[&RecruitApplication],
    organization: &str,
    dir: &Path,
    output: Option<PathBuf>,
) -> Result<PathBuf> {
    let bytes = to_csv(apps)?;
    let path = output.unwrap_or_else(|| {
        dir.join(default_filename(organization, export_date()))
    });
    std::fs::write(&path, bytes)?;
    info!(path = %path.display(), rows = apps.len(), "exported applications");
    Ok(path)
}
