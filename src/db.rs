use anyhow::{anyhow, Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::RecruitError;
use crate::models::{Lesson, RecruitApplication, Status, UserProfile};

pub const COL_RECRUIT: &str = "recruit";

/// Stored sign-in material for one account.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub uid: String,
    pub email: String,
    /// Argon2 PHC string; it carries its own salt and parameters.
    pub password_hash: String,
}

/// The document store: profiles, applications and lessons, plus the
/// credential table backing the auth service.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

const APPLICATION_COLUMNS: &str = "id, user_id, user_name, email, gender, birth_date, address,
     detail_address, phone, photo_url, education, experience, self_intro,
     desired_field, expected_salary, status, created_at";

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                uid TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                display_name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS credentials (
                uid TEXT PRIMARY KEY REFERENCES users(uid),
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS recruit (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                user_name TEXT NOT NULL,
                email TEXT NOT NULL,
                gender TEXT NOT NULL CHECK (gender IN ('male', 'female')),
                birth_date TEXT NOT NULL DEFAULT '',
                address TEXT NOT NULL DEFAULT '',
                detail_address TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT '',
                photo_url TEXT,
                education TEXT NOT NULL DEFAULT '[]',
                experience TEXT NOT NULL DEFAULT '[]',
                self_intro TEXT NOT NULL DEFAULT '',
                desired_field TEXT NOT NULL,
                expected_salary TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'reviewed', 'accepted', 'rejected')),
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS col_lesson (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                instructor TEXT NOT NULL,
                file_url TEXT,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_recruit_user ON recruit(user_id);
            CREATE INDEX IF NOT EXISTS idx_recruit_created ON recruit(created_at);
            CREATE INDEX IF NOT EXISTS idx_lesson_created ON col_lesson(created_at);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [COL_RECRUIT],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'recruit init' first."));
        }
        Ok(())
    }

    // --- Profiles and credentials ---

    /// Writes the profile and its credentials together.
    pub fn create_account(&self, profile: &UserProfile, password_hash: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users (uid, email, display_name, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                profile.uid,
                profile.email,
                profile.display_name,
                profile.role.as_str(),
                profile.created_at
            ],
        )?;
        tx.execute(
            "INSERT INTO credentials (uid, email, password_hash) VALUES (?1, ?2, ?3)",
            params![profile.uid, profile.email, password_hash],
        )?;
        tx.commit()?;
        info!(uid = %profile.uid, role = %profile.role, "created account");
        Ok(())
    }

    pub fn find_credentials(&self, email: &str) -> Result<Option<Credentials>> {
        self.conn
            .query_row(
                "SELECT uid, email, password_hash FROM credentials WHERE email = ?1",
                [email.trim()],
                |row| {
                    Ok(Credentials {
                        uid: row.get(0)?,
                        email: row.get(1)?,
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()
            .context("Failed to look up credentials")
    }

    pub fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        self.conn
            .query_row(
                "SELECT uid, email, display_name, role, created_at FROM users WHERE uid = ?1",
                [uid],
                Self::row_to_profile,
            )
            .optional()
            .context("Failed to fetch user profile")
    }

    pub fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, email, display_name, role, created_at FROM users ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_profile)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list users")
    }

    fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
        let role: String = row.get(3)?;
        Ok(UserProfile {
            uid: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
            role: role
                .parse()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
            created_at: row.get(4)?,
        })
    }

    // --- Applications ---

    pub fn insert_application(&self, app: &RecruitApplication) -> Result<()> {
        let education = serde_json::to_string(&app.education)?;
        let experience = serde_json::to_string(&app.experience)?;
        self.conn.execute(
            &format!(
                "INSERT INTO recruit ({APPLICATION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                app.id,
                app.user_id,
                app.user_name,
                app.email,
                app.gender.as_str(),
                app.birth_date,
                app.address,
                app.detail_address,
                app.phone,
                app.photo_url,
                education,
                experience,
                app.self_intro,
                app.desired_field,
                app.expected_salary,
                app.status.as_str(),
                app.created_at
            ],
        )?;
        info!(id = %app.id, user = %app.user_id, "inserted application");
        Ok(())
    }

    /// All applications, newest first.
    pub fn list_applications(&self) -> Result<Vec<RecruitApplication>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM recruit ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([], Self::row_to_application)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list applications")
    }

    /// Applications created by `user_id`, in storage order.
    pub fn list_applications_for_user(&self, user_id: &str) -> Result<Vec<RecruitApplication>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM recruit WHERE user_id = ?1"
        ))?;
        let rows = stmt.query_map([user_id], Self::row_to_application)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list applications for user")
    }

    pub fn get_application(&self, id: &str) -> Result<Option<RecruitApplication>> {
        self.conn
            .query_row(
                &format!("SELECT {APPLICATION_COLUMNS} FROM recruit WHERE id = ?1"),
                [id],
                Self::row_to_application,
            )
            .optional()
            .context("Failed to fetch application")
    }

    /// Returns the number of records changed (0 when `id` does not exist).
    pub fn update_application_status(&self, id: &str, status: Status) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE recruit SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        debug!(id, status = %status, changed, "updated application status");
        Ok(changed)
    }

    /// Sets `status` on every id in one transaction. Either all rows are
    /// written or none are: an id with no row aborts the whole batch.
    pub fn update_status_batch(&self, ids: &[String], status: Status) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut changed = 0;
        {
            let mut stmt = tx.prepare("UPDATE recruit SET status = ?1 WHERE id = ?2")?;
            for id in ids {
                let n = stmt.execute(params![status.as_str(), id])?;
                if n == 0 {
                    // Dropping `tx` rolls back the rows already written.
                    return Err(RecruitError::NotFound {
                        kind: "Application",
                        id: id.clone(),
                    }
                    .into());
                }
                changed += n;
            }
        }
        tx.commit().context("Failed to commit batch status update")?;
        info!(count = ids.len(), changed, status = %status, "batch status update");
        Ok(changed)
    }

    fn row_to_application(row: &rusqlite::Row) -> rusqlite::Result<RecruitApplication> {
        let gender: String = row.get(4)?;
        let education: String = row.get(10)?;
        let experience: String = row.get(11)?;
        let status: String = row.get(15)?;
        Ok(RecruitApplication {
            id: row.get(0)?,
            user_id: row.get(1)?,
            user_name: row.get(2)?,
            email: row.get(3)?,
            gender: gender.parse().map_err(|e| conversion_error(4, e))?,
            birth_date: row.get(5)?,
            address: row.get(6)?,
            detail_address: row.get(7)?,
            phone: row.get(8)?,
            photo_url: row.get(9)?,
            education: serde_json::from_str(&education).map_err(|e| conversion_error(10, e))?,
            experience: serde_json::from_str(&experience).map_err(|e| conversion_error(11, e))?,
            self_intro: row.get(12)?,
            desired_field: row.get(13)?,
            expected_salary: row.get(14)?,
            status: status.parse().map_err(|e| conversion_error(15, e))?,
            created_at: row.get(16)?,
        })
    }

    // --- Lessons ---

    pub fn insert_lesson(&self, lesson: &Lesson) -> Result<()> {
        self.conn.execute(
            "INSERT INTO col_lesson (id, title, content, instructor, file_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                lesson.id,
                lesson.title,
                lesson.content,
                lesson.instructor,
                lesson.file_url,
                lesson.created_at
            ],
        )?;
        info!(id = %lesson.id, "inserted lesson");
        Ok(())
    }

    /// All lessons, newest first.
    pub fn list_lessons(&self) -> Result<Vec<Lesson>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, content, instructor, file_url, created_at
             FROM col_lesson ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Lesson {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                instructor: row.get(3)?,
                file_url: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list lessons")
    }

    #[cfg(test)]
    pub fn count_applications(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM recruit", [], |row| row.get(0))?)
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}
