use anyhow::{Context, Result};
use tracing::{error, info};

use crate::auth::Session;
use crate::db::Database;
use crate::models::{now_millis, Lesson};
use crate::storage::ObjectStore;

/// A file to attach to a new lesson.
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read attachment: {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        Ok(Self { filename, bytes })
    }
}

pub struct LessonBoard {
    lessons: Vec<Lesson>,
}

impl LessonBoard {
    pub fn load(db: &Database) -> Result<Self> {
        Ok(Self {
            lessons: db.list_lessons()?,
        })
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    /// Adds a lesson as the signed-in administrator. The attachment, if any,
    /// is uploaded first so its download URL can go into the record. The
    /// board is refetched afterwards.
    pub fn create(
        &mut self,
        db: &Database,
        storage: &ObjectStore,
        session: &Session,
        title: &str,
        content: &str,
        attachment: Option<Attachment>,
    ) -> Result<Lesson> {
        let author = session.require_admin()?;

        let file_url = match attachment {
            Some(file) => {
                let key = ObjectStore::lesson_key(now_millis(), &file.filename);
                Some(storage.upload(&key, &file.bytes)?)
            }
            None => None,
        };

        let lesson = Lesson {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            content: content.to_string(),
            instructor: author.display_name.clone(),
            file_url,
            created_at: now_millis(),
        };
        if let Err(e) = db.insert_lesson(&lesson) {
            error!("Failed to add lesson: {:#}", e);
            return Err(e.context("An error occurred while adding the lesson"));
        }
        info!(id = %lesson.id, attached = lesson.file_url.is_some(), "lesson added");

        self.lessons = db.list_lessons()?;
        Ok(lesson)
    }
}
