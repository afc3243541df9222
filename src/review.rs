use anyhow::Result;
use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::db::Database;
use crate::error::RecruitError;
use crate::models::{RecruitApplication, Status, UserProfile};

/// Per-status totals over a list of applications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub reviewed: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn tally<'a, I>(apps: I) -> Self
    where
        I: IntoIterator<Item = &'a RecruitApplication>,
    {
        let mut counts = Self::default();
        for app in apps {
            counts.total += 1;
            match app.status {
                Status::Pending => counts.pending += 1,
                Status::Reviewed => counts.reviewed += 1,
                Status::Accepted => counts.accepted += 1,
                Status::Rejected => counts.rejected += 1,
            }
        }
        counts
    }
}

/// The administrator's working view: every application as last fetched,
/// plus filter and selection state derived from it. Writes go to the store
/// first and are then patched into the local list.
pub struct ReviewBoard {
    applications: Vec<RecruitApplication>,
    users: Vec<UserProfile>,
    status_filter: Option<Status>,
    search: String,
    selected: HashSet<String>,
}

impl ReviewBoard {
    pub fn load(db: &Database) -> Result<Self> {
        let applications = db.list_applications()?;
        let users = db.list_profiles()?;
        Ok(Self::from_records(applications, users))
    }

    /// `applications` are expected newest first, as the store returns them.
    pub fn from_records(applications: Vec<RecruitApplication>, users: Vec<UserProfile>) -> Self {
        Self {
            applications,
            users,
            status_filter: None,
            search: String::new(),
            selected: HashSet::new(),
        }
    }

    pub fn applications(&self) -> &[RecruitApplication] {
        &self.applications
    }

    pub fn users(&self) -> &[UserProfile] {
        &self.users
    }

    pub fn get(&self, id: &str) -> Option<&RecruitApplication> {
        self.applications.iter().find(|a| a.id == id)
    }

    pub fn stats(&self) -> StatusCounts {
        StatusCounts::tally(&self.applications)
    }

    // --- Filtering ---

    pub fn status_filter(&self) -> Option<Status> {
        self.status_filter
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_status_filter(&mut self, status: Option<Status>) {
        self.status_filter = status;
        self.selected.clear();
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.selected.clear();
    }

    fn matches(&self, app: &RecruitApplication) -> bool {
        if let Some(status) = self.status_filter {
            if app.status != status {
                return false;
            }
        }
        let term = self.search.trim().to_lowercase();
        term.is_empty()
            || app.user_name.to_lowercase().contains(&term)
            || app.desired_field.to_lowercase().contains(&term)
    }

    /// Records passing the current status filter and search, in list order.
    pub fn filtered(&self) -> Vec<&RecruitApplication> {
        self.applications.iter().filter(|a| self.matches(a)).collect()
    }

    // --- Selection ---

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn selection_len(&self) -> usize {
        self.selected.len()
    }

    /// Returns false if `id` is not on the board.
    pub fn toggle_select(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
        true
    }

    /// Selects every record in the filtered view, or clears the selection if
    /// all of them are already selected.
    pub fn toggle_select_all(&mut self) {
        let visible: HashSet<String> = self.filtered().iter().map(|a| a.id.clone()).collect();
        if !visible.is_empty() && self.selected == visible {
            self.selected.clear();
        } else {
            self.selected = visible;
        }
    }

    pub fn all_visible_selected(&self) -> bool {
        let visible = self.filtered();
        !visible.is_empty() && visible.len() == self.selected.len() && visible.iter().all(|a| self.is_selected(&a.id))
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Selected records in list order.
    pub fn selected_records(&self) -> Vec<&RecruitApplication> {
        self.applications
            .iter()
            .filter(|a| self.selected.contains(&a.id))
            .collect()
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.selected_records().into_iter().map(|a| a.id.clone()).collect()
    }

    // --- Writes ---

    /// Sets one record's status in the store, then in the local list.
    pub fn update_status(&mut self, db: &Database, id: &str, status: Status) -> Result<()> {
        let changed = match db.update_application_status(id, status) {
            Ok(n) => n,
            Err(e) => {
                error!(id, "status update failed: {:#}", e);
                return Err(e.context("An error occurred while updating the status"));
            }
        };
        if changed == 0 {
            return Err(RecruitError::NotFound {
                kind: "Application",
                id: id.to_string(),
            }
            .into());
        }
        if let Some(app) = self.applications.iter_mut().find(|a| a.id == id) {
            app.status = status;
        } else {
            // Written remotely but missing locally: our list is stale.
            self.reconcile(db)?;
        }
        Ok(())
    }

    /// Sets `status` on every selected record in one store write, patches the
    /// local list and clears the selection. Returns the number of records
    /// updated; an empty selection does nothing. If any selected record is
    /// gone from the store nothing is written and the board is left as is.
    pub fn update_selected(&mut self, db: &Database, status: Status) -> Result<usize> {
        let ids = self.selected_ids();
        if ids.is_empty() {
            return Ok(0);
        }

        let changed = match db.update_status_batch(&ids, status) {
            Ok(n) => n,
            Err(e) => {
                error!(count = ids.len(), "batch update failed: {:#}", e);
                return Err(e.context("An error occurred during the batch update"));
            }
        };

        let mut patched = 0;
        for app in self.applications.iter_mut() {
            if self.selected.contains(&app.id) {
                app.status = status;
                patched += 1;
            }
        }
        self.selected.clear();

        if changed != patched {
            warn!(changed, patched, "local patch diverged from store, refetching");
            self.reconcile(db)?;
        }
        info!(count = changed, status = %status, "batch status change");
        Ok(changed)
    }

    pub fn accept_selected(&mut self, db: &Database) -> Result<usize> {
        self.update_selected(db, Status::Accepted)
    }

    /// Replaces the local lists with a fresh read from the store. Selected
    /// ids that no longer exist are dropped.
    pub fn reconcile(&mut self, db: &Database) -> Result<()> {
        self.applications = db.list_applications()?;
        self.users = db.list_profiles()?;
        let present: HashSet<&str> = self.applications.iter().map(|a| a.id.as_str()).collect();
        self.selected.retain(|id| present.contains(id.as_str()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{sample_application, test_db};

    fn seeded() -> (Database, ReviewBoard) {
        let db = test_db();
        let rows = [
            ("a1", "Kim Minji", "바리스타", Status::Pending),
            ("a2", "Lee Jun", "객실서비스", Status::Reviewed),
            ("a3", "Park Sora", "바리스타", Status::Accepted),
            ("a4", "Choi Kim", "디자인", Status::Rejected),
            ("a5", "Jung Hoon", "판매서비스", Status::Pending),
        ];
        for (i, (id, name, field, status)) in rows.iter().enumerate() {
            let mut app = sample_application(id, &format!("u{}", i), name, i as i64);
            app.desired_field = field.to_string();
            app.status = *status;
            db.insert_application(&app).unwrap();
        }
        let board = ReviewBoard::load(&db).unwrap();
        (db, board)
    }

    fn ids(apps: &[&RecruitApplication]) -> Vec<String> {
        apps.iter().map(|a| a.id.clone()).collect()
    }

    #[test]
    fn test_loads_newest_first() {
        let (_db, board) = seeded();
        let order: Vec<&str> = board.applications().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(order, vec!["a5", "a4", "a3", "a2", "a1"]);
    }

    #[test]
    fn test_status_filter_returns_exact_subset() {
        let (_db, mut board) = seeded();
        for status in Status::ALL {
            board.set_status_filter(Some(status));
            let filtered = board.filtered();
            let expected: Vec<&RecruitApplication> =
                board.applications().iter().filter(|a| a.status == status).collect();
            assert_eq!(ids(&filtered), ids(&expected));
            assert!(filtered.iter().all(|a| a.status == status));
        }
        board.set_status_filter(None);
        assert_eq!(board.filtered().len(), 5);
    }

    #[test]
    fn test_search_is_case_insensitive_over_name_and_field() {
        let (_db, mut board) = seeded();
        board.set_search("kim");
        assert_eq!(ids(&board.filtered()), vec!["a4", "a1"]);

        board.set_search("바리스타");
        assert_eq!(ids(&board.filtered()), vec!["a3", "a1"]);

        board.set_status_filter(Some(Status::Pending));
        assert_eq!(ids(&board.filtered()), vec!["a1"]);
    }

    #[test]
    fn test_select_all_is_bound_to_filtered_view() {
        let (_db, mut board) = seeded();
        board.set_status_filter(Some(Status::Pending));
        board.toggle_select_all();
        assert_eq!(board.selected_ids(), vec!["a5", "a1"]);
        assert!(board.all_visible_selected());

        board.toggle_select_all();
        assert_eq!(board.selection_len(), 0);

        // Partial selection: select-all fills in the rest.
        board.toggle_select("a1");
        board.toggle_select_all();
        assert_eq!(board.selection_len(), 2);
    }

    #[test]
    fn test_filter_change_clears_selection() {
        let (_db, mut board) = seeded();
        assert!(board.toggle_select("a2"));
        assert!(!board.toggle_select("missing"));
        board.set_search("lee");
        assert_eq!(board.selection_len(), 0);

        board.toggle_select("a2");
        board.set_status_filter(Some(Status::Reviewed));
        assert_eq!(board.selection_len(), 0);
    }

    #[test]
    fn test_batch_accept_touches_exactly_the_selection() {
        let (db, mut board) = seeded();
        board.toggle_select("a1");
        board.toggle_select("a2");
        board.toggle_select("a4");

        let changed = board.accept_selected(&db).unwrap();
        assert_eq!(changed, 3);
        assert_eq!(board.selection_len(), 0);

        let expected = |id: &str| match id {
            "a1" | "a2" | "a3" | "a4" => Status::Accepted,
            _ => Status::Pending,
        };
        for app in board.applications() {
            assert_eq!(app.status, expected(&app.id), "local {}", app.id);
        }
        for app in db.list_applications().unwrap() {
            assert_eq!(app.status, expected(&app.id), "stored {}", app.id);
        }
    }

    #[test]
    fn test_batch_with_stale_record_is_all_or_nothing() {
        let db = test_db();
        db.insert_application(&sample_application("a1", "u1", "Kim", 1)).unwrap();
        let mut board = ReviewBoard::from_records(
            vec![
                sample_application("ghost", "u2", "Gone", 2),
                sample_application("a1", "u1", "Kim", 1),
            ],
            vec![],
        );
        board.toggle_select("ghost");
        board.toggle_select("a1");

        let err = board.accept_selected(&db).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecruitError>(),
            Some(RecruitError::NotFound { id, .. }) if id == "ghost"
        ));
        assert_eq!(db.get_application("a1").unwrap().unwrap().status, Status::Pending);
        assert!(board.applications().iter().all(|a| a.status == Status::Pending));
        assert_eq!(board.selection_len(), 2);
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let (db, mut board) = seeded();
        assert_eq!(board.accept_selected(&db).unwrap(), 0);
        assert_eq!(board.stats().accepted, 1);
    }

    #[test]
    fn test_single_update_patches_local_and_store() {
        let (db, mut board) = seeded();
        // Any status can follow any other.
        board.update_status(&db, "a3", Status::Pending).unwrap();
        assert_eq!(board.get("a3").unwrap().status, Status::Pending);
        assert_eq!(db.get_application("a3").unwrap().unwrap().status, Status::Pending);

        let err = board.update_status(&db, "zzz", Status::Accepted).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecruitError>(),
            Some(RecruitError::NotFound { .. })
        ));
    }

    #[test]
    fn test_divergent_batch_reconciles_from_store() {
        let (db, mut board) = seeded();
        board.toggle_select("a1");
        // Another administrator's write lands after our fetch.
        let mut late = sample_application("a9", "u9", "Late", 99);
        late.status = Status::Pending;
        db.insert_application(&late).unwrap();
        board.reconcile(&db).unwrap();
        assert!(board.is_selected("a1"));
        assert_eq!(board.applications()[0].id, "a9");

        board.accept_selected(&db).unwrap();
        assert_eq!(board.get("a1").unwrap().status, Status::Accepted);
        assert_eq!(board.get("a9").unwrap().status, Status::Pending);
    }

    #[test]
    fn test_stats() {
        let (_db, board) = seeded();
        assert_eq!(
            board.stats(),
            StatusCounts {
                total: 5,
                pending: 2,
                reviewed: 1,
                accepted: 1,
                rejected: 1
            }
        );
    }
}
