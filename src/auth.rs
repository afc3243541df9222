use anyhow::{anyhow, Result};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::RecruitError;
use crate::local::{LocalStore, KEY_SESSION_UID};
use crate::models::{now_millis, Role, UserProfile};

pub const MIN_PASSWORD_LEN: usize = 6;

/// The signed-in user as seen by every command. `profile` is `None` when the
/// uid has no profile record; role-gated commands then treat the session as
/// signed out.
#[derive(Debug, Clone)]
pub struct Session {
    pub uid: String,
    pub profile: Option<UserProfile>,
}

impl Session {
    pub fn profile(&self) -> Result<&UserProfile, RecruitError> {
        self.profile.as_ref().ok_or(RecruitError::NotSignedIn)
    }

    pub fn require_admin(&self) -> Result<&UserProfile, RecruitError> {
        let profile = self.profile()?;
        if profile.role != Role::Admin {
            return Err(RecruitError::PermissionDenied("admin"));
        }
        Ok(profile)
    }

    pub fn require_applicant(&self) -> Result<&UserProfile, RecruitError> {
        let profile = self.profile()?;
        if profile.role != Role::User {
            return Err(RecruitError::PermissionDenied("user"));
        }
        Ok(profile)
    }
}

/// Email/password auth over the store's credential table. The sign-in state
/// lives in local storage, the way a browser keeps its auth session.
pub struct Auth<'a> {
    db: &'a Database,
    local: &'a mut LocalStore,
}

impl<'a> Auth<'a> {
    pub fn new(db: &'a Database, local: &'a mut LocalStore) -> Self {
        Self { db, local }
    }

    /// Creates the account and its profile, then signs in as it.
    pub fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        display_name: &str,
        role: Role,
    ) -> Result<Session> {
        let email = email.trim();
        if email.is_empty() || display_name.trim().is_empty() {
            return Err(anyhow!("Email and display name are required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(RecruitError::WeakPassword(MIN_PASSWORD_LEN).into());
        }
        if self.db.find_credentials(email)?.is_some() {
            return Err(RecruitError::EmailInUse(email.to_string()).into());
        }

        let profile = UserProfile {
            uid: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: display_name.trim().to_string(),
            role,
            created_at: now_millis(),
        };
        self.db.create_account(&profile, &hash_password(password)?)?;

        self.local.set(KEY_SESSION_UID, &profile.uid)?;
        Ok(Session {
            uid: profile.uid.clone(),
            profile: Some(profile),
        })
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(anyhow!("Email and password are required"));
        }
        let creds = self
            .db
            .find_credentials(email)?
            .ok_or(RecruitError::InvalidCredentials)?;
        if !verify_password(&creds.password_hash, password)? {
            warn!(email = %creds.email, "rejected sign-in");
            return Err(RecruitError::InvalidCredentials.into());
        }

        self.local.set(KEY_SESSION_UID, &creds.uid)?;
        info!(uid = %creds.uid, "signed in");
        self.load_session(creds.uid)
    }

    pub fn sign_out(&mut self) -> Result<()> {
        if let Some(uid) = self.local.get(KEY_SESSION_UID) {
            info!(uid, "signed out");
        }
        self.local.remove(KEY_SESSION_UID)
    }

    /// Resolves the persisted sign-in state into a session, if any.
    pub fn current(&self) -> Result<Option<Session>> {
        match self.local.get(KEY_SESSION_UID) {
            Some(uid) => self.load_session(uid.to_string()).map(Some),
            None => Ok(None),
        }
    }

    fn load_session(&self, uid: String) -> Result<Session> {
        let profile = self.db.get_profile(&uid)?;
        if profile.is_none() {
            warn!(uid = %uid, "user profile not found in store");
        }
        Ok(Session { uid, profile })
    }
}

/// Argon2id PHC string (`$argon2id$v=19$...`) with a fresh random salt.
fn hash_password(password: &str) -> Result<String> {
    let salt: [u8; 16] = rand::random();
    let config = argon2::Config {
        variant: argon2::Variant::Argon2id,
        ..argon2::Config::default()
    };
    argon2::hash_encoded(password.as_bytes(), &salt, &config)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))
}

fn verify_password(encoded: &str, password: &str) -> Result<bool> {
    argon2::verify_encoded(encoded, password.as_bytes())
        .map_err(|e| anyhow!("Stored password hash is unreadable: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;

    fn local_store(dir: &tempfile::TempDir) -> LocalStore {
        LocalStore::open(&dir.path().join("local.json")).unwrap()
    }

    #[test]
    fn test_sign_up_then_sign_in() {
        let db = test_db();
        let dir = tempfile::tempdir().unwrap();
        let mut local = local_store(&dir);
        let mut auth = Auth::new(&db, &mut local);

        let session = auth
            .sign_up("kim@example.com", "secret1", "Kim", Role::User)
            .unwrap();
        assert_eq!(session.profile().unwrap().display_name, "Kim");
        assert_eq!(auth.current().unwrap().unwrap().uid, session.uid);

        auth.sign_out().unwrap();
        assert!(auth.current().unwrap().is_none());

        let again = auth.sign_in("kim@example.com", "secret1").unwrap();
        assert_eq!(again.uid, session.uid);
        assert_eq!(again.profile().unwrap().role, Role::User);
    }

    #[test]
    fn test_rejects_weak_password_duplicate_email_and_bad_login() {
        let db = test_db();
        let dir = tempfile::tempdir().unwrap();
        let mut local = local_store(&dir);
        let mut auth = Auth::new(&db, &mut local);

        let err = auth.sign_up("a@b.com", "12345", "A", Role::User).unwrap_err();
        assert_eq!(err.downcast_ref::<RecruitError>(), Some(&RecruitError::WeakPassword(6)));

        auth.sign_up("a@b.com", "123456", "A", Role::User).unwrap();
        let err = auth.sign_up("A@B.com", "123456", "B", Role::Admin).unwrap_err();
        assert!(matches!(err.downcast_ref::<RecruitError>(), Some(RecruitError::EmailInUse(_))));

        let err = auth.sign_in("a@b.com", "wrong!").unwrap_err();
        assert_eq!(err.downcast_ref::<RecruitError>(), Some(&RecruitError::InvalidCredentials));
        let err = auth.sign_in("nobody@b.com", "123456").unwrap_err();
        assert_eq!(err.downcast_ref::<RecruitError>(), Some(&RecruitError::InvalidCredentials));
    }

    #[test]
    fn test_missing_profile_leaves_session_unauthenticated() {
        let db = test_db();
        let dir = tempfile::tempdir().unwrap();
        let mut local = local_store(&dir);
        local.set(KEY_SESSION_UID, "ghost").unwrap();
        let auth = Auth::new(&db, &mut local);

        let session = auth.current().unwrap().unwrap();
        assert!(session.profile.is_none());
        assert_eq!(session.require_admin().unwrap_err(), RecruitError::NotSignedIn);
    }

    #[test]
    fn test_role_gates() {
        let admin = Session {
            uid: "u".into(),
            profile: Some(UserProfile {
                uid: "u".into(),
                email: "e".into(),
                display_name: "n".into(),
                role: Role::Admin,
                created_at: 0,
            }),
        };
        assert!(admin.require_admin().is_ok());
        assert_eq!(
            admin.require_applicant().unwrap_err(),
            RecruitError::PermissionDenied("user")
        );
    }

    #[test]
    fn test_password_hash_is_salted_argon2() {
        let first = hash_password("secret1").unwrap();
        let second = hash_password("secret1").unwrap();
        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(verify_password(&first, "secret1").unwrap());
        assert!(!verify_password(&first, "secret2").unwrap());
        assert!(verify_password("not a phc string", "secret1").is_err());
    }

    #[test]
    fn test_stored_credential_is_not_the_password() {
        let db = test_db();
        let dir = tempfile::tempdir().unwrap();
        let mut local = local_store(&dir);
        Auth::new(&db, &mut local)
            .sign_up("lee@example.com", "secret1", "Lee", Role::User)
            .unwrap();

        let creds = db.find_credentials("lee@example.com").unwrap().unwrap();
        assert!(creds.password_hash.starts_with("$argon2id$"));
        assert!(!creds.password_hash.contains("secret1"));
    }
}
