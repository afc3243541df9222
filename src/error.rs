use thiserror::Error;

/// Domain failures callers may want to match on. Store and IO failures stay
/// in `anyhow` and carry context instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecruitError {
    #[error("Please choose a desired field before submitting.")]
    MissingDesiredField,

    #[error("Consent to personal data collection is required. Run 'recruit consent agree' first.")]
    ConsentRequired,

    #[error("At most {max} {kind} entries are allowed (got {got})")]
    TooManyEntries {
        kind: &'static str,
        max: usize,
        got: usize,
    },

    #[error("Not signed in. Run 'recruit login' first.")]
    NotSignedIn,

    #[error("This action requires the {0} role")]
    PermissionDenied(&'static str),

    #[error("Email address is already in use: {0}")]
    EmailInUse(String),

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("Email or password is incorrect")]
    InvalidCredentials,

    #[error("Unknown status '{0}' (expected pending, reviewed, accepted, rejected)")]
    UnknownStatus(String),

    #[error("Unknown gender '{0}' (expected male, female)")]
    UnknownGender(String),

    #[error("Unknown role '{0}' (expected user, admin)")]
    UnknownRole(String),

    #[error("Select at least one application first")]
    NothingSelected,

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
}
