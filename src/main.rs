mod auth;
mod config;
mod consent;
mod dashboard;
mod db;
mod error;
mod export;
mod lessons;
mod local;
mod models;
mod photo;
mod review;
mod storage;
mod submission;
mod telemetry;
mod tui;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use auth::{Auth, Session};
use config::Config;
use dashboard::ApplicantDashboard;
use db::Database;
use error::RecruitError;
use lessons::{Attachment, LessonBoard};
use local::LocalStore;
use models::{format_date, RecruitApplication, Role, Status};
use review::ReviewBoard;
use storage::ObjectStore;
use submission::{ApplicationDraft, JOB_CATEGORIES};
use tui::truncate;

#[derive(Parser)]
#[command(name = "recruit")]
#[command(about = "Recruitment management - applications, review and training material")]
struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,

        /// At least 6 characters
        #[arg(short, long)]
        password: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account role (user, admin)
        #[arg(short, long, default_value = "user")]
        role: Role,
    },

    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Personal data collection consent
    Consent {
        #[command(subcommand)]
        command: ConsentCommands,
    },

    /// Write or submit an application
    Apply {
        #[command(subcommand)]
        command: ApplyCommands,
    },

    /// List the desired fields offered on the form
    Categories,

    /// Show your own applications
    My,

    /// List all applications (admin)
    List {
        /// Filter by status (pending, reviewed, accepted, rejected)
        #[arg(short, long)]
        status: Option<Status>,

        /// Search name or desired field
        #[arg(short = 'q', long)]
        search: Option<String>,
    },

    /// Show application details
    Show {
        /// Application ID
        id: String,
    },

    /// Set the status of one application (admin)
    Status {
        /// Application ID
        id: String,

        /// New status (pending, reviewed, accepted, rejected)
        status: Status,
    },

    /// Accept several applications in one batch (admin)
    Accept {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Export selected applications to CSV (admin)
    Export {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Output file (default: dated file in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show application counts by status (admin)
    Stats,

    /// List registered users (admin)
    Users,

    /// Interactive review board (admin)
    Review,

    /// Training material
    Lessons {
        #[command(subcommand)]
        command: LessonCommands,
    },
}

#[derive(clap::Args)]
struct SelectionArgs {
    /// Application IDs to select
    ids: Vec<String>,

    /// Select every application matching the filters
    #[arg(long)]
    all: bool,

    /// Filter by status before selecting
    #[arg(short, long)]
    status: Option<Status>,

    /// Search name or desired field before selecting
    #[arg(short = 'q', long)]
    search: Option<String>,
}

#[derive(Subcommand)]
enum ConsentCommands {
    /// Show the consent document
    Show {
        /// Applicant name to sign the document with
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Agree to personal data collection
    Agree,

    /// Decline personal data collection
    Decline,
}

#[derive(Subcommand)]
enum ApplyCommands {
    /// Write an empty application form as JSON
    Template {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Submit a filled-in application form
    Submit {
        /// Path to the JSON form
        form: PathBuf,

        /// Photo to attach (downscaled before upload)
        #[arg(short, long)]
        photo: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum LessonCommands {
    /// List lessons
    List,

    /// Add a lesson (admin)
    Add {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        content: String,

        /// File to attach
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Download a lesson's attachment
    Fetch {
        /// Lesson ID
        id: String,

        /// Output file (default: original file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn require_session(db: &Database, local: &mut LocalStore) -> Result<Session> {
    Auth::new(db, local)
        .current()?
        .ok_or_else(|| RecruitError::NotSignedIn.into())
}

fn apply_selection(board: &mut ReviewBoard, selection: &SelectionArgs) -> Result<()> {
    board.set_status_filter(selection.status);
    if let Some(term) = &selection.search {
        board.set_search(term);
    }
    if selection.all {
        board.toggle_select_all();
    }
    for id in &selection.ids {
        if board.is_selected(id) {
            continue;
        }
        if !board.toggle_select(id) {
            return Err(RecruitError::NotFound {
                kind: "Application",
                id: id.clone(),
            }
            .into());
        }
    }
    if board.selection_len() == 0 {
        return Err(RecruitError::NothingSelected.into());
    }
    Ok(())
}

fn print_application_table(apps: &[&RecruitApplication]) {
    println!(
        "{:<38} {:<10} {:<16} {:<20} {:>8} {:<10}",
        "ID", "STATUS", "NAME", "FIELD", "SALARY", "SUBMITTED"
    );
    println!("{}", "-".repeat(106));
    for app in apps {
        println!(
            "{:<38} {:<10} {:<16} {:<20} {:>8} {:<10}",
            app.id,
            app.status.as_str(),
            truncate(&app.user_name, 14),
            truncate(&app.desired_field, 18),
            app.expected_salary,
            format_date(app.created_at)
        );
    }
}

fn print_application(app: &RecruitApplication) {
    println!("Application {}", app.id);
    println!("Name: {} ({})", app.user_name, app.gender.as_str());
    println!("Status: {} ({})", app.status.display_label(), app.status);
    println!("Desired field: {}", app.desired_field);
    println!("Expected salary: {}만원", app.expected_salary);
    println!("Email: {}", app.email);
    println!("Phone: {}", app.phone);
    println!("Birth date: {}", app.birth_date);
    println!("Address: {} {}", app.address, app.detail_address);
    println!("Submitted: {}", format_date(app.created_at));
    if app.photo_url.is_some() {
        println!("Photo: attached");
    }
    if !app.education.is_empty() {
        println!("\n--- Education ---");
        for edu in &app.education {
            println!(
                "  {} ~ {}  {}  {}",
                edu.admission_year, edu.graduation_year, edu.school_major, edu.certificates
            );
        }
    }
    if !app.experience.is_empty() {
        println!("\n--- Experience ---");
        for exp in &app.experience {
            println!("  {}  {}  {}", exp.period, exp.company_dept, exp.duties);
        }
    }
    if !app.self_intro.is_empty() {
        println!("\n--- Self Introduction ---\n{}", app.self_intro);
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // The review board owns the terminal, so it gets no log output.
    if !matches!(cli.command, Commands::Review) {
        telemetry::init_tracing();
    }

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_overrides(|key| std::env::var(key).ok());
            config
        }
        None => Config::load()?,
    };
    let db = Database::open(&config.database_path())?;
    let mut local = LocalStore::open(&config.local_store_path())?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Register {
            email,
            password,
            name,
            role,
        } => {
            db.ensure_initialized()?;
            let session = Auth::new(&db, &mut local).sign_up(&email, &password, &name, role)?;
            let profile = session.profile()?;
            println!("Registered {} <{}> as {}.", profile.display_name, profile.email, profile.role);
        }

        Commands::Login { email, password } => {
            db.ensure_initialized()?;
            let session = Auth::new(&db, &mut local).sign_in(&email, &password)?;
            match &session.profile {
                Some(profile) => println!("Signed in as {} ({}).", profile.display_name, profile.role),
                None => println!("Signed in, but no profile exists for this account."),
            }
        }

        Commands::Logout => {
            Auth::new(&db, &mut local).sign_out()?;
            println!("Signed out.");
        }

        Commands::Whoami => {
            db.ensure_initialized()?;
            match Auth::new(&db, &mut local).current()? {
                Some(Session {
                    profile: Some(profile),
                    ..
                }) => {
                    println!("{} <{}>", profile.display_name, profile.email);
                    println!("Role: {}", profile.role);
                    println!("Member since: {}", format_date(profile.created_at));
                }
                Some(session) => println!("Signed in as {} (no profile record).", session.uid),
                None => println!("Not signed in."),
            }
        }

        Commands::Consent { command } => match command {
            ConsentCommands::Show { name } => {
                if let Some(name) = name {
                    consent::remember_applicant_name(&mut local, &name)?;
                }
                print!("{}", consent::render_document(&local, chrono::Local::now().date_naive()));
                println!(
                    "\nCurrent choice: {}",
                    if consent::is_agreed(&local) { "agreed" } else { "not agreed" }
                );
            }
            ConsentCommands::Agree => {
                consent::record_choice(&mut local, true)?;
                println!("You agreed to the collection and use of personal data.");
            }
            ConsentCommands::Decline => {
                consent::record_choice(&mut local, false)?;
                println!("You declined. Applications cannot be submitted without consent.");
            }
        },

        Commands::Apply { command } => {
            db.ensure_initialized()?;
            let session = require_session(&db, &mut local)?;
            let profile = session.require_applicant()?;
            match command {
                ApplyCommands::Template { output } => {
                    let draft = ApplicationDraft::template(profile);
                    let json = serde_json::to_string_pretty(&draft)?;
                    consent::remember_applicant_name(&mut local, &draft.user_name)?;
                    match output {
                        Some(path) => {
                            std::fs::write(&path, json)
                                .with_context(|| format!("Failed to write {}", path.display()))?;
                            println!("Form template written to {}", path.display());
                        }
                        None => println!("{}", json),
                    }
                }
                ApplyCommands::Submit { form, photo } => {
                    let content = std::fs::read_to_string(&form)
                        .with_context(|| format!("Failed to read form: {}", form.display()))?;
                    let mut draft: ApplicationDraft = serde_json::from_str(&content)
                        .with_context(|| format!("Invalid application form: {}", form.display()))?;
                    if let Some(path) = photo {
                        draft.photo_url = Some(photo::load_photo(
                            &path,
                            config.photo_max_width(),
                            config.photo_quality(),
                        )?);
                    }
                    if !draft.desired_field.is_empty() && !submission::is_known_field(&draft.desired_field) {
                        tracing::warn!(field = %draft.desired_field, "desired field is not one of the listed categories");
                    }
                    let app = submission::submit(&db, &mut local, profile, &draft)?;
                    println!("Application submitted ({}).", app.id);
                }
            }
        }

        Commands::Categories => {
            for (group, options) in JOB_CATEGORIES {
                println!("{}", group);
                for option in *options {
                    println!("  - {}", option);
                }
            }
        }

        Commands::My => {
            db.ensure_initialized()?;
            let session = require_session(&db, &mut local)?;
            let profile = session.profile()?;
            let dash = ApplicantDashboard::load(&db, profile)?;
            let summary = dash.summary();
            println!(
                "Total: {}  Pending: {}  Accepted: {}",
                summary.total, summary.pending, summary.accepted
            );
            if dash.applications().is_empty() {
                println!("\nNo applications yet. Start with 'recruit apply template'.");
            } else {
                for card in dash.cards() {
                    println!("\n{}", card);
                }
            }
        }

        Commands::List { status, search } => {
            db.ensure_initialized()?;
            require_session(&db, &mut local)?.require_admin()?;
            let mut board = ReviewBoard::load(&db)?;
            board.set_status_filter(status);
            if let Some(term) = &search {
                board.set_search(term);
            }
            let apps = board.filtered();
            if apps.is_empty() {
                println!("No applications found.");
            } else {
                print_application_table(&apps);
            }
        }

        Commands::Show { id } => {
            db.ensure_initialized()?;
            let session = require_session(&db, &mut local)?;
            let profile = session.profile()?;
            let app = db
                .get_application(&id)?
                .filter(|app| profile.is_admin() || app.user_id == profile.uid);
            match app {
                Some(app) => print_application(&app),
                None => println!("Application {} not found.", id),
            }
        }

        Commands::Status { id, status } => {
            db.ensure_initialized()?;
            require_session(&db, &mut local)?.require_admin()?;
            let mut board = ReviewBoard::load(&db)?;
            board.update_status(&db, &id, status)?;
            println!("Application {} is now {}.", id, status.display_label());
        }

        Commands::Accept { selection } => {
            db.ensure_initialized()?;
            require_session(&db, &mut local)?.require_admin()?;
            let mut board = ReviewBoard::load(&db)?;
            apply_selection(&mut board, &selection)?;
            let count = board.accept_selected(&db)?;
            println!("Batch complete: {} application(s) accepted.", count);
        }

        Commands::Export { selection, output } => {
            db.ensure_initialized()?;
            require_session(&db, &mut local)?.require_admin()?;
            let mut board = ReviewBoard::load(&db)?;
            apply_selection(&mut board, &selection)?;
            let selected = board.selected_records();
            let dir = std::env::current_dir()?;
            let path = export::write_export(&selected, config.organization(), &dir, output)?;
            println!("Exported {} application(s) to {}", selected.len(), path.display());
        }

        Commands::Stats => {
            db.ensure_initialized()?;
            require_session(&db, &mut local)?.require_admin()?;
            let stats = ReviewBoard::load(&db)?.stats();
            println!("{:<10} {:>6}", "STATUS", "COUNT");
            println!("{}", "-".repeat(17));
            println!("{:<10} {:>6}", "total", stats.total);
            println!("{:<10} {:>6}", "pending", stats.pending);
            println!("{:<10} {:>6}", "reviewed", stats.reviewed);
            println!("{:<10} {:>6}", "accepted", stats.accepted);
            println!("{:<10} {:>6}", "rejected", stats.rejected);
        }

        Commands::Users => {
            db.ensure_initialized()?;
            require_session(&db, &mut local)?.require_admin()?;
            let board = ReviewBoard::load(&db)?;
            if board.users().is_empty() {
                println!("No users found.");
            } else {
                println!("{:<20} {:<30} {:<6} {:<10}", "NAME", "EMAIL", "ROLE", "JOINED");
                println!("{}", "-".repeat(69));
                for user in board.users() {
                    println!(
                        "{:<20} {:<30} {:<6} {:<10}",
                        truncate(&user.display_name, 18),
                        truncate(&user.email, 28),
                        user.role.as_str(),
                        format_date(user.created_at)
                    );
                }
            }
        }

        Commands::Review => {
            db.ensure_initialized()?;
            require_session(&db, &mut local)?.require_admin()?;
            tui::run_review(&db, std::env::current_dir()?, config.organization().to_string())?;
        }

        Commands::Lessons { command } => {
            db.ensure_initialized()?;
            let session = require_session(&db, &mut local)?;
            let storage = ObjectStore::open(&config.storage_dir())?;
            let mut board = LessonBoard::load(&db)?;
            match command {
                LessonCommands::List => {
                    if board.lessons().is_empty() {
                        println!("No lessons yet.");
                    }
                    for lesson in board.lessons() {
                        println!("[{}] {}", format_date(lesson.created_at), lesson.title);
                        println!("  id: {}  instructor: {}", lesson.id, lesson.instructor);
                        for line in textwrap::fill(&lesson.content, 76).lines() {
                            println!("  {}", line);
                        }
                        if let Some(url) = &lesson.file_url {
                            println!("  attachment: {}", url);
                        }
                        println!();
                    }
                }
                LessonCommands::Add { title, content, file } => {
                    let attachment = file.as_deref().map(Attachment::from_path).transpose()?;
                    let lesson = board.create(&db, &storage, &session, &title, &content, attachment)?;
                    println!("Lesson added ({}).", lesson.id);
                }
                LessonCommands::Fetch { id, output } => {
                    let lesson = board
                        .lessons()
                        .iter()
                        .find(|l| l.id == id)
                        .ok_or_else(|| RecruitError::NotFound {
                            kind: "Lesson",
                            id: id.clone(),
                        })?;
                    let url = lesson
                        .file_url
                        .as_deref()
                        .ok_or_else(|| anyhow!("Lesson {} has no attachment", id))?;
                    let bytes = storage.download(url)?;
                    let path = output.unwrap_or_else(|| {
                        let name = url.rsplit('/').next().unwrap_or("attachment");
                        let name = name.split_once('_').map(|(_, rest)| rest).unwrap_or(name);
                        PathBuf::from(name)
                    });
                    std::fs::write(&path, &bytes)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Saved {} bytes to {}", bytes.len(), path.display());
                }
            }
        }
    }

    Ok(())
}
