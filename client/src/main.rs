use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use client::admin::{AdminQueryService, EXPORT_FILE_NAME, FilterCriteria, Paging};
use client::api::{ApiClient, LoginRequest, RegisterRequest};
use client::attendance::AttendanceSubmitter;
use client::auth::guards;
use client::auth::session::SessionStore;
use client::capture::camera::CommandCamera;
use client::capture::location::ConfiguredLocationSource;
use client::models::{AttendanceRecord, RecordsPage, Role};
use common::Config;
use common::logger::init_logger;
use validator::Validate;

#[derive(Parser, Debug)]
#[command(name = "presence", version, about = "Attendance verification client")]
struct Cli {
    /// Environment file to load settings from
    #[arg(long, default_value = ".env")]
    env_file: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and persist the session
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Clear the persisted session
    Logout,
    /// Show the signed-in profile as reported by the server
    Me,
    /// Create a user with an optional face template (development helper)
    Register {
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum, default_value_t = Role::Student)]
        role: Role,
        #[arg(long)]
        company_id: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
        /// Image file to enroll as the face template
        #[arg(long)]
        face: Option<PathBuf>,
    },
    /// Capture a frame and a location fix and submit them
    Submit {
        /// History rows to print after the attempt
        #[arg(long, default_value_t = 10)]
        recent: usize,
    },
    /// Print your attendance history
    History,
    /// Query attendance records (admins)
    Records {
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        student: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Download filtered records as a spreadsheet (admins)
    Export {
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        student: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value = EXPORT_FILE_NAME)]
        out: PathBuf,
    },
}

const ADMIN_ROLES: &[Role] = &[Role::CompanyAdmin, Role::FacultyAdmin];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::init(&cli.env_file);
    init_logger(&config.log_level, &config.log_file);

    let store = Arc::new(SessionStore::load(config.session_file.clone()));
    let api = ApiClient::new(config.api_base_url.clone(), store.clone());

    match cli.command {
        Commands::Login { username, password } => run_login(&api, &store, username, password).await,
        Commands::Logout => {
            store.logout()?;
            println!("Signed out");
            Ok(())
        }
        Commands::Me => run_me(&api, &store).await,
        Commands::Register {
            username,
            password,
            role,
            company_id,
            full_name,
            face,
        } => {
            let req = RegisterRequest {
                username,
                password,
                role,
                company_id,
                full_name,
            };
            run_register(&api, req, face).await
        }
        Commands::Submit { recent } => run_submit(&api, &store, config, recent).await,
        Commands::History => run_history(&api, &store).await,
        Commands::Records {
            company,
            student,
            start,
            end,
            page,
            limit,
        } => {
            let criteria = criteria_from_args(company, student, start, end);
            let paging = Paging { page, limit };
            run_records(&api, &store, criteria, paging).await
        }
        Commands::Export {
            company,
            student,
            start,
            end,
            out,
        } => {
            let criteria = criteria_from_args(company, student, start, end);
            run_export(&api, &store, criteria, out).await
        }
    }
}

fn criteria_from_args(
    company: Option<String>,
    student: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> FilterCriteria {
    FilterCriteria {
        company,
        student,
        start,
        end,
    }
}

async fn run_login(
    api: &ApiClient,
    store: &SessionStore,
    username: String,
    password: String,
) -> anyhow::Result<()> {
    let req = LoginRequest { username, password };
    if let Err(errors) = req.validate() {
        bail!(common::format_validation_errors(&errors));
    }
    let resp = api.login(&req).await?;
    store.login(resp.access_token, resp.user.clone())?;
    println!("Signed in as {} ({})", resp.user.username, resp.user.role);
    Ok(())
}

async fn run_me(api: &ApiClient, store: &SessionStore) -> anyhow::Result<()> {
    guards::require_authenticated(store)?;
    let user = api.me().await?;
    println!("Username:  {}", user.username);
    println!("Role:      {}", user.role);
    if let Some(company_id) = &user.company_id {
        println!("Company:   {company_id}");
    }
    if let Some(full_name) = &user.full_name {
        println!("Full name: {full_name}");
    }
    println!(
        "Face:      {}",
        if user.has_face_encoding {
            "registered"
        } else {
            "not registered"
        }
    );
    Ok(())
}

async fn run_register(
    api: &ApiClient,
    req: RegisterRequest,
    face: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Err(errors) = req.validate() {
        bail!(common::format_validation_errors(&errors));
    }
    let face = match face {
        Some(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("could not read face image {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "face.jpg".into());
            Some((filename, bytes))
        }
        None => None,
    };
    let user = api.register(&req, face).await?;
    println!("Registered {} ({})", user.username, user.role);
    Ok(())
}

async fn run_submit(
    api: &ApiClient,
    store: &SessionStore,
    config: &Config,
    recent: usize,
) -> anyhow::Result<()> {
    guards::require(store, &[Role::Student])?;

    let camera_command = config
        .camera_command
        .clone()
        .context("CAMERA_COMMAND is not configured")?;
    let location = ConfiguredLocationSource::from_settings(
        config.location_command.clone(),
        config.fixed_lat,
        config.fixed_lon,
    )
    .context("no location source configured: set LOCATION_COMMAND or FIXED_LAT/FIXED_LON")?;

    let submitter = AttendanceSubmitter::new(api.clone(), location, CommandCamera::new(camera_command));
    submitter.start_camera().await?;
    let result = submitter.submit().await;
    submitter.release_camera().await;

    match result {
        Ok(outcome) => {
            println!("{outcome}");
            print_history(&submitter.history(), recent);
            Ok(())
        }
        Err(e) => {
            print_history(&submitter.history(), recent);
            Err(e.into())
        }
    }
}

async fn run_history(api: &ApiClient, store: &SessionStore) -> anyhow::Result<()> {
    guards::require(store, &[Role::Student])?;
    let records = api.my_records().await?;
    if records.is_empty() {
        println!("No attendance recorded yet");
    } else {
        print_history(&records, records.len());
    }
    Ok(())
}

async fn run_records(
    api: &ApiClient,
    store: &SessionStore,
    criteria: FilterCriteria,
    paging: Paging,
) -> anyhow::Result<()> {
    guards::require(store, ADMIN_ROLES)?;
    let page = AdminQueryService::new(api.clone())
        .query(&criteria, &paging)
        .await?;
    print_records_page(&page);
    Ok(())
}

async fn run_export(
    api: &ApiClient,
    store: &SessionStore,
    criteria: FilterCriteria,
    out: PathBuf,
) -> anyhow::Result<()> {
    guards::require(store, ADMIN_ROLES)?;
    AdminQueryService::new(api.clone())
        .save_export(&criteria, &out)
        .await?;
    println!("Saved {}", out.display());
    Ok(())
}

fn print_history(records: &[AttendanceRecord], limit: usize) {
    if records.is_empty() {
        return;
    }
    println!("{:<20} {:<10} {:>10} {:>10}", "Time", "Status", "Lat", "Lon");
    for record in records.iter().take(limit) {
        println!(
            "{:<20} {:<10} {:>10.5} {:>10.5}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.status,
            record.location.lat,
            record.location.lon
        );
    }
}

fn print_records_page(page: &RecordsPage) {
    println!(
        "{:<20} {:<12} {:<20} {:>10} {:>10} {:<10}",
        "Timestamp", "Company", "Student", "Lat", "Lon", "Status"
    );
    for record in &page.data {
        println!(
            "{:<20} {:<12} {:<20} {:>10.5} {:>10.5} {:<10}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.company_id.as_deref().unwrap_or("-"),
            record.student_identity().unwrap_or("-"),
            record.location.lat,
            record.location.lon,
            record.status
        );
    }
    // always the server's count: a page may hold fewer rows than match
    println!("Total: {}", page.total);
}
