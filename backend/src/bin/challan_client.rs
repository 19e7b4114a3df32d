//! Command-line client for the challan gateway
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Not signed in or session expired

use anyhow::Context;
use challan_gateway::api::auth::ProfileUpdateRequest;
use challan_gateway::chart;
use challan_gateway::client::{ApiClient, ClientError, StoredSession};
use challan_gateway::query::{QueryRequest, QueryResponse};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "challan_client", version, about = "Query traffic challan data from the terminal")]
struct Cli {
    /// Gateway base URL
    #[arg(long, env = "CHALLAN_API_URL", default_value = "http://localhost:8000")]
    server: String,

    /// File holding the session token
    #[arg(long, env = "CHALLAN_TOKEN_FILE", default_value = ".challan-token")]
    token_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mail a one-time code
    RequestOtp { email: String },
    /// Sign in with a one-time code
    VerifyOtp { email: String, otp: String },
    /// Sign in with an MPIN
    LoginMpin { email: String, mpin: String },
    /// Show the signed-in profile
    Profile,
    /// Change profile fields
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        designation: Option<String>,
    },
    /// Generate a new MPIN and mail it
    SetMpin,
    /// Upload a CSV or Excel file
    Upload { path: PathBuf },
    /// List uploaded files
    Files,
    /// Delete an uploaded file
    DeleteFile { file_id: String },
    /// Ask a question about uploaded data
    Query {
        question: String,
        /// text, graph or table
        #[arg(long, default_value = "text")]
        mode: String,
        /// Table to query instead of the latest upload
        #[arg(long)]
        table: Option<String>,
        #[arg(long)]
        top_k: Option<i64>,
        /// Write the chart of a graph query to this SVG file
        #[arg(long)]
        svg: Option<PathBuf>,
    },
    /// Forget the stored session
    Logout,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .try_init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            if matches!(e.downcast_ref::<ClientError>(), Some(ClientError::Unauthorized)) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let session = load_session(&cli.token_file)?;
    let mut client = ApiClient::new(&cli.server)?;
    if let Some(session) = &session {
        client = client.with_token(session.token.clone());
    }

    let result = execute(&mut client, &cli).await;

    // A rejected token is cleared by the client; keep the file in step
    if session.is_some() && client.token().is_none() {
        remove_session(&cli.token_file)?;
    }
    result
}

async fn execute(client: &mut ApiClient, cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::RequestOtp { email } => {
            println!("✓ {}", client.request_otp(email).await?);
        }
        Commands::VerifyOtp { email, otp } => {
            let login = client.verify_otp(email, otp).await?;
            save_session(&cli.token_file, &login.token, Some(email))?;
            println!("✓ Signed in as {}", login.email.as_deref().unwrap_or(email));
        }
        Commands::LoginMpin { email, mpin } => {
            let login = client.login_mpin(email, mpin).await?;
            save_session(&cli.token_file, &login.token, Some(email))?;
            println!("✓ Signed in as {}", login.email.as_deref().unwrap_or(email));
        }
        Commands::Profile => {
            let profile = client.profile().await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::UpdateProfile {
            name,
            department,
            designation,
        } => {
            let update = ProfileUpdateRequest {
                name: name.clone(),
                department: department.clone(),
                designation: designation.clone(),
            };
            let updated = client.update_profile(&update).await?;
            println!("✓ Profile updated");
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        Commands::SetMpin => {
            println!("✓ {}", client.set_mpin().await?);
        }
        Commands::Upload { path } => {
            let content = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload.csv");
            let reply = client.upload(filename, content).await?;
            println!("✓ {}", reply.message);
            println!("  table:   {}", reply.data.table_name);
            println!("  columns: {}", reply.data.columns.join(", "));
        }
        Commands::Files => {
            let listing = client.list_files().await?;
            if listing.files.is_empty() {
                println!("No files uploaded yet");
            }
            for file in listing.files {
                println!(
                    "{}  {}  {} rows  {}  ({})",
                    file.id, file.filename, file.row_count, file.table_name, file.created_at
                );
            }
        }
        Commands::DeleteFile { file_id } => {
            let reply = client.delete_file(file_id).await?;
            println!("✓ {}", reply.message);
            if !reply.data.table_dropped {
                println!("  (the data table could not be dropped)");
            }
        }
        Commands::Query {
            question,
            mode,
            table,
            top_k,
            svg,
        } => {
            let request = QueryRequest {
                query: question.clone(),
                top_k: *top_k,
                mode: Some(mode.clone()),
                table_name: table.clone(),
            };
            let response = client.query(&request).await?;
            print_query(&response);
            if let Some(path) = svg {
                write_chart(&response, path).await?;
            }
        }
        Commands::Logout => {
            remove_session(&cli.token_file)?;
            client.clear_token();
            println!("✓ Signed out");
        }
    }
    Ok(())
}

fn print_query(response: &QueryResponse) {
    println!("{}\n", response.answer);
    if let Some(table) = &response.table_data {
        println!("{}", table.headers.join(" | "));
        for row in &table.rows {
            println!("{}", row.join(" | "));
        }
        println!();
    }
    println!("SQL:   {}", response.sql_query);
    println!("Table: {}", response.table_name);
}

async fn write_chart(response: &QueryResponse, path: &Path) -> anyhow::Result<()> {
    let Some(data) = &response.visualization_data else {
        println!("No chart for this query (use --mode graph)");
        return Ok(());
    };
    tokio::fs::write(path, chart::render_svg(data))
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✓ {} written to {}", data.chart_type(), path.display());
    Ok(())
}

fn load_session(path: &Path) -> anyhow::Result<Option<StoredSession>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str(&raw) {
        Ok(session) => Ok(Some(session)),
        Err(e) => {
            tracing::warn!("Ignoring unreadable token file {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

fn save_session(path: &Path, token: &str, email: Option<&str>) -> anyhow::Result<()> {
    let session = StoredSession {
        token: token.to_string(),
        email: email.map(str::to_string),
    };
    std::fs::write(path, serde_json::to_string_pretty(&session)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn remove_session(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}
