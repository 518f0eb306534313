//! services/client/src/bin/client.rs

use bytes::Bytes;
use clap::{Parser, Subcommand};
use client_lib::{
    adapters::DownloadDir,
    api::PriceApi,
    config::Config,
    error::{ClientError, ClientResult},
    feedback::StatusMessage,
    forms::{GrantForm, LoginForm, RegisterForm, DEFAULT_GRANT_MINUTES},
    report::{render_analysis_report, render_company_history, render_profile_history, render_upload_stats},
};
use price_analysis_core::analysis::group_by_supplier;
use price_analysis_core::domain::Download;
use price_analysis_core::history::group_requests_by_company;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Best supplier price analysis client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with phone number and password.
    Login {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
    },
    /// Create a company account and sign in.
    Register {
        #[arg(long)]
        tax_id: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    Logout,
    /// Show the current session.
    Whoami,
    /// Download the request template (or the supplier price list template).
    Template {
        #[arg(long)]
        supplier: bool,
    },
    /// Analyze a filled-in request sheet.
    Analyze {
        file: PathBuf,
        /// Save the results as a spreadsheet.
        #[arg(long)]
        export: bool,
        /// Save a results sheet and an invoice for every supplier.
        #[arg(long)]
        per_supplier: bool,
    },
    /// Upload a supplier price list (administrators only).
    UploadSuppliers { file: PathBuf },
    /// List your past requests.
    History {
        /// Export the request with this id as a spreadsheet.
        #[arg(long)]
        export: Option<i64>,
    },
    /// List uploads of all companies (administrators only).
    AdminHistory {
        /// Export every listed upload as a spreadsheet.
        #[arg(long)]
        export: bool,
    },
    /// Check whether the subscription is still active.
    Subscription,
    /// Extend a user's subscription.
    Grant {
        #[arg(long)]
        email: String,
        #[arg(long, default_value_t = DEFAULT_GRANT_MINUTES)]
        minutes: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", StatusMessage::from(&ClientError::from(e)));
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!(api_url = %config.api_url, "Configuration loaded");

    // --- 2. Restore the Session & Run the Command ---
    let outcome = match PriceApi::connect(&config).await {
        Ok(api) => {
            let downloads = DownloadDir::new(&config.download_dir);
            run(cli.command, &api, &downloads).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(status) => {
            println!("{}", status);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", StatusMessage::from(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, api: &PriceApi, downloads: &DownloadDir) -> ClientResult<StatusMessage> {
    match command {
        Command::Login { phone, password } => {
            let session = api.login(&LoginForm { phone, password }).await?;
            Ok(StatusMessage::success(format!("Signed in as {:?}", session.role)))
        }
        Command::Register {
            tax_id,
            full_name,
            phone,
            password,
            confirm_password,
            email,
            address,
        } => {
            let form = RegisterForm {
                tax_id,
                full_name,
                email,
                address,
                phone,
                password,
                confirm_password,
            };
            api.register(&form).await?;
            Ok(StatusMessage::success("Registration complete, you are signed in"))
        }
        Command::Logout => {
            api.logout().await?;
            Ok(StatusMessage::success("Signed out"))
        }
        Command::Whoami => Ok(match api.session().await {
            Some(session) => StatusMessage::success(format!(
                "Signed in as {:?}{}, token valid until {}",
                session.role,
                session.email.map(|email| format!(" ({})", email)).unwrap_or_default(),
                session.access_token_expires_at.format("%Y-%m-%d %H:%M UTC")
            )),
            None => StatusMessage::success("Not signed in"),
        }),
        Command::Template { supplier } => {
            let download = if supplier {
                api.download_supplier_template().await?
            } else {
                api.download_template().await?
            };
            let path = save(downloads, &download).await?;
            Ok(StatusMessage::success(format!("Template saved to {}", path.display())))
        }
        Command::Analyze {
            file,
            export,
            per_supplier,
        } => {
            let (file_name, bytes) = read_upload(&file).await?;
            let results = api.analyze_prices(&file_name, bytes).await?;
            print!("{}", render_analysis_report(&results));

            if export {
                save(downloads, &api.export_analysis(&results).await?).await?;
            }
            if per_supplier {
                save(downloads, &api.export_results(&results).await?).await?;
                for group in group_by_supplier(&results) {
                    save(downloads, &api.export_supplier_results(&group).await?).await?;
                    save(downloads, &api.export_invoice(&group).await?).await?;
                }
            }
            Ok(StatusMessage::success("Price analysis completed"))
        }
        Command::UploadSuppliers { file } => {
            let (file_name, bytes) = read_upload(&file).await?;
            let stats = api.upload_supplier_data(&file_name, bytes).await?;
            print!("{}", render_upload_stats(&stats));
            Ok(if stats.success {
                StatusMessage::success("Supplier data uploaded")
            } else {
                StatusMessage::failure("Supplier data uploaded with errors")
            })
        }
        Command::History { export } => {
            let requests = api.profile_history().await?;
            print!("{}", render_profile_history(&requests));
            if let Some(id) = export {
                let request = requests
                    .iter()
                    .find(|request| request.id == id)
                    .ok_or_else(|| ClientError::Internal(format!("No request with id {}", id)))?;
                let path = save(downloads, &api.export_detailed_analysis(request).await?).await?;
                return Ok(StatusMessage::success(format!("Request saved to {}", path.display())));
            }
            Ok(StatusMessage::success(format!("{} requests", requests.len())))
        }
        Command::AdminHistory { export } => {
            let groups = group_requests_by_company(&api.admin_upload_history().await?);
            print!("{}", render_company_history(&groups));
            if export {
                for request in groups.iter().flat_map(|group| &group.requests) {
                    if let Some(download) = api.export_history(request).await? {
                        save(downloads, &download).await?;
                    }
                }
            }
            Ok(StatusMessage::success(format!("{} companies", groups.len())))
        }
        Command::Subscription => {
            let status = api.check_subscription().await?;
            Ok(if status.is_expired {
                StatusMessage::failure("Subscription has expired")
            } else {
                StatusMessage::success("Subscription is active")
            })
        }
        Command::Grant { email, minutes } => {
            let message = api.grant_subscription(&GrantForm { email, minutes }).await?;
            Ok(StatusMessage::success(
                message.unwrap_or_else(|| "Subscription extended".to_string()),
            ))
        }
    }
}

async fn read_upload(path: &Path) -> ClientResult<(String, Bytes)> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ClientError::Internal(format!("{} is not a file", path.display())))?;
    Ok((file_name, Bytes::from(bytes)))
}

async fn save(downloads: &DownloadDir, download: &Download) -> ClientResult<PathBuf> {
    let path = downloads.save(download).await?;
    println!("Saved {}", path.display());
    Ok(path)
}
