use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

// `#[zbus::proxy]` generates `RollcallProxy` (async) for the daemon interface.
#[zbus::proxy(
    interface = "org.rollcall.Rollcall1",
    default_service = "org.rollcall.Rollcall1",
    default_path = "/org/rollcall/Rollcall1"
)]
trait Rollcall {
    async fn status(&self) -> zbus::Result<String>;
    async fn list_identities(&self) -> zbus::Result<String>;
    async fn delete_identity(&self, id: &str) -> zbus::Result<String>;
    async fn enroll(&self, body: &str, image: Vec<u8>) -> zbus::Result<String>;
    async fn attend(&self, image: Vec<u8>) -> zbus::Result<String>;
    async fn attend_demo(&self, identity_id: &str) -> zbus::Result<String>;
    async fn list_attendance(&self, identity_id: &str, date: &str, limit: u32)
        -> zbus::Result<String>;
    async fn daily_summaries(&self, identity_id: &str, date: &str) -> zbus::Result<String>;
    async fn reset_demo_data(&self) -> zbus::Result<String>;
    async fn clear_all(&self) -> zbus::Result<String>;
}

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall face attendance CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon status
    Status,
    /// List enrolled identities
    Identities,
    /// Remove an identity
    Remove {
        /// Identity ID to remove
        id: String,
    },
    /// Enroll a new identity from a face image
    Enroll {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        department: String,
        /// Image file to capture the reference face from
        #[arg(long)]
        image: PathBuf,
    },
    /// Check in or out by face
    Attend {
        /// Image file to capture from
        #[arg(long, conflicts_with = "demo", required_unless_present = "demo")]
        image: Option<PathBuf>,
        /// Simulate a capture of an enrolled identity (e.g. "emp_001")
        #[arg(long)]
        demo: Option<String>,
    },
    /// List attendance records, newest first
    History {
        #[arg(long)]
        employee: Option<String>,
        /// Date or date prefix, e.g. "2024-03-01"
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Daily check-in, check-out and hours worked
    Summary {
        #[arg(long)]
        employee: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Replace all data with the demo dataset
    Reset,
    /// Delete every identity and attendance record
    Clear,
}

/// Pretty-print the body of a daemon response. Error statuses become errors.
fn render(response: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(response).context("daemon returned invalid JSON")?;
    let status = value["status"].as_u64().unwrap_or(500);
    let body = value["body"].clone();
    if status >= 400 {
        let error = body["error"].as_str().unwrap_or("request failed");
        bail!("{error} (status {status})");
    }
    Ok(body)
}

fn read_image(path: &PathBuf) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading image {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let conn = zbus::Connection::session()
        .await
        .context("connecting to the session bus")?;
    let proxy = RollcallProxy::new(&conn)
        .await
        .context("rollcalld is not reachable")?;

    let response = match cli.command {
        Commands::Status => proxy.status().await?,
        Commands::Identities => proxy.list_identities().await?,
        Commands::Remove { id } => proxy.delete_identity(&id).await?,
        Commands::Enroll {
            name,
            email,
            department,
            image,
        } => {
            let body = json!({ "name": name, "email": email, "department": department });
            println!("Capturing face...");
            proxy.enroll(&body.to_string(), read_image(&image)?).await?
        }
        Commands::Attend { image, demo } => match (image, demo) {
            (_, Some(id)) => proxy.attend_demo(&id).await?,
            (Some(path), None) => {
                println!("Capturing face...");
                proxy.attend(read_image(&path)?).await?
            }
            (None, None) => bail!("either --image or --demo is required"),
        },
        Commands::History {
            employee,
            date,
            limit,
        } => {
            proxy
                .list_attendance(
                    employee.as_deref().unwrap_or(""),
                    date.as_deref().unwrap_or(""),
                    limit,
                )
                .await?
        }
        Commands::Summary { employee, date } => {
            proxy
                .daily_summaries(employee.as_deref().unwrap_or(""), date.as_deref().unwrap_or(""))
                .await?
        }
        Commands::Reset => proxy.reset_demo_data().await?,
        Commands::Clear => proxy.clear_all().await?,
    };

    let body = render(&response)?;
    tracing::debug!(%body, "response");
    if let Some(message) = body["message"].as_str() {
        println!("{message}");
    }
    if let Some(data) = body.get("data").filter(|d| !d.is_null()) {
        println!("{}", serde_json::to_string_pretty(data)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_success() {
        let body = render(r#"{"status":200,"body":{"success":true,"data":[1,2]}}"#).unwrap();
        assert_eq!(body["data"], json!([1, 2]));
    }

    #[test]
    fn test_render_error_status() {
        let err = render(r#"{"status":404,"body":{"success":false,"error":"Employee not found"}}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "Employee not found (status 404)");
    }

    #[test]
    fn test_render_invalid_json() {
        assert!(render("not json").is_err());
    }

    #[test]
    fn test_attend_requires_a_source() {
        assert!(Cli::try_parse_from(["rollcall", "attend"]).is_err());
        assert!(Cli::try_parse_from(["rollcall", "attend", "--demo", "emp_001"]).is_ok());
        assert!(
            Cli::try_parse_from(["rollcall", "attend", "--demo", "a", "--image", "x.jpg"]).is_err()
        );
    }
}
