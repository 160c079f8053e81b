use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use garagedesk_core::models::{JobStatus, Registration};
use garagedesk_core::{Config, JobBoard, SessionManager, ShopApi};

use crate::output;
use crate::Command;

/// Maximum accepted username length
const MAX_USERNAME_LENGTH: usize = 150;

pub(crate) async fn run(command: Command, config: &mut Config, session: &SessionManager, shop: &ShopApi) -> Result<()> {
    debug!(?command, "Running command");
    match command {
        Command::Login { username } => login(config, session, username).await,
        Command::Logout => {
            session.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami => {
            require_login(session)?;
            let me = session.me().await?;
            println!("{} ({})", me.display_name(), me.email.as_deref().unwrap_or("no email"));
            Ok(())
        }
        Command::Register { username, email } => register(session, username, email).await,
        Command::Passwd => change_password(session).await,
        Command::Refresh => {
            require_login(session)?;
            session.ensure_fresh().await?;
            println!("Access token refreshed.");
            Ok(())
        }
        Command::Clients => {
            require_login(session)?;
            output::print_customers(&shop.customers().list_all().await?);
            Ok(())
        }
        Command::Vehicles { client } => {
            require_login(session)?;
            let vehicles = match client {
                Some(id) => shop.vehicles_for(id).await?,
                None => shop.vehicles().list_all().await?,
            };
            output::print_vehicles(&vehicles);
            Ok(())
        }
        Command::Employees => {
            require_login(session)?;
            output::print_employees(&shop.employees().list_all().await?);
            Ok(())
        }
        Command::Inventory { low } => {
            require_login(session)?;
            let mut items = shop.inventory().list_all().await?;
            if low {
                items.retain(|item| item.needs_reorder());
            }
            output::print_inventory(&items);
            Ok(())
        }
        Command::Appointments { upcoming } => {
            require_login(session)?;
            let mut appointments = shop.appointments().list_all().await?;
            if upcoming {
                let now = Utc::now();
                appointments.retain(|appt| appt.is_upcoming(now));
            }
            appointments.sort_by_key(|appt| appt.scheduled_for);
            output::print_appointments(&appointments);
            Ok(())
        }
        Command::Jobs => {
            require_login(session)?;
            let board = JobBoard::from_cards(shop.job_cards().list_all().await?);
            output::print_board(&board);
            Ok(())
        }
        Command::Move { id, status, index } => {
            require_login(session)?;
            let to = status.parse::<JobStatus>().map_err(anyhow::Error::msg)?;
            let mut board = JobBoard::from_cards(shop.job_cards().list_all().await?);
            let applied = board
                .move_and_save(shop, id, to, index.unwrap_or(usize::MAX))
                .await?;
            info!(id, from = applied.from.as_str(), to = applied.to.as_str(), "Job card moved");
            println!("Job #{} moved to {} (position {}).", id, applied.to, applied.to_index + 1);
            Ok(())
        }
        Command::Summary => {
            require_login(session)?;
            summary(shop).await
        }
    }
}

fn require_login(session: &SessionManager) -> Result<()> {
    if !session.is_authenticated() {
        bail!("Not logged in. Run `garagedesk login` first.");
    }
    Ok(())
}

async fn login(config: &mut Config, session: &SessionManager, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(name) => name,
        None => prompt_username(config.last_username.as_deref())?,
    };
    if !is_valid_username(&username) {
        bail!("Invalid username");
    }

    let password = rpassword::prompt_password("Password: ")?;
    session.login(&username, &password).await?;

    config.last_username = Some(username.clone());
    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "Failed to save config");
    }
    println!("Logged in as {}.", username);
    Ok(())
}

async fn register(session: &SessionManager, username: String, email: String) -> Result<()> {
    if !is_valid_username(&username) {
        bail!("Invalid username");
    }
    let password = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }

    let user = session
        .register(&Registration {
            username,
            email,
            password,
            re_password: Some(confirm),
        })
        .await?;
    println!("Created account {}. You can now log in.", user.username);
    Ok(())
}

async fn change_password(session: &SessionManager) -> Result<()> {
    require_login(session)?;
    let current = rpassword::prompt_password("Current password: ")?;
    let new = rpassword::prompt_password("New password: ")?;
    let confirm = rpassword::prompt_password("Confirm new password: ")?;
    if new != confirm {
        bail!("Passwords do not match");
    }
    session.set_password(&current, &new).await?;
    println!("Password changed.");
    Ok(())
}

/// Fire the collection requests at once. If the access token has expired
/// they all share one refresh.
async fn summary(shop: &ShopApi) -> Result<()> {
    let customers = shop.customers();
    let vehicles = shop.vehicles();
    let jobs = shop.job_cards();
    let inventory = shop.inventory();

    let (customers, vehicles, jobs, inventory) = futures::try_join!(
        customers.list_all(),
        vehicles.list_all(),
        jobs.list_all(),
        inventory.list_all(),
    )?;

    let board = JobBoard::from_cards(jobs);
    output::print_summary(customers.len(), vehicles.len(), &board, &inventory);
    Ok(())
}

fn prompt_username(default: Option<&str>) -> Result<String> {
    match default {
        Some(name) => print!("Username [{}]: ", name),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read username")?;
    let entered = line.trim();

    match (entered.is_empty(), default) {
        (true, Some(name)) => Ok(name.to_string()),
        (true, None) => bail!("A username is required"),
        (false, _) => Ok(entered.to_string()),
    }
}

fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= MAX_USERNAME_LENGTH
        && !username.chars().any(char::is_control)
}
