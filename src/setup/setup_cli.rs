use blogmotor::config::Config;
use blogmotor::models::db_operations::{settings_db_operations, users_db_operations};
use blogmotor::models::{ROLE_ADMIN, ROLE_AUTHOR};
use blogmotor::setup::db_setup;
use clap::{Parser, Subcommand};
use redb::Database;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "Creates the BlogMotor databases and manages user accounts.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Creates `site`, `posts`, or both when no type is given.
    Setup {
        db_type: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum UserAction {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = ROLE_ADMIN)]
        role: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        username: String,
        #[arg(long)]
        new_password: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup { db_type } => match db_type.as_deref() {
                Some("site") => setup_site_database(&config),
                Some("posts") => setup_posts_database(&config),
                Some(other) => eprintln!("❌ Error: Unknown database type '{}'. Use 'site' or 'posts'.", other),
                None => {
                    setup_site_database(&config);
                    setup_posts_database(&config);
                }
            },
        },
        Commands::User { action } => match action {
            UserAction::Create { username, password, role } => create_user(&config, username, password, role),
            UserAction::List => list_users(&config),
            UserAction::ChangePassword { username, new_password } => {
                change_password(&config, username, new_password)
            }
        },
    }
}

fn open_site_db(config: &Config) -> Option<Connection> {
    let db_path = config.site_db_path();
    if !db_path.exists() {
        eprintln!("❌ Error: Site database not found at '{}'. Please run `setup_cli db setup` first.", db_path.display());
        return None;
    }
    match Connection::open(&db_path) {
        Ok(conn) => Some(conn),
        Err(e) => {
            eprintln!("❌ Error opening site database: {}", e);
            None
        }
    }
}

fn setup_site_database(config: &Config) {
    let db_path = config.site_db_path();
    println!("\nSetting up site database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let mut conn = Connection::open(&db_path).expect("Could not create site database file.");
    if let Err(e) = db_setup::setup_site_db(&mut conn) {
        eprintln!("❌ Error setting up site database: {}", e);
        return;
    }
    // Seeds the settings row so the first page view does not have to.
    match settings_db_operations::get_or_create_settings(&conn) {
        Ok(settings) => println!("✅ Site database ready. Blog title: '{}'.", settings.blog_title),
        Err(e) => eprintln!("❌ Error creating default blog settings: {}", e),
    }
}

fn setup_posts_database(config: &Config) {
    let db_path = config.posts_db_path();
    if db_path.exists() {
        println!("ℹ️ Posts database already exists at '{}'. Skipping creation.", db_path.display());
        return;
    }
    println!("\nSetting up posts database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let db = Database::create(&db_path).expect("Failed to create posts database file.");
    match db_setup::setup_posts_db(&db) {
        Ok(_) => println!("✅ Posts database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up posts database: {}", e),
    }
}

fn create_user(config: &Config, username: &str, password: &str, role: &str) {
    if role != ROLE_ADMIN && role != ROLE_AUTHOR {
        eprintln!("❌ Error: Unknown role '{}'. Use '{}' or '{}'.", role, ROLE_ADMIN, ROLE_AUTHOR);
        return;
    }
    let Some(conn) = open_site_db(config) else { return };

    match users_db_operations::create_user(&conn, username, password, role) {
        Ok(_) => println!("✅ User '{}' created with role '{}'.", username, role),
        Err(e) => eprintln!("❌ Error creating user: {}. It might be because the username already exists.", e),
    }
}

fn list_users(config: &Config) {
    let Some(conn) = open_site_db(config) else { return };

    match users_db_operations::read_all_users(&conn) {
        Ok(users) => {
            println!("Listing Users:");
            for user in users {
                let status = if user.is_active { "active" } else { "suspended" };
                println!(
                    "- {} ({}, {}, last login: {})",
                    user.username,
                    user.role,
                    status,
                    user.last_login_time.as_deref().unwrap_or("never")
                );
            }
        }
        Err(e) => eprintln!("❌ Error fetching users: {}", e),
    }
}

fn change_password(config: &Config, username: &str, new_password: &str) {
    let Some(conn) = open_site_db(config) else { return };

    match users_db_operations::change_password(&conn, username, new_password) {
        Ok(0) => eprintln!("❌ Error: No user named '{}' found.", username),
        Ok(_) => println!("✅ Password for '{}' changed successfully.", username),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}
