//! CLI tool to create a user directly in the database.
//!
//! Usage:
//!   cargo run --bin create-user -- --username alice --email alice@example.com --password s3cret --admin

use std::env;

use detection_gateway_lib::config::Config;
use detection_gateway_lib::db::DbPool;
use detection_gateway_lib::models::CreateUserRequest;
use detection_gateway_lib::services::users;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let mut username: Option<String> = None;
    let mut email: Option<String> = None;
    let mut password: Option<String> = None;
    let mut is_admin = false;
    let mut is_active = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--username" | "-u" => {
                i += 1;
                if i < args.len() {
                    username = Some(args[i].clone());
                }
            }
            "--email" | "-e" => {
                i += 1;
                if i < args.len() {
                    email = Some(args[i].clone());
                }
            }
            "--password" | "-p" => {
                i += 1;
                if i < args.len() {
                    password = Some(args[i].clone());
                }
            }
            "--admin" => is_admin = true,
            "--inactive" => is_active = false,
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    // Fall back to the environment so the password stays out of shell history
    let password = password.or_else(|| env::var("GATEWAY_NEW_USER_PASSWORD").ok());

    let request = CreateUserRequest {
        username,
        email,
        password,
        is_active: Some(is_active),
        is_admin: Some(is_admin),
    };

    let new_user = match users::validate_new_user(request, true) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    // Load config and initialize database
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::new(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };

    // Run migrations
    if let Err(e) = pool.run_migrations().await {
        eprintln!("Error running migrations: {}", e);
        std::process::exit(1);
    }

    let user = match users::create_user(&pool, new_user, config.auth.bcrypt_cost).await {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Error creating user: {}", e);
            std::process::exit(1);
        }
    };

    // Output
    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("  User Created");
    println!("════════════════════════════════════════════════════════════════");
    println!();
    println!("  ID:       {}", user.id);
    println!("  Username: {}", user.username);
    println!("  Email:    {}", user.email);
    println!("  Admin:    {}", user.is_admin);
    println!("  Active:   {}", user.is_active);
    println!();
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: create-user --username <NAME> --email <EMAIL> [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -u, --username <NAME>      Login name (required)");
    eprintln!("  -e, --email <EMAIL>        Email address (required)");
    eprintln!("  -p, --password <PASSWORD>  Password (or set GATEWAY_NEW_USER_PASSWORD)");
    eprintln!("      --admin                Grant the admin role");
    eprintln!("      --inactive             Create the account disabled");
    eprintln!("  -h, --help                 Show this help");
    eprintln!();
}
