use abroadly_cli::admin::create_admin;
use abroadly_cli::seeder::{self, SeedConfig};
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "abroadly-cli")]
#[command(about = "Abroadly CLI - Administrative tools for the Abroadly API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an administrator account
    CreateAdmin {
        #[arg(short = 'f', long)]
        first_name: Option<String>,

        #[arg(short = 'l', long)]
        last_name: Option<String>,

        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Seed consultants, students, courses, practice tests and CMS pages
    Seed {
        #[arg(long, default_value = "5")]
        consultants: usize,

        #[arg(long, default_value = "50")]
        students: usize,

        #[arg(long, default_value = "20")]
        courses: usize,

        #[arg(long, default_value = "4")]
        tests: usize,

        #[arg(long, default_value = "5")]
        pages: usize,
    },
    /// Remove everything created by `seed` (admins are kept)
    ClearSeed,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();

    let pool = match abroadly_db::init_db_pool().await {
        Ok(pool) => pool,
        Err(e) => fail("Failed to connect to database", e),
    };
    if let Err(e) = abroadly_db::run_migrations(&pool).await {
        fail("Failed to run migrations", e);
    }

    match cli.command {
        Commands::CreateAdmin {
            first_name,
            last_name,
            email,
            password,
        } => handle_create_admin(&pool, first_name, last_name, email, password).await,
        Commands::Seed {
            consultants,
            students,
            courses,
            tests,
            pages,
        } => {
            let config = SeedConfig {
                consultants,
                students,
                courses,
                tests,
                pages,
            };
            if let Err(e) = seeder::seed_all(&pool, config).await {
                fail("Error seeding database", e);
            }
        }
        Commands::ClearSeed => {
            if let Err(e) = seeder::clear_all(&pool).await {
                fail("Error clearing seeded data", e);
            }
        }
    }
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("\n❌ {}: {}", context, err);
    std::process::exit(1);
}

fn prompt(value: Option<String>, label: &str) -> String {
    match value {
        Some(v) => v,
        None => Input::new()
            .with_prompt(label)
            .interact_text()
            .unwrap_or_else(|e| fail(&format!("Failed to read {}", label.to_lowercase()), e)),
    }
}

async fn handle_create_admin(
    pool: &PgPool,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) {
    let first_name = prompt(first_name, "First name");
    let last_name = prompt(last_name, "Last name");
    let email = prompt(email, "Email address");
    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .unwrap_or_else(|e| fail("Failed to read password", e)),
    };

    match create_admin(pool, &first_name, &last_name, &email, &password).await {
        Ok(id) => {
            println!("\n✅ Admin created successfully!");
            println!("   ID: {}", id);
            println!("   Email: {}", email.trim().to_lowercase());
            println!("   Name: {} {}", first_name, last_name);
        }
        Err(e) => fail("Error creating admin", e),
    }
}
