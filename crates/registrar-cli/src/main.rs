use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use registrar_auth::create_access_token;
use registrar_cli::seeder::{self, SeedConfig};
use registrar_config::{DatabaseConfig, JwtConfig};
use registrar_db::{PgPool, init_db_pool, run_migrations};
use registrar_models::{UserId, UserRole};

#[derive(Parser)]
#[command(name = "registrar-cli")]
#[command(about = "Registrar CLI - migrations, seeding and development tokens", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Seed the database with a fake catalog, students and grade history
    Seed {
        /// Number of students to create
        #[arg(short = 's', long, default_value = "200")]
        students: usize,

        /// Number of courses to create
        #[arg(short = 'c', long, default_value = "20")]
        courses: usize,

        /// Sections per course in the seeded term
        #[arg(long, default_value = "2")]
        sections_per_course: usize,

        /// Seats per section
        #[arg(long, default_value = "30")]
        capacity: i32,

        /// Term label for the seeded sections
        #[arg(short = 't', long, default_value = "2025-FALL")]
        term: String,
    },
    /// Clear all seeded data
    ClearSeed,
    /// Print an access token for an existing user (development only)
    IssueToken {
        /// User id to put in the `sub` claim
        #[arg(short = 'u', long)]
        user_id: i64,

        /// Role claim: student, instructor or admin
        #[arg(short = 'r', long, default_value = "student")]
        role: UserRole,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => handle_migrate(&connect().await).await,
        Commands::Seed {
            students,
            courses,
            sections_per_course,
            capacity,
            term,
        } => {
            let config = SeedConfig::new(students)
                .with_courses(courses)
                .with_sections(sections_per_course, capacity)
                .with_term(term);
            handle_seed(&connect().await, &config).await
        }
        Commands::ClearSeed => handle_clear_seed(&connect().await).await,
        Commands::IssueToken { user_id, role } => handle_issue_token(user_id, role),
    }
}

async fn connect() -> PgPool {
    let config = match DatabaseConfig::from_env() {
        Ok(config) => config,
        Err(e) => fail("Invalid database configuration", e),
    };

    match init_db_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => fail("Failed to connect to database", e),
    }
}

async fn handle_migrate(pool: &PgPool) {
    match run_migrations(pool).await {
        Ok(()) => println!("✅ Migrations applied"),
        Err(e) => fail("Error running migrations", e),
    }
}

async fn handle_seed(pool: &PgPool, config: &SeedConfig) {
    if let Err(e) = seeder::seed_all(pool, config).await {
        fail("Error seeding database", e);
    }
}

async fn handle_clear_seed(pool: &PgPool) {
    if let Err(e) = seeder::clear_all(pool).await {
        fail("Error clearing seeded data", e);
    }
}

fn handle_issue_token(user_id: i64, role: UserRole) {
    let jwt_config = JwtConfig::from_env();
    match create_access_token(UserId::new(user_id), role, &jwt_config) {
        Ok(token) => println!("{token}"),
        Err(e) => fail("Error issuing token", e),
    }
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("\n❌ {}: {}", context, err);
    std::process::exit(1);
}
