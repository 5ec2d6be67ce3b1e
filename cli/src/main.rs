use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use blog_client::config::{ClientConfig, ConfigError};
use blog_client::net::api::ApiError;
use blog_client::net::types::{AuthRequest, AuthToken, NewPost, Post, UserProfile};
use blog_client::services::blog::{BlogService, CompletionStatus, FetchOutcome, RegistrationForm};
use blog_client::services::feed::{Feed, FeedFilter};
use blog_client::util::jwt::{self, JwtError};

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid session token: {0}")]
    Session(#[from] JwtError),
    #[error("not logged in; run `blog-cli login` and export BLOG_TOKEN")]
    NotLoggedIn,
    #[error("{0}")]
    Rejected(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "blog-cli", about = "Blog backend command-line client")]
struct Cli {
    /// Backend base URL; overrides BLOG_BACKEND_URL.
    #[arg(long)]
    base_url: Option<String>,

    /// JWT from a previous `login`.
    #[arg(long, env = "BLOG_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account.
    Register(RegisterArgs),
    /// Log in and print the issued token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BLOG_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Page through posts.
    Read(ReadArgs),
    /// Publish a new post.
    Post {
        #[arg(long)]
        content: String,
        /// Keep the post unpublished.
        #[arg(long, default_value_t = false)]
        draft: bool,
    },
    /// Replace the content of one of your posts.
    Update {
        id: String,
        #[arg(long)]
        content: String,
        #[arg(long, default_value_t = false)]
        draft: bool,
    },
    /// Delete one of your posts.
    Delete { id: String },
    /// Show an author's profile.
    Profile { email: String },
    /// Show the current session.
    Whoami,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    confirm_password: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    about: Option<String>,
}

#[derive(Args, Debug)]
struct ReadArgs {
    /// Only posts by this author.
    #[arg(long, conflicts_with = "mine")]
    author: Option<String>,
    /// Only your own posts, drafts included.
    #[arg(long, default_value_t = false)]
    mine: bool,
    /// Number of pages to load.
    #[arg(long, default_value_t = 1)]
    pages: u32,
    /// Print posts as JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl ReadArgs {
    fn filter(&self) -> FeedFilter {
        match (&self.author, self.mine) {
            (_, true) => FeedFilter::Own,
            (Some(author), false) => FeedFilter::Author(author.clone()),
            (None, false) => FeedFilter::All,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url)?;
    }
    debug!(base_url = %config.base_url, page_size = config.page_size, "client configured");

    let service = BlogService::from_config(&config)?;
    if let Some(token) = cli.token {
        service.restore_session(AuthToken::new(token))?;
    }

    match cli.command {
        Command::Register(args) => run_register(&service, args).await,
        Command::Login { email, password } => run_login(&service, email, password).await,
        Command::Read(args) => run_read(&service, config.page_size, &args).await,
        Command::Post { content, draft } => run_post(&service, content, draft).await,
        Command::Update { id, content, draft } => run_update(&service, id, content, draft).await,
        Command::Delete { id } => report(service.delete_post(&id).await),
        Command::Profile { email } => run_profile(&service, &email).await,
        Command::Whoami => run_whoami(&service),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_register(service: &BlogService, args: RegisterArgs) -> Result<(), CliError> {
    let form = RegistrationForm {
        email: args.email,
        password: args.password,
        password_confirmation: args.confirm_password,
        first_name: args.first_name,
        last_name: args.last_name,
        about: args.about,
    };
    report(service.register_with_confirmation(form).await)
}

async fn run_login(service: &BlogService, email: String, password: String) -> Result<(), CliError> {
    report(service.authenticate_user(AuthRequest { email, password }).await)?;
    let token = service.get_authentication().bearer();
    println!("{}", token.authorization_value());
    Ok(())
}

async fn run_read(service: &BlogService, page_size: u32, args: &ReadArgs) -> Result<(), CliError> {
    let filter = args.filter();
    if filter == FeedFilter::Own {
        require_session(service)?;
    }

    let mut feed = Feed::new(service.clone(), page_size);
    feed.set_filter(filter);

    let mut last = feed.load_initial().await;
    for _ in 1..args.pages {
        if !last.as_ref().is_some_and(FetchOutcome::is_success) {
            break;
        }
        last = Some(feed.load_more().await);
    }

    let posts = feed.posts();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&posts)?);
    } else {
        for post in &posts {
            let author = match service.resolve_profile(&post.author_email).await {
                Ok(profile) => profile,
                Err(e) => {
                    debug!(email = %post.author_email, error = %e, "author lookup failed");
                    UserProfile::default()
                }
            };
            println!("{}", render_post(post, &author));
        }
    }

    match last {
        None => Ok(()),
        Some(outcome @ FetchOutcome::AuthExpired) => Err(CliError::Rejected(outcome.message().to_owned())),
        Some(FetchOutcome::Transport(message)) => Err(CliError::Rejected(message)),
        Some(outcome) => {
            eprintln!("{}", outcome.message());
            Ok(())
        }
    }
}

async fn run_post(service: &BlogService, content: String, draft: bool) -> Result<(), CliError> {
    let author_email = require_session(service)?;
    report(service.new_post(NewPost { author_email, content, published: !draft }).await)
}

async fn run_update(service: &BlogService, id: String, content: String, draft: bool) -> Result<(), CliError> {
    let author_email = require_session(service)?;
    let post = Post { id, author_email, created_at: None, content, published: !draft };
    report(service.update_post(post).await)
}

async fn run_profile(service: &BlogService, email: &str) -> Result<(), CliError> {
    let profile = service.resolve_profile(email).await?;
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

fn run_whoami(service: &BlogService) -> Result<(), CliError> {
    let user = service.get_authentication();
    if !user.has_token() {
        return Err(CliError::NotLoggedIn);
    }
    let claims = jwt::decode_claims(&user.bearer())?;
    println!("{}", user.subject_id.as_deref().unwrap_or("(no subject)"));
    if let Some(exp) = claims.exp {
        println!("expires: {exp}");
    }
    Ok(())
}

fn require_session(service: &BlogService) -> Result<String, CliError> {
    service
        .get_authentication()
        .subject_id
        .ok_or(CliError::NotLoggedIn)
}

fn report(status: CompletionStatus) -> Result<(), CliError> {
    if status.executed_successfully {
        eprintln!("{}", status.message);
        Ok(())
    } else {
        Err(CliError::Rejected(status.message))
    }
}

fn render_post(post: &Post, author: &UserProfile) -> String {
    let name = author.name.as_deref().unwrap_or(&post.author_email);
    let mut header = format!("[{}] {name} <{}>", post.id, post.author_email);
    if let Some(created_at) = &post.created_at {
        header.push(' ');
        header.push_str(created_at);
    }
    if !post.published {
        header.push_str(" (draft)");
    }
    format!("{header}\n    {}", post.content)
}
