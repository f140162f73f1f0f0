use clap::{Parser, Subcommand};
use std::io::Write;
use taskly_client::config::ClientConfig;
use taskly_client::forms::{LoginForm, RegisterForm, TaskForm};
use taskly_client::render::{render_error, render_profile, render_task_detail, render_task_list};
use taskly_client::table::{SortOrder, StatusFilter};
use taskly_client::{
    ApiClient, FileStorage, PageLoad, Route, Session, TasklyApp, ViewError, guard,
};
use taskly_core::{TaskId, TaskStatus};
use tracing_subscriber::EnvFilter;

type App = TasklyApp<ApiClient, FileStorage>;

#[derive(Parser, Debug)]
#[command(name = "taskly", version, about = "Terminal client for the Taskly to-do API")]
struct Cli {
    /// Base URL of the API. Overrides TASKLY_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Defaults to the password
        #[arg(long)]
        password_confirmation: Option<String>,
    },
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and revoke the stored token
    Logout,
    /// Show the signed-in user and their tasks
    Profile,
    /// Manage tasks
    #[command(subcommand)]
    Tasks(TaskCommands),
}

#[derive(Debug, Clone, Subcommand)]
enum TaskCommands {
    /// List tasks
    List {
        /// all, pending or completed
        #[arg(long, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        /// Due date order: asc or desc
        #[arg(long, default_value_t = SortOrder::Asc)]
        sort: SortOrder,
    },
    /// Show one task
    Show { id: TaskId },
    /// Create a task
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// YYYY-MM-DD
        #[arg(long)]
        due_date: String,
        #[arg(long, default_value_t = TaskStatus::Pending)]
        status: TaskStatus,
    },
    /// Edit a task you own. Omitted fields keep their value.
    Edit {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        due_date: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Delete a task you own
    Delete {
        id: TaskId,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

impl Commands {
    fn route(&self) -> Route {
        match self {
            Commands::Register { .. } => Route::Register,
            Commands::Login { .. } | Commands::Logout => Route::Login,
            Commands::Profile => Route::Profile,
            Commands::Tasks(TaskCommands::List { .. }) => Route::Tasks,
            Commands::Tasks(TaskCommands::Show { id }) => Route::ShowTask(*id),
            Commands::Tasks(TaskCommands::Add { .. }) => Route::AddTask,
            Commands::Tasks(TaskCommands::Edit { id, .. }) => Route::EditTask(*id),
            Commands::Tasks(TaskCommands::Delete { id, .. }) => Route::ShowTask(*id),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so rendered output stays clean.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    let api_url = cli.api_url.unwrap_or_else(|| config.api_url.clone());
    let storage = FileStorage::open(config.storage_path()?)?;
    tracing::debug!(%api_url, storage = %storage.path().display(), "Starting client");

    let mut app = TasklyApp::new(ApiClient::new(&api_url), Session::restore(storage));
    match run(&mut app, cli.command).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", render_error(&err)?);
            std::process::exit(1);
        }
    }
}

async fn run(app: &mut App, command: Commands) -> Result<String, ViewError> {
    let requested = command.route();
    // Logout is allowed from any state.
    if !matches!(command, Commands::Logout) {
        let allowed = guard(requested, app.session());
        if allowed != requested {
            return Ok(redirect_notice(app, allowed));
        }
    }

    match command {
        Commands::Register {
            name,
            email,
            password,
            password_confirmation,
        } => {
            let form = RegisterForm {
                name,
                email,
                password_confirmation: password_confirmation.unwrap_or_else(|| password.clone()),
                password,
            };
            app.register(&form).await?;
            Ok(signed_in_notice(app))
        }
        Commands::Login { email, password } => {
            app.login(&LoginForm { email, password }).await?;
            Ok(signed_in_notice(app))
        }
        Commands::Logout => {
            app.logout().await?;
            Ok("You are logged out.".to_string())
        }
        Commands::Profile => match app.load_profile().await? {
            PageLoad::Ready(profile) => rendered(render_profile(&profile)),
            PageLoad::Redirect(route) => Ok(redirect_notice(app, route)),
        },
        Commands::Tasks(command) => run_task_command(app, command).await,
    }
}

async fn run_task_command(app: &mut App, command: TaskCommands) -> Result<String, ViewError> {
    match command {
        TaskCommands::List { status, sort } => match app.load_tasks().await? {
            PageLoad::Ready(mut table) => {
                table.set_filter(status);
                table.set_sort_order(sort);
                rendered(render_task_list(&table))
            }
            PageLoad::Redirect(route) => Ok(redirect_notice(app, route)),
        },
        TaskCommands::Show { id } => match app.load_task(id).await? {
            PageLoad::Ready(detail) => rendered(render_task_detail(&detail)),
            PageLoad::Redirect(route) => Ok(redirect_notice(app, route)),
        },
        TaskCommands::Add {
            title,
            description,
            due_date,
            status,
        } => {
            let form = TaskForm {
                title,
                description,
                due_date,
                status,
            };
            match app.create_task(&form).await? {
                PageLoad::Ready(task) => Ok(format!("Created task #{}.", task.id)),
                PageLoad::Redirect(route) => Ok(redirect_notice(app, route)),
            }
        }
        TaskCommands::Edit {
            id,
            title,
            description,
            due_date,
            status,
        } => {
            let detail = match app.load_task(id).await? {
                PageLoad::Ready(detail) => detail,
                PageLoad::Redirect(route) => return Ok(redirect_notice(app, route)),
            };
            let mut form = TaskForm::for_task(&detail.task);
            if let Some(title) = title {
                form.title = title;
            }
            if let Some(description) = description {
                form.description = description;
            }
            if let Some(due_date) = due_date {
                form.due_date = due_date;
            }
            if let Some(status) = status {
                form.status = status;
            }
            match app.update_task(id, &form).await? {
                PageLoad::Ready(task) => Ok(format!("Updated task #{}.", task.id)),
                PageLoad::Redirect(route) => Ok(redirect_notice(app, route)),
            }
        }
        TaskCommands::Delete { id, yes } => {
            let detail = match app.load_task(id).await? {
                PageLoad::Ready(detail) => detail,
                PageLoad::Redirect(route) => return Ok(redirect_notice(app, route)),
            };
            let confirmation = app.request_delete(&detail.task)?;
            if !yes && !confirm(&confirmation.prompt())? {
                return Ok("Cancelled.".to_string());
            }
            match app.confirm_delete(confirmation).await? {
                PageLoad::Ready(message) => Ok(message),
                PageLoad::Redirect(route) => Ok(redirect_notice(app, route)),
            }
        }
    }
}

fn rendered(result: Result<String, askama::Error>) -> Result<String, ViewError> {
    result.map_err(|err| ViewError::Message(format!("Failed to render output: {}", err)))
}

fn signed_in_notice(app: &App) -> String {
    match app.session().current_user() {
        Some(user) => format!("Signed in as {} <{}>.", user.name, user.email),
        None => "Signed in.".to_string(),
    }
}

fn redirect_notice(app: &App, route: Route) -> String {
    match route {
        Route::Login => "You are not signed in. Run `taskly login` first.".to_string(),
        _ => format!(
            "{} Run `taskly logout` to switch accounts.",
            signed_in_notice(app)
        ),
    }
}

/// Asks a yes/no question on the terminal. Anything but `y` or `yes` is a no.
fn confirm(prompt: &str) -> Result<bool, ViewError> {
    let io_error =
        |err: std::io::Error| ViewError::Message(format!("Failed to read answer: {}", err));
    eprint!("{} [y/N] ", prompt);
    std::io::stderr().flush().map_err(io_error)?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer).map_err(io_error)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
