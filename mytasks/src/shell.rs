//! Line-oriented command shell driving both controllers.
//!
//! [`parse_command`] turns one input line into a [`Command`] without
//! touching any state. [`Shell::execute`] dispatches it to the task or
//! auth controller and returns the lines to print.

use std::fmt::Write as _;

use chrono::{NaiveDate, NaiveTime};

use mytasks_proto::task::{ParseTaskFieldError, Task, TaskFilter, TaskId, TaskPriority};

use crate::auth::{AuthController, AuthEvent};
use crate::store::{AuthStore, SettingsStore, TaskStore};
use crate::tasks::{TaskController, TaskEvent};

/// Text printed by `help`.
pub const HELP: &str = "\
Account:
  register <name> <email> <password> <confirm>
  login <email> <password>
  logout
  whoami
Tasks:
  add <title>             save a new task (uses any pending desc/due/priority)
  edit <n|id>             load a task into the form
  title <text>            set the form title
  desc <text>             set the form description
  due <YYYY-MM-DD>        set the form due date
  priority <level>        low, medium, high or urgent
  save                    save the form
  cancel                  discard the form
  done <n|id>             mark a task completed
  undo <n|id>             mark a task active
  rm <n|id>               delete a task
  filter <all|active|completed>
  list
  clear-completed
Other:
  help
  quit";

/// One parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account and sign in.
    Register {
        /// Display name (may contain spaces).
        name: String,
        /// Account email.
        email: String,
        /// Password.
        password: String,
        /// Password confirmation.
        confirm: String,
    },
    /// Sign in.
    Login {
        /// Account email.
        email: String,
        /// Password.
        password: String,
    },
    /// Sign out.
    Logout,
    /// Show the signed-in user.
    WhoAmI,
    /// Set the title and save.
    Add(String),
    /// Load a task into the form. Holds a list number or an id.
    Edit(String),
    /// Set the form title.
    Title(String),
    /// Set the form description.
    Desc(String),
    /// Set the form due date.
    Due(NaiveDate),
    /// Set the form priority.
    Priority(TaskPriority),
    /// Save the form.
    Save,
    /// Reset the form.
    Cancel,
    /// Mark a task completed.
    Done(String),
    /// Mark a task active again.
    Undo(String),
    /// Delete a task.
    Remove(String),
    /// Change the list filter.
    Filter(TaskFilter),
    /// Print the tasks under the current filter.
    List,
    /// Delete every completed task.
    ClearCompleted,
    /// Print usage.
    Help,
    /// Leave the shell.
    Quit,
}

impl Command {
    /// Returns `true` for commands that need a signed-in user.
    #[must_use]
    pub const fn needs_session(&self) -> bool {
        !matches!(
            self,
            Self::Register { .. }
                | Self::Login { .. }
                | Self::Logout
                | Self::WhoAmI
                | Self::Help
                | Self::Quit
        )
    }
}

/// Errors produced when a line cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The line was blank.
    #[error("empty command")]
    Empty,
    /// The first word is not a command.
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    /// Arguments missing or malformed.
    #[error("usage: {0}")]
    Usage(&'static str),
    /// The due date is not `YYYY-MM-DD`.
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    /// A priority or filter name was not recognized.
    #[error(transparent)]
    Field(#[from] ParseTaskFieldError),
}

/// Parses one input line.
///
/// # Errors
///
/// Returns [`ParseError`] if the line is blank, names no known command, or
/// carries missing or malformed arguments.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

    match verb.to_ascii_lowercase().as_str() {
        "" => Err(ParseError::Empty),
        "register" => parse_register(rest),
        "login" => match rest.split_whitespace().collect::<Vec<_>>()[..] {
            [email, password] => Ok(Command::Login {
                email: email.to_string(),
                password: password.to_string(),
            }),
            _ => Err(ParseError::Usage("login <email> <password>")),
        },
        "logout" => Ok(Command::Logout),
        "whoami" => Ok(Command::WhoAmI),
        "add" => text(rest, "add <title>").map(Command::Add),
        "edit" => key(rest, "edit <n|id>").map(Command::Edit),
        "title" => text(rest, "title <text>").map(Command::Title),
        "desc" => Ok(Command::Desc(rest.to_string())),
        "due" => {
            let raw = text(rest, "due <YYYY-MM-DD>")?;
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map(Command::Due)
                .map_err(|_| ParseError::InvalidDate(raw))
        }
        "priority" => Ok(Command::Priority(
            text(rest, "priority <low|medium|high|urgent>")?.parse()?,
        )),
        "save" => Ok(Command::Save),
        "cancel" => Ok(Command::Cancel),
        "done" => key(rest, "done <n|id>").map(Command::Done),
        "undo" => key(rest, "undo <n|id>").map(Command::Undo),
        "rm" => key(rest, "rm <n|id>").map(Command::Remove),
        "filter" => Ok(Command::Filter(
            text(rest, "filter <all|active|completed>")?.parse()?,
        )),
        "list" | "ls" => Ok(Command::List),
        "clear-completed" => Ok(Command::ClearCompleted),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

fn parse_register(rest: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "register <name> <email> <password> <confirm>";
    let words: Vec<&str> = rest.split_whitespace().collect();
    match words.split_last_chunk::<3>() {
        Some((name, [email, password, confirm])) if !name.is_empty() => Ok(Command::Register {
            name: name.join(" "),
            email: (*email).to_string(),
            password: (*password).to_string(),
            confirm: (*confirm).to_string(),
        }),
        _ => Err(ParseError::Usage(USAGE)),
    }
}

fn text(rest: &str, usage: &'static str) -> Result<String, ParseError> {
    if rest.is_empty() {
        Err(ParseError::Usage(usage))
    } else {
        Ok(rest.to_string())
    }
}

fn key(rest: &str, usage: &'static str) -> Result<String, ParseError> {
    match rest.split_whitespace().collect::<Vec<_>>()[..] {
        [key] => Ok(key.to_string()),
        _ => Err(ParseError::Usage(usage)),
    }
}

/// Formats one list row: `<n>. [x] <title> (<priority>, due <date>) <id>`.
#[must_use]
pub fn format_task(number: usize, task: &Task, date_format: &str) -> String {
    let mark = if task.is_completed { 'x' } else { ' ' };
    let mut due = String::new();
    if write!(due, "{}", task.date.format(date_format)).is_err() {
        // Unusable format string from config.
        due = task.date.date_naive().to_string();
    }
    let mut row = format!(
        "{number:>3}. [{mark}] {} ({}, due {due}) {}",
        task.title, task.priority, task.id
    );
    if !task.description.is_empty() {
        row.push_str("\n       ");
        row.push_str(&task.description);
    }
    row
}

/// Both controllers plus display settings.
pub struct Shell<S, A, P> {
    tasks: TaskController<S>,
    auth: AuthController<A, P>,
    date_format: String,
}

impl<S: TaskStore, A: AuthStore, P: SettingsStore> Shell<S, A, P> {
    /// Wraps the two controllers.
    pub fn new(
        tasks: TaskController<S>,
        auth: AuthController<A, P>,
        date_format: impl Into<String>,
    ) -> Self {
        Self {
            tasks,
            auth,
            date_format: date_format.into(),
        }
    }

    /// The task controller.
    pub const fn tasks(&self) -> &TaskController<S> {
        &self.tasks
    }

    /// The auth controller.
    pub const fn auth(&self) -> &AuthController<A, P> {
        &self.auth
    }

    /// Parses and runs one line. Parse errors are returned as output.
    pub async fn run_line(&self, line: &str) -> Vec<String> {
        match parse_command(line) {
            Ok(command) => self.execute(command).await,
            Err(ParseError::Empty) => Vec::new(),
            Err(e) => vec![e.to_string()],
        }
    }

    /// Runs one command and returns the lines to print.
    pub async fn execute(&self, command: Command) -> Vec<String> {
        if command.needs_session() {
            if !self.auth.current_session().is_logged_in {
                return vec!["Please log in first.".to_string()];
            }
            self.tasks.refresh_views();
        }

        match command {
            Command::Register {
                name,
                email,
                password,
                confirm,
            } => self.register(name, email, password, confirm).await,
            Command::Login { email, password } => self.login(email, password).await,
            Command::Logout => {
                self.auth.handle(AuthEvent::Logout).await;
                self.tasks.handle(TaskEvent::ClearForm).await;
                if self.auth.current_session().is_logged_in {
                    vec!["Sign-out failed.".to_string()]
                } else {
                    vec!["Signed out.".to_string()]
                }
            }
            Command::WhoAmI => {
                let session = self.auth.current_session();
                if session.is_logged_in {
                    vec![format!(
                        "Signed in as {} <{}>",
                        session.user_name, session.user_email
                    )]
                } else {
                    vec!["Not signed in.".to_string()]
                }
            }
            Command::Add(title) => {
                if self.tasks.state().is_editing {
                    self.tasks.handle(TaskEvent::ClearForm).await;
                }
                self.tasks.handle(TaskEvent::UpdateTitle(title)).await;
                self.save().await
            }
            Command::Edit(key) => self.edit(&key).await,
            Command::Title(title) => {
                self.tasks.handle(TaskEvent::UpdateTitle(title)).await;
                Vec::new()
            }
            Command::Desc(description) => {
                self.tasks
                    .handle(TaskEvent::UpdateDescription(description))
                    .await;
                Vec::new()
            }
            Command::Due(date) => {
                let due = date.and_time(NaiveTime::MIN).and_utc();
                self.tasks.handle(TaskEvent::UpdateDate(due)).await;
                Vec::new()
            }
            Command::Priority(priority) => {
                self.tasks.handle(TaskEvent::UpdatePriority(priority)).await;
                Vec::new()
            }
            Command::Save => self.save().await,
            Command::Cancel => {
                self.tasks.handle(TaskEvent::ClearForm).await;
                vec!["Form cleared.".to_string()]
            }
            Command::Done(key) => self.set_completion(&key, true).await,
            Command::Undo(key) => self.set_completion(&key, false).await,
            Command::Remove(key) => match self.resolve(&key) {
                Some(task) => {
                    let title = task.title.clone();
                    self.tasks.handle(TaskEvent::DeleteTask(task)).await;
                    vec![format!("Deleted '{title}'.")]
                }
                None => vec![format!("No task '{key}'.")],
            },
            Command::Filter(filter) => {
                self.tasks.handle(TaskEvent::SetFilter(filter)).await;
                vec![format!("Showing {filter} tasks.")]
            }
            Command::List => self.list(),
            Command::ClearCompleted => {
                let count = self.tasks.views().completed.len();
                self.tasks.handle(TaskEvent::ClearCompleted).await;
                vec![format!("Cleared {count} completed task(s).")]
            }
            Command::Help => HELP.lines().map(str::to_string).collect(),
            Command::Quit => vec!["Bye.".to_string()],
        }
    }

    async fn register(
        &self,
        name: String,
        email: String,
        password: String,
        confirm: String,
    ) -> Vec<String> {
        self.auth.handle(AuthEvent::UpdateName(name)).await;
        self.auth.handle(AuthEvent::UpdateEmail(email)).await;
        self.auth.handle(AuthEvent::UpdatePassword(password)).await;
        self.auth
            .handle(AuthEvent::UpdateConfirmPassword(confirm))
            .await;
        self.auth.handle(AuthEvent::Register).await;
        self.signed_in_reply().await
    }

    async fn login(&self, email: String, password: String) -> Vec<String> {
        self.auth.handle(AuthEvent::UpdateEmail(email)).await;
        self.auth.handle(AuthEvent::UpdatePassword(password)).await;
        self.auth.handle(AuthEvent::Login).await;
        self.signed_in_reply().await
    }

    /// Reports the outcome of a sign-in attempt from the stores' current
    /// state, so the reply names the account just signed in.
    async fn signed_in_reply(&self) -> Vec<String> {
        if let Some(message) = self.auth.state().error_message {
            self.auth.handle(AuthEvent::ClearError).await;
            return vec![message];
        }
        let session = self.auth.current_session();
        if session.is_logged_in && session.user_name.is_empty() {
            vec![format!("Signed in as {}.", session.user_email)]
        } else if session.is_logged_in {
            vec![format!("Welcome, {}!", session.user_name)]
        } else {
            vec!["Sign-in did not complete.".to_string()]
        }
    }

    async fn save(&self) -> Vec<String> {
        let form = self.tasks.state();
        if form.title_is_blank() {
            return vec!["Title cannot be empty.".to_string()];
        }
        self.tasks.handle(TaskEvent::SaveTask).await;
        if form.is_editing {
            vec![format!("Updated '{}'.", form.title.trim())]
        } else {
            vec![format!("Added '{}'.", form.title.trim())]
        }
    }

    async fn edit(&self, key: &str) -> Vec<String> {
        let id = self
            .resolve(key)
            .map_or_else(|| TaskId::from(key), |task| task.id);
        self.tasks.handle(TaskEvent::LoadTask(Some(id))).await;
        let form = self.tasks.state();
        if form.is_editing {
            vec![format!("Editing '{}'.", form.title)]
        } else {
            vec![format!("No task '{key}'.")]
        }
    }

    async fn set_completion(&self, key: &str, completed: bool) -> Vec<String> {
        let Some(task) = self.resolve(key) else {
            return vec![format!("No task '{key}'.")];
        };
        self.tasks
            .handle(TaskEvent::ToggleTaskCompletion {
                id: task.id,
                completed,
            })
            .await;
        let state = if completed { "completed" } else { "active" };
        vec![format!("Marked '{}' {state}.", task.title)]
    }

    fn list(&self) -> Vec<String> {
        let views = self.tasks.views();
        let visible = self.tasks.visible_tasks();
        let mut out: Vec<String> = visible
            .iter()
            .enumerate()
            .map(|(i, task)| format_task(i + 1, task, &self.date_format))
            .collect();
        if out.is_empty() {
            out.push("No tasks.".to_string());
        }
        out.push(format!(
            "{} active, {} completed.",
            views.active_count,
            views.completed.len()
        ));
        out
    }

    /// Finds a task by its number in the visible list, or by id.
    fn resolve(&self, key: &str) -> Option<Task> {
        let visible = self.tasks.visible_tasks();
        if let Ok(number) = key.parse::<usize>()
            && let Some(task) = number.checked_sub(1).and_then(|i| visible.get(i))
        {
            return Some(task.clone());
        }
        self.tasks
            .views()
            .all
            .into_iter()
            .find(|task| task.id.as_str() == key)
    }
}
