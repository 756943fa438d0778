//! The interactive menu: command registry and dispatch loop.
//!
//! Each iteration prints the numbered entries, reads a selection, collects
//! the chosen command's fields, and runs it against the API. A failed
//! command of any kind prints its error and returns to the menu; only the
//! explicit exit entry leaves the loop.

use tracing::debug;

use calman_core::field::{FieldDef, FieldKind, FieldSource, FieldValues, collect_fields};
use calman_google::{BoxFuture, CalendarApi};

use crate::error::{CliError, CliResult};
use crate::ops;

/// One menu entry: a field spec plus a body that runs against the API.
///
/// Commands are small and stateless; the interesting parts live in the
/// field definitions, the payload builders, and the formatters they
/// delegate to.
pub trait MenuCommand: Send + Sync {
    /// Menu label.
    fn description(&self) -> &'static str;

    /// Inputs to collect before running, in prompt order.
    fn fields(&self) -> &'static [FieldDef] {
        &[]
    }

    /// Executes the command and returns the text to print.
    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>>;
}

/// What a command needs from its environment.
pub struct CommandContext<'a> {
    /// The authenticated session, behind the trait so tests can script it.
    pub api: &'a dyn CalendarApi,
    /// Calendar every operation targets.
    pub calendar_id: &'a str,
    /// Skip already-present addresses when inviting.
    pub dedupe_attendees: bool,
}

/// The menu's command set, built once at startup and never mutated.
pub struct CommandRegistry {
    commands: Vec<Box<dyn MenuCommand>>,
}

impl CommandRegistry {
    /// The standard menu, in its fixed order.
    pub fn standard() -> Self {
        Self {
            commands: vec![
                Box::new(ops::ListEvents),
                Box::new(ops::ReadEvent),
                Box::new(ops::CreateEvent),
                Box::new(ops::CreateBirthdayEvent),
                Box::new(ops::UpdateEvent),
                Box::new(ops::DeleteEvent),
                Box::new(ops::CheckAvailability),
                Box::new(ops::CreateEventWithAttachment),
                Box::new(ops::CreateEventWithMeet),
                Box::new(ops::WatchCalendar),
                Box::new(ops::GrantAccess),
                Box::new(ops::RemoveAccess),
                Box::new(ops::InviteUsers),
                Box::new(ops::AddReminders),
                Box::new(ops::ListCalendars),
                Box::new(ops::AddExtendedProperties),
                Box::new(ops::SendBatchRequests),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn MenuCommand> {
        self.commands.get(index).map(Box::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn MenuCommand> {
        self.commands.iter().map(Box::as_ref)
    }
}

/// The selection is read through a [`FieldDef`] like every other input, so
/// any [`FieldSource`] can drive the whole loop.
const SELECTION: FieldDef =
    FieldDef::required("choice", "Enter the number of the action", FieldKind::Text);

/// Runs the read-eval loop until the exit entry is chosen.
///
/// Command failures are printed and the loop continues; only a selection
/// read failure (the input device going away) ends it early.
pub async fn run_menu(
    registry: &CommandRegistry,
    ctx: &CommandContext<'_>,
    source: &mut dyn FieldSource,
) -> CliResult<()> {
    let exit_entry = registry.len() + 1;

    loop {
        println!("\nSelect an option:");
        for (index, command) in registry.iter().enumerate() {
            println!("{}. {}", index + 1, command.description());
        }
        println!("{}. Exit", exit_entry);

        let raw = source.read(&SELECTION).map_err(CliError::Io)?;

        let selected = match raw.trim().parse::<usize>() {
            Ok(n) if (1..=exit_entry).contains(&n) => n,
            _ => {
                println!("Invalid choice. Please try again.");
                continue;
            }
        };

        if selected == exit_entry {
            return Ok(());
        }

        if let Some(command) = registry.get(selected - 1) {
            debug!(command = command.description(), "dispatching");
            match dispatch(command, ctx, source).await {
                Ok(output) => println!("{}", output),
                Err(e) => println!("Error: {}", e),
            }
        }
    }
}

/// Collects a command's fields and runs it. A validation failure aborts
/// here, before anything is sent to the service.
async fn dispatch(
    command: &dyn MenuCommand,
    ctx: &CommandContext<'_>,
    source: &mut dyn FieldSource,
) -> CliResult<String> {
    let values = collect_fields(command.fields(), source)?;
    command.run(ctx, values).await
}
