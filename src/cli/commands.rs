//! Command dispatch
//!
//! Every mutating command opens the context, applies one edit, validates and
//! saves. Nothing is written when any step fails.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use colored::Colorize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::application::services::EditorService;
use crate::cli::args::{Cli, Commands, ConfigCommands, MoveTarget};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{DropTarget, FieldKind, NodeId, NodePath};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `fieldtree --help`".into(),
        ));
    };

    // Commands that need no services
    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
        Commands::Config { command } => return config_command(cli, command),
        _ => {}
    }

    let settings = Settings::load(project_dir(cli).as_deref())?;
    let container = ServiceContainer::new(settings)?;

    match command {
        Commands::Show { context } => show(&container, context.as_deref()),
        Commands::Validate { context } => validate(&container, context),
        Commands::Add {
            context,
            field_type,
            parent,
        } => mutate(&container, context, |editor| {
            let parent = parent.as_ref().map(|p| editor.resolve(p)).transpose()?;
            let id = editor.add(field_type, parent)?;
            Ok(format!("added {} at {}", field_type, editor.path_of(id)?))
        }),
        Commands::Set {
            context,
            path,
            assignments,
        } => {
            let props = parse_assignments(assignments)?;
            mutate(&container, context, |editor| {
                let id = editor.resolve(path)?;
                editor.update(id, props)?;
                Ok(format!("updated {}", path))
            })
        }
        Commands::Edit { context, path } => edit(&container, context, path),
        Commands::Delete { context, path } => mutate(&container, context, |editor| {
            let id = editor.resolve(path)?;
            let removed = editor.delete(id)?;
            Ok(format!("deleted {} ({} nodes)", path, removed.len()))
        }),
        Commands::Duplicate { context, path } => mutate(&container, context, |editor| {
            let id = editor.resolve(path)?;
            let copy = editor.duplicate(id)?;
            Ok(format!("duplicated {} to {}", path, editor.path_of(copy)?))
        }),
        Commands::MoveUp { context, path } => mutate(&container, context, |editor| {
            let id = editor.resolve(path)?;
            let moved = editor.move_up(id)?;
            shift_message(editor, id, moved, "first")
        }),
        Commands::MoveDown { context, path } => mutate(&container, context, |editor| {
            let id = editor.resolve(path)?;
            let moved = editor.move_down(id)?;
            shift_message(editor, id, moved, "last")
        }),
        Commands::Move {
            context,
            path,
            target,
        } => mutate(&container, context, |editor| {
            let id = editor.resolve(path)?;
            let target = drop_target(editor, target)?;
            editor.reparent(id, target)?;
            Ok(format!("moved {} to {}", path, editor.path_of(id)?))
        }),
        Commands::Retype {
            context,
            path,
            field_type,
        } => mutate(&container, context, |editor| {
            let id = editor.resolve(path)?;
            editor.change_type(id, field_type)?;
            Ok(format!("{} is now {}", path, field_type))
        }),
        Commands::Import { context, file } => import(&container, context, file),
        Commands::Export { context, output } => export(&container, context, output.as_deref()),
        Commands::Types => types(&container),
        Commands::Completion { .. } | Commands::Config { .. } => Ok(()),
    }
}

fn project_dir(cli: &Cli) -> Option<PathBuf> {
    cli.project_dir
        .clone()
        .or_else(|| std::env::current_dir().ok())
}

/// Open, apply `edit`, save, report.
fn mutate<F>(container: &ServiceContainer, context: &str, edit: F) -> CliResult<()>
where
    F: FnOnce(&mut EditorService) -> CliResult<String>,
{
    let mut editor = container.editor_service(context)?;
    report_skipped(&editor);
    let message = edit(&mut editor)?;
    editor.save()?;
    output::success(&message);
    editor.teardown();
    Ok(())
}

fn report_skipped(editor: &EditorService) {
    for entry in editor.skipped() {
        output::skipped(editor.context(), entry);
    }
}

fn shift_message(editor: &EditorService, id: NodeId, moved: bool, edge: &str) -> CliResult<String> {
    let path = editor.path_of(id)?;
    Ok(if moved {
        format!("moved to {}", path)
    } else {
        format!("{} is already {}", path, edge)
    })
}

fn drop_target(editor: &EditorService, target: &MoveTarget) -> CliResult<DropTarget> {
    match (&target.onto, &target.into, target.root) {
        (Some(p), None, false) => Ok(DropTarget::Onto(editor.resolve(p)?)),
        (None, Some(p), false) => Ok(DropTarget::Inside(editor.resolve(p)?)),
        (None, None, true) => Ok(DropTarget::Root),
        _ => Err(CliError::InvalidArgs(
            "give exactly one of --onto, --into, --root".into(),
        )),
    }
}

/// `key=value` pairs; values are JSON, anything unparsable is a plain string.
pub fn parse_assignments(assignments: &[String]) -> CliResult<Map<String, Value>> {
    assignments
        .iter()
        .map(|a| {
            let (key, raw) = a
                .split_once('=')
                .ok_or_else(|| CliError::InvalidArgs(format!("expected key=value: {}", a)))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::InvalidArgs(format!("empty key in: {}", a)));
            }
            let value =
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            Ok((key.to_string(), value))
        })
        .collect()
}

#[instrument(skip(container))]
fn show(container: &ServiceContainer, context: Option<&str>) -> CliResult<()> {
    let Some(context) = context else {
        let contexts = container
            .repository
            .contexts()
            .map_err(|e| InfraError::io("list schemas", e))?;
        if contexts.is_empty() {
            output::info(&"No schemas stored yet");
        }
        for c in contexts {
            output::info(&c);
        }
        return Ok(());
    };

    let editor = container.editor_service(context)?;
    report_skipped(&editor);
    output::header(&context);
    print!("{}", editor.render());
    editor.teardown();
    Ok(())
}

#[instrument(skip(container))]
fn validate(container: &ServiceContainer, context: &str) -> CliResult<()> {
    let editor = container.editor_service(context)?;
    report_skipped(&editor);
    let result = editor.validate();
    editor.teardown();
    result.map_err(crate::application::ApplicationError::from)?;
    output::success(&format!("{} is valid", context));
    Ok(())
}

fn edit(container: &ServiceContainer, context: &str, path: &NodePath) -> CliResult<()> {
    mutate(container, context, |editor| {
        let id = editor.resolve(path)?;
        let before = editor.editable_properties(id)?;
        let current_type = editor
            .store()
            .node(id)?
            .field_type()
            .to_string();

        let file = tempfile::Builder::new()
            .prefix("fieldtree-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| InfraError::io("create temp file", e))?;
        let content = serde_json::to_string_pretty(&Value::Object(before))
            .map_err(|e| CliError::Usage(e.to_string()))?;
        container
            .fs
            .write(file.path(), &content)
            .map_err(|e| InfraError::file("write", file.path(), e))?;

        container
            .editor
            .open(file.path())
            .map_err(|e| InfraError::editor(file.path(), e))?;

        let edited = container
            .fs
            .read_to_string(file.path())
            .map_err(|e| InfraError::file("read", file.path(), e))?;
        let props = match serde_json::from_str::<Value>(&edited) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(CliError::InvalidArgs("edited content is not a JSON object".into())),
            Err(e) => return Err(CliError::InvalidArgs(format!("edited content: {}", e))),
        };
        if let Some(new_type) = props.get("fieldType").and_then(Value::as_str) {
            if new_type != current_type {
                return Err(CliError::Usage(format!(
                    "use `fieldtree retype {} {} {}` to change the field type",
                    context, path, new_type
                )));
            }
        }

        let ignored = editor.replace_properties(id, props)?;
        debug!("edit: ignored keys {:?}", ignored);
        Ok(format!("edited {}", path))
    })
}

fn import(container: &ServiceContainer, context: &str, file: &Path) -> CliResult<()> {
    let content = container
        .fs
        .read_to_string(file)
        .map_err(|e| InfraError::file("read", file, e))?;
    let entries: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
        CliError::InvalidArgs(format!("{} is not a JSON array: {}", file.display(), e))
    })?;

    let mut editor = container.editor_service(context)?;
    let skipped = editor.import(&entries).to_vec();
    for entry in &skipped {
        output::skipped(context, entry);
    }
    editor.save()?;
    output::success(&format!(
        "imported {} nodes into {}",
        editor.store().len(),
        context
    ));
    editor.teardown();
    Ok(())
}

fn export(container: &ServiceContainer, context: &str, target: Option<&Path>) -> CliResult<()> {
    let editor = container.editor_service(context)?;
    report_skipped(&editor);
    let json = serde_json::to_string_pretty(&editor.export())
        .map_err(|e| CliError::Usage(e.to_string()))?;
    editor.teardown();

    match target {
        Some(path) => {
            container
                .fs
                .ensure_parent(path)
                .and_then(|_| container.fs.write(path, &json))
                .map_err(|e| InfraError::file("write", path, e))?;
            output::action("Exported", &path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json).map_err(|e| InfraError::io("write stdout", e))?;
        }
    }
    Ok(())
}

fn types(container: &ServiceContainer) -> CliResult<()> {
    for template in container.catalog.templates() {
        let kind = match template.kind() {
            FieldKind::Container => "container".cyan(),
            FieldKind::Composite => "composite".yellow(),
            FieldKind::Leaf => "field".normal(),
        };
        output::info(&format!(
            "{:<12} {:<10} {}",
            template.field_type, kind, template.label
        ));
    }
    Ok(())
}

fn config_command(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    let project = project_dir(cli);
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(project.as_deref())?;
            print!("{}", settings.to_toml()?);
        }
        ConfigCommands::Template => print!("{}", Settings::template()),
        ConfigCommands::Init { global } => {
            let path = config_file(*global, project.as_deref())?;
            if path.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| InfraError::file("create", parent, e))?;
            }
            std::fs::write(&path, Settings::template())
                .map_err(|e| InfraError::file("write", &path, e))?;
            output::action("Created", &path.display());
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(p) => output::info(&format!("global: {}", p.display())),
                None => output::info(&"global: (no config directory)"),
            }
            if let Some(p) = project.as_deref() {
                output::info(&format!("local:  {}", local_config_path(p).display()));
            }
        }
        ConfigCommands::Edit { global } => {
            let settings = Settings::load(project.as_deref())?;
            let container = ServiceContainer::new(settings)?;
            let path = config_file(*global, project.as_deref())?;
            container
                .editor
                .open(&path)
                .map_err(|e| InfraError::editor(&path, e))?;
        }
    }
    Ok(())
}

fn config_file(global: bool, project: Option<&Path>) -> CliResult<PathBuf> {
    if global {
        global_config_path()
            .ok_or_else(|| CliError::Usage("cannot determine config directory".into()))
    } else {
        project
            .map(local_config_path)
            .ok_or_else(|| CliError::Usage("cannot determine project directory".into()))
    }
}
