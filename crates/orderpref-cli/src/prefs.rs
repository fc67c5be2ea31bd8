use color_eyre::Result;
use orderpref_core::{
    files::FileEntry,
    form::{Dropdown, FormSubmission, PreferenceForm, PreferenceService, PREFERENCE_ITEM_TYPE},
    preferences::{PreferenceRepository, UserId},
};
use orderpref_storage::sqlite_store::SqlitePreferenceRepo;

use crate::{cli::Command, config, storage};

/// Heading shown on the preference form.
pub fn form_title() -> String {
    format!("orderpref - {}", env!("CARGO_PKG_VERSION"))
}

fn service(config: &config::Config) -> Result<PreferenceService<SqlitePreferenceRepo>> {
    Ok(PreferenceService::new(
        storage::repo_from_config(config)?,
        config.catalog()?,
        form_title(),
    ))
}

/// Execute a preference subcommand against the configured database and file stores.
pub async fn handle(cmd: Command, config: &config::Config) -> Result<()> {
    match cmd {
        Command::Templates { json } => {
            let files = config.catalog()?.templates();
            print_files(&files, json)?;
        }
        Command::Signatures { user_name, json } => {
            let files = config.catalog()?.signatures(&user_name);
            print_files(&files, json)?;
        }
        Command::Show { user } => {
            let service = service(config)?;
            match service.repo().find_by_user(UserId(user)).await? {
                Some(record) => {
                    println!("preference {} for user {}", record.id, record.user_id);
                    println!("  template:  {}", display_value(&record.template));
                    println!("  signature: {}", display_value(&record.signature));
                }
                None => println!("No preference stored for user {user}."),
            }
        }
        Command::Set {
            user,
            template,
            signature,
        } => {
            let service = service(config)?;
            let submission = apply_changes(&service, UserId(user), template, signature).await?;
            service.submit(submission).await?;
            println!("Saved preference for user {user}");
        }
        Command::Form {
            user,
            user_name,
            json,
        } => {
            let service = service(config)?;
            let form = service
                .display_tab(PREFERENCE_ITEM_TYPE, UserId(user), &user_name)
                .await?
                .ok_or_else(|| color_eyre::eyre::eyre!("preference tab not available"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&form)?);
            } else {
                print_form(&form);
            }
        }
        other => color_eyre::eyre::bail!("not a preference command: {other:?}"),
    }
    Ok(())
}

/// Build a submission from the user's current record with the given fields replaced.
async fn apply_changes<R: PreferenceRepository>(
    service: &PreferenceService<R>,
    user_id: UserId,
    template: Option<String>,
    signature: Option<String>,
) -> Result<FormSubmission> {
    let id = service.repo().ensure_exists(user_id).await?;
    let current = service
        .repo()
        .get(id)
        .await?
        .ok_or_else(|| color_eyre::eyre::eyre!("preference {id} vanished"))?;
    Ok(FormSubmission {
        id,
        user_id,
        template: template.unwrap_or(current.template),
        signature: signature.unwrap_or(current.signature),
    })
}

fn print_files(files: &[FileEntry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(files)?);
        return Ok(());
    }
    if files.is_empty() {
        println!("No files found.");
        return Ok(());
    }
    for file in files {
        println!("{}  {}", file.modified, file.name);
    }
    Ok(())
}

fn print_form(form: &PreferenceForm) {
    println!("{}", form.title);
    print_dropdown("Use this model", &form.template);
    print_dropdown("Use this sign", &form.signature);
    if let Some(preview) = &form.signature_preview {
        println!("signature image: {}", preview.display());
    }
}

fn print_dropdown(label: &str, dropdown: &Dropdown) {
    println!("{label}:");
    for (value, text) in &dropdown.options {
        let marker = if *value == dropdown.selected { '*' } else { ' ' };
        println!("  {marker} {text}");
    }
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(none)"
    } else {
        value
    }
}
