use crate::app::cli::{help_text, parse_cli_options, parse_cli_verb, CliOptions, CliVerb};
use crate::config::{ClusterDocument, Settings};
use crate::logging::ReconcileLog;
use crate::reconcile::{connect, new_process_executor, reconcile_once};
use serde_json::{json, Value};
use std::fs;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let Some(first) = args.first() else {
        return Ok(help_text());
    };

    let verb = parse_cli_verb(first);
    match verb {
        CliVerb::Help => return Ok(help_text()),
        CliVerb::Unknown => return Err(format!("unknown command `{first}`")),
        _ => {}
    }
    let options = parse_cli_options(&args[1..])?;
    run_verb(verb, &options)
}

fn load_settings(options: &CliOptions) -> Result<Settings, String> {
    let settings = match &options.settings {
        Some(path) => Settings::from_path(path).map_err(|err| err.to_string())?,
        None => Settings::default(),
    };
    settings.validate().map_err(|err| err.to_string())?;
    Ok(settings)
}

fn run_verb(verb: CliVerb, options: &CliOptions) -> Result<String, String> {
    let settings = load_settings(options)?;
    let credentials = match &options.credentials {
        Some(path) => fs::read(path)
            .map_err(|err| format!("failed to read credentials {}: {err}", path.display()))?,
        None => Vec::new(),
    };
    let log = match &settings.log_file {
        Some(path) => ReconcileLog::file(path),
        None => ReconcileLog::stderr(),
    };

    let mut document =
        ClusterDocument::from_path(&options.resource).map_err(|err| err.to_string())?;
    let mut cluster = document.to_cluster().map_err(|err| err.to_string())?;
    let client = connect(&settings, &credentials, new_process_executor, log)
        .map_err(|err| err.to_string())?;

    let result: Value = match verb {
        CliVerb::Observe => {
            let observation = client.observe(&mut cluster).map_err(|err| err.to_string())?;
            json!({
                "exists": observation.resource_exists,
                "upToDate": observation.resource_up_to_date,
            })
        }
        CliVerb::Create => {
            client.create(&mut cluster).map_err(|err| err.to_string())?;
            json!("created")
        }
        CliVerb::Update => {
            client.update(&mut cluster).map_err(|err| err.to_string())?;
            json!("updated")
        }
        CliVerb::Delete => {
            client.delete(&mut cluster).map_err(|err| err.to_string())?;
            json!("deleted")
        }
        CliVerb::Reconcile => {
            let outcome = reconcile_once(&client, &mut cluster, options.delete)
                .map_err(|err| err.to_string())?;
            json!(outcome)
        }
        CliVerb::Help | CliVerb::Unknown => return Ok(help_text()),
    };

    if options.write {
        document.set_status(cluster.status.clone());
        document
            .save(&options.resource)
            .map_err(|err| err.to_string())?;
    }

    let summary = json!({
        "cluster": cluster.spec.name,
        "result": result,
        "status": cluster.status,
    });
    serde_json::to_string_pretty(&summary).map_err(|err| err.to_string())
}
