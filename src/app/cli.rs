use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Observe,
    Create,
    Update,
    Delete,
    Reconcile,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "observe" => CliVerb::Observe,
        "create" => CliVerb::Create,
        "update" => CliVerb::Update,
        "delete" => CliVerb::Delete,
        "reconcile" => CliVerb::Reconcile,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOptions {
    pub resource: PathBuf,
    pub settings: Option<PathBuf>,
    pub credentials: Option<PathBuf>,
    pub delete: bool,
    pub write: bool,
}

pub fn parse_cli_options(args: &[String]) -> Result<CliOptions, String> {
    let mut resource = None;
    let mut options = CliOptions::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--resource" => resource = Some(PathBuf::from(flag_value(&mut iter, arg)?)),
            "--settings" => options.settings = Some(PathBuf::from(flag_value(&mut iter, arg)?)),
            "--credentials" => {
                options.credentials = Some(PathBuf::from(flag_value(&mut iter, arg)?))
            }
            "--delete" => options.delete = true,
            "--write" => options.write = true,
            other => return Err(format!("unknown option `{other}`")),
        }
    }

    options.resource = resource.ok_or_else(|| "missing required option `--resource`".to_string())?;
    Ok(options)
}

fn flag_value<'a>(
    iter: &mut impl Iterator<Item = &'a String>,
    flag: &str,
) -> Result<&'a String, String> {
    iter.next()
        .filter(|value| !value.starts_with("--"))
        .ok_or_else(|| format!("option `{flag}` requires a value"))
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Usage: pcluster-reconciler <command> --resource <file> [options]".to_string(),
        String::new(),
        "Commands:".to_string(),
        "  observe     Describe the cluster and check it against the desired configuration"
            .to_string(),
        "  create      Create the cluster from the desired configuration".to_string(),
        "  update      Apply the desired configuration to the cluster".to_string(),
        "  delete      Delete the cluster".to_string(),
        "  reconcile   Observe, then create, update or delete as needed".to_string(),
        String::new(),
        "Options:".to_string(),
        "  --resource <file>      Cluster resource document (yaml)".to_string(),
        "  --settings <file>      Settings document (yaml)".to_string(),
        "  --credentials <file>   Credential blob handed to the executor".to_string(),
        "  --delete               With reconcile: the cluster should be deleted".to_string(),
        "  --write                Save the resulting status back into the resource file"
            .to_string(),
    ]
}

pub fn help_text() -> String {
    cli_help_lines().join("\n")
}
