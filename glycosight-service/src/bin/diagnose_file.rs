use std::env;
use std::path::Path;

use anyhow::{Context, Result, bail};
use glycosight_service::{AppConfig, Collaborators, Outcome, WorkflowState, create_flow_runner};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: {} <user_id> <pdf|image|dicom> <file_path>", args[0]);
        eprintln!("Example: {} user-42 pdf /path/to/lab_report.pdf", args[0]);
        std::process::exit(1);
    }
    let (user_id, input_type, source) = (&args[1], &args[2], Path::new(&args[3]));

    let config = AppConfig::from_env()?;
    let deps = Collaborators::from_config(&config).await?;
    let runner = create_flow_runner(deps, config.run_timeout)?;

    // Work on a scratch copy so converted files never land next to the original.
    let scratch = tempfile::tempdir()?;
    let file_name = source
        .file_name()
        .with_context(|| format!("{} has no file name", source.display()))?;
    let upload = scratch.path().join(file_name);
    tokio::fs::copy(source, &upload)
        .await
        .with_context(|| format!("cannot read {}", source.display()))?;

    println!("Diagnosing {} as {} for {}", source.display(), input_type, user_id);
    let result = runner
        .run(WorkflowState::new(user_id.as_str(), upload, input_type.as_str()))
        .await?;
    println!("Path: {}", result.visited.join(" -> "));
    println!();

    match result.state.into_outcome() {
        Some(Outcome::Success(diagnosis)) => {
            println!("{}", serde_json::to_string_pretty(&diagnosis)?);
            Ok(())
        }
        Some(Outcome::Failure(message)) => bail!(message),
        None => bail!("workflow did not produce a final response"),
    }
}
