//! The `setup` subcommand: upload a directory of reference files, create the
//! assistant over them and print the id the operator has to configure.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use futures_util::future::join_all;
use quill_ai::{AssistantClient, AssistantConfig};

const ASSISTANT_TOOL_TYPE: &str = "file";

const ASSISTANT_INSTRUCTIONS: &str = "You are a feedback assistant. You are used by the user to \
generate feedback for a colleague. Please ask a set of maximum 10 questions to be able to write \
a feedback to the users colleague. The feedback should be objective and neutral.\n\
Decide for yourself which questions are best suited to get a complete and meaningful overall \
impression. Use the attached files as a basis. The output in markdown.\n\
Before you can ask the user specific questions you need to find out in which competence the \
colleague to whom the user wants to provide feedback is working. Please also find out in which \
relation the user and the colleague are, e.g. is it your AL (Accountable Lead), CL (Competence \
Lead), is it a team member? Also ask the user in which context he wants to provide the feedback, \
like a project, a hackathon, day to days situations or observations from a specific meeting \
could be examples.\n\
Use the attached files to generate further questions you will ask the user to gather more \
information before you generate on behalf of the user a written text of feedback the user can \
provide to his colleague.\n\
When you ask the questions to the user it should be done 1 by 1 and not all at once, so that it \
is a conversation between you and the user.\n\
Be sure to stay in your role and don't digress from the topic at hand, even if the user asks \
you to.";

#[derive(Debug, Args)]
pub(crate) struct SetupArgs {
    /// Directory holding the reference PDFs to upload.
    #[arg(long, short = 'd')]
    dir: PathBuf,
    #[arg(long, default_value = "Feedback Assistant")]
    name: String,
    #[arg(long, default_value = "gpt-4")]
    model: String,
    /// Skip the interactive confirmations.
    #[arg(long)]
    yes: bool,

    #[arg(long, env = "OPENAI_API_URL")]
    openai_api_url: String,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,
    #[arg(long, env = "OPENAI_ORGANIZATION")]
    openai_organization: Option<String>,
    /// Guard against double bootstrap: refuses to run when already set.
    #[arg(long, env = "OPENAI_ASSISTANT_ID")]
    assistant_id: Option<String>,
}

pub(crate) async fn run(args: SetupArgs) -> Result<()> {
    if args
        .assistant_id
        .as_deref()
        .is_some_and(|id| !id.trim().is_empty())
    {
        bail!("assistant already created; unset OPENAI_ASSISTANT_ID to bootstrap again");
    }

    let client = AssistantClient::new(AssistantConfig {
        api_base: args.openai_api_url,
        api_key: args.openai_api_key,
        organization: args.openai_organization,
        ..AssistantConfig::default()
    })
    .context("invalid assistant configuration")?;

    let files = collect_pdf_files(&args.dir)?;
    if files.is_empty() {
        bail!("no .pdf files found in {}", args.dir.display());
    }

    println!("About to upload the following files:\n");
    for file in &files {
        println!("  * {}", file.display());
    }
    confirm(args.yes, "\nPress enter to upload, ctrl+c to abort.")?;

    let uploads = join_all(files.iter().map(|path| client.upload_file(path))).await;
    let mut file_ids = Vec::new();
    for (path, upload) in files.iter().zip(uploads) {
        match upload {
            Ok(file) => {
                println!("Uploaded {}: {}", file.id, path.display());
                file_ids.push(file.id);
            }
            Err(error) => eprintln!("Upload error {}: {error}", path.display()),
        }
    }
    if file_ids.is_empty() {
        bail!("every upload failed; nothing to create the assistant from");
    }

    println!("\nAbout to create an assistant over the uploaded files:\n");
    for id in &file_ids {
        println!("  * {id}");
    }
    confirm(args.yes, "\nPress enter to create it, ctrl+c to abort.")?;

    let assistant = client
        .create_assistant(
            &args.name,
            ASSISTANT_INSTRUCTIONS,
            &args.model,
            ASSISTANT_TOOL_TYPE,
            &file_ids,
        )
        .await
        .context("failed to create assistant")?;

    println!(
        "\nAssistant created. Set this in your environment:\n\n  OPENAI_ASSISTANT_ID={}\n",
        assistant.id
    );
    Ok(())
}

fn collect_pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?;
    if !metadata.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let mut files = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"))
        })
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}

fn confirm(skip: bool, prompt: &str) -> Result<()> {
    if skip {
        return Ok(());
    }
    println!("{prompt}");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read confirmation")?;
    Ok(())
}
