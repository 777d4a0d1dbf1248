//! `courseforge generate` command: interactive two-stage generation loop.
//!
//! Drives the workflow state machine from the terminal. The current stage
//! decides what is rendered and which inputs are accepted, so the command
//! surface always matches the machine's legal intents.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use courseforge_core::gateway::{GatewayConfig, HttpGenerationGateway};
use courseforge_core::model::TextbookSubmission;
use courseforge_core::workflow::{WorkflowStage, WorkflowStateMachine};

use crate::render;

pub struct GenerateOptions {
    /// Read the textbook text from this file instead of prompting.
    pub file: Option<String>,
    pub module_count: u8,
    pub grade_level: Option<String>,
    pub subject: Option<String>,
}

/// Run the interactive generation session.
pub async fn run_generate(config: GatewayConfig, options: GenerateOptions) -> Result<()> {
    let gateway = HttpGenerationGateway::new(config)?;
    let machine = WorkflowStateMachine::new(Arc::new(gateway));

    // A --file argument feeds the first submission; later submissions
    // (after going back to input) are typed in.
    let mut pending_content = match &options.file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read textbook file {path}"))?,
        ),
        None => None,
    };

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        match machine.snapshot().stage {
            WorkflowStage::CollectingInput => {
                let content = match pending_content.take() {
                    Some(content) => content,
                    None => match read_textbook(&mut lines)? {
                        Some(content) => content,
                        None => return Ok(()),
                    },
                };

                let mut submission = TextbookSubmission::new(content);
                submission.module_count = options.module_count;
                submission.grade_level = options.grade_level.clone();
                submission.subject = options.subject.clone();

                println!("Generating course outline...");
                if let Err(error) = machine.submit_textbook(submission).await {
                    eprintln!("error: {error}");
                }
            }

            WorkflowStage::ShowingOutline => {
                let snapshot = machine.snapshot();
                let outline = snapshot
                    .outline
                    .context("outline stage without an outline")?;
                render::render_outline(&outline);

                let Some(input) =
                    prompt(&mut lines, "Module number to expand, 'i' new input, 'q' quit: ")?
                else {
                    return Ok(());
                };
                match input.as_str() {
                    "q" => return Ok(()),
                    "i" => machine.go_back_to_input(),
                    other => {
                        let module_id = match other.parse::<u32>().ok().and_then(|n| {
                            outline.modules.iter().find(|m| m.sequence == n)
                        }) {
                            Some(module) => module.module_id.clone(),
                            None => {
                                eprintln!("no module numbered {other:?} in this outline");
                                continue;
                            }
                        };
                        println!("Generating teaching detail...");
                        if let Err(error) = machine.select_module(&module_id).await {
                            eprintln!("error: {error}");
                        }
                    }
                }
            }

            WorkflowStage::ShowingDetail => {
                let snapshot = machine.snapshot();
                let detail = snapshot.detail.context("detail stage without a detail")?;
                render::render_detail(&detail);

                let Some(input) =
                    prompt(&mut lines, "'b' back to outline, 'i' new input, 'q' quit: ")?
                else {
                    return Ok(());
                };
                match input.as_str() {
                    "q" => return Ok(()),
                    "b" => {
                        machine.go_back_to_outline()?;
                    }
                    "i" => machine.go_back_to_input(),
                    other => eprintln!("unknown choice {other:?}"),
                }
            }
        }
    }
}

/// Print `message` and read one trimmed line. `None` means EOF.
fn prompt<B: BufRead>(
    lines: &mut io::Lines<B>,
    message: &str,
) -> Result<Option<String>> {
    print!("{message}");
    io::stdout().flush().context("failed to flush stdout")?;
    match lines.next() {
        Some(line) => Ok(Some(line.context("failed to read input")?.trim().to_owned())),
        None => Ok(None),
    }
}

/// Read textbook text from the terminal, terminated by an empty line.
/// `None` means EOF before any text arrived.
fn read_textbook<B: BufRead>(lines: &mut io::Lines<B>) -> Result<Option<String>> {
    println!("Paste textbook text, then an empty line to submit:");
    let mut content = String::new();
    loop {
        match lines.next() {
            Some(line) => {
                let line = line.context("failed to read input")?;
                if line.trim().is_empty() {
                    break;
                }
                content.push_str(&line);
                content.push('\n');
            }
            None => break,
        }
    }
    if content.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(content))
    }
}
