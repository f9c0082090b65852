//! REPL - terminal chat with the analysis assistant
//!
//! Plain lines are chat messages. Slash commands stage scans and submit
//! biomarkers:
//!
//! ```text
//! /attach <path>   stage a scan for the next message
//! /remove <n>      unstage scan number n
//! /files           list staged scans
//! /bio <csv>       submit gender,age,educ,ses,mmse,etiv,nwbv
//! /help            this list
//! /quit            leave
//! ```
//!
//! Input is read only after the previous request finished, so there is never
//! more than one request in flight.

use crate::commands::AppContext;
use crate::progress::with_busy;
use anyhow::Result;
use mnemos_common::render::{format_message, paint, RenderOptions};
use mnemos_common::{
    BiomarkerPanel, ChatSession, ImageUpload, InferenceGateway, SendOutcome, Sender,
};
use owo_colors::OwoColorize;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

const HELP: &str = "/attach <path>  stage a scan (png, jpg, jpeg, gif, dcm, dicom)
/remove <n>     unstage scan number n
/files          list staged scans
/bio <csv>      submit gender,age,educ,ses,mmse,etiv,nwbv
/quit           leave";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Plain text, possibly empty
    Send(String),
    Attach(PathBuf),
    /// 1-based index as shown by `/files`
    Remove(usize),
    Files,
    Bio(String),
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return ReplCommand::Send(line.to_string());
    };

    let (command, arg) = rest
        .split_once(char::is_whitespace)
        .map(|(c, a)| (c, a.trim()))
        .unwrap_or((rest, ""));

    match command {
        "attach" if !arg.is_empty() => ReplCommand::Attach(PathBuf::from(arg)),
        "remove" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => ReplCommand::Remove(n),
            _ => ReplCommand::Unknown(line.to_string()),
        },
        "files" => ReplCommand::Files,
        "bio" if !arg.is_empty() => ReplCommand::Bio(arg.to_string()),
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(line.to_string()),
    }
}

/// Print assistant messages appended since `printed`; returns the new mark
fn print_new<G: InferenceGateway, W: Write>(
    chat: &ChatSession<G>,
    printed: usize,
    out: &mut W,
    options: RenderOptions,
) -> Result<usize> {
    let messages = chat.conversation().messages();
    for message in messages.iter().skip(printed) {
        if message.sender() == Sender::Assistant {
            writeln!(out, "{}\n", format_message(message, options))?;
        }
    }
    Ok(messages.len())
}

fn prompt<G: InferenceGateway>(chat: &ChatSession<G>) -> String {
    match chat.staged().len() {
        0 => ">".to_string(),
        1 => "[1 scan] >".to_string(),
        n => format!("[{} scans] >", n),
    }
}

/// Drive a chat session from `input` until EOF or `/quit`
pub async fn run<G, R, W>(
    chat: &mut ChatSession<G>,
    input: R,
    out: &mut W,
    options: RenderOptions,
) -> Result<()>
where
    G: InferenceGateway,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let color = options.color;
    let mut printed = print_new(chat, 0, out, options)?;
    writeln!(
        out,
        "{}",
        paint(color, "Type /help for commands.", |t| t.dimmed().to_string())
    )?;

    let mut lines = input.lines();
    loop {
        write!(
            out,
            "{} ",
            paint(color, &prompt(chat), |t| t.bright_cyan().to_string())
        )?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            ReplCommand::Send(text) => {
                let message = if chat.staged().is_empty() {
                    "Thinking..."
                } else {
                    "Analyzing scans..."
                };
                if let SendOutcome::Sent { .. } = with_busy(message, chat.send(&text)).await {
                    printed = print_new(chat, printed, out, options)?;
                }
            }
            ReplCommand::Attach(path) => match ImageUpload::from_path(&path) {
                Ok(upload) => {
                    writeln!(out, "  staged {}", upload.file_name)?;
                    chat.stage_file(upload);
                }
                Err(err) => writeln!(
                    out,
                    "  {} {}",
                    paint(color, "cannot attach:", |t| t.red().to_string()),
                    err
                )?,
            },
            ReplCommand::Remove(n) => match chat.unstage(n - 1) {
                Some(upload) => writeln!(out, "  removed {}", upload.file_name)?,
                None => writeln!(out, "  no staged scan #{}", n)?,
            },
            ReplCommand::Files => {
                let names = chat.staged().names();
                if names.is_empty() {
                    writeln!(out, "  no scans staged")?;
                }
                for (i, name) in names.iter().enumerate() {
                    writeln!(out, "  {}. {}", i + 1, name)?;
                }
            }
            ReplCommand::Bio(csv) => match BiomarkerPanel::parse_csv(&csv) {
                Ok(panel) => {
                    for warning in panel.range_warnings() {
                        writeln!(
                            out,
                            "  {} {}",
                            paint(color, "warning:", |t| t.yellow().to_string()),
                            warning
                        )?;
                    }
                    with_busy("Analyzing biomarkers...", chat.submit_biomarkers(&panel)).await;
                    printed = print_new(chat, printed, out, options)?;
                }
                Err(err) => writeln!(
                    out,
                    "  {} {}",
                    paint(color, "cannot submit:", |t| t.red().to_string()),
                    err
                )?,
            },
            ReplCommand::Help => writeln!(out, "{}", HELP)?,
            ReplCommand::Quit => break,
            ReplCommand::Unknown(line) => {
                writeln!(out, "  unknown command {:?}; /help lists commands", line)?
            }
        }
    }

    Ok(())
}

/// Interactive chat on stdin/stdout
pub async fn start(ctx: &AppContext) -> Result<()> {
    let mut chat = ChatSession::new(ctx.gateway()?);
    let stdin = BufReader::new(tokio::io::stdin());
    run(&mut chat, stdin, &mut std::io::stdout(), ctx.render).await
}
