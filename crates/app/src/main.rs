//! Terminal front end for the chat + code-preview core.
//!
//! Presentation only: reads prompts from stdin, prints the streamed
//! answer incrementally, and shows the preview pane state. All turn and
//! preview mutations happen inside the conversation controller.

mod config;

use anyhow::Result;
use conversation::controller::{Applied, ChatController, SessionEvent};
use shared::turn::Attachment;
use std::io::Write as _;
use std::path::Path;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

enum Step {
    Input(Option<String>),
    Event(Option<SessionEvent>),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = config::load_settings();
    let mut controller = ChatController::from_settings(&settings)?;

    // Fresh backend context for every app session.
    controller.reset().await;

    println!("uigenius — describe a UI and watch the code preview.");
    println!("commands: /image <path>  /open  /close  /history  /new  /quit");

    let mut input = spawn_stdin_reader();
    let mut staged_attachment: Option<Attachment> = None;
    // Byte length of the answer prefix already printed.
    let mut printed = 0usize;

    loop {
        let step = tokio::select! {
            line = input.recv() => Step::Input(line),
            event = controller.next_event() => Step::Event(event),
        };

        match step {
            Step::Input(None) => break,
            Step::Input(Some(line)) => {
                let line = line.trim().to_string();
                match line.as_str() {
                    "" => {}
                    "/quit" => break,
                    "/new" => {
                        controller.reset().await;
                        staged_attachment = None;
                        printed = 0;
                        println!("(new chat)");
                    }
                    "/open" => {
                        controller.open_preview();
                        if controller.preview().visible() {
                            print_preview(&controller);
                        } else {
                            println!("(no code to preview)");
                        }
                    }
                    "/close" => {
                        controller.close_preview();
                        println!("(preview closed)");
                    }
                    "/history" => print_history(&controller),
                    _ if line.starts_with("/image") => {
                        let path = line.trim_start_matches("/image").trim();
                        if path.is_empty() {
                            println!("usage: /image <path>");
                        } else {
                            match load_attachment(Path::new(path)) {
                                Ok(att) => {
                                    println!("(attached {})", att.file_name);
                                    staged_attachment = Some(att);
                                }
                                Err(e) => println!("could not attach image: {e}"),
                            }
                        }
                    }
                    _ => {
                        // The staged image rides along on exactly one send.
                        if controller.send(&line, staged_attachment.take()).is_some() {
                            printed = 0;
                        }
                    }
                }
            }
            Step::Event(None) => break,
            Step::Event(Some(event)) => match controller.apply(event)? {
                Applied::Updated(text) => {
                    print!("{}", &text[printed..]);
                    std::io::stdout().flush().ok();
                    printed = text.len();
                }
                Applied::Completed {
                    answer,
                    preview_open,
                } => {
                    println!("{}", &answer[printed..]);
                    printed = 0;
                    if preview_open {
                        print_preview(&controller);
                    }
                }
                Applied::Failed(message) => {
                    println!();
                    println!("[request failed: {message}]");
                    printed = 0;
                }
                Applied::Stale => {}
            },
        }
    }

    Ok(())
}

fn print_history(controller: &ChatController) {
    let turns = controller.store().turns();
    if turns.is_empty() {
        println!("(no messages yet)");
        return;
    }
    for turn in turns {
        let marker = if turn.is_live { " …" } else { "" };
        println!(
            "[{}] {}> {}{}",
            turn.timestamp.format("%H:%M"),
            turn.role.as_str(),
            turn.content,
            marker
        );
    }
}

fn print_preview(controller: &ChatController) {
    let preview = controller.preview();
    let lang = preview.language().unwrap_or("code");
    println!("--- preview ({lang}) ---");
    println!("{}", preview.code());
    println!("--- end preview ---");
}

/// Blocking stdin reader on its own thread, feeding the async loop.
fn spawn_stdin_reader() -> UnboundedReceiver<String> {
    let (tx, rx) = unbounded_channel();
    std::thread::spawn(move || {
        use std::io::BufRead;
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if tx.send(l).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

fn load_attachment(path: &Path) -> Result<Attachment> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let mime_type = match path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("jpg") | Some("jpeg") | None => "image/jpeg",
        Some(_) => "application/octet-stream",
    }
    .to_string();
    Ok(Attachment {
        file_name,
        mime_type,
        bytes,
    })
}
