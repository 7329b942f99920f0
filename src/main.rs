// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Halimede CLI entrypoint.
//!
//! `format`, `check` and `locate` work on local files. `watch` opens a diagram on a backend,
//! subscribes to live updates and keeps the local session in step until the channel closes.

use std::error::Error;

use halimede::api::{HttpDiagramApi, ServerMessage, SessionScope};
use halimede::config::EditorConfig;
use halimede::format::autoformat;
use halimede::format::mermaid::check_source;
use halimede::locate::{locate_edge, locate_node};
use halimede::model::DiagramId;
use halimede::session::{EditorSession, RemoteOutcome};
use halimede::sync::{CollabSyncClient, WsTransport};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "HALIMEDE_LOG";

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  \
         {program} [--config <file>] format <file>\n  \
         {program} [--config <file>] check <file>\n  \
         {program} [--config <file>] locate <file> <node-id>\n  \
         {program} [--config <file>] locate <file> --edge <source> <target>\n  \
         {program} [--config <file>] watch --server <url> --project <id> --session <id> \
         <diagram-id>\n\n\
         `format` prints the canonical layout of a flowchart to stdout.\n\
         `watch` derives the live-channel url from --server (http -> ws).\n\n\
         Logging is controlled by {LOG_ENV} (default `info`)."
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Format { file: String },
    Check { file: String },
    LocateNode { file: String, id: String },
    LocateEdge { file: String, source: String, target: String },
    Watch { server: String, project: String, session: String, diagram: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config: Option<String>,
    command: Command,
}

fn parse_options(args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut config = None;
    let mut server = None;
    let mut project = None;
    let mut session = None;
    let mut edge = false;
    let mut positional = Vec::new();

    let mut args = args;
    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--config" => &mut config,
            "--server" => &mut server,
            "--project" => &mut project,
            "--session" => &mut session,
            "--edge" => {
                if edge {
                    return Err(());
                }
                edge = true;
                continue;
            }
            _ if arg.starts_with('-') => return Err(()),
            _ => {
                positional.push(arg);
                continue;
            }
        };
        if slot.is_some() {
            return Err(());
        }
        *slot = Some(args.next().ok_or(())?);
    }

    let mut positional = positional.into_iter();
    let name = positional.next().ok_or(())?;
    let rest: Vec<String> = positional.collect();
    let is_watch = name == "watch";
    if !is_watch && (server.is_some() || project.is_some() || session.is_some()) {
        return Err(());
    }
    if name != "locate" && edge {
        return Err(());
    }

    let command = match (name.as_str(), rest.as_slice()) {
        ("format", [file]) => Command::Format { file: file.clone() },
        ("check", [file]) => Command::Check { file: file.clone() },
        ("locate", [file, id]) if !edge => {
            Command::LocateNode { file: file.clone(), id: id.clone() }
        }
        ("locate", [file, source, target]) if edge => Command::LocateEdge {
            file: file.clone(),
            source: source.clone(),
            target: target.clone(),
        },
        ("watch", [diagram]) => Command::Watch {
            server: server.ok_or(())?,
            project: project.ok_or(())?,
            session: session.ok_or(())?,
            diagram: diagram.clone(),
        },
        _ => return Err(()),
    };

    Ok(CliOptions { config, command })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn ws_base(server: &str) -> String {
    if let Some(rest) = server.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        server.to_owned()
    }
}

fn run_check(file: &str) -> Result<bool, Box<dyn Error>> {
    let text = std::fs::read_to_string(file)?;
    match check_source(&text) {
        Ok(dialect) => {
            println!("ok ({dialect:?})");
            Ok(true)
        }
        Err(err) => {
            println!("{file}: {err}");
            Ok(false)
        }
    }
}

async fn run_watch(
    server: &str,
    project: &str,
    session: &str,
    diagram: &str,
    config: &EditorConfig,
) -> Result<(), Box<dyn Error>> {
    let scope = SessionScope::new(Some(project), Some(session))?;
    let id = DiagramId::new(diagram)?;
    let api = HttpDiagramApi::new(server, scope.clone());

    let transport = WsTransport::new(&ws_base(server), &scope);
    let mut client = CollabSyncClient::from_config(transport, config);
    let handle = client.handle();
    let mut editor = EditorSession::open(&api, id.clone(), api.clone(), config)
        .await?
        .with_sync_state(handle.state().clone());

    let (inbound_tx, mut inbound) = mpsc::unbounded_channel::<ServerMessage>();
    client.on_message(move |message| {
        let _ = inbound_tx.send(message.clone());
    });
    client.on_status(|status| info!(%status, "live channel"));
    handle.subscribe(&id);

    let editor_loop = async {
        loop {
            tokio::select! {
                message = inbound.recv() => {
                    let Some(message) = message else { break };
                    match editor.receive_remote(&message) {
                        RemoteOutcome::Applied => println!("{}", editor.text()),
                        RemoteOutcome::Orphaned => {
                            warn!(diagram = %id, "diagram deleted; stopping");
                            handle.shutdown();
                            break;
                        }
                        RemoteOutcome::Echo
                        | RemoteOutcome::Unchanged
                        | RemoteOutcome::Ignored => {}
                    }
                }
                text = editor.next_autosave() => {
                    if let Err(err) = editor.persist(&api, text).await {
                        warn!(error = %err, "autosave failed");
                    }
                }
            }
        }
        editor.close(&api).await
    };

    let ((), closed) = tokio::join!(client.run(), editor_loop);
    closed?;
    Ok(())
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "halimede".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        init_tracing();
        let config = match &options.config {
            Some(path) => EditorConfig::load(path)?,
            None => EditorConfig::default(),
        };

        match options.command {
            Command::Format { file } => {
                let text = std::fs::read_to_string(&file)?;
                print!("{}", autoformat(&text)?);
            }
            Command::Check { file } => {
                if !run_check(&file)? {
                    std::process::exit(1);
                }
            }
            Command::LocateNode { file, id } => {
                let text = std::fs::read_to_string(&file)?;
                match locate_node(&text, &id) {
                    Some(found) => {
                        let (line, column) = (found.line + 1, found.column + 1);
                        println!("{file}:{line}:{column}: {}", found.line_text)
                    }
                    None => std::process::exit(1),
                }
            }
            Command::LocateEdge { file, source, target } => {
                let text = std::fs::read_to_string(&file)?;
                match locate_edge(&text, &source, &target) {
                    Some(found) => println!("{}:{}: {}", file, found.line + 1, found.line_text),
                    None => std::process::exit(1),
                }
            }
            Command::Watch { server, project, session, diagram } => {
                let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
                runtime.block_on(run_watch(&server, &project, &session, &diagram, &config))?;
            }
        }
        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_options, ws_base, CliOptions, Command};

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values.iter().map(|value| (*value).to_owned()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_format() {
        let options = parse_options(args(&["format", "flow.mmd"])).expect("parse options");
        assert_eq!(
            options,
            CliOptions { config: None, command: Command::Format { file: "flow.mmd".to_owned() } }
        );
    }

    #[test]
    fn parses_config_anywhere() {
        let options = parse_options(args(&["check", "flow.mmd", "--config", "editor.json"]))
            .expect("parse options");
        assert_eq!(options.config.as_deref(), Some("editor.json"));
        assert_eq!(options.command, Command::Check { file: "flow.mmd".to_owned() });
    }

    #[test]
    fn parses_locate_node_and_edge() {
        let node = parse_options(args(&["locate", "flow.mmd", "A"])).expect("parse options");
        assert_eq!(
            node.command,
            Command::LocateNode { file: "flow.mmd".to_owned(), id: "A".to_owned() }
        );

        let edge = parse_options(args(&["locate", "flow.mmd", "--edge", "A", "B"]))
            .expect("parse options");
        assert_eq!(
            edge.command,
            Command::LocateEdge {
                file: "flow.mmd".to_owned(),
                source: "A".to_owned(),
                target: "B".to_owned(),
            }
        );
    }

    #[test]
    fn parses_watch() {
        let options = parse_options(args(&[
            "watch",
            "--server",
            "http://localhost:3000",
            "--project",
            "p1",
            "--session",
            "s1",
            "auth-flow",
        ]))
        .expect("parse options");
        assert_eq!(
            options.command,
            Command::Watch {
                server: "http://localhost:3000".to_owned(),
                project: "p1".to_owned(),
                session: "s1".to_owned(),
                diagram: "auth-flow".to_owned(),
            }
        );
    }

    #[test]
    fn watch_requires_scope() {
        parse_options(args(&["watch", "--server", "http://x", "--project", "p1", "d1"]))
            .unwrap_err();
    }

    #[test]
    fn rejects_unknown_and_duplicate_flags() {
        parse_options(args(&["--nope", "format", "a"])).unwrap_err();
        parse_options(args(&["--config", "a", "--config", "b", "format", "x"])).unwrap_err();
        parse_options(args(&["locate", "f", "--edge", "--edge", "A", "B"])).unwrap_err();
    }

    #[test]
    fn rejects_misplaced_flags_and_arity() {
        parse_options(args(&["format", "a", "--server", "http://x"])).unwrap_err();
        parse_options(args(&["check", "--edge", "a"])).unwrap_err();
        parse_options(args(&["format"])).unwrap_err();
        parse_options(args(&["locate", "f", "--edge", "A"])).unwrap_err();
        parse_options(std::iter::empty()).unwrap_err();
    }

    #[test]
    fn derives_socket_base_from_server() {
        assert_eq!(ws_base("http://localhost:3000"), "ws://localhost:3000");
        assert_eq!(ws_base("https://example.com"), "wss://example.com");
        assert_eq!(ws_base("ws://already"), "ws://already");
    }
}
