use ipnet::Ipv4Net;
use rustyline::{DefaultEditor, Result};
use std::sync::mpsc::Sender;
use tracing::debug;

use crate::api::Command;

pub fn repl(sender: Sender<Command>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("> ");
        match readline {
            Ok(line) => {
                let args: Vec<&str> = line.split_whitespace().collect();
                if args.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                let command = match parse_command(&args) {
                    Ok(command) => command,
                    Err(usage) => {
                        println!("{}", usage);
                        continue;
                    }
                };
                let exit = matches!(command, Command::Exit);

                // Receiver gone means the classifier thread has stopped
                if sender.send(command).is_err() {
                    debug!("command receiver closed, leaving repl");
                    break;
                }
                if exit {
                    break;
                }
            }
            Err(err) => {
                println!("Error: {:?}", err);
                let _ = sender.send(Command::Exit);
                break;
            }
        }
    }
    Ok(())
}

fn parse_command(args: &[&str]) -> std::result::Result<Command, String> {
    match args[0] {
        "add" => match args {
            [_, prefix, next_hop] => Ok(Command::AddRoute(parse_prefix(prefix)?, next_hop.to_string())),
            _ => Err("Usage: add <prefix> <next-hop>".to_string()),
        },
        "del" => match args {
            [_, prefix, next_hop] => Ok(Command::RemoveRoute(parse_prefix(prefix)?, next_hop.to_string())),
            _ => Err("Usage: del <prefix> <next-hop>".to_string()),
        },
        "lookup" | "lu" => match args {
            [_, ip] => Ok(Command::Lookup(ip.to_string())),
            _ => Err("Usage: lookup <addr>".to_string()),
        },
        "lr" => Ok(Command::ListRoutes),
        "exit" => Ok(Command::Exit),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn parse_prefix(input: &str) -> std::result::Result<Ipv4Net, String> {
    input
        .parse()
        .map_err(|e| format!("Invalid prefix {}: {}", input, e))
}
