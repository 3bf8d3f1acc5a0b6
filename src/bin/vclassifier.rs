use std::env;
use std::sync::mpsc::{self, Receiver};

use cidrtrie::api::parser::RouteConfig;
use cidrtrie::api::repl::repl;
use cidrtrie::api::Command;
use cidrtrie::CidrClassifier;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cidrtrie=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut classifier: CidrClassifier<String> = CidrClassifier::new();

    match args.get(1).map(String::as_str) {
        None => {}
        Some("--config") if args.len() == 3 => match RouteConfig::try_new(args[2].clone()) {
            Ok(config) => config.apply(&mut classifier),
            Err(e) => {
                eprintln!("Failed to parse the route file: {}", e);
                std::process::exit(1);
            }
        },
        Some(_) => {
            eprintln!("Usage: {} [--config <route-file-path>]", args[0]);
            std::process::exit(1);
        }
    }
    info!(next_hops = classifier.len(), "classifier ready");

    // Create a channel for communication between the REPL and the classifier
    let (tx, rx) = mpsc::channel();

    // Spawn the REPL in a separate thread
    let repl_thread = std::thread::spawn(move || {
        if let Err(e) = repl(tx) {
            error!(error = %e, "repl failed");
        }
    });

    listen_for_commands(&mut classifier, rx);
    let _ = repl_thread.join();
}

/// Apply REPL commands until `exit` or until the REPL hangs up. The classifier never leaves
/// this thread.
fn listen_for_commands(classifier: &mut CidrClassifier<String>, receiver: Receiver<Command>) {
    while let Ok(command) = receiver.recv() {
        match command {
            Command::AddRoute(prefix, next_hop) => classifier.insert(prefix, next_hop),
            Command::RemoveRoute(prefix, next_hop) => {
                if let Err(e) = classifier.remove(prefix, &next_hop) {
                    println!("Error: cannot remove {} via {}: {}", prefix, next_hop, e);
                }
            }
            Command::Lookup(ip) => match classifier.lookup(&ip, true) {
                Ok(result) => println!("{}", result),
                Err(e) => println!("Error: {}", e),
            },
            Command::ListRoutes => {
                println!("Prefix              Next hops");
                for (prefix, next_hops) in classifier.routes() {
                    println!("{:<18}  {}", prefix.to_string(), next_hops.join(", "));
                }
            }
            Command::Exit => break,
        }
    }
}
