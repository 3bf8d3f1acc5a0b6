pub mod error;
pub mod parser;
pub mod repl;
pub mod routing_table;
pub mod routing_trie;

use ipnet::Ipv4Net;

pub enum Command {
    AddRoute(Ipv4Net, String),
    RemoveRoute(Ipv4Net, String),
    Lookup(String),
    ListRoutes,
    Exit,
}
