use std::fs;

use ipnet::Ipv4Net;
use tracing::info;

use super::error::ConfigError;
use super::routing_table::CidrClassifier;

/// A prefix and the next hop it maps to.
pub type StaticRoute = (Ipv4Net, String);

/// Routes loaded from a route file.
///
/// ```text
/// # comment
/// route 192.168.0.0/24 via HopA
/// route 192.168.0.0/24 via HopB
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteConfig {
  pub routes: Vec<StaticRoute>,
}

impl RouteConfig {
  pub fn try_new(path: String) -> Result<RouteConfig, ConfigError> {
    let contents = fs::read_to_string(&path).map_err(|e| ConfigError::FileError {
      message: format!("{}: {}", path, e),
    })?;
    let config = Self::parse(&contents)?;
    info!(path = %path, routes = config.routes.len(), "loaded route file");
    Ok(config)
  }

  pub fn parse(contents: &str) -> Result<RouteConfig, ConfigError> {
    let mut routes = Vec::new();

    for (index, raw) in contents.lines().enumerate() {
      let line = raw.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      routes.push(Self::parse_route(line, index + 1)?);
    }

    Ok(RouteConfig { routes })
  }

  fn parse_route(line: &str, line_no: usize) -> Result<StaticRoute, ConfigError> {
    let parse_error = |message: String| ConfigError::ParseError { line: line_no, message };

    let args: Vec<&str> = line.split_whitespace().collect();
    match args.as_slice() {
      ["route", prefix, "via", next_hop] => {
        let prefix: Ipv4Net = prefix
          .parse()
          .map_err(|e| parse_error(format!("bad prefix {}: {}", prefix, e)))?;
        Ok((prefix, next_hop.to_string()))
      }
      _ => Err(parse_error(format!("expected `route <prefix> via <next-hop>`, got `{}`", line))),
    }
  }

  /// Load every route into `classifier`, in file order.
  pub fn apply(&self, classifier: &mut CidrClassifier<String>) {
    for (prefix, next_hop) in &self.routes {
      classifier.insert(*prefix, next_hop.clone());
    }
  }
}
