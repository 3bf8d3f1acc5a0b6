use std::fmt;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use tracing::{debug, warn};

use super::error::{ClassifierError, TrieError};
use super::routing_trie::{MatchMode, PrefixTrie};
use crate::utils::ip_utils::{bits_to_ip, ip_to_bits, prefix_bits};

/// Outcome of a lookup: the matched network, its mask length and the next hops stored there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrResult<'a, V> {
  pub base: Ipv4Addr,
  pub mask: u8,
  pub next_hops: &'a [V],
}

impl<'a, V> CidrResult<'a, V> {
  /// The `0.0.0.0/0` result with no next hops, handed out for uncovered addresses.
  pub fn unroutable() -> Self {
    CidrResult {
      base: Ipv4Addr::UNSPECIFIED,
      mask: 0,
      next_hops: &[],
    }
  }

  // Stored prefixes always carry at least one hop
  pub fn is_unroutable(&self) -> bool {
    self.next_hops.is_empty()
  }
}

impl<V: fmt::Display> fmt::Display for CidrResult<'_, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.base, self.mask)?;
    if self.is_unroutable() {
      return write!(f, " unroutable");
    }
    for (i, hop) in self.next_hops.iter().enumerate() {
      let sep = if i == 0 { " via " } else { ", " };
      write!(f, "{}{}", sep, hop)?;
    }
    Ok(())
  }
}

/// Maps IPv4 prefixes to next hops and resolves addresses by longest-prefix match.
#[derive(Debug)]
pub struct CidrClassifier<V> {
  // The mask is never stored: it is the depth of the terminal node
  trie: PrefixTrie<bool, V>,
}

impl<V> Default for CidrClassifier<V> {
  fn default() -> Self {
    CidrClassifier { trie: PrefixTrie::new() }
  }
}

impl<V> CidrClassifier<V> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add `next_hop` for `prefix`. Host bits past the prefix length are not checked, the
  /// prefix is stored by its literal leading bits.
  pub fn insert(&mut self, prefix: Ipv4Net, next_hop: V) {
    let key = prefix_bits(prefix.addr(), prefix.prefix_len());
    self.trie.insert(&key, next_hop);
    debug!(%prefix, "added mapping");
  }

  /// Remove one copy of `next_hop` from `prefix`. The prefix must be given exactly as it was
  /// inserted.
  pub fn remove(&mut self, prefix: Ipv4Net, next_hop: &V) -> Result<V, TrieError>
  where
    V: PartialEq,
  {
    let key = prefix_bits(prefix.addr(), prefix.prefix_len());
    let removed = self.trie.remove(&key, next_hop)?;
    debug!(%prefix, "removed mapping");
    Ok(removed)
  }

  /// Longest-prefix match for `ip`
  ///
  /// # Returns
  ///
  /// The most specific stored prefix covering `ip`, or `KeyNotFound` if none does.
  pub fn lookup_addr(&self, ip: Ipv4Addr) -> Result<CidrResult<'_, V>, TrieError> {
    let (prefix, next_hops) = self.trie.find(&ip_to_bits(ip), MatchMode::LongestPrefix)?;
    let result = CidrResult {
      base: bits_to_ip(&prefix),
      mask: prefix.len() as u8,
      next_hops,
    };
    debug!(%ip, base = %result.base, mask = result.mask, hops = next_hops.len(), "lookup");
    Ok(result)
  }

  /// Add a mapping `base/mask -> next_hop` from a dotted-decimal base address.
  pub fn add_mapping(&mut self, base: &str, mask: u8, next_hop: V) -> Result<(), ClassifierError> {
    let prefix = Self::parse_prefix(base, mask)?;
    self.insert(prefix, next_hop);
    Ok(())
  }

  pub fn remove_mapping(&mut self, base: &str, mask: u8, next_hop: &V) -> Result<V, ClassifierError>
  where
    V: PartialEq,
  {
    let prefix = Self::parse_prefix(base, mask)?;
    Ok(self.remove(prefix, next_hop)?)
  }

  /// Look up a dotted-decimal address
  ///
  /// # Arguments
  ///
  /// * `ip`: The address to classify
  /// * `return_unroutable`: Answer a miss with [`CidrResult::unroutable`] instead of an error
  ///
  /// # Returns
  ///
  /// The matched prefix. A malformed `ip` is always an error, whatever `return_unroutable` says.
  pub fn lookup(&self, ip: &str, return_unroutable: bool) -> Result<CidrResult<'_, V>, ClassifierError> {
    let addr = Self::parse_addr(ip)?;
    match self.lookup_addr(addr) {
      Ok(result) => Ok(result),
      Err(TrieError::KeyNotFound) if return_unroutable => {
        warn!(%addr, "no covering prefix, answering unroutable");
        Ok(CidrResult::unroutable())
      }
      Err(e) => Err(e.into()),
    }
  }

  /// Every stored prefix with its next hops, ordered by address bits then by length.
  pub fn routes(&self) -> impl Iterator<Item = (Ipv4Net, &[V])> + '_ {
    self.trie.iter().filter_map(|(bits, next_hops)| {
      Ipv4Net::new(bits_to_ip(&bits), bits.len() as u8)
        .ok()
        .map(|prefix| (prefix, next_hops))
    })
  }

  /// Number of stored next hops across all prefixes.
  pub fn len(&self) -> usize {
    self.trie.len()
  }

  pub fn is_empty(&self) -> bool {
    self.trie.is_empty()
  }

  /// Reclaim trie nodes left behind by removals. Lookup results do not change.
  pub fn compact(&mut self) -> usize {
    self.trie.compact()
  }

  fn parse_addr(input: &str) -> Result<Ipv4Addr, ClassifierError> {
    input.parse().map_err(|source| ClassifierError::InvalidAddress {
      input: input.to_string(),
      source,
    })
  }

  fn parse_prefix(base: &str, mask: u8) -> Result<Ipv4Net, ClassifierError> {
    let addr = Self::parse_addr(base)?;
    Ipv4Net::new(addr, mask).map_err(|_| ClassifierError::InvalidMask(mask))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn addr(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
  }

  #[test]
  fn ecmp_hops_come_back_in_insertion_order() {
    let mut c = CidrClassifier::new();
    c.add_mapping("192.168.0.0", 24, "HopA").unwrap();
    c.add_mapping("192.168.0.0", 24, "HopB").unwrap();

    let result = c.lookup("192.168.0.1", false).unwrap();
    assert_eq!(result.base, addr("192.168.0.0"));
    assert_eq!(result.mask, 24);
    assert_eq!(result.next_hops, &["HopA", "HopB"]);
  }

  #[test]
  fn longer_mask_wins() {
    let mut c = CidrClassifier::new();
    c.add_mapping("10.0.0.0", 24, "HopA").unwrap();
    c.add_mapping("10.0.0.0", 25, "HopC").unwrap();

    let result = c.lookup("10.0.0.1", false).unwrap();
    assert_eq!((result.base, result.mask), (addr("10.0.0.0"), 25));
    assert_eq!(result.next_hops, &["HopC"]);

    // Upper half of the /24 is outside the /25
    let result = c.lookup("10.0.0.200", false).unwrap();
    assert_eq!((result.base, result.mask), (addr("10.0.0.0"), 24));
    assert_eq!(result.next_hops, &["HopA"]);
  }

  #[test]
  fn miss_is_an_error_unless_unroutable_requested() {
    let mut c = CidrClassifier::new();
    c.add_mapping("10.0.0.0", 8, 1u32).unwrap();

    let err = c.lookup("11.0.0.1", false).unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, ClassifierError::Trie(TrieError::KeyNotFound)));

    let result = c.lookup("11.0.0.1", true).unwrap();
    assert_eq!(result, CidrResult::unroutable());
    assert_eq!(result.base, Ipv4Addr::UNSPECIFIED);
    assert_eq!(result.mask, 0);
    assert!(result.next_hops.is_empty());
  }

  #[test]
  fn malformed_address_is_never_masked() {
    let mut c: CidrClassifier<u32> = CidrClassifier::new();

    for bad in ["", "10.0.0", "10.0.0.256", "host.example", "::1"] {
      let err = c.lookup(bad, true).unwrap_err();
      assert!(matches!(err, ClassifierError::InvalidAddress { .. }), "{bad}");
      assert!(!err.is_not_found());
    }
    assert!(matches!(
      c.add_mapping("10.0.0.x", 8, 1),
      Err(ClassifierError::InvalidAddress { .. })
    ));
    assert!(c.is_empty());
  }

  #[test]
  fn mask_longer_than_32_is_rejected() {
    let mut c = CidrClassifier::new();
    assert!(matches!(
      c.add_mapping("10.0.0.0", 33, 1u32),
      Err(ClassifierError::InvalidMask(33))
    ));
    assert!(c.is_empty());
  }

  #[test]
  fn non_canonical_base_is_stored_by_literal_bits() {
    let mut c = CidrClassifier::new();
    // 10.0.0.200/25 is the upper half of 10.0.0.0/24
    c.add_mapping("10.0.0.200", 25, "upper").unwrap();

    let result = c.lookup("10.0.0.129", false).unwrap();
    assert_eq!((result.base, result.mask), (addr("10.0.0.128"), 25));
    assert!(c.lookup("10.0.0.1", false).unwrap_err().is_not_found());

    // Any base with the same leading bits names the same entry
    assert_eq!(c.remove_mapping("10.0.0.128", 25, &"upper").unwrap(), "upper");
    assert!(c.is_empty());
  }

  #[test]
  fn default_route_and_host_route() {
    let mut c = CidrClassifier::new();
    c.add_mapping("0.0.0.0", 0, "default").unwrap();
    c.add_mapping("172.16.5.4", 32, "host").unwrap();

    let result = c.lookup("8.8.8.8", false).unwrap();
    assert_eq!((result.base, result.mask), (Ipv4Addr::UNSPECIFIED, 0));
    assert_eq!(result.next_hops, &["default"]);
    assert!(!result.is_unroutable());

    let result = c.lookup("172.16.5.4", false).unwrap();
    assert_eq!((result.base, result.mask), (addr("172.16.5.4"), 32));
    assert_eq!(result.next_hops, &["host"]);

    let result = c.lookup("172.16.5.5", false).unwrap();
    assert_eq!(result.next_hops, &["default"]);
  }

  #[test]
  fn remove_mapping_errors() {
    let mut c = CidrClassifier::new();
    c.add_mapping("192.168.0.0", 24, "HopA").unwrap();

    assert!(matches!(
      c.remove_mapping("192.168.0.0", 25, &"HopA"),
      Err(ClassifierError::Trie(TrieError::KeyNotFound))
    ));
    assert!(matches!(
      c.remove_mapping("192.168.0.0", 24, &"HopZ"),
      Err(ClassifierError::Trie(TrieError::ValueNotFound))
    ));
    assert_eq!(c.len(), 1);
  }

  #[test]
  fn routes_lists_every_prefix() {
    let mut c = CidrClassifier::new();
    c.add_mapping("192.168.0.0", 24, "HopA").unwrap();
    c.add_mapping("10.0.0.0", 8, "HopB").unwrap();
    c.add_mapping("10.1.0.0", 16, "HopC").unwrap();
    c.add_mapping("10.1.0.0", 16, "HopD").unwrap();

    let routes: Vec<(String, Vec<&str>)> = c
      .routes()
      .map(|(prefix, hops)| (prefix.to_string(), hops.to_vec()))
      .collect();
    assert_eq!(
      routes,
      vec![
        ("10.0.0.0/8".to_string(), vec!["HopB"]),
        ("10.1.0.0/16".to_string(), vec!["HopC", "HopD"]),
        ("192.168.0.0/24".to_string(), vec!["HopA"]),
      ]
    );
  }

  #[test]
  fn result_display() {
    let mut c = CidrClassifier::new();
    c.add_mapping("192.168.0.0", 24, "HopA").unwrap();
    c.add_mapping("192.168.0.0", 24, "HopB").unwrap();

    assert_eq!(
      c.lookup("192.168.0.9", true).unwrap().to_string(),
      "192.168.0.0/24 via HopA, HopB"
    );
    assert_eq!(c.lookup("1.1.1.1", true).unwrap().to_string(), "0.0.0.0/0 unroutable");
  }

  #[test]
  fn compact_keeps_lookups_stable() {
    let mut c = CidrClassifier::new();
    c.add_mapping("10.0.0.0", 8, "wide").unwrap();
    c.add_mapping("10.20.30.0", 24, "narrow").unwrap();
    c.remove_mapping("10.20.30.0", 24, &"narrow").unwrap();

    let before = c.lookup("10.20.30.40", false).unwrap().next_hops.to_vec();
    assert_eq!(c.compact(), 16);
    let after = c.lookup("10.20.30.40", false).unwrap();
    assert_eq!(after.next_hops.to_vec(), before);
    assert_eq!(after.mask, 8);
  }
}
