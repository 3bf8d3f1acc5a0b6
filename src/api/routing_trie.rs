use std::collections::HashMap;
use std::hash::Hash;

use tracing::trace;

use super::error::TrieError;

/// How `find` picks a terminal node along the path dictated by the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// First terminal node on the path, the root included.
    ShortestPrefix,
    /// Deepest terminal node on the path. Routing-table semantics.
    #[default]
    LongestPrefix,
    /// Only the node at the end of the full key.
    Exact,
}

#[derive(Debug)]
struct TrieNode<S, V> {
    symbol: Option<S>,
    terminal: bool,
    values: Vec<V>,
    children: HashMap<S, TrieNode<S, V>>,
}

impl<S, V> TrieNode<S, V> {
    fn new(symbol: Option<S>) -> Self {
        TrieNode {
            symbol,
            terminal: false,
            values: Vec::new(),
            children: HashMap::new(),
        }
    }
}

/// A prefix tree over sequences of symbols, without path compression.
///
/// Every terminal node holds an ordered list of values. Inserting the same key twice appends
/// to that list instead of replacing it, so a key can carry several equal-cost entries.
#[derive(Debug)]
pub struct PrefixTrie<S, V> {
    root: TrieNode<S, V>,
    len: usize,
}

impl<S, V> Default for PrefixTrie<S, V> {
    fn default() -> Self {
        PrefixTrie { root: TrieNode::new(None), len: 0 }
    }
}

impl<S, V> PrefixTrie<S, V>
where
    S: Copy + Eq + Hash,
{
    /// Create a new empty PrefixTrie
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value under a key
    ///
    /// # Arguments
    ///
    /// * `key`: The symbols leading from the root to the terminal node
    /// * `value`: The value appended to the terminal node's value list
    pub fn insert(&mut self, key: &[S], value: V) {
        let mut node = &mut self.root;

        // Only the missing suffix of the path gets built
        for &symbol in key {
            node = node
                .children
                .entry(symbol)
                .or_insert_with(|| TrieNode::new(Some(symbol)));
        }

        node.terminal = true;
        node.values.push(value);
        self.len += 1;
        trace!(depth = key.len(), values = node.values.len(), "trie insert");
    }

    /// Remove the first value equal to `value` stored exactly at `key`
    ///
    /// # Returns
    ///
    /// The removed value, `KeyNotFound` if `key` is not a terminal node, or `ValueNotFound` if
    /// the node does not hold `value`.
    pub fn remove(&mut self, key: &[S], value: &V) -> Result<V, TrieError>
    where
        V: PartialEq,
    {
        let node = self.exact_node_mut(key)?;
        let position = node
            .values
            .iter()
            .position(|stored| stored == value)
            .ok_or(TrieError::ValueNotFound)?;
        let removed = node.values.remove(position);

        // The node stays in place even when it has no values left
        if node.values.is_empty() {
            node.terminal = false;
        }
        trace!(depth = key.len(), remaining = node.values.len(), "trie remove");

        self.len -= 1;
        Ok(removed)
    }

    /// Find the node selected by `mode` along the path of `key`
    ///
    /// # Returns
    ///
    /// The matched key prefix and the values stored at it, or `KeyNotFound`.
    pub fn find(&self, key: &[S], mode: MatchMode) -> Result<(Vec<S>, &[V]), TrieError> {
        let (prefix, node) = self.find_node(key, mode)?;
        Ok((prefix, node.values.as_slice()))
    }

    pub fn contains(&self, key: &[S]) -> bool {
        self.find_node(key, MatchMode::Exact).is_ok()
    }

    /// Values stored exactly at `key`.
    pub fn get(&self, key: &[S]) -> Option<&[V]> {
        self.find_node(key, MatchMode::Exact)
            .ok()
            .map(|(_, node)| node.values.as_slice())
    }

    /// Number of stored values, counting every copy on every terminal node.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes in the tree, the root included. Demoted nodes still count.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.values());
        }
        count
    }

    /// Drop every subtree that holds no terminal node
    ///
    /// Removal leaves demoted nodes in the tree. This reclaims them without changing the
    /// result of any lookup.
    ///
    /// # Returns
    ///
    /// The number of nodes removed.
    pub fn compact(&mut self) -> usize {
        let removed = Self::prune(&mut self.root);
        trace!(removed, "trie compact");
        removed
    }

    fn prune(node: &mut TrieNode<S, V>) -> usize {
        let mut removed = 0;
        for child in node.children.values_mut() {
            removed += Self::prune(child);
        }

        let before = node.children.len();
        node.children
            .retain(|_, child| child.terminal || !child.children.is_empty());
        removed + before - node.children.len()
    }

    fn find_node(
        &self,
        key: &[S],
        mode: MatchMode,
    ) -> Result<(Vec<S>, &TrieNode<S, V>), TrieError> {
        let mut current = &self.root;
        if mode == MatchMode::ShortestPrefix && current.terminal {
            return Ok((Vec::new(), current));
        }

        let mut path: Vec<&TrieNode<S, V>> = Vec::with_capacity(key.len());
        for symbol in key {
            match current.children.get(symbol) {
                Some(child) => {
                    current = child;
                    path.push(current);
                    if mode == MatchMode::ShortestPrefix && current.terminal {
                        return Ok((Self::symbols(&path), current));
                    }
                }
                None if mode == MatchMode::Exact => return Err(TrieError::KeyNotFound),
                None => break,
            }
        }

        // Walked the whole key
        if path.len() == key.len() && current.terminal {
            return Ok((Self::symbols(&path), current));
        }

        if mode == MatchMode::LongestPrefix {
            // Backtrack from the point of divergence to the deepest terminal node
            for (depth, node) in path.iter().enumerate().rev() {
                if node.terminal {
                    return Ok((Self::symbols(&path[..=depth]), *node));
                }
            }
            if self.root.terminal {
                return Ok((Vec::new(), &self.root));
            }
        }

        Err(TrieError::KeyNotFound)
    }

    fn exact_node_mut(&mut self, key: &[S]) -> Result<&mut TrieNode<S, V>, TrieError> {
        let mut current = &mut self.root;
        for symbol in key {
            current = current
                .children
                .get_mut(symbol)
                .ok_or(TrieError::KeyNotFound)?;
        }

        if current.terminal {
            Ok(current)
        } else {
            Err(TrieError::KeyNotFound)
        }
    }

    fn symbols(path: &[&TrieNode<S, V>]) -> Vec<S> {
        path.iter().filter_map(|node| node.symbol).collect()
    }
}

impl<S, V> PrefixTrie<S, V>
where
    S: Copy + Ord,
{
    /// Every terminal entry in depth-first order, siblings in ascending symbol order.
    pub fn iter(&self) -> Iter<'_, S, V> {
        Iter { stack: vec![(Vec::new(), &self.root)] }
    }
}

pub struct Iter<'a, S, V> {
    stack: Vec<(Vec<S>, &'a TrieNode<S, V>)>,
}

impl<'a, S, V> Iterator for Iter<'a, S, V>
where
    S: Copy + Ord,
{
    type Item = (Vec<S>, &'a [V]);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((prefix, node)) = self.stack.pop() {
            let mut children: Vec<&'a TrieNode<S, V>> = node.children.values().collect();
            // Pushed largest first so the smallest symbol pops next
            children.sort_unstable_by(|a, b| b.symbol.cmp(&a.symbol));
            for child in children {
                let mut child_prefix = prefix.clone();
                child_prefix.extend(child.symbol);
                self.stack.push((child_prefix, child));
            }

            if node.terminal {
                return Some((prefix, node.values.as_slice()));
            }
        }
        None
    }
}
