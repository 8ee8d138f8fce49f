//! The query layer: type/ref/heads/time filters, chain and tree walks,
//! reverse lookups, and composable search.
//!
//! Sorting tie-break everywhere: identical `created_at` orders by hash
//! ascending. Limits are clamped, never rejected.

use crate::store::{referenced_by_role, BlockStore};
use fb_types::{Hash, StoredBlock};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashSet;

/// `/blocks` limit bounds.
pub const BLOCKS_LIMIT_MAX: usize = 100;
pub const BLOCKS_LIMIT_DEFAULT: usize = 50;

/// `/chain` depth bounds.
pub const CHAIN_DEPTH_MAX: usize = 500;
pub const CHAIN_DEPTH_DEFAULT: usize = 100;

/// `/tree` depth bounds.
pub const TREE_DEPTH_MAX: usize = 50;
pub const TREE_DEPTH_DEFAULT: usize = 10;

/// State fields `/find` will match on. Anything else is silently ignored to
/// bound indexing pressure.
pub const FIND_STATE_WHITELIST: &[&str] = &["name", "status", "category", "origin", "organic"];

/// Sort order for `/find`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl SortOrder {
    pub fn parse(value: &str) -> Self {
        match value {
            "oldest" => Self::Oldest,
            _ => Self::Newest,
        }
    }
}

fn newest_first(a: &StoredBlock, b: &StoredBlock) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.hash.cmp(&b.hash))
}

fn oldest_first(a: &StoredBlock, b: &StoredBlock) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.hash.cmp(&b.hash))
}

/// Exact-or-dot-prefix type match: filter `transfer` matches `transfer` and
/// `transfer.order`, never `transform`.
fn type_matches(filter: &str, block_type: &str) -> bool {
    block_type == filter
        || block_type
            .strip_prefix(filter)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Parameters for `GET /blocks`.
#[derive(Debug, Clone, Default)]
pub struct BlocksQuery {
    pub type_filter: Option<String>,
    pub ref_role: Option<String>,
    pub ref_value: Option<Hash>,
    pub heads_only: bool,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Run `GET /blocks`.
pub fn query_blocks(store: &dyn BlockStore, query: &BlocksQuery) -> Vec<StoredBlock> {
    let limit = query
        .limit
        .unwrap_or(BLOCKS_LIMIT_DEFAULT)
        .clamp(1, BLOCKS_LIMIT_MAX);

    let mut blocks = candidates(store, query.type_filter.as_deref(), query.ref_value.as_ref(), query.ref_role.as_deref());
    if query.heads_only {
        blocks.retain(|b| b.is_head);
    }
    blocks.sort_by(newest_first);
    blocks.into_iter().skip(query.offset).take(limit).collect()
}

/// Candidate selection shared by `/blocks` and `/find`: narrow through the
/// most selective available index, then filter.
fn candidates(
    store: &dyn BlockStore,
    type_filter: Option<&str>,
    ref_value: Option<&Hash>,
    ref_role: Option<&str>,
) -> Vec<StoredBlock> {
    let hashes: Vec<Hash> = if let Some(target) = ref_value {
        match ref_role {
            Some(role) => referenced_by_role(store, target, role),
            None => store
                .referencing(target)
                .into_iter()
                .map(|(_, h)| h)
                .collect(),
        }
    } else if let Some(filter) = type_filter {
        store.by_type(filter, true)
    } else {
        store.all_ordered()
    };

    let mut seen = HashSet::new();
    hashes
        .into_iter()
        .filter(|h| seen.insert(h.clone()))
        .filter_map(|h| store.get(&h))
        .filter(|b| {
            type_filter
                .map(|f| type_matches(f, &b.block.block_type))
                .unwrap_or(true)
        })
        .collect()
}

/// Parameters for `GET /find`.
#[derive(Debug, Clone)]
pub struct FindQuery {
    pub type_filter: Option<String>,
    pub ref_role: Option<String>,
    pub ref_value: Option<Hash>,
    pub author: Option<Hash>,
    /// created_at strictly after, unix millis.
    pub after: Option<i64>,
    /// created_at strictly before, unix millis.
    pub before: Option<i64>,
    /// Defaults to true: search current knowledge, not history.
    pub heads: bool,
    pub sort: SortOrder,
    /// Whitelisted `state.<field>` equality filters.
    pub state_filters: Vec<(String, Value)>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Default for FindQuery {
    fn default() -> Self {
        Self {
            type_filter: None,
            ref_role: None,
            ref_value: None,
            author: None,
            after: None,
            before: None,
            heads: true,
            sort: SortOrder::Newest,
            state_filters: Vec::new(),
            limit: None,
            offset: 0,
        }
    }
}

/// `GET /find` response shape.
#[derive(Debug, Clone, Serialize)]
pub struct FindResult {
    pub blocks: Vec<StoredBlock>,
    pub total: usize,
    pub has_more: bool,
}

/// Run `GET /find`.
pub fn find(store: &dyn BlockStore, query: &FindQuery) -> FindResult {
    let limit = query
        .limit
        .unwrap_or(BLOCKS_LIMIT_DEFAULT)
        .clamp(1, BLOCKS_LIMIT_MAX);

    let mut blocks = candidates(
        store,
        query.type_filter.as_deref(),
        query.ref_value.as_ref(),
        query.ref_role.as_deref(),
    );

    blocks.retain(|b| {
        if query.heads && !b.is_head {
            return false;
        }
        if let Some(author) = &query.author {
            if b.author_hash.as_ref() != Some(author) {
                return false;
            }
        }
        if let Some(after) = query.after {
            if b.created_at <= after {
                return false;
            }
        }
        if let Some(before) = query.before {
            if b.created_at >= before {
                return false;
            }
        }
        query
            .state_filters
            .iter()
            .all(|(field, expected)| state_field_matches(&b.block.state, field, expected))
    });

    match query.sort {
        SortOrder::Newest => blocks.sort_by(newest_first),
        SortOrder::Oldest => blocks.sort_by(oldest_first),
    }

    let total = blocks.len();
    let page: Vec<StoredBlock> = blocks.into_iter().skip(query.offset).take(limit).collect();
    let has_more = query.offset + page.len() < total;

    FindResult {
        blocks: page,
        total,
        has_more,
    }
}

/// Equality over a whitelisted state field. Missing fields never match;
/// non-whitelisted fields are ignored upstream.
fn state_field_matches(state: &Map<String, Value>, field: &str, expected: &Value) -> bool {
    match state.get(field) {
        None => false,
        Some(actual) => match (actual, expected) {
            (Value::String(a), Value::String(e)) => a == e,
            (Value::Bool(a), Value::String(e)) => e.parse::<bool>().map(|b| *a == b).unwrap_or(false),
            (Value::Number(a), Value::String(e)) => a
                .as_f64()
                .zip(e.parse::<f64>().ok())
                .map(|(x, y)| x == y)
                .unwrap_or(false),
            (a, e) => a == e,
        },
    }
}

/// Walk `refs.updates` backward from a block, newest first, depth-capped.
pub fn chain(store: &dyn BlockStore, start: &Hash, depth: Option<usize>) -> Vec<StoredBlock> {
    let depth = depth.unwrap_or(CHAIN_DEPTH_DEFAULT).clamp(1, CHAIN_DEPTH_MAX);

    let mut out = Vec::new();
    let mut cursor = Some(start.clone());
    let mut visited = HashSet::new();

    while let Some(hash) = cursor {
        if out.len() >= depth || !visited.insert(hash.clone()) {
            break;
        }
        let Some(record) = store.get(&hash) else { break };
        cursor = record.block.updates_ref();
        out.push(record);
    }
    out
}

/// One node of a `/tree` expansion.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub hash: Hash,
    #[serde(rename = "type")]
    pub block_type: String,
    pub state: Map<String, Value>,
    /// Role -> expanded children. Hashes already visited or beyond the depth
    /// cap stay unexpanded in `refs`.
    pub children: Map<String, Value>,
    pub refs: Map<String, Value>,
}

/// Recursive ref expansion, cycle-safe and depth-bounded.
pub fn tree(store: &dyn BlockStore, start: &Hash, depth: Option<usize>) -> Option<TreeNode> {
    let depth = depth.unwrap_or(TREE_DEPTH_DEFAULT).clamp(1, TREE_DEPTH_MAX);
    let mut visited = HashSet::new();
    expand(store, start, depth, &mut visited)
}

fn expand(
    store: &dyn BlockStore,
    hash: &Hash,
    remaining: usize,
    visited: &mut HashSet<Hash>,
) -> Option<TreeNode> {
    let record = store.get(hash)?;
    visited.insert(hash.clone());

    let mut children = Map::new();
    if remaining > 0 {
        for role in record.block.refs.keys() {
            let mut expanded = Vec::new();
            for target in record.block.ref_values(role) {
                if visited.contains(&target) {
                    continue;
                }
                if let Some(node) = expand(store, &target, remaining - 1, visited) {
                    expanded.push(serde_json::to_value(node).unwrap_or(Value::Null));
                }
            }
            if !expanded.is_empty() {
                children.insert(role.clone(), Value::Array(expanded));
            }
        }
    }

    Some(TreeNode {
        hash: record.hash,
        block_type: record.block.block_type,
        state: record.block.state,
        children,
        refs: record.block.refs,
    })
}

/// `GET /forward/:hash` — blocks referencing a target, optionally narrowed
/// by type and by which ref role points at it.
pub fn forward(
    store: &dyn BlockStore,
    target: &Hash,
    type_filter: Option<&str>,
    role: Option<&str>,
) -> Vec<StoredBlock> {
    let mut seen = HashSet::new();
    let mut blocks: Vec<StoredBlock> = store
        .referencing(target)
        .into_iter()
        .filter(|(r, _)| role.map(|want| r == want).unwrap_or(true))
        .map(|(_, h)| h)
        .filter(|h| seen.insert(h.clone()))
        .filter_map(|h| store.get(&h))
        .filter(|b| {
            type_filter
                .map(|f| type_matches(f, &b.block.block_type))
                .unwrap_or(true)
        })
        .collect();
    blocks.sort_by(newest_first);
    blocks
}

/// `GET /heads` — current heads, optionally narrowed by type.
pub fn heads(store: &dyn BlockStore, type_filter: Option<&str>) -> Vec<StoredBlock> {
    let mut blocks: Vec<StoredBlock> = store
        .all_heads()
        .into_iter()
        .filter_map(|h| store.get(&h))
        .filter(|b| {
            type_filter
                .map(|f| type_matches(f, &b.block.block_type))
                .unwrap_or(true)
        })
        .collect();
    blocks.sort_by(newest_first);
    blocks
}
