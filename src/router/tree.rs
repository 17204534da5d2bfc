//! Ternary search tree for route matching
//!
//! 3分探索木 (TST) によるルーティング。
//! ノード1つが1文字を表し、`lt` / `gt` は同じ深さの兄弟、`eq` は次の文字。
//! 探索コストはパスの長さに比例し、登録ルート数には依存しない。

use ahash::AHashMap as Map;
use smallvec::SmallVec;

use crate::{
    context::Context,
    router::pattern::{CATCH_ALL_MARKER, NAMED_MARKER, Pattern, is_marker},
    utils::method::Method,
};

/// Outcome of comparing one key byte against a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Less,
    Greater,
    /// equal, more bytes follow
    Next,
    /// equal, last byte of the key
    Terminal,
}

#[inline]
fn branch(c: u8, v: u8, last: bool) -> Branch {
    if c < v {
        Branch::Less
    } else if c > v {
        Branch::Greater
    } else if last {
        Branch::Terminal
    } else {
        Branch::Next
    }
}

struct Node<H> {
    v: u8,
    lt: Option<Box<Node<H>>>,
    eq: Option<Box<Node<H>>>,
    gt: Option<Box<Node<H>>>,
    /// パターンの終端ノードにだけある
    handlers: Option<Map<Method, H>>,
    /// マーカーノード (`:` `*`) のパラメータ名
    /// 同じ位置を共有するルートの名前を辞書順で全部持つ
    var_names: SmallVec<[Box<str>; 1]>,
}

impl<H> Node<H> {
    fn new(v: u8) -> Self {
        Node {
            v,
            lt: None,
            eq: None,
            gt: None,
            handlers: None,
            var_names: SmallVec::new(),
        }
    }

    #[inline]
    fn handler(&self, method: Method) -> Option<&H> {
        self.handlers.as_ref()?.get(&method)
    }

    fn record_var_name(&mut self, name: &str) {
        if let Err(pos) = self.var_names.binary_search_by(|n| (**n).cmp(name)) {
            self.var_names.insert(pos, name.into());
        }
    }

    fn count(&self) -> usize {
        1 + [&self.lt, &self.eq, &self.gt]
            .into_iter()
            .flatten()
            .map(|n| n.count())
            .sum::<usize>()
    }
}

impl<H> std::fmt::Debug for Node<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("value", &(self.v as char))
            .field("var_names", &self.var_names)
            .field("methods", &self.handlers.as_ref().map(|h| {
                let mut m: Vec<_> = h.keys().copied().collect();
                m.sort();
                m
            }))
            .finish()
    }
}

/// Looks up the node holding byte `c` among the siblings reachable from `level`.
#[inline]
fn sibling<H>(mut level: Option<&Node<H>>, c: u8) -> Option<&Node<H>> {
    while let Some(n) = level {
        match branch(c, n.v, true) {
            Branch::Less => level = n.lt.as_deref(),
            Branch::Greater => level = n.gt.as_deref(),
            Branch::Next | Branch::Terminal => return Some(n),
        }
    }
    None
}

/// Follows `name` down the `eq` chain starting below `marker`.
/// Returns the node of the last byte of "marker + name".
fn descend<'t, H>(marker: &'t Node<H>, name: &str) -> Option<&'t Node<H>> {
    let mut node = marker;
    for &b in name.as_bytes() {
        node = sibling(node.eq.as_deref(), b)?;
    }
    Some(node)
}

/// A ternary search tree mapping route patterns to per-method handlers.
///
/// Insertion needs `&mut self`; once the tree is shared it can only be read,
/// so registration after serving has begun cannot compile.
pub struct Tree<H> {
    root: Option<Box<Node<H>>>,
    routes: usize,
}

impl<H> Default for Tree<H> {
    fn default() -> Self {
        Tree::new()
    }
}

impl<H> Tree<H> {
    pub fn new() -> Self {
        Tree {
            root: None,
            routes: 0,
        }
    }

    /// Stores `handler` for `method` at the end of `pattern`.
    ///
    /// Returns the handler previously stored for the same (method, pattern), if any.
    /// 同じ (メソッド, パターン) は後勝ち
    pub fn insert(&mut self, method: Method, pattern: &Pattern, handler: H) -> Option<H> {
        let bytes = pattern.as_bytes();
        let last = bytes.len() - 1;
        let mut index = 0;
        let mut slot = &mut self.root;
        loop {
            let v = bytes[index];
            let node = slot.get_or_insert_with(|| Box::new(Node::new(v)));
            match branch(v, node.v, index == last) {
                Branch::Less => slot = &mut node.lt,
                Branch::Greater => slot = &mut node.gt,
                Branch::Next => {
                    if let Some(name) = pattern.var_name_at(index) {
                        node.record_var_name(name);
                    }
                    index += 1;
                    slot = &mut node.eq;
                }
                Branch::Terminal => {
                    if let Some(name) = pattern.var_name_at(index) {
                        node.record_var_name(name);
                    }
                    let old = node
                        .handlers
                        .get_or_insert_with(Map::default)
                        .insert(method, handler);
                    if old.is_none() {
                        self.routes += 1;
                    }
                    return old;
                }
            }
        }
    }

    /// Resolves `path` to the handler registered for `method`.
    ///
    /// Captured parameters are appended to `ctx`; on a miss `ctx` is left as it was.
    /// Static continuations win over named parameters, which win over catch-alls.
    pub fn find(&self, method: Method, path: &str, ctx: &mut Context) -> Option<&H> {
        if path.is_empty() {
            return None;
        }
        let mark = ctx.len();
        let found = walk(self.root.as_deref(), path, 0, method, ctx);
        if found.is_none() {
            ctx.truncate(mark);
        }
        found
    }

    /// Resolves the longest literal prefix of `key` that ends on a pattern
    /// registered for `method`, then matches that prefix with [`Tree::find`].
    ///
    /// 固定サブパスのフォールバック用。パラメータの意味は無視する。
    pub fn longest_prefix(&self, method: Method, key: &str, ctx: &mut Context) -> Option<&H> {
        if key.is_empty() {
            return None;
        }
        let len = prefix_len(self.root.as_deref(), key.as_bytes(), 0, method);
        if len == 0 {
            return None;
        }
        self.find(method, key.get(..len)?, ctx)
    }

    /// 登録済み (メソッド, パターン) の数
    pub fn len(&self) -> usize {
        self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes == 0
    }

    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, |n| n.count())
    }

    /// 木を中間順で trace ログに出す
    pub fn log_traversal(&self) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        fn visit<H>(node: Option<&Node<H>>, depth: usize) {
            let Some(n) = node else {
                return;
            };
            visit(n.lt.as_deref(), depth);
            log::trace!("{:indent$}{:?}", "", n, indent = depth);
            visit(n.eq.as_deref(), depth + 1);
            visit(n.gt.as_deref(), depth);
        }
        visit(self.root.as_deref(), 0);
    }
}

impl<H> std::fmt::Debug for Tree<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("routes", &self.routes)
            .field("nodes", &self.node_count())
            .finish()
    }
}

/// Matches `path[i..]` against the siblings reachable from `level`.
fn walk<'t, H>(
    level: Option<&'t Node<H>>,
    path: &str,
    i: usize,
    method: Method,
    ctx: &mut Context,
) -> Option<&'t H> {
    let bytes = path.as_bytes();
    let c = bytes[i];
    let last = i == bytes.len() - 1;
    let segment_start = i > 0 && bytes[i - 1] == b'/';

    // マーカー文字はリテラルとしてはマッチさせない
    if !(segment_start && is_marker(c)) {
        if let Some(n) = sibling(level, c) {
            let found = if last {
                n.handler(method).or_else(|| {
                    if c == b'/' {
                        catch_all(n.eq.as_deref(), path, bytes.len(), method, ctx)
                    } else {
                        None
                    }
                })
            } else {
                walk(n.eq.as_deref(), path, i + 1, method, ctx)
            };
            if found.is_some() {
                return found;
            }
        }
    }

    if !segment_start {
        return None;
    }
    named(level, path, i, method, ctx).or_else(|| catch_all(level, path, i, method, ctx))
}

/// Captures the segment starting at `i` under a named parameter at this level.
fn named<'t, H>(
    level: Option<&'t Node<H>>,
    path: &str,
    i: usize,
    method: Method,
    ctx: &mut Context,
) -> Option<&'t H> {
    let marker = sibling(level, NAMED_MARKER)?;
    let len = path.len();
    let end = path[i..].find('/').map_or(len, |p| i + p);
    if end == i {
        return None;
    }
    let segment = &path[i..end];

    for name in &marker.var_names {
        let Some(tail) = descend(marker, name) else {
            continue;
        };
        let mark = ctx.len();
        ctx.add(name, segment);

        // 続きのセグメントがあるときだけ '/' を挟んで再開する
        let found = if end == len {
            tail.handler(method)
        } else {
            sibling(tail.eq.as_deref(), b'/').and_then(|slash| {
                if end == len - 1 {
                    slash
                        .handler(method)
                        .or_else(|| catch_all(slash.eq.as_deref(), path, len, method, ctx))
                } else {
                    walk(slash.eq.as_deref(), path, end + 1, method, ctx)
                }
            })
        };
        if found.is_some() {
            return found;
        }
        ctx.truncate(mark);
    }
    None
}

/// Captures `path[i..]` (possibly empty) under a catch-all at this level.
fn catch_all<'t, H>(
    level: Option<&'t Node<H>>,
    path: &str,
    i: usize,
    method: Method,
    ctx: &mut Context,
) -> Option<&'t H> {
    let marker = sibling(level, CATCH_ALL_MARKER)?;
    for name in &marker.var_names {
        if let Some(h) = descend(marker, name).and_then(|tail| tail.handler(method)) {
            ctx.add(name, &path[i..]);
            return Some(h);
        }
    }
    None
}

/// Length of the longest prefix of `key` ending on a node with a handler for `method`.
fn prefix_len<H>(node: Option<&Node<H>>, key: &[u8], index: usize, method: Method) -> usize {
    let Some(n) = node else {
        return 0;
    };
    if index == key.len() {
        return 0;
    }
    match branch(key[index], n.v, index == key.len() - 1) {
        Branch::Less => prefix_len(n.lt.as_deref(), key, index, method),
        Branch::Greater => prefix_len(n.gt.as_deref(), key, index, method),
        Branch::Next | Branch::Terminal => {
            let here = if n.handler(method).is_some() { index + 1 } else { 0 };
            here.max(prefix_len(n.eq.as_deref(), key, index + 1, method))
        }
    }
}
