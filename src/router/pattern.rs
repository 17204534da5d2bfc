//! Route pattern compiler
//!
//! パターン文字列を「どの位置がパラメータの開始か」の情報付きに変換する。
//! 登録時にだけ使う純粋な変換。

use smallvec::SmallVec;

use crate::error::RouterError;

/// 名前付きパラメータ (1セグメント)
pub const NAMED_MARKER: u8 = b':';
/// キャッチオール (残り全部)
pub const CATCH_ALL_MARKER: u8 = b'*';

#[inline]
pub fn is_marker(b: u8) -> bool {
    b == NAMED_MARKER || b == CATCH_ALL_MARKER
}

/// Kind of parameter that begins at a marker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Named,
    CatchAll,
}

/// A compiled route pattern.
///
/// Markers are only recognised directly after a `/`. A named parameter's name
/// runs to the next `/` or the end; a catch-all's name always runs to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: Box<str>,
    /// (marker index, kind, name)
    params: SmallVec<[(usize, ParamKind, Box<str>); 2]>,
}

impl Pattern {
    pub fn new(raw: &str) -> Result<Pattern, RouterError> {
        if raw.is_empty() {
            return Err(RouterError::EmptyPattern);
        }
        let bytes = raw.as_bytes();
        let mut params = SmallVec::new();
        let mut i = 0;
        while i < bytes.len() {
            let at_segment_start = i > 0 && bytes[i - 1] == b'/';
            if !at_segment_start || !is_marker(bytes[i]) {
                i += 1;
                continue;
            }
            if bytes[i] == CATCH_ALL_MARKER {
                params.push((i, ParamKind::CatchAll, raw[i + 1..].into()));
                break;
            }
            let end = raw[i + 1..].find('/').map_or(bytes.len(), |p| i + 1 + p);
            params.push((i, ParamKind::Named, raw[i + 1..end].into()));
            i = end;
        }
        Ok(Pattern {
            raw: raw.into(),
            params,
        })
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// `index` がパラメータの開始位置ならその名前
    pub fn var_name_at(&self, index: usize) -> Option<&str> {
        self.param_at(index).map(|(_, name)| name)
    }

    pub fn param_at(&self, index: usize) -> Option<(ParamKind, &str)> {
        self.params
            .iter()
            .find(|(i, _, _)| *i == index)
            .map(|(_, kind, name)| (*kind, &**name))
    }

    /// パラメータ名を出現順で
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(_, _, name)| &**name)
    }

    pub fn is_static(&self) -> bool {
        self.params.is_empty()
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
