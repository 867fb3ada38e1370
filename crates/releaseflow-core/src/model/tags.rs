use serde::{Deserialize, Serialize};
use std::fmt;

/// 実行開始時に一度だけ取得するタイムスタンプ（UNIX秒）
///
/// 1回の実行で生成される全タグはこの値を共有する。途中で時計を読み直さないこと。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunTimestamp(i64);

impl RunTimestamp {
    pub const fn new(seconds: i64) -> Self {
        Self(seconds)
    }

    /// 現在時刻を取得（Init でのみ呼ぶ）
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RunTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 重複のない順序付きタグ列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// 出現順を保ったまま重複を除いて作成
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.into();
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }
        Self(unique)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
