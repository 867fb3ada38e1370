//! タグ導出
//!
//! ブランチ名・実行時刻・リポジトリ識別子からタグ集合を決定する純粋関数。
//! I/O は行わない。

use crate::model::{ImageRepository, RunTimestamp, TagSet};

pub const LATEST_TAG: &str = "latest";

/// 導出結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedTags {
    /// 小文字化済みのオーナー名
    pub owner: String,
    /// 小文字化済みのリポジトリ名
    pub name: String,
    pub tags: TagSet,
}

impl DerivedTags {
    /// 導出したオーナー名・リポジトリ名でレジストリ上のリポジトリを作る
    pub fn repository(&self, registry: &str) -> ImageRepository {
        ImageRepository {
            registry: registry.trim_end_matches('/').to_ascii_lowercase(),
            owner: self.owner.clone(),
            name: self.name.clone(),
        }
    }
}

/// タグ集合を導出
///
/// 生成されるタグ（この順序）:
/// 1. `{branch}`
/// 2. `{branch}-{timestamp}`
/// 3. `latest`
///
/// ブランチ名は加工しない（`/` もそのまま）。
/// ブランチ名が `latest` の場合は重複が除かれ2つになる。
pub fn derive(owner: &str, name: &str, branch: &str, timestamp: RunTimestamp) -> DerivedTags {
    let tags = TagSet::from_tags([
        branch.to_string(),
        format!("{}-{}", branch, timestamp),
        LATEST_TAG.to_string(),
    ]);

    DerivedTags {
        owner: owner.to_ascii_lowercase(),
        name: name.to_ascii_lowercase(),
        tags,
    }
}
