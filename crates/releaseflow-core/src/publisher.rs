//! タグごとのプッシュ
//!
//! 失敗したタグがあっても残りのタグは必ず試行する。

use crate::collaborator::ImagePublish;
use crate::model::{ImageHandle, PublishResult, TagSet};
use futures_util::future::join_all;

/// 全タグをプッシュし、タグ順に結果を返す
///
/// `concurrent` が true の場合は全プッシュを同時に発行し、すべての完了を待つ。
pub async fn publish_all<P: ImagePublish>(
    publisher: &P,
    handle: &ImageHandle,
    tags: &TagSet,
    concurrent: bool,
) -> Vec<PublishResult> {
    if concurrent {
        join_all(tags.iter().map(|tag| publish_one(publisher, handle, tag))).await
    } else {
        let mut results = Vec::with_capacity(tags.len());
        for tag in tags {
            results.push(publish_one(publisher, handle, tag).await);
        }
        results
    }
}

async fn publish_one<P: ImagePublish>(publisher: &P, handle: &ImageHandle, tag: &str) -> PublishResult {
    match publisher.publish(handle, tag).await {
        Ok(reference) => {
            tracing::info!("Published {}", reference);
            PublishResult::success(tag)
        }
        Err(e) => {
            tracing::warn!("Failed to publish {}: {}", handle.reference(tag), e.message);
            PublishResult::failed(tag, e.message)
        }
    }
}
