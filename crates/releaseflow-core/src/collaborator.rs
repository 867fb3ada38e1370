use crate::error::{BuildFailure, PushFailure};
use crate::model::{BuildRequest, ImageHandle};

/// ビルドエンジンのトレイト
///
/// 1回の実行につき `build` は1度だけ呼ばれ、全タグを同じイメージに付与する。
#[allow(async_fn_in_trait)]
pub trait ImageBuild {
    async fn build(&self, request: &BuildRequest) -> Result<ImageHandle, BuildFailure>;

    /// 実行終了時にハンドルを手放す
    async fn discard(&self, handle: ImageHandle) {
        drop(handle);
    }
}

/// レジストリへのプッシュのトレイト
///
/// 認証済みのセッションを前提とする。成功時はプッシュした参照を返す。
#[allow(async_fn_in_trait)]
pub trait ImagePublish {
    async fn publish(&self, handle: &ImageHandle, tag: &str) -> Result<String, PushFailure>;
}
