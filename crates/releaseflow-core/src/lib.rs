//! releaseflow core
//!
//! コンテナイメージのリリースパイプラインの中核。
//! タグ導出、トリガーイベントの解釈、ビルドとタグごとのプッシュの制御を提供します。
//! Docker への依存はなく、ビルド・プッシュは [`ImageBuild`] / [`ImagePublish`] トレイト経由で行います。

pub mod collaborator;
pub mod error;
pub mod event;
pub mod model;
pub mod pipeline;
pub mod publisher;
pub mod tagging;

pub use collaborator::*;
pub use error::*;
pub use event::*;
pub use model::*;
pub use pipeline::*;
pub use publisher::*;
pub use tagging::*;
