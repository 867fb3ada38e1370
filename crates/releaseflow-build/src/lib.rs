//! releaseflow Docker Image Build functionality
//!
//! Docker Engine を使ったビルド・プッシュの実装です。
//! ビルドコンテキストの作成、入力の検証、1回のビルドでの全タグ付与、
//! 認証済みセッションを使ったタグごとのプッシュを提供します。

pub mod auth;
pub mod builder;
pub mod context;
pub mod error;
pub mod progress;
pub mod pusher;
pub mod resolver;

pub use auth::{RegistrySession, registry_of};
pub use builder::ImageBuilder;
pub use context::ContextBuilder;
pub use error::{BuildError, BuildResult};
pub use progress::BuildProgress;
pub use pusher::{ImagePusher, validate_tag};
pub use resolver::BuildResolver;
