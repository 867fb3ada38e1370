//! パイプライン制御
//!
//! Init → Tagging → Building → Publishing → Done の順に進める。
//! 失敗時の方針を持つのはこのモジュールだけで、自動リトライは行わない。

use crate::collaborator::{ImageBuild, ImagePublish};
use crate::error::{PipelineError, Result};
use crate::event::TriggerEvent;
use crate::model::{
    BuildRequest, ImageRepository, PipelineConfig, RunReport, RunTimestamp, TagSet,
};
use crate::publisher::publish_all;
use crate::tagging::derive;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Tagging,
    Building,
    Publishing,
    Done(Outcome),
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Init => write!(f, "init"),
            PipelineState::Tagging => write!(f, "tagging"),
            PipelineState::Building => write!(f, "building"),
            PipelineState::Publishing => write!(f, "publishing"),
            PipelineState::Done(Outcome::Success) => write!(f, "done(success)"),
            PipelineState::Done(Outcome::Failure) => write!(f, "done(failure)"),
        }
    }
}

/// Tagging まで進めた結果（ビルド前の計画）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePlan {
    pub branch: String,
    pub timestamp: RunTimestamp,
    pub repository: ImageRepository,
    pub tags: TagSet,
}

impl ReleasePlan {
    pub fn references(&self) -> Vec<String> {
        self.tags.iter().map(|t| self.repository.reference(t)).collect()
    }
}

/// 追跡対象ブランチの判定とタグ導出を行う
///
/// ビルドやプッシュは行わない。`releaseflow tags` からも使う。
pub fn plan(
    config: &PipelineConfig,
    event: &TriggerEvent,
    timestamp: RunTimestamp,
) -> Result<ReleasePlan> {
    config.validate()?;

    let branch = event.branch()?;
    let identity = event.identity()?;

    if !config.is_tracked(branch) {
        return Err(PipelineError::UntrackedBranch {
            branch: branch.to_string(),
        });
    }

    let tag_branch = config.branch_tags.apply(branch)?;
    let derived = derive(identity.owner(), identity.name(), &tag_branch, timestamp);

    Ok(ReleasePlan {
        branch: branch.to_string(),
        timestamp,
        repository: derived.repository(&config.registry),
        tags: derived.tags,
    })
}

pub struct Pipeline<B, P> {
    config: PipelineConfig,
    project_root: PathBuf,
    builder: B,
    publisher: P,
    state: PipelineState,
}

impl<B: ImageBuild, P: ImagePublish> Pipeline<B, P> {
    pub fn new(config: PipelineConfig, project_root: &Path, builder: B, publisher: P) -> Self {
        Self {
            config,
            project_root: project_root.to_path_buf(),
            builder,
            publisher,
            state: PipelineState::Init,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!("Pipeline state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// 1回の実行
    ///
    /// `timestamp` は呼び出し側で一度だけ取得した値を渡す。
    ///
    /// # Returns
    /// * `Ok(report)` - ビルド成功。プッシュ失敗の有無は `report.status` で判定
    /// * `Err(PipelineError::Build)` - ビルド失敗。プッシュは一切行わない
    /// * `Err(PipelineError::Configuration | UntrackedBranch)` - Tagging 前に終了
    pub async fn run(&mut self, event: &TriggerEvent, timestamp: RunTimestamp) -> Result<RunReport> {
        self.state = PipelineState::Init;

        let plan = match plan(&self.config, event, timestamp) {
            Ok(plan) => {
                self.transition(PipelineState::Tagging);
                plan
            }
            Err(e) => {
                self.transition(PipelineState::Done(Outcome::Failure));
                return Err(e);
            }
        };

        tracing::info!(
            "Derived {} tags for {} (branch {}, timestamp {})",
            plan.tags.len(),
            plan.repository,
            plan.branch,
            plan.timestamp
        );

        self.transition(PipelineState::Building);
        let request = self.build_request(&plan);
        let handle = match self.builder.build(&request).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("Build failed: {}", e.message);
                self.transition(PipelineState::Done(Outcome::Failure));
                return Err(PipelineError::Build(e));
            }
        };

        self.transition(PipelineState::Publishing);
        let results = publish_all(
            &self.publisher,
            &handle,
            &plan.tags,
            self.config.publish.concurrent,
        )
        .await;

        let image_id = handle.id.clone();
        self.builder.discard(handle).await;

        let report =
            RunReport::aggregate(plan.timestamp, plan.repository, plan.tags, image_id, results);

        if report.is_success() {
            self.transition(PipelineState::Done(Outcome::Success));
        } else {
            tracing::error!("Failed tags: {}", report.failed_tags().join(", "));
            self.transition(PipelineState::Done(Outcome::Failure));
        }

        Ok(report)
    }

    fn build_request(&self, plan: &ReleasePlan) -> BuildRequest {
        let build = &self.config.build;
        let context_dir = self.project_root.join(&build.context);
        let dockerfile = context_dir.join(&build.dockerfile);

        BuildRequest {
            context_dir,
            dockerfile,
            repository: plan.repository.clone(),
            tags: plan.tags.clone(),
            build_args: build.args.clone(),
            target: build.target.clone(),
            no_cache: build.no_cache,
            pull: build.pull,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BuildFailure, ConfigurationError, PushFailure};
    use crate::event::EventType;
    use crate::model::{BranchTagPolicy, ImageHandle, PublishStatus, RunStatus};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingBuilder {
        fail: bool,
        builds: AtomicUsize,
        discarded: AtomicUsize,
        requests: Mutex<Vec<BuildRequest>>,
    }

    impl ImageBuild for &RecordingBuilder {
        async fn build(&self, request: &BuildRequest) -> std::result::Result<ImageHandle, BuildFailure> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(BuildFailure::new(
                    "exit status 1",
                    "Step 3/7 : RUN pip install\nERROR: no matching distribution",
                ));
            }
            Ok(ImageHandle::new(
                "sha256:feed",
                request.repository.clone(),
                &request.tags,
            ))
        }

        async fn discard(&self, _handle: ImageHandle) {
            self.discarded.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        failing: Vec<&'static str>,
        attempts: Mutex<Vec<(String, String)>>,
    }

    impl ImagePublish for &RecordingPublisher {
        async fn publish(&self, handle: &ImageHandle, tag: &str) -> std::result::Result<String, PushFailure> {
            self.attempts
                .lock()
                .unwrap()
                .push((handle.id.clone(), tag.to_string()));
            if self.failing.iter().any(|f| *f == tag) {
                return Err(PushFailure {
                    tag: tag.to_string(),
                    message: "denied: permission_denied".to_string(),
                });
            }
            Ok(handle.reference(tag))
        }
    }

    fn event(branch: &str) -> TriggerEvent {
        TriggerEvent {
            event_type: EventType::Push,
            branch_ref: branch.to_string(),
            repository_owner: "MyOrg".to_string(),
            repository_name: "ShipTracker".to_string(),
        }
    }

    const TS: RunTimestamp = RunTimestamp::new(1700000000);

    #[tokio::test]
    async fn test_successful_run() {
        let builder = RecordingBuilder::default();
        let publisher = RecordingPublisher::default();
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            Path::new("/srv/app"),
            &builder,
            &publisher,
        );

        let report = pipeline.run(&event("master"), TS).await.unwrap();

        assert!(report.is_success());
        assert_eq!(pipeline.state(), PipelineState::Done(Outcome::Success));
        assert_eq!(report.repository.to_string(), "ghcr.io/myorg/shiptracker");
        assert_eq!(
            report.tags.as_slice(),
            ["master", "master-1700000000", "latest"]
        );
        assert_eq!(report.image_id.as_deref(), Some("sha256:feed"));
        assert_eq!(builder.discarded.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_build_labels_every_tag() {
        let builder = RecordingBuilder::default();
        let publisher = RecordingPublisher::default();
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            Path::new("/srv/app"),
            &builder,
            &publisher,
        );

        pipeline.run(&event("master"), TS).await.unwrap();

        assert_eq!(builder.builds.load(Ordering::SeqCst), 1);
        let requests = builder.requests.lock().unwrap();
        assert_eq!(
            requests[0].references(),
            vec![
                "ghcr.io/myorg/shiptracker:master",
                "ghcr.io/myorg/shiptracker:master-1700000000",
                "ghcr.io/myorg/shiptracker:latest",
            ]
        );
        assert_eq!(requests[0].context_dir, Path::new("/srv/app/."));
        assert_eq!(requests[0].dockerfile, Path::new("/srv/app/./Dockerfile"));

        // 全プッシュが同じイメージを対象にする
        let attempts = publisher.attempts.lock().unwrap();
        assert!(attempts.iter().all(|(id, _)| id == "sha256:feed"));
    }

    #[tokio::test]
    async fn test_every_tag_attempted_after_failure() {
        let builder = RecordingBuilder::default();
        let publisher = RecordingPublisher {
            failing: vec!["master"],
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            Path::new("."),
            &builder,
            &publisher,
        );

        let report = pipeline.run(&event("master"), TS).await.unwrap();

        let attempted: Vec<String> = publisher
            .attempts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, tag)| tag.clone())
            .collect();
        assert_eq!(attempted.len(), 3);
        assert!(attempted.contains(&"latest".to_string()));
        assert_eq!(report.failed_tags(), ["master"]);
    }

    #[tokio::test]
    async fn test_partial_failure_reports_failed_tags() {
        let builder = RecordingBuilder::default();
        let publisher = RecordingPublisher {
            failing: vec!["master-1700000000"],
            ..Default::default()
        };
        let config = PipelineConfig {
            publish: crate::model::PublishSettings {
                concurrent: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(config, Path::new("."), &builder, &publisher);

        let report = pipeline.run(&event("master"), TS).await.unwrap();

        assert_eq!(
            report.status,
            RunStatus::Failure {
                failed_tags: vec!["master-1700000000".to_string()]
            }
        );
        let statuses: Vec<PublishStatus> = report.results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [
                PublishStatus::Success,
                PublishStatus::Failed,
                PublishStatus::Success
            ]
        );
        assert_eq!(pipeline.state(), PipelineState::Done(Outcome::Failure));
        assert_eq!(builder.discarded.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_build_failure_skips_publishing() {
        let builder = RecordingBuilder {
            fail: true,
            ..Default::default()
        };
        let publisher = RecordingPublisher::default();
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            Path::new("."),
            &builder,
            &publisher,
        );

        let err = pipeline.run(&event("master"), TS).await.unwrap_err();

        match err {
            PipelineError::Build(failure) => {
                assert!(failure.diagnostic.contains("no matching distribution"));
            }
            other => panic!("Expected build failure, got {:?}", other),
        }
        assert!(publisher.attempts.lock().unwrap().is_empty());
        assert_eq!(pipeline.state(), PipelineState::Done(Outcome::Failure));
    }

    #[tokio::test]
    async fn test_untracked_branch_never_builds() {
        let builder = RecordingBuilder::default();
        let publisher = RecordingPublisher::default();
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            Path::new("."),
            &builder,
            &publisher,
        );

        let err = pipeline.run(&event("develop"), TS).await.unwrap_err();

        assert!(err.is_skip());
        assert_eq!(builder.builds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_configuration_error_before_tagging() {
        let builder = RecordingBuilder::default();
        let publisher = RecordingPublisher::default();
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            Path::new("."),
            &builder,
            &publisher,
        );
        let mut ev = event("master");
        ev.repository_name = String::new();

        let err = pipeline.run(&ev, TS).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Configuration(ConfigurationError::MissingField("repository name"))
        ));
        assert_eq!(builder.builds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_plan_with_replace_policy() {
        let config = PipelineConfig {
            tracked_branches: vec!["release/2.0".to_string()],
            branch_tags: BranchTagPolicy::Replace,
            ..Default::default()
        };

        let plan = plan(&config, &event("refs/heads/release/2.0"), TS).unwrap();
        assert_eq!(plan.branch, "release/2.0");
        assert_eq!(
            plan.references(),
            vec![
                "ghcr.io/myorg/shiptracker:release-2.0",
                "ghcr.io/myorg/shiptracker:release-2.0-1700000000",
                "ghcr.io/myorg/shiptracker:latest",
            ]
        );
    }

    #[test]
    fn test_plan_with_reject_policy() {
        let config = PipelineConfig {
            tracked_branches: vec!["feature/x".to_string()],
            branch_tags: BranchTagPolicy::Reject,
            ..Default::default()
        };

        let err = plan(&config, &event("feature/x"), TS).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Configuration(ConfigurationError::SeparatorInBranch(_))
        ));
    }
}
