//! Analysis pipeline — one resume + job description in, one model response out.
//!
//! Flow: validate → rasterize first page → extract job field → render prompt →
//!       throttle admission → inference call → result.
//!
//! Every failure is terminal for the request. Nothing is retried, and a
//! throttle admission is kept even when the inference call that follows fails.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::job_field::extract_job_field;
use crate::analysis::prompts::render_prompt;
use crate::document::{DocumentRasterizer, RasterizeError};
use crate::llm_client::{InferenceClient, LlmError};
use crate::models::analysis::{AnalysisKind, AnalysisResult};
use crate::throttle::CallThrottle;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Document conversion failed: {0}")]
    DocumentConversion(#[from] RasterizeError),

    #[error("Inference failed: {0}")]
    Inference(#[from] LlmError),

    #[error("Analysis was cancelled")]
    Cancelled,
}

/// Rejects requests the pipeline must never start on.
pub fn validate_input(resume: &[u8], job_description: &str) -> Result<(), AnalysisError> {
    if resume.is_empty() {
        return Err(AnalysisError::Validation(
            "a resume document is required".to_string(),
        ));
    }
    if job_description.trim().is_empty() {
        return Err(AnalysisError::Validation(
            "job description cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Holds the collaborators for one process. Stateless per request; the only
/// shared mutable state is the throttle's admission log.
#[derive(Clone)]
pub struct AnalysisPipeline {
    rasterizer: Arc<dyn DocumentRasterizer>,
    inference: Arc<dyn InferenceClient>,
    throttle: Arc<CallThrottle>,
}

impl AnalysisPipeline {
    pub fn new(
        rasterizer: Arc<dyn DocumentRasterizer>,
        inference: Arc<dyn InferenceClient>,
        throttle: Arc<CallThrottle>,
    ) -> Self {
        Self {
            rasterizer,
            inference,
            throttle,
        }
    }

    pub fn throttle(&self) -> &CallThrottle {
        &self.throttle
    }

    /// Runs one analysis to completion.
    pub async fn analyze(
        &self,
        resume: &[u8],
        job_description: &str,
        kind: AnalysisKind,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.run(resume, job_description, kind, None).await
    }

    /// Runs one analysis, giving up with `Cancelled` as soon as `cancel` fires.
    ///
    /// Cancelling during the throttle wait records no admission. Cancelling
    /// during the inference call keeps the admission already recorded.
    pub async fn analyze_with_cancellation(
        &self,
        resume: &[u8],
        job_description: &str,
        kind: AnalysisKind,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.run(resume, job_description, kind, Some(cancel)).await
    }

    async fn run(
        &self,
        resume: &[u8],
        job_description: &str,
        kind: AnalysisKind,
        cancel: Option<&CancellationToken>,
    ) -> Result<AnalysisResult, AnalysisError> {
        validate_input(resume, job_description)?;

        let analysis_id = Uuid::new_v4();
        info!("Analysis {analysis_id}: kind={kind}, resume={} bytes", resume.len());

        // Step 1: first page → JPEG payload
        let rasterized =
            until_cancelled(cancel, self.rasterizer.rasterize_first_page(resume)).await?;
        let image = rasterized.map_err(|e| {
            warn!("Analysis {analysis_id}: document conversion failed: {e}");
            AnalysisError::DocumentConversion(e)
        })?;

        // Step 2: prompt
        let job_field = extract_job_field(job_description);
        let prompt = render_prompt(kind, job_field);
        info!("Analysis {analysis_id}: job_field={job_field}");

        // Step 3: pacing
        match cancel {
            Some(cancel) => self
                .throttle
                .admit_or_cancel(cancel)
                .await
                .map_err(|_| AnalysisError::Cancelled)?,
            None => self.throttle.admit().await,
        }

        // Step 4: model call
        let generated = until_cancelled(
            cancel,
            self.inference.generate(&prompt, &image, job_description),
        )
        .await?;
        let text = generated.map_err(|e| {
            warn!("Analysis {analysis_id}: inference failed: {e}");
            AnalysisError::Inference(e)
        })?;

        info!("Analysis {analysis_id}: completed ({} chars)", text.len());

        Ok(AnalysisResult {
            analysis_id,
            kind,
            job_field: job_field.to_string(),
            text,
            created_at: Utc::now(),
        })
    }
}

/// Awaits `step`, or returns `Cancelled` first if `cancel` fires.
async fn until_cancelled<T>(
    cancel: Option<&CancellationToken>,
    step: impl Future<Output = T>,
) -> Result<T, AnalysisError> {
    match cancel {
        Some(cancel) => tokio::select! {
            out = step => Ok(out),
            _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
        },
        None => Ok(step.await),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::document::ImagePayload;
    use crate::throttle::ThrottleConfig;

    pub(crate) const DATA_ENGINEER_JD: &str = "Looking for a Data Engineer to join our \
        Data Engineering group. You will build batch and streaming pipelines in Spark.";

    #[derive(Default)]
    pub(crate) struct FakeRasterizer {
        pub calls: AtomicUsize,
        pub reject: bool,
    }

    #[async_trait]
    impl DocumentRasterizer for FakeRasterizer {
        async fn rasterize_first_page(
            &self,
            _document: &[u8],
        ) -> Result<ImagePayload, RasterizeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(RasterizeError::Backend {
                    code: Some(1),
                    stderr: "Syntax Error: Couldn't find trailer dictionary".to_string(),
                });
            }
            Ok(ImagePayload::jpeg("/9j/4AAQSkZJRg==".to_string()))
        }
    }

    pub(crate) struct FakeInference {
        pub calls: AtomicUsize,
        pub prompts: Mutex<Vec<String>>,
        /// `None` makes every call fail.
        pub reply: Option<String>,
        pub delay: Duration,
    }

    impl FakeInference {
        pub fn replying(reply: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                reply: Some(reply.to_string()),
                delay: Duration::ZERO,
            }
        }

        pub fn failing() -> Self {
            Self {
                reply: None,
                ..Self::replying("")
            }
        }
    }

    #[async_trait]
    impl InferenceClient for FakeInference {
        async fn generate(
            &self,
            prompt: &str,
            image: &ImagePayload,
            _job_description: &str,
        ) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            assert_eq!(image.mime_type, "image/jpeg");
            tokio::time::sleep(self.delay).await;
            self.reply.clone().ok_or(LlmError::Api {
                status: 503,
                message: "The model is overloaded".to_string(),
            })
        }
    }

    pub(crate) fn pipeline_with(
        rasterizer: Arc<FakeRasterizer>,
        inference: Arc<FakeInference>,
        max_calls: usize,
    ) -> AnalysisPipeline {
        let config = ThrottleConfig::new(max_calls, Duration::from_secs(60)).unwrap();
        AnalysisPipeline::new(rasterizer, inference, Arc::new(CallThrottle::new(config)))
    }

    #[tokio::test]
    async fn test_success_calls_each_collaborator_once_and_returns_text_verbatim() {
        let rasterizer = Arc::new(FakeRasterizer::default());
        let reply = "  **Match Score: 78%**\n\nMissing keywords: Airflow, dbt\n";
        let inference = Arc::new(FakeInference::replying(reply));
        let pipeline = pipeline_with(rasterizer.clone(), inference.clone(), 15);

        let result = pipeline
            .analyze(b"%PDF-1.7 resume", DATA_ENGINEER_JD, AnalysisKind::MatchScore)
            .await
            .unwrap();

        assert_eq!(result.text, reply);
        assert_eq!(result.job_field, "Data Engineering");
        assert_eq!(result.kind, AnalysisKind::MatchScore);
        assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(inference.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.throttle().admissions_in_window().await, 1);

        let prompts = inference.prompts.lock().unwrap();
        assert!(prompts[0].contains("ATS scanner with expertise in Data Engineering"));
        assert!(!prompts[0].contains("[JOB_FIELD]"));
    }

    #[tokio::test]
    async fn test_conversion_failure_never_reaches_throttle_or_model() {
        let rasterizer = Arc::new(FakeRasterizer {
            reject: true,
            ..Default::default()
        });
        let inference = Arc::new(FakeInference::replying("unused"));
        let pipeline = pipeline_with(rasterizer.clone(), inference.clone(), 15);

        let err = pipeline
            .analyze(b"not a pdf", DATA_ENGINEER_JD, AnalysisKind::FullAnalysis)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::DocumentConversion(_)), "got {err:?}");
        assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.throttle().admissions_in_window().await, 0);
    }

    #[tokio::test]
    async fn test_inference_failure_still_consumes_quota() {
        let rasterizer = Arc::new(FakeRasterizer::default());
        let inference = Arc::new(FakeInference::failing());
        let pipeline = pipeline_with(rasterizer, inference.clone(), 15);

        let err = pipeline
            .analyze(b"%PDF-1.7 resume", DATA_ENGINEER_JD, AnalysisKind::SkillsGap)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Inference(_)), "got {err:?}");
        assert_eq!(inference.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.throttle().admissions_in_window().await, 1);
    }

    #[tokio::test]
    async fn test_empty_job_description_is_rejected_before_any_work() {
        let rasterizer = Arc::new(FakeRasterizer::default());
        let inference = Arc::new(FakeInference::replying("unused"));
        let pipeline = pipeline_with(rasterizer.clone(), inference.clone(), 15);

        let err = pipeline
            .analyze(b"%PDF-1.7 resume", "   \n", AnalysisKind::FullAnalysis)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Validation(_)));
        assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_blank_and_whitespace_job_descriptions_are_both_rejected() {
        for job_description in ["", " ", "\t\n  "] {
            let err = validate_input(b"%PDF-1.7 resume", job_description).unwrap_err();
            assert!(
                matches!(err, AnalysisError::Validation(_)),
                "{job_description:?} should be rejected"
            );
        }
        assert!(validate_input(b"%PDF-1.7 resume", " SQL ").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_waits_for_quota_before_calling_model() {
        let rasterizer = Arc::new(FakeRasterizer::default());
        let inference = Arc::new(FakeInference::replying("ok"));
        let pipeline = pipeline_with(rasterizer, inference.clone(), 1);
        let start = tokio::time::Instant::now();

        pipeline
            .analyze(b"%PDF", DATA_ENGINEER_JD, AnalysisKind::FullAnalysis)
            .await
            .unwrap();
        pipeline
            .analyze(b"%PDF", DATA_ENGINEER_JD, AnalysisKind::SkillsGap)
            .await
            .unwrap();

        assert_eq!(tokio::time::Instant::now() - start, Duration::from_secs(60));
        assert_eq!(inference.calls.load(Ordering::SeqCst), 2);
        assert_eq!(pipeline.throttle().admissions_in_window().await, 1);
    }

    #[test]
    fn test_missing_document_is_a_validation_error() {
        let err = validate_input(b"", DATA_ENGINEER_JD).unwrap_err();
        assert!(err.to_string().contains("resume"));
    }

    #[tokio::test]
    async fn test_unknown_field_falls_back_to_technology_in_prompt() {
        let rasterizer = Arc::new(FakeRasterizer::default());
        let inference = Arc::new(FakeInference::replying("ok"));
        let pipeline = pipeline_with(rasterizer, inference.clone(), 15);

        let result = pipeline
            .analyze(b"%PDF", "Line cook, weekend shifts", AnalysisKind::FullAnalysis)
            .await
            .unwrap();

        assert_eq!(result.job_field, "Technology");
        assert!(inference.prompts.lock().unwrap()[0].contains("expertise in Technology"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_throttle_wait_skips_model_and_records_nothing() {
        let rasterizer = Arc::new(FakeRasterizer::default());
        let inference = Arc::new(FakeInference::replying("first"));
        let pipeline = pipeline_with(rasterizer, inference.clone(), 1);

        pipeline
            .analyze(b"%PDF", DATA_ENGINEER_JD, AnalysisKind::MatchScore)
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let err = pipeline
            .analyze_with_cancellation(
                b"%PDF",
                DATA_ENGINEER_JD,
                AnalysisKind::MatchScore,
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Cancelled));
        assert_eq!(inference.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.throttle().admissions_in_window().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_inference_keeps_admission() {
        let rasterizer = Arc::new(FakeRasterizer::default());
        let inference = Arc::new(FakeInference {
            delay: Duration::from_secs(30),
            ..FakeInference::replying("too late")
        });
        let pipeline = pipeline_with(rasterizer, inference.clone(), 15);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = pipeline
            .analyze_with_cancellation(
                b"%PDF",
                DATA_ENGINEER_JD,
                AnalysisKind::FullAnalysis,
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Cancelled));
        assert_eq!(inference.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.throttle().admissions_in_window().await, 1);
    }
}
