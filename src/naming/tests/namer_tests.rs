//! Tests for branch name generation and fallback.

use std::sync::Arc;

use crate::naming::{
    adapters::memory::StaticTextGenerator,
    ports::{MockTextGenerator, TextGenerationError, TextGenerator},
    services::{BranchNamer, BranchNamingError, BranchNamingSettings, BranchRequest},
};
use crate::task::domain::TaskId;
use chrono::{TimeZone, Utc};
use eyre::{Result, bail, ensure};
use rstest::rstest;

fn namer_with(generator: impl TextGenerator + 'static) -> BranchNamer {
    BranchNamer::new(Some(Arc::new(generator)), BranchNamingSettings::default())
}

fn split_suffix(name: &str) -> Option<(&str, &str)> {
    name.rsplit_once('-')
}

#[rstest]
#[case("feature/health-endpoint")]
#[case("\"feature/health-endpoint\"")]
#[case("`feature/health-endpoint`")]
#[case("  'feature/health-endpoint'\n")]
#[tokio::test(flavor = "multi_thread")]
async fn valid_replies_get_a_random_suffix(#[case] reply: &str) -> Result<()> {
    let namer = namer_with(StaticTextGenerator::replying(reply));

    let name = namer
        .generate(BranchRequest::new("Add a health endpoint"))
        .await?;

    let Some((base, suffix)) = split_suffix(name.as_str()) else {
        bail!("missing suffix in {name}");
    };
    ensure!(base == "feature/health-endpoint");
    ensure!(suffix.len() == 6);
    ensure!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    Ok(())
}

#[rstest]
#[case("Feature/Health")]
#[case("feature//health")]
#[case("-feature/health")]
#[case("feature/health/")]
#[case("feature/health endpoint")]
#[case("feature/this-branch-name-is-far-too-long-to-be-accepted-by-the-namer")]
#[case("")]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_replies_are_rejected(#[case] reply: &str) -> Result<()> {
    let namer = namer_with(StaticTextGenerator::replying(reply));

    let result = namer.generate(BranchRequest::new("anything")).await;

    ensure!(
        matches!(result, Err(BranchNamingError::Invalid(_))),
        "accepted {reply:?}: {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn prompt_includes_hints() -> Result<()> {
    let generator = StaticTextGenerator::replying("fix/login");
    let namer = namer_with(generator.clone());

    namer
        .generate(
            BranchRequest::new("Fix the login redirect")
                .with_repo_hint("acme/app")
                .with_context_hint("users report a loop"),
        )
        .await?;

    let prompts = generator.prompts();
    let prompt = prompts.first().map(String::as_str).unwrap_or_default();
    ensure!(prompt.contains("Task: Fix the login redirect"));
    ensure!(prompt.contains("Repository: acme/app"));
    ensure!(prompt.contains("Context: users report a loop"));
    ensure!(prompt.contains("at most 50 characters"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn generator_failure_falls_back() -> Result<()> {
    let mut generator = MockTextGenerator::new();
    generator
        .expect_complete()
        .times(1)
        .returning(|_| Err(TextGenerationError::EmptyResponse));
    let namer = namer_with(generator);
    let task_id = TaskId::new("Abc123xyz789")?;
    let at = Utc
        .with_ymd_and_hms(2026, 3, 4, 5, 6, 7)
        .single()
        .ok_or_else(|| eyre::eyre!("invalid timestamp"))?;

    let name = namer
        .name_or_fallback(BranchRequest::new("anything"), &task_id, at)
        .await;

    ensure!(name.as_str() == "agent/2026-03-04T05-06-07-abc123xy");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disabled_namer_never_calls_generator() -> Result<()> {
    let mut generator = MockTextGenerator::new();
    generator.expect_complete().times(0);
    let settings = BranchNamingSettings {
        enabled: false,
        ..BranchNamingSettings::default()
    };
    let namer = BranchNamer::new(Some(Arc::new(generator)), settings);

    let result = namer.generate(BranchRequest::new("anything")).await;

    ensure!(matches!(result, Err(BranchNamingError::Disabled)));
    Ok(())
}

#[rstest]
#[case("ab")]
#[case("a_b-c")]
fn fallback_pads_short_identifiers(#[case] raw: &str) -> Result<()> {
    let task_id = TaskId::new(raw)?;
    let at = Utc::now();

    let name = BranchNamer::fallback(&task_id, at);

    let Some((_, suffix)) = split_suffix(name.as_str()) else {
        bail!("missing suffix in {name}");
    };
    ensure!(suffix.len() == 8);
    ensure!(name.as_str().starts_with("agent/"));
    ensure!(name == BranchNamer::fallback(&task_id, at), "fallback must be deterministic");
    Ok(())
}
