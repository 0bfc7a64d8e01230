//! Tests for credential fallback, agent scoping and validation.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::agent::domain::AgentKind;
use crate::credentials::{
    adapters::memory::InMemoryCredentialStore,
    domain::{ApiProvider, CredentialError, ResolvedCredentials, SandboxCredentials, Secret},
    services::{CredentialDefaults, CredentialResolver},
};
use crate::task::domain::UserId;
use eyre::{Result, ensure, eyre};
use rstest::{fixture, rstest};

fn secret(value: &str) -> Result<Secret> {
    Secret::new(value).ok_or_else(|| eyre!("blank secret"))
}

#[fixture]
fn user() -> UserId {
    UserId::new("user-1").expect("valid user id")
}

#[fixture]
fn defaults() -> CredentialDefaults {
    let mut api_keys = BTreeMap::new();
    api_keys.insert(
        ApiProvider::Anthropic,
        Secret::new("sk-default-anthropic").expect("non-blank"),
    );
    api_keys.insert(
        ApiProvider::OpenAi,
        Secret::new("sk-default-openai").expect("non-blank"),
    );
    CredentialDefaults {
        api_keys,
        git_hosting_token: Secret::new("ghp_default"),
        sandbox: SandboxCredentials::default(),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stored_user_key_takes_precedence_over_default(
    user: UserId,
    defaults: CredentialDefaults,
) -> Result<()> {
    let store = InMemoryCredentialStore::new();
    store.put_api_key(user.clone(), ApiProvider::Anthropic, secret("sk-user")?)?;
    let resolver = CredentialResolver::new(Arc::new(store), Arc::new(defaults));

    let resolved = resolver.resolve(&user).await?;

    let key = resolved
        .api_key(ApiProvider::Anthropic)
        .ok_or_else(|| eyre!("anthropic key missing"))?;
    ensure!(key.expose() == "sk-user", "user key should win");
    let fallback = resolved
        .api_key(ApiProvider::OpenAi)
        .ok_or_else(|| eyre!("openai key missing"))?;
    ensure!(fallback.expose() == "sk-default-openai", "default should fill gaps");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn git_token_falls_back_to_default(user: UserId, defaults: CredentialDefaults) -> Result<()> {
    let resolver = CredentialResolver::new(
        Arc::new(InMemoryCredentialStore::new()),
        Arc::new(defaults),
    );

    let token = resolver.git_hosting_token(&user).await?;

    ensure!(token.map(|t| t.expose().to_owned()) == Some("ghp_default".to_owned()));
    Ok(())
}

#[rstest]
fn env_for_injects_only_agent_relevant_keys() -> Result<()> {
    let resolved = ResolvedCredentials::new(SandboxCredentials::default())
        .with_api_key(ApiProvider::Anthropic, secret("sk-ant")?)
        .with_api_key(ApiProvider::Gemini, secret("gem-key")?);

    let env = resolved.env_for(AgentKind::Claude);

    ensure!(env.len() == 1, "unexpected variables: {:?}", env.keys());
    ensure!(env.get("ANTHROPIC_API_KEY").map(String::as_str) == Some("sk-ant"));
    Ok(())
}

#[rstest]
fn copilot_receives_git_token_variables() -> Result<()> {
    let resolved = ResolvedCredentials::new(SandboxCredentials::default())
        .with_git_hosting_token(secret("ghp_token")?);

    let env = resolved.env_for(AgentKind::Copilot);

    ensure!(env.get("GH_TOKEN").map(String::as_str) == Some("ghp_token"));
    ensure!(env.get("GITHUB_TOKEN").map(String::as_str) == Some("ghp_token"));
    Ok(())
}

#[rstest]
#[case(AgentKind::Codex, "OPENAI_API_KEY")]
#[case(AgentKind::Gemini, "GEMINI_API_KEY")]
#[case(AgentKind::Cursor, "CURSOR_API_KEY")]
fn missing_key_is_configuration_error(#[case] agent: AgentKind, #[case] variable: &str) {
    let resolved = ResolvedCredentials::new(SandboxCredentials::default());

    let result = resolved.ensure_agent_ready(agent);

    assert!(matches!(
        result,
        Err(CredentialError::MissingApiKey { variables, .. }) if variables == variable
    ));
}

#[rstest]
fn opencode_accepts_either_provider() -> Result<()> {
    let resolved = ResolvedCredentials::new(SandboxCredentials::default())
        .with_api_key(ApiProvider::Anthropic, secret("sk-ant")?);

    resolved.ensure_agent_ready(AgentKind::OpenCode)?;
    Ok(())
}

#[rstest]
fn sandbox_credentials_name_missing_field() -> Result<()> {
    let credentials = SandboxCredentials {
        token: Some(secret("vercel-token")?),
        team_id: Some("team".to_owned()),
        project_id: None,
    };

    let result = credentials.validate();

    ensure!(matches!(
        result,
        Err(CredentialError::MissingSandboxCredential("project_id"))
    ));
    Ok(())
}

#[rstest]
fn secret_debug_output_is_redacted() -> Result<()> {
    let value = secret("sk-very-secret")?;

    let rendered = format!("{value:?}");

    ensure!(!rendered.contains("sk-very-secret"));
    Ok(())
}

#[rstest]
fn blank_secret_is_rejected() {
    assert!(Secret::new("   ").is_none());
}
