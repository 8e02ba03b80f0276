//! Local walkthrough of the session coordinator over in-memory collaborators.

use std::sync::Arc;

use synjoint_session::content::{Article, NewArticle, NewPosting, Posting};
use synjoint_session::memory::{MemoryContentStore, MemoryIdentityProvider, TracingNavigator, TracingNotifier};
use synjoint_session::{Collaborators, Coordinator, SessionConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to read .env"),
    }

    let config = match SessionConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid session config");
            std::process::exit(1);
        }
    };
    tracing::info!(%config, "session config loaded");

    let identity = Arc::new(MemoryIdentityProvider::new());
    let admin_email = format!("editor@{}", config.admin_domain);
    let editor_id = identity.seed_account(&admin_email, "change-me", Some("Editor"));
    if let Err(e) = identity.set_profile_row(&editor_id, serde_json::json!({ "role": "admin", "count": 1 })) {
        tracing::warn!(error = %e, "editor profile not stored");
    }

    let navigator = Arc::new(TracingNavigator::default());
    let coordinator = Coordinator::new(
        config,
        Collaborators {
            identity: identity.clone(),
            articles: Arc::new(MemoryContentStore::<Article>::default()),
            postings: Arc::new(MemoryContentStore::<Posting>::default()),
            navigator: navigator.clone(),
            notifier: Arc::new(TracingNotifier),
        },
    );
    coordinator.start().await;

    // Wrong password first, then the real one.
    coordinator.login(&admin_email, "guess").await;
    coordinator.login(&admin_email, "change-me").await;
    let mut auth = coordinator.watch_auth();
    if auth.wait_for(|state| state.user.is_some()).await.is_err() {
        tracing::error!("coordinator closed before sign-in completed");
        return;
    }

    coordinator
        .add_article(NewArticle {
            title: "Hello from Synjoint".into(),
            excerpt: "First post".into(),
            content: "We are live.".into(),
            category: "News".into(),
            image: None,
        })
        .await;
    coordinator
        .add_posting(NewPosting {
            title: "Backend engineer".into(),
            department: "Engineering".into(),
            location: "Remote".into(),
            employment_type: "Full-time".into(),
            description: "Own the content pipeline.".into(),
            requirements: vec!["Rust".into(), "Postgres".into()],
        })
        .await;
    tracing::info!(
        articles = coordinator.articles().len(),
        postings = coordinator.postings().len(),
        route = navigator.current().as_deref(),
        "content published"
    );

    coordinator.logout().await;
    coordinator.shutdown().await;
}
