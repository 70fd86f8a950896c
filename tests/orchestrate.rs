use site_ship::config::{Credentials, SiteConfig};
use site_ship::contract::{
    Deployment, EdgeProject, MockEdgeHost, MockProjectStore, MockRepoHost, RepositoryRef,
    StoredPage,
};
use site_ship::edge_publish::EdgePublisher;
use site_ship::error::DeployError;
use site_ship::orchestrate::deploy;
use site_ship::repo_publish::RepositoryPublisher;

fn credentials() -> Credentials {
    Credentials {
        github_owner: "acme".to_string(),
        github_token: "gh-token".to_string(),
        cloudflare_account_id: "acct-1".to_string(),
        cloudflare_token: "cf-token".to_string(),
        store_base_url: "http://localhost:3000".to_string(),
        store_token: "store-token".to_string(),
    }
}

fn site_config() -> SiteConfig {
    SiteConfig {
        project_id: "42".to_string(),
        site_name: "my-site".to_string(),
        branch: "main".to_string(),
        commit_message: None,
        skip_edge: false,
    }
}

fn page(path: &str, content: &str) -> StoredPage {
    StoredPage {
        path: path.to_string(),
        content: content.to_string(),
    }
}

fn repo_ref() -> RepositoryRef {
    RepositoryRef {
        owner: "acme".to_string(),
        name: "my-site".to_string(),
        default_branch: "main".to_string(),
        head_commit_sha: Some("head".to_string()),
    }
}

fn happy_repo_host() -> MockRepoHost {
    let mut host = MockRepoHost::new();
    host.expect_get_repo().returning(|_| Ok(repo_ref()));
    host.expect_get_branch_ref()
        .returning(|_| Ok("head".to_string()));
    host.expect_create_blob()
        .returning(|_, _| Ok("blob-sha".to_string()));
    host.expect_create_tree()
        .returning(|_, _| Ok("tree-sha".to_string()));
    host.expect_create_commit()
        .returning(|_, _, _, _| Ok("commit-sha".to_string()));
    host.expect_force_update_ref().returning(|_, _| Ok(()));
    host
}

fn happy_edge_host() -> MockEdgeHost {
    let mut host = MockEdgeHost::new();
    host.expect_get_project().returning(|name| {
        Ok(EdgeProject {
            name: name.to_string(),
            account_id: "acct-1".to_string(),
            subdomain: Some("my-site.pages.dev".to_string()),
        })
    });
    host.expect_create_deployment().returning(|_, _, _| {
        Ok(Deployment {
            id: "dep-1".to_string(),
            url: "https://abc123.my-site.pages.dev".to_string(),
            created_at: None,
        })
    });
    host.expect_deployment_domain()
        .returning(|_, _| Ok(Some("https://my-site.pages.dev".to_string())));
    host
}

fn happy_store() -> MockProjectStore {
    let mut store = MockProjectStore::new();
    store
        .expect_list_pages()
        .returning(|_| Ok(vec![page("/index.html", "<h1>Hi</h1>")]));
    store.expect_trigger_deploy().returning(|_| Ok(()));
    store.expect_save_domain().returning(|_, _| Ok(()));
    store.expect_persist_outcome().returning(|_, _| Ok(()));
    store
}

#[tokio::test(start_paused = true)]
async fn full_pipeline_reports_both_urls() {
    let repo = RepositoryPublisher::new(happy_repo_host());
    let edge = EdgePublisher::new(happy_edge_host());
    let store = happy_store();

    let outcome = deploy(&repo, &edge, &store, &credentials(), &site_config())
        .await
        .expect("deploy should succeed");

    assert!(outcome.success);
    assert_eq!(outcome.url, "https://my-site.pages.dev");
    assert_eq!(
        outcome.github_url.as_deref(),
        Some("https://github.com/acme/my-site")
    );
    assert_eq!(
        outcome.cloudflare_url.as_deref(),
        Some("https://abc123.my-site.pages.dev")
    );
    // /index.html plus the injected build manifest.
    assert_eq!(outcome.files_count, 2);
}

#[tokio::test(start_paused = true)]
async fn edge_failure_is_downgraded_to_success_with_warning() {
    let repo = RepositoryPublisher::new(happy_repo_host());

    let mut edge_host = MockEdgeHost::new();
    edge_host.expect_get_project().returning(|_| {
        Err(DeployError::Backend {
            backend: "cloudflare",
            status: 500,
            message: "edge down".to_string(),
        })
    });
    let edge = EdgePublisher::new(edge_host);
    let store = happy_store();

    let outcome = deploy(&repo, &edge, &store, &credentials(), &site_config())
        .await
        .expect("primary success must survive edge failure");

    assert!(outcome.success);
    assert_eq!(outcome.cloudflare_url, None);
    assert_eq!(outcome.url, "https://github.com/acme/my-site");
    assert!(outcome.message.contains("edge publish did not complete"));
}

#[tokio::test(start_paused = true)]
async fn primary_failure_is_fatal() {
    let mut repo_host = MockRepoHost::new();
    repo_host.expect_get_repo().returning(|_| {
        Err(DeployError::Backend {
            backend: "github",
            status: 503,
            message: "unavailable".to_string(),
        })
    });
    let repo = RepositoryPublisher::new(repo_host);
    let edge = EdgePublisher::new(MockEdgeHost::new());

    let mut store = MockProjectStore::new();
    store
        .expect_list_pages()
        .returning(|_| Ok(vec![page("/index.html", "<h1>Hi</h1>")]));

    let err = deploy(&repo, &edge, &store, &credentials(), &site_config())
        .await
        .expect_err("primary failure must abort");
    assert!(matches!(err, DeployError::Backend { status: 503, .. }));
}

#[tokio::test(start_paused = true)]
async fn empty_project_is_fatal_before_any_publish() {
    let repo = RepositoryPublisher::new(MockRepoHost::new());
    let edge = EdgePublisher::new(MockEdgeHost::new());

    let mut store = MockProjectStore::new();
    store.expect_list_pages().returning(|_| Ok(vec![]));
    store.expect_legacy_document().returning(|_| Ok(None));

    let err = deploy(&repo, &edge, &store, &credentials(), &site_config())
        .await
        .expect_err("empty project must abort");
    assert!(matches!(err, DeployError::NothingToDeploy));
}

#[tokio::test(start_paused = true)]
async fn missing_credentials_fail_before_any_call() {
    let repo = RepositoryPublisher::new(MockRepoHost::new());
    let edge = EdgePublisher::new(MockEdgeHost::new());
    let store = MockProjectStore::new();

    let mut creds = credentials();
    creds.github_token = String::new();

    // No expectations were set on any mock: a single network-facing call
    // would panic the test.
    let err = deploy(&repo, &edge, &store, &creds, &site_config())
        .await
        .expect_err("blank credential must abort");
    assert!(matches!(err, DeployError::Auth(_)));
}

#[tokio::test(start_paused = true)]
async fn trigger_failure_is_ignored() {
    let repo = RepositoryPublisher::new(happy_repo_host());
    let edge = EdgePublisher::new(happy_edge_host());

    let mut store = MockProjectStore::new();
    store
        .expect_list_pages()
        .returning(|_| Ok(vec![page("/index.html", "<h1>Hi</h1>")]));
    store.expect_trigger_deploy().returning(|_| {
        Err(DeployError::Backend {
            backend: "store",
            status: 500,
            message: "trigger down".to_string(),
        })
    });
    store.expect_save_domain().returning(|_, _| Ok(()));
    store.expect_persist_outcome().returning(|_, _| Ok(()));

    let outcome = deploy(&repo, &edge, &store, &credentials(), &site_config())
        .await
        .expect("trigger failure must not surface");
    assert!(outcome.success);
}

#[tokio::test(start_paused = true)]
async fn skip_edge_publishes_repository_only() {
    let repo = RepositoryPublisher::new(happy_repo_host());
    let edge = EdgePublisher::new(MockEdgeHost::new());
    let store = happy_store();

    let mut config = site_config();
    config.skip_edge = true;

    let outcome = deploy(&repo, &edge, &store, &credentials(), &config)
        .await
        .expect("repository-only deploy should succeed");
    assert!(outcome.success);
    assert_eq!(outcome.cloudflare_url, None);
    assert_eq!(outcome.url, "https://github.com/acme/my-site");
    assert!(outcome.message.contains("edge publish skipped"));
}

#[tokio::test(start_paused = true)]
async fn persistence_failure_is_downgraded() {
    let repo = RepositoryPublisher::new(happy_repo_host());
    let edge = EdgePublisher::new(happy_edge_host());

    let mut store = MockProjectStore::new();
    store
        .expect_list_pages()
        .returning(|_| Ok(vec![page("/index.html", "<h1>Hi</h1>")]));
    store.expect_trigger_deploy().returning(|_| Ok(()));
    store.expect_save_domain().returning(|_, _| Ok(()));
    store.expect_persist_outcome().returning(|_, _| {
        Err(DeployError::Backend {
            backend: "store",
            status: 500,
            message: "write failed".to_string(),
        })
    });

    let outcome = deploy(&repo, &edge, &store, &credentials(), &site_config())
        .await
        .expect("persistence failure must not surface");
    assert!(outcome.success);
}
