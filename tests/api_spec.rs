use std::fs;
use std::path::Path;

use axum::http::StatusCode;
use axum_test::TestServer;
use keeper_dashboard::api::{create_router, AppState};
use keeper_dashboard::events::Broadcaster;
use keeper_dashboard::models::*;
use keeper_dashboard::store::FileStore;
use serde_json::{json, Value};
use tempfile::TempDir;

struct Fixture {
    server: TestServer,
    root: TempDir,
}

impl Fixture {
    fn seeds(&self) -> std::path::PathBuf {
        self.root.path().join("seeds")
    }

    fn decisions(&self) -> std::path::PathBuf {
        self.root.path().join("decisions")
    }
}

fn setup() -> Fixture {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    fs::create_dir_all(root.path().join("seeds")).expect("Failed to create seeds dir");
    fs::create_dir_all(root.path().join("decisions")).expect("Failed to create decisions dir");

    let store = FileStore::new(root.path().join("seeds"), root.path().join("decisions"));
    let app = create_router(AppState::new(store, Broadcaster::new()));
    let server = TestServer::new(app).expect("Failed to create test server");
    Fixture { server, root }
}

fn write(dir: &Path, file: &str, body: &str) {
    if let Some(parent) = dir.join(file).parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(dir.join(file), body).expect("Failed to write fixture");
}

// ============================================================
// Health endpoint
// ============================================================

mod health {
    use super::*;

    #[tokio::test]
    async fn returns_ok_with_timestamp() {
        let fx = setup();

        let response = fx.server.get("/api/health").await;

        response.assert_status_ok();
        let health: HealthStatus = response.json();
        assert_eq!(health.status, "ok");
    }
}

// ============================================================
// Vaults
// ============================================================

mod vaults {
    use super::*;

    #[tokio::test]
    async fn lists_and_reads_a_frontend_vault() {
        let fx = setup();
        write(
            &fx.seeds(),
            "frontend.yaml",
            "components:\n  Button:\n    variants: [primary, secondary]\n",
        );

        let response = fx.server.get("/api/vaults").await;
        response.assert_status_ok();
        response.assert_json(&json!({
            "vaults": [{"name": "frontend", "file": "frontend.yaml"}]
        }));

        let response = fx.server.get("/api/vault/frontend").await;
        response.assert_status_ok();
        response.assert_json(&json!({
            "name": "frontend",
            "content": {"components": {"Button": {"variants": ["primary", "secondary"]}}}
        }));
    }

    #[tokio::test]
    async fn listing_ignores_non_yaml_files_and_strips_yml() {
        let fx = setup();
        write(&fx.seeds(), "backend.yaml", "services: {}\n");
        write(&fx.seeds(), "auth.yml", "roles: {}\n");
        write(&fx.seeds(), "README.md", "# notes\n");
        write(&fx.seeds(), "frontend.yaml.bak", "components: {}\n");

        let list: VaultList = fx.server.get("/api/vaults").await.json();

        let names: Vec<_> = list.vaults.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["auth", "backend"]);
        assert_eq!(list.vaults[0].file, "auth.yml");
    }

    #[tokio::test]
    async fn yml_vaults_can_be_read_by_name() {
        let fx = setup();
        write(&fx.seeds(), "auth.yml", "roles:\n  admin: {}\n");

        let vault: VaultContent = fx.server.get("/api/vault/auth").await.json();

        assert_eq!(vault.content, json!({"roles": {"admin": {}}}));
    }

    #[tokio::test]
    async fn listing_is_empty_when_directory_is_missing() {
        let fx = setup();
        fs::remove_dir_all(fx.seeds()).unwrap();

        let response = fx.server.get("/api/vaults").await;

        response.assert_status_ok();
        response.assert_json(&json!({"vaults": []}));
    }

    #[tokio::test]
    async fn missing_vault_is_404() {
        let fx = setup();

        let response = fx.server.get("/api/vault/nope").await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({"error": "Vault not found"}));
    }

    #[tokio::test]
    async fn corrupt_and_empty_vaults_look_missing() {
        let fx = setup();
        write(&fx.seeds(), "broken.yaml", "components: [unclosed\n");
        write(&fx.seeds(), "blank.yaml", "");

        for name in ["broken", "blank"] {
            let response = fx.server.get(&format!("/api/vault/{}", name)).await;
            response.assert_status(StatusCode::NOT_FOUND);
            response.assert_json(&json!({"error": "Vault not found"}));
        }
    }

    #[tokio::test]
    async fn non_word_vault_names_do_not_match() {
        let fx = setup();
        write(&fx.seeds(), "front-end.yaml", "components: {}\n");

        let response = fx.server.get("/api/vault/front-end").await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({"error": "Not found"}));
    }

    #[tokio::test]
    async fn content_round_trips_through_yaml() {
        let fx = setup();
        let doc = json!({
            "api_routes": {
                "GET /api/vaults": {
                    "purpose": "List vaults",
                    "auth_required": false,
                    "scopes": [],
                    "returns": "VaultInfo[]"
                }
            },
            "services": {
                "watcher": {"responsibilities": ["watch", "classify"], "retries": 3, "ratio": 0.5}
            }
        });
        write(&fx.seeds(), "backend.yaml", &serde_yaml::to_string(&doc).unwrap());

        let vault: VaultContent = fx.server.get("/api/vault/backend").await.json();

        assert_eq!(vault.content, doc);
    }
}

// ============================================================
// Seeds
// ============================================================

mod seeds {
    use super::*;

    const BACKEND: &str = "\
api_routes:
  GET /api/vaults:
    purpose: List vaults
    auth_required: false
    returns: VaultInfo[]
services:
  watcher:
    responsibilities: [watch directories]
    forbidden: [writing files]
";

    #[tokio::test]
    async fn lists_seeds_for_the_detected_kind() {
        let fx = setup();
        write(&fx.seeds(), "backend.yaml", BACKEND);

        let response = fx.server.get("/api/vault/backend/seeds").await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "name": "backend",
            "kind": "backend",
            "seeds": ["GET /api/vaults", "watcher"]
        }));
    }

    #[tokio::test]
    async fn resolves_a_seed_with_normalized_attributes() {
        let fx = setup();
        write(&fx.seeds(), "backend.yaml", BACKEND);

        let response = fx
            .server
            .get("/api/vault/backend/seeds/GET%20%2Fapi%2Fvaults")
            .await;

        response.assert_status_ok();
        let seed: SeedDetail = response.json();
        assert_eq!(seed.name, "GET /api/vaults");
        assert_eq!(seed.container.as_deref(), Some("api_routes"));
        assert_eq!(seed.attributes.purpose.as_deref(), Some("List vaults"));
        assert_eq!(seed.attributes.auth_required, Some(false));
        assert_eq!(seed.raw["returns"], "VaultInfo[]");
    }

    #[tokio::test]
    async fn unknown_seed_is_404() {
        let fx = setup();
        write(&fx.seeds(), "backend.yaml", BACKEND);

        let response = fx.server.get("/api/vault/backend/seeds/missing").await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({"error": "Seed not found"}));
    }

    #[tokio::test]
    async fn seeds_of_missing_vault_is_404() {
        let fx = setup();

        let response = fx.server.get("/api/vault/nope/seeds").await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({"error": "Vault not found"}));
    }
}

// ============================================================
// Decisions
// ============================================================

mod decisions {
    use super::*;

    #[tokio::test]
    async fn lists_newest_first_with_latest_flag() {
        let fx = setup();
        write(&fx.decisions(), "001-a.yaml", "summary: First\n");
        write(&fx.decisions(), "002-b.yaml", "summary: Second\n");
        write(&fx.decisions(), "003-c.yaml", "summary: Third\n");

        let list: DecisionList = fx.server.get("/api/decisions").await.json();

        let ids: Vec<_> = list.decisions.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["003-c", "002-b", "001-a"]);
        assert!(list.decisions[0].latest);
        assert!(list.decisions[1..].iter().all(|d| !d.latest));
        assert_eq!(list.decisions[0].summary.as_deref(), Some("Third"));
    }

    #[tokio::test]
    async fn summary_is_null_when_missing_or_unparseable() {
        let fx = setup();
        write(&fx.decisions(), "001-a.yaml", "title: no summary here\n");
        write(&fx.decisions(), "002-b.yaml", "summary: [unclosed\n");

        let body: Value = fx.server.get("/api/decisions").await.json();

        assert_eq!(body["decisions"][0]["id"], "002-b");
        assert_eq!(body["decisions"][0]["summary"], Value::Null);
        assert_eq!(body["decisions"][1]["summary"], Value::Null);
    }

    #[tokio::test]
    async fn listing_is_empty_when_directory_is_missing() {
        let fx = setup();
        fs::remove_dir_all(fx.decisions()).unwrap();

        let response = fx.server.get("/api/decisions").await;

        response.assert_status_ok();
        response.assert_json(&json!({"decisions": []}));
    }

    #[tokio::test]
    async fn every_listed_decision_can_be_fetched() {
        let fx = setup();
        write(&fx.decisions(), "001-initial.yaml", "summary: First\n");
        write(&fx.decisions(), "2024-01-15T10:30-auth.yaml", "summary: Timestamped\n");

        let list: DecisionList = fx.server.get("/api/decisions").await.json();
        assert!(list.decisions.iter().any(|d| d.id == "2024-01-15T10:30-auth"));

        for decision in &list.decisions {
            let response = fx.server.get(&format!("/api/decision/{}", decision.id)).await;
            response.assert_status_ok();
            let body: DecisionContent = response.json();
            assert_eq!(body.id, decision.id);
            assert_eq!(body.content["summary"], json!(decision.summary));
        }
    }

    #[tokio::test]
    async fn non_string_summary_is_listed_as_null() {
        let fx = setup();
        write(&fx.decisions(), "001-a.yaml", "summary:\n  short: nested\n");
        write(&fx.decisions(), "002-b.yaml", "summary: 42\n");

        let body: Value = fx.server.get("/api/decisions").await.json();

        assert_eq!(body["decisions"][0]["summary"], Value::Null);
        assert_eq!(body["decisions"][1]["summary"], Value::Null);
    }

    #[tokio::test]
    async fn reads_a_decision_by_id() {
        let fx = setup();
        write(
            &fx.decisions(),
            "001-use-sse.yaml",
            "summary: Use SSE\ncontext: one-way push is enough\n",
        );

        let response = fx.server.get("/api/decision/001-use-sse").await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "id": "001-use-sse",
            "content": {"summary": "Use SSE", "context": "one-way push is enough"}
        }));
    }

    #[tokio::test]
    async fn ids_may_contain_subdirectories() {
        let fx = setup();
        write(&fx.decisions(), "2024/004-split.yaml", "summary: Split\n");

        let decision: DecisionContent = fx.server.get("/api/decision/2024/004-split").await.json();

        assert_eq!(decision.id, "2024/004-split");
        assert_eq!(decision.content["summary"], "Split");
    }

    #[tokio::test]
    async fn traversal_outside_the_decision_directory_is_refused() {
        let fx = setup();
        write(&fx.seeds(), "frontend.yaml", "components: {}\n");

        let response = fx
            .server
            .get("/api/decision/..%2Fseeds%2Ffrontend")
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({"error": "Decision not found"}));
    }

    #[tokio::test]
    async fn missing_decision_is_404() {
        let fx = setup();

        let response = fx.server.get("/api/decision/999-nope").await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({"error": "Decision not found"}));
    }
}

// ============================================================
// Routing & CORS
// ============================================================

mod routing {
    use super::*;

    #[tokio::test]
    async fn unknown_paths_are_json_404() {
        let fx = setup();

        for path in ["/", "/api/unknown", "/api/vault"] {
            let response = fx.server.get(path).await;
            response.assert_status(StatusCode::NOT_FOUND);
            response.assert_json(&json!({"error": "Not found"}));
        }
    }

    #[tokio::test]
    async fn responses_allow_any_origin() {
        let fx = setup();

        let response = fx
            .server
            .get("/api/vaults")
            .add_header("Origin", "http://localhost:5173")
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("access-control-allow-origin"), "*");
    }
}
