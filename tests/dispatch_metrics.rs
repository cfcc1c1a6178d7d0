use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use clapboard::{
    application::{
        catalog::ProjectCatalog,
        dispatch::RenderDispatcher,
        engine::{RenderBody, RenderEngine, RenderError, RenderJob, RenderReply},
    },
    config::ProjectsSettings,
};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use serde_json::json;
use tempfile::TempDir;

struct AcceptingEngine;

#[async_trait]
impl RenderEngine for AcceptingEngine {
    async fn render(&self, _job: RenderJob) -> Result<RenderReply, RenderError> {
        Ok(RenderReply::new(StatusCode::OK, json!({ "status": "success" })))
    }
}

fn settings(root: PathBuf) -> ProjectsSettings {
    ProjectsSettings {
        root,
        project_file: None,
        definition_file: PathBuf::from("src/project.ts"),
        template: "default".to_string(),
    }
}

#[tokio::test]
async fn dispatch_and_catalog_paths_emit_expected_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let dir = TempDir::new().expect("temp dir");
    let root = dir.path().join("projects");
    fs::create_dir_all(root.join("demo/src")).expect("create project");
    fs::write(root.join("demo/src/project.ts"), "export default {};\n").expect("write definition");

    let dispatcher = RenderDispatcher::new(&settings(root.clone()), Arc::new(AcceptingEngine));
    dispatcher
        .dispatch(Some("demo"), RenderBody::new())
        .await
        .expect("named dispatch");
    dispatcher
        .dispatch(None, RenderBody::new())
        .await
        .expect("default dispatch");
    dispatcher
        .dispatch(None, RenderBody::new())
        .await
        .expect("default dispatch");
    dispatcher
        .dispatch(Some("ghost"), RenderBody::new())
        .await
        .expect_err("missing project");

    let broken_root = dir.path().join("plain-file");
    fs::write(&broken_root, "not a directory").expect("write file");
    ProjectCatalog::new(&settings(broken_root))
        .snapshot()
        .await
        .expect_err("catalog failure");

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| {
            let key = composite_key.key();
            let mut name = key.name().to_string();
            for label in key.labels() {
                name.push_str(&format!("{{{}={}}}", label.key(), label.value()));
            }
            match value {
                DebugValue::Counter(count) => Some((name, count)),
                _ => None,
            }
        })
        .collect();

    let expected = [
        ("clapboard_render_dispatch_total{mode=named}", 1),
        ("clapboard_render_dispatch_total{mode=default}", 2),
        ("clapboard_render_not_found_total", 1),
        ("clapboard_catalog_failures_total", 1),
    ];

    for (metric, count) in expected {
        assert_eq!(
            counters.get(metric).copied(),
            Some(count),
            "unexpected value for {metric}: {counters:?}"
        );
    }
}
