use base64::Engine;
use edge_agent::AgentError;
use edge_agent_devkit::{EdgexCall, TestHarness};

const EXPORT_TOML: &str = r#"
[exp]
nats = "nats://127.0.0.1:4222"
port = "8170"

[mqtt]
channel = "c0ffee"

[[routes]]
mqtt_topic = "channel/c0ffee/messages"
nats_topic = "export"
type = "plain"
workers = 4
"#;

fn b64(content: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(content)
}

#[tokio::test]
async fn test_blank_commands_are_rejected_everywhere() {
    let h = TestHarness::new().await.unwrap();

    for line in ["", "   ", "\t\n"] {
        assert!(matches!(h.agent.execute("1", line).await, Err(AgentError::InvalidCommand)));
        assert!(matches!(h.agent.control("1", line).await, Err(AgentError::InvalidCommand)));
        assert!(matches!(
            h.agent.service_config("1", line).await,
            Err(AgentError::InvalidCommand)
        ));
    }

    assert!(h.runner.get_calls().is_empty());
    assert!(h.edgex.get_calls().is_empty());
    assert!(h.control.get_published_messages().is_empty());
    assert!(h.bus.get_published_messages().is_empty());
}

#[tokio::test]
async fn test_execute_publishes_output() {
    let h = TestHarness::new().await.unwrap();
    h.runner.output(b"total 0\n");

    let payload = h.agent.execute("req-1", "ls, -l, /tmp").await.unwrap();

    assert_eq!(
        h.runner.get_calls(),
        vec![("ls".to_string(), vec!["-l".to_string(), "/tmp".to_string()])]
    );
    assert_eq!(payload, r#"[{"bn":"req-1","n":"ls","vs":"total 0\n"}]"#);

    let messages = h.control.get_published_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].topic, "channels/c0ffee/messages/res");
    assert_eq!(messages[0].payload, payload.as_bytes());
}

#[tokio::test]
async fn test_execute_failure_publishes_nothing() {
    let h = TestHarness::new().await.unwrap();
    h.runner.exit_with(2);

    let err = h.agent.execute("req-1", "ls,/missing").await.unwrap_err();
    assert!(matches!(err, AgentError::Execution { status: Some(2), .. }));
    assert!(h.control.get_published_messages().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_execute_runs_real_commands() {
    let h = TestHarness::with_system_runner().await.unwrap();

    h.agent.execute("42", "echo,hello").await.unwrap();
    let record = h.last_response().unwrap();
    assert_eq!(record.base_name, "42");
    assert_eq!(record.name, "echo");
    assert!(record.string_value.unwrap().contains("hello"));

    let err = h.agent.execute("43", "false").await.unwrap_err();
    assert!(matches!(err, AgentError::Execution { .. }));
    assert_eq!(h.responses().len(), 1);
}

#[tokio::test]
async fn test_execute_publish_failure_is_returned() {
    let h = TestHarness::new().await.unwrap();
    h.control.fail_publishes(true);

    let err = h.agent.execute("1", "uptime").await.unwrap_err();
    assert!(matches!(err, AgentError::Publish(_)));
    assert_eq!(h.runner.get_calls().len(), 1);
}

#[tokio::test]
async fn test_control_ping_with_and_without_arguments() {
    let h = TestHarness::new().await.unwrap();
    h.edgex.respond_with("pong");

    h.agent.control("p1", "edgex-ping").await.unwrap();
    h.agent.control("p2", "edgex-ping,extra").await.unwrap();

    let calls = h.edgex.get_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.method == "ping" && c.args.is_empty()));

    let responses = h.responses();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].base_name, "p1");
    assert_eq!(responses[1].base_name, "p2");
    assert!(responses
        .iter()
        .all(|r| r.name == "edgex-ping" && r.string_value.as_deref() == Some("pong")));
}

#[tokio::test]
async fn test_control_routes_each_verb() {
    let h = TestHarness::new().await.unwrap();

    h.agent
        .control("1", "edgex-operation, restart, edgex-core-data")
        .await
        .unwrap();
    h.agent.control("2", "edgex-config,edgex-core-data,edgex-core-metadata").await.unwrap();
    h.agent.control("3", "edgex-metrics,edgex-core-data").await.unwrap();

    assert_eq!(
        h.edgex.get_calls(),
        vec![
            EdgexCall {
                method: "push_operation",
                args: vec!["restart".into(), "edgex-core-data".into()],
            },
            EdgexCall {
                method: "fetch_config",
                args: vec!["edgex-core-data".into(), "edgex-core-metadata".into()],
            },
            EdgexCall {
                method: "fetch_metrics",
                args: vec!["edgex-core-data".into()],
            },
        ]
    );

    let names: Vec<String> = h.responses().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["edgex-operation", "edgex-config", "edgex-metrics"]);
}

#[tokio::test]
async fn test_control_unknown_verb_makes_no_call() {
    let h = TestHarness::new().await.unwrap();

    let err = h.agent.control("1", "bogus-verb,x").await.unwrap_err();
    assert!(matches!(err, AgentError::UnknownCommand(verb) if verb == "bogus-verb"));

    let err = h.agent.control("2", "bogus").await.unwrap_err();
    assert!(matches!(err, AgentError::InvalidCommand));
    assert!(h.edgex.get_calls().is_empty());
    assert!(h.control.get_published_messages().is_empty());
}

#[tokio::test]
async fn test_control_missing_arguments() {
    let h = TestHarness::new().await.unwrap();

    assert!(matches!(
        h.agent.control("1", "edgex-metrics").await,
        Err(AgentError::InvalidCommand)
    ));
    assert!(h.edgex.get_calls().is_empty());
}

#[tokio::test]
async fn test_control_device_failure_publishes_nothing() {
    let h = TestHarness::new().await.unwrap();
    h.edgex.fail_with("connection refused");

    let err = h.agent.control("1", "edgex-ping").await.unwrap_err();
    assert!(matches!(err, AgentError::Device(msg) if msg == "connection refused"));
    assert!(h.control.get_published_messages().is_empty());
}

#[tokio::test]
async fn test_view_serializes_registry() {
    let h = TestHarness::new().await.unwrap();
    h.registry.register_or_touch("export");
    h.registry.register_or_touch("ui");

    h.agent.service_config("v1", "view").await.unwrap();

    let record = h.last_response().unwrap();
    assert_eq!(record.base_name, "v1");
    assert_eq!(record.name, "view");

    let services: serde_json::Value =
        serde_json::from_str(&record.string_value.unwrap()).unwrap();
    assert_eq!(services.as_object().unwrap().len(), 2);
    assert_eq!(services["export"]["status"], "online");
    assert_eq!(services["ui"]["name"], "ui");
}

#[tokio::test]
async fn test_save_writes_config_and_notifies() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("export").join("config.toml");

    let cmd = format!("save, export, {}, {}", target.display(), b64(EXPORT_TOML));
    h.agent.service_config("s1", &cmd).await.unwrap();

    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.contains("nats_topic = \"export\""));

    let notifications = h.bus.find_messages_by_subject("commands.export.config");
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].payload.is_empty());

    let record = h.last_response().unwrap();
    assert_eq!(record.name, "save");
    assert_eq!(record.string_value.as_deref(), Some(""));
}

#[tokio::test]
async fn test_save_keeps_file_when_notification_fails() {
    let h = TestHarness::new().await.unwrap();
    h.bus.fail_publishes(true);
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("config.toml");

    let cmd = format!("save,export,{},{}", target.display(), b64(EXPORT_TOML));
    let err = h.agent.service_config("s2", &cmd).await.unwrap_err();

    assert!(matches!(err, AgentError::Publish(_)));
    assert!(std::fs::read_to_string(&target).unwrap().contains("[exp]"));
    assert!(h.bus.get_published_messages().is_empty());
    assert!(h.control.get_published_messages().is_empty());
}

#[tokio::test]
async fn test_save_unknown_service() {
    let h = TestHarness::new().await.unwrap();

    let err = h
        .agent
        .service_config("s1", "save,unknown-service,f,Yg==")
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::NoSuchService(name) if name == "unknown-service"));
    assert!(h.bus.get_published_messages().is_empty());
    assert!(h.control.get_published_messages().is_empty());
}

#[tokio::test]
async fn test_save_rejects_bad_base64() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("config.toml");

    let cmd = format!("save,export,{},not*base64", target.display());
    let err = h.agent.service_config("s1", &cmd).await.unwrap_err();

    assert!(matches!(err, AgentError::Decoding(_)));
    assert!(!target.exists());
    assert!(h.bus.get_published_messages().is_empty());
}

#[tokio::test]
async fn test_save_rejects_malformed_content() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("config.toml");

    let cmd = format!("save,export,{},{}", target.display(), b64("[exp\nport ="));
    let err = h.agent.service_config("s1", &cmd).await.unwrap_err();

    assert!(matches!(err, AgentError::Persistence(_)));
    assert!(!target.exists());
    assert!(h.bus.get_published_messages().is_empty());
}

#[tokio::test]
async fn test_save_needs_three_arguments() {
    let h = TestHarness::new().await.unwrap();

    assert!(matches!(
        h.agent.service_config("s1", "save,export,file").await,
        Err(AgentError::InvalidCommand)
    ));
}

#[tokio::test]
async fn test_unknown_service_sub_command() {
    let h = TestHarness::new().await.unwrap();

    assert!(matches!(
        h.agent.service_config("s1", "restart,export").await,
        Err(AgentError::UnknownCommand(cmd)) if cmd == "restart"
    ));
    assert!(h.control.get_published_messages().is_empty());
}

#[tokio::test]
async fn test_add_config_persists_without_touching_running_copy() {
    let h = TestHarness::new().await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let mut update = h.agent.config();
    update.file = dir.path().join("agent.toml");
    update.channels.control = "new-channel".to_string();

    h.agent.add_config(&update).await.unwrap();

    let saved = edge_agent::AgentConfig::load(&update.file).await.unwrap();
    assert_eq!(saved.channels.control, "new-channel");
    assert_eq!(h.agent.config().channels.control, "c0ffee");
}
