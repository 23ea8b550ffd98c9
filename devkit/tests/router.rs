use edge_agent::router::{route, spawn_request, Request, RequestKind};
use edge_agent::senml;
use edge_agent_devkit::TestHarness;

#[tokio::test]
async fn test_exec_request_round_trip() {
    let h = TestHarness::new().await.unwrap();
    h.runner.output(b"up 3 days\n");

    let request = Request::decode(br#"[{"bn":"7:","n":"exec","vs":"uptime"}]"#).unwrap();
    route(&h.agent, &request).await.unwrap();

    let record = h.last_response().unwrap();
    assert_eq!(record.base_name, "7");
    assert_eq!(record.name, "uptime");
    assert_eq!(record.string_value.as_deref(), Some("up 3 days\n"));
}

#[tokio::test]
async fn test_control_and_config_requests() {
    let h = TestHarness::new().await.unwrap();

    let payload = senml::encode("8:", "control", "edgex-ping").unwrap();
    let request = Request::decode(&payload).unwrap();
    assert_eq!(request.kind, RequestKind::Control);
    route(&h.agent, &request).await.unwrap();
    assert_eq!(h.edgex.get_calls().len(), 1);

    let payload = senml::encode("9:", "config", "view").unwrap();
    route(&h.agent, &Request::decode(&payload).unwrap()).await.unwrap();

    let names: Vec<String> = h.responses().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["edgex-ping", "view"]);
}

#[tokio::test]
async fn test_spawned_requests_publish_asynchronously() {
    let h = TestHarness::new().await.unwrap();

    spawn_request(
        h.agent.clone(),
        br#"[{"bn":"1:","n":"config","vs":"view"}]"#.to_vec(),
    );

    assert!(h.wait_until(1000, || h.responses().len() == 1).await);
}

#[tokio::test]
async fn test_failed_requests_stay_silent() {
    let h = TestHarness::new().await.unwrap();

    spawn_request(h.agent.clone(), b"garbage".to_vec());
    spawn_request(
        h.agent.clone(),
        br#"[{"bn":"2:","n":"control","vs":"bogus-verb,x"}]"#.to_vec(),
    );
    spawn_request(
        h.agent.clone(),
        br#"[{"bn":"3:","n":"config","vs":"save,unknown-service,f,Yg=="}]"#.to_vec(),
    );

    assert!(!h.wait_until(200, || !h.control.get_published_messages().is_empty()).await);
    assert!(h.edgex.get_calls().is_empty());
    assert!(h.bus.get_published_messages().is_empty());
}
