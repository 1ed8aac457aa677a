use std::sync::Arc;

use barrage::{
    ApiRequest, Executor, ProgressBroadcaster, Summary, TestScenario, VirtualUserExecutor,
    client::{DEFAULT_TIMEOUT, ReqwestClient},
};
use futures::StreamExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Build the client once; every virtual user shares its connection pool.
    let client = ReqwestClient::new(DEFAULT_TIMEOUT)?;
    let progress = ProgressBroadcaster::new(256);

    let mut lines = progress.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(line) = lines.next().await {
            println!("{line}");
        }
    });

    let scenario = TestScenario {
        concurrent_users: 10,
        duration_seconds: 5,
        requests: vec![
            ApiRequest::new("GET", "http://localhost:3000"),
            ApiRequest::new("POST", "http://localhost:3000/items")
                .header("Content-Type", "application/json")
                .body(serde_json::json!({ "name": "barrage" })),
        ],
        max_requests: 0,
    };
    scenario.validate()?;

    let results = VirtualUserExecutor::builder()
        .client(Arc::new(client))
        .progress(progress.clone())
        .build()
        .exec(&scenario)
        .await?;

    progress.close_all();
    printer.await?;

    println!("{:#?}", Summary::from_results(&results));
    Ok(())
}
