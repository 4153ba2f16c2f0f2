//! Self-contained walkthrough of both engines
//!
//! Wires the consensus engine and the memory manager with the in-process
//! adapters and runs one proposal to resolution, then a handful of memory
//! operations, printing what happens along the way.

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use hivemind_application::{ConsensusEngine, DistributedMemoryManager};
use hivemind_domain::{BatchOptions, DistributedNode, Proposal, ReadOptions, Vote, WriteOptions};
use hivemind_infrastructure::{
    ChannelBroadcast, FileConfig, HeuristicAnalyzer, InMemoryProposalRepository,
    InMemoryTaskExecutor, JsonlStore, LoopbackTransport, MarkerCompressionCodec,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(config: FileConfig, quiet: bool) -> Result<()> {
    let narrate = |line: &str| {
        if !quiet {
            println!("{line}");
        }
    };

    // === Consensus ===
    narrate("== Consensus ==");

    let repository = Arc::new(InMemoryProposalRepository::new());
    let broadcaster = Arc::new(ChannelBroadcast::default());
    let tasks = Arc::new(InMemoryTaskExecutor::new());
    let engine = Arc::new(ConsensusEngine::new(
        repository,
        broadcaster.clone(),
        Arc::new(HeuristicAnalyzer::new()),
        tasks.clone(),
        config.consensus.to_consensus_config(),
    ));
    let consensus_sweeps = engine.start();

    let mut swarm_rx = broadcaster.subscribe();

    tasks.register("task-deploy", json!({"kind": "deploy", "replicas": 3}));

    let proposal = Proposal::new(
        "swarm-1",
        json!({"action": "approve_task", "topic": "deploy v2", "risk": "low"}),
        0.66,
    )
    .with_task("task-deploy")
    .with_deadline(Utc::now() + ChronoDuration::seconds(30));

    let proposal_id = engine.create_proposal(proposal, 3).await?;
    narrate(&format!("created proposal {proposal_id} (threshold 0.66, 3 expected voters)"));

    if let Ok(message) = swarm_rx.recv().await {
        narrate(&format!(
            "swarm received {} for {}",
            message.message_type, message.payload["proposalId"]
        ));
    }

    let recommendation = engine
        .recommend_vote(&proposal_id, "agent-1", "worker")
        .await?;
    narrate(&format!(
        "recommendation for agent-1: {} (confidence {:.2}) - {}",
        if recommendation.approve { "approve" } else { "reject" },
        recommendation.confidence,
        recommendation.reasoning,
    ));

    engine
        .submit_vote(Vote::approve(&proposal_id, "agent-1", "capacity available"))
        .await?;
    engine
        .submit_vote(Vote::reject(&proposal_id, "agent-2", "prefer a canary first"))
        .await?;
    engine
        .submit_vote(Vote::approve(&proposal_id, "agent-3", "low risk"))
        .await?;

    let status = engine.status(&proposal_id).await?;
    narrate(&format!(
        "proposal {} is {} ({}/{} approvals)",
        proposal_id, status.status, status.tally.positive, status.tally.total
    ));
    if let Some(task) = tasks.task("task-deploy") {
        narrate(&format!("task-deploy status: {}", task.status));
    }

    let metrics = engine.metrics().await;
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    consensus_sweeps.cancel();

    // === Memory ===
    narrate("\n== Memory ==");

    let store_path = config.node.store_path();
    let store = Arc::new(JsonlStore::open(&store_path)?);
    narrate(&format!("durable store: {}", store_path.display()));

    let transport = Arc::new(LoopbackTransport::new(vec![
        DistributedNode::new("node-beta", "loopback"),
        DistributedNode::new("node-gamma", "loopback"),
    ]));
    let manager = Arc::new(DistributedMemoryManager::new(
        config.node.id.clone(),
        store,
        transport,
        Arc::new(MarkerCompressionCodec::new()),
        config.memory.to_memory_config(),
    ));
    let memory_ticks = manager.start();
    manager.refresh_peers().await;

    manager
        .set("agent:1", json!({"name": "ada", "role": "scout"}), WriteOptions::default())
        .await?;
    manager
        .set("agent:metadata", json!({"count": 1}), WriteOptions::default())
        .await?;

    let agent = manager.get("agent:1", ReadOptions::default()).await?;
    narrate(&format!("agent:1 => {}", agent.unwrap_or(json!(null))));

    let entries = vec![
        ("task:1".to_string(), json!({"kind": "scan"})),
        ("task:2".to_string(), json!({"kind": "report"})),
    ];
    let applied = manager.set_batch(&entries, BatchOptions::default().atomic()).await?;
    narrate(&format!("set_batch applied {applied} entries atomically"));

    let keys: Vec<String> = ["agent:1", "task:1", "task:2", "missing"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let resolved = manager.get_batch(&keys, BatchOptions::default()).await?;
    narrate(&format!("get_batch resolved {} of {} keys", resolved.len(), keys.len()));

    manager
        .set("buffered:1", json!(1), WriteOptions::default().batched())
        .await?;
    manager.flush_batch().await;
    narrate("batched write flushed");

    // Let replication and prefetch tasks settle before reporting
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = manager.get_cache_stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    let health = manager.health_check();
    println!("{}", serde_json::to_string_pretty(&health)?);

    memory_ticks.cancel();
    Ok(())
}
