//! Hydrate a rendered page in a worker and print what it sends back
//!
//! Run with `RUST_LOG=debug` to see flushes and hydration in the log.

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use wdom_dom::{
    ElementAttributes, EventListener, EventTarget, HydrateableNode, InboundMessage, NodeIndex,
    TransferrableEvent,
};
use wdom_worker::{WorkerConfig, WorkerThread};

/// `<body><button id="inc">+</button><span>0</span></body>` as the main thread
/// serializes it
const STRINGS: &str = r#"["body","button","null","id","inc","+","span","0"]"#;
const SKELETON: &str = r#"{
    "0": 1, "1": 0, "7": 2,
    "4": [
        {"0": 1, "1": 1, "7": 3, "2": [[2, 3, 4]], "4": [{"0": 3, "1": 0, "5": 5, "7": 4}]},
        {"0": 1, "1": 6, "7": 5, "4": [{"0": 3, "1": 0, "5": 7, "7": 6}]}
    ]
}"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let strings: Vec<String> = serde_json::from_str(STRINGS).context("decoding strings")?;
    let skeleton: HydrateableNode = serde_json::from_str(SKELETON).context("decoding skeleton")?;

    let config = WorkerConfig {
        location: "https://example.com/counter".to_string(),
        inner_width: 800,
        inner_height: 600,
        ..Default::default()
    };

    let handle = WorkerThread::spawn(config, move |worker| {
        worker.hydrate(&strings, &skeleton, &[])?;
        let document = worker.document_mut();
        let count = NodeIndex::new(5);
        document.add_event_listener(
            NodeIndex::new(3),
            "click",
            EventListener::new(move |document, _| {
                let next = document.text_content(count).parse::<u32>().unwrap_or(0) + 1;
                if let Err(err) = document.set_text_content(count, &next.to_string()) {
                    tracing::warn!("Counter update failed: {}", err);
                }
            }),
        )?;
        let button = NodeIndex::new(3);
        document.set_attribute(button, "aria-label", "increment")?;
        Ok(())
    })?;

    let first = smol::block_on(handle.recv())?;
    println!("{}", serde_json::to_string(&first)?);

    for _ in 0..3 {
        handle.post_message(InboundMessage::Event(TransferrableEvent {
            index: 3,
            event_type: "click".to_string(),
            bubbles: true,
            ..Default::default()
        }))?;
        let reply = smol::block_on(handle.recv())?;
        println!("{}", serde_json::to_string(&reply)?);
    }

    handle.terminate()?;
    Ok(())
}
