//! Star + router against a loopback echo server.
//!
//! Demonstrates:
//! - Building a star with the router as delegate and IP source
//! - Observing connection status through the notification center
//! - Routing echoed frames to controllers and a push receiver
//! - Send completion handlers and terminate
//!
//! Usage:
//!   cargo run --example echo_chat
//!   cargo run --example echo_chat -- --debug --no-wait

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::Args;
use stargate::{
    Error, Frame, NetworkEventRouter, Notification, Result, Star, StarDelegate, Status,
};
use tokio::sync::watch;

// ============================================================================
// Constants
// ============================================================================

const SAY_HELLO: u32 = 1;
const CONVERSATION_LIST: u32 = 2;
const SEND_MSG: u32 = 3;

const SERVER_HOST: &str = "echo.local";

// ============================================================================
// Handlers
// ============================================================================

/// Prints the outcome of each send.
struct PrintFinish;

impl StarDelegate for PrintFinish {
    fn on_receive(&self, _data: Bytes) -> i32 {
        stargate::SUCCESS
    }

    fn on_finish_send(&self, payload: &Bytes, error: Option<&Error>) {
        match error {
            None => println!("    ✓ Sent {} bytes", payload.len()),
            Some(e) => println!("    ✗ Send failed: {e}"),
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== echo_chat ===\n");

    // ========================================================================
    // Server
    // ========================================================================

    let addr = common::spawn_echo_server()
        .await
        .map_err(|e| Error::connection(e.to_string()))?;
    println!("[1] Echo server on {addr}\n");

    // ========================================================================
    // Router
    // ========================================================================

    println!("[2] Configuring router...");
    let router = Arc::new(NetworkEventRouter::new());

    // Unreachable first candidate shows the fallback to the next one.
    router.set_ip_list(["127.0.0.2", &addr.ip().to_string()], SERVER_HOST);

    router.register_controller(
        SAY_HELLO,
        Arc::new(|_: u32, payload: Bytes| {
            println!("    [hello] {}", String::from_utf8_lossy(&payload));
        }),
    );
    router.register_controller(
        SEND_MSG,
        Arc::new(|_: u32, payload: Bytes| {
            println!("    [message] {}", String::from_utf8_lossy(&payload));
        }),
    );
    router.register_push_receiver(
        "conversations",
        [CONVERSATION_LIST],
        Arc::new(|data: Bytes, cmd_id: u32| {
            println!("    [push {cmd_id}] {}", String::from_utf8_lossy(&data));
        }),
    );

    let (status_tx, mut status_rx) = watch::channel(Status::Init);
    router
        .notifications()
        .add_observer(Arc::new(move |n: &Notification| {
            println!("    [status] {}", n.status);
            let _ = status_tx.send(n.status);
        }));
    println!("    ✓ Router ready\n");

    // ========================================================================
    // Star
    // ========================================================================

    println!("[3] Launching star...");
    let star = Star::builder()
        .server(SERVER_HOST, addr.port())
        .delegate(router.clone())
        .ip_hints(router.clone())
        .connect_timeout(Duration::from_secs(2))
        .build()?;

    star.launch(None);

    status_rx
        .wait_for(|status| matches!(status, Status::Connected | Status::Error))
        .await
        .map_err(|_| Error::ConnectionClosed)?;

    if !star.is_connected() {
        return Err(Error::connection("echo server unreachable"));
    }
    println!("    ✓ Connected via {:?}\n", star.ip());

    // ========================================================================
    // Traffic
    // ========================================================================

    println!("[4] Sending frames...");
    let handler: Arc<dyn StarDelegate> = Arc::new(PrintFinish);

    star.send_with_handler(Frame::new(SAY_HELLO, "hello star").encode(), handler.clone());
    star.send_with_handler(
        Frame::new(CONVERSATION_LIST, "[alice, bob]").encode(),
        handler.clone(),
    );
    star.send_with_handler(Frame::new(SEND_MSG, "hi alice").encode(), handler);
    star.send(Frame::new(99, "nobody listens").encode());

    tokio::time::sleep(Duration::from_millis(300)).await;
    println!();

    // ========================================================================
    // Lifecycle
    // ========================================================================

    println!("[5] Background / foreground hints...");
    star.enter_background();
    star.enter_foreground();
    println!("    ✓ Still {}\n", star.status());

    common::wait_for_exit(args.no_wait).await;

    println!("[6] Terminating...");
    star.terminate();
    println!("    ✓ Status {}", star.status());

    Ok(())
}
