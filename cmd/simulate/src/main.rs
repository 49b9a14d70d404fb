//! Simulated request traffic
//!
//! Drives an `HttpModule` from a fixed-rate owner loop with a mix of
//! scripted requests: quick successes, slow downloads reporting progress,
//! a server error, a connection failure and one request that never
//! finishes and gets cancelled.
//!
//! # Environment Variables
//!
//! - `REQTRACK_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `REQTRACK_FLUSH_EPRINT=1` - Flush log output immediately
//! - `REQTRACK_IDLE_FRAME_SECS=0.05` - Worker idle frame time
//! - `SIM_REQUESTS=8` - Number of quick requests

use reqtrack::{codes, env_get, hinfo, hwarn, HttpModule, RegistryConfig, Script, ScriptedRequest};
use reqtrack::{HttpBase, HttpRequest, HttpResponse, RequestKey, RequestStatus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const FRAME: Duration = Duration::from_millis(16);

// REQTRACK_LOG_LEVEL=debug cargo run -p reqtrack-simulate
fn main() {
    println!("=== reqtrack simulation ===\n");

    let config = RegistryConfig::from_env().deferred_destroy_delay(Duration::from_millis(250));
    config.print();

    let module = match HttpModule::new(config) {
        Ok(module) => module,
        Err(e) => {
            eprintln!("failed to start: {}", e);
            std::process::exit(1);
        }
    };
    let registry = module.registry();

    let finished = Arc::new(AtomicUsize::new(0));
    let mut requests = Vec::new();

    let quick: u32 = env_get("SIM_REQUESTS", 8);
    for i in 0..quick {
        let script = Script::succeed_after(1 + i % 4).with_response(codes::OK, format!("item {}", i));
        requests.push(ScriptedRequest::shared("GET", &format!("http://sim/items/{}", i), script));
    }
    requests.push(ScriptedRequest::shared(
        "GET",
        "http://sim/download?file=big.bin",
        Script::succeed_after(20)
            .with_response(codes::OK, vec![0u8; 64 * 1024])
            .with_progress(4096),
    ));
    requests.push(ScriptedRequest::shared(
        "POST",
        "http://sim/upload",
        Script::succeed_after(3)
            .with_status(RequestStatus::Failed)
            .with_response(codes::SERVER_ERROR, "boom"),
    ));
    requests.push(ScriptedRequest::shared("GET", "http://sim/offline", Script::fail_start()));
    let stuck = ScriptedRequest::shared("GET", "http://sim/stuck", Script::hang());
    requests.push(stuck.clone());

    for req in &requests {
        let counter = finished.clone();
        req.set_completion_handler(Some(Box::new(move |req, response| {
            let code = response.map_or(codes::UNKNOWN, |r| r.response_code());
            hinfo!(
                "[done] {} {} -> {} (code {}, {:?})",
                req.verb(),
                req.url(),
                req.status(),
                code,
                req.elapsed_time()
            );
            counter.fetch_add(1, Ordering::SeqCst);
        })));
        if req.url().contains("download") {
            req.set_progress_handler(Some(Box::new(|_, _sent, received| {
                hinfo!("[progress] download {} bytes", received);
            })));
        }
        if !registry.process_threaded_request(req.clone()) {
            hwarn!("could not submit {}", req.url());
        }
    }

    println!("Submitted {} requests\n", requests.len());

    let start = Instant::now();
    let timeout = Duration::from_secs(10);
    let mut last = Instant::now();
    let mut cancelled = false;

    while finished.load(Ordering::SeqCst) < requests.len() {
        if start.elapsed() > timeout {
            println!("WARNING: Timeout!");
            break;
        }

        let now = Instant::now();
        module.tick(now - last);
        last = now;

        if !cancelled && start.elapsed() > Duration::from_millis(200) {
            registry.dump_requests();
            stuck.cancel_request();
            registry.cancel_threaded_request(&*stuck);
            cancelled = true;
        }

        std::thread::sleep(FRAME);
    }

    println!(
        "\n{} of {} requests finished, {} pending destroy",
        finished.load(Ordering::SeqCst),
        requests.len(),
        registry.pending_destroy_count()
    );
    println!(
        "stuck request: valid={} status={}",
        registry.is_valid_request(RequestKey::of_arc(&stuck)),
        stuck.status()
    );
    println!("worker: {}", registry.worker_stats());

    if let Err(e) = module.shutdown() {
        eprintln!("shutdown failed: {}", e);
    }

    println!("\n=== Simulation Complete ===");
}
