// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{env, process, thread};

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use loki_agent::{
    agent::Agent,
    config::AgentConfig,
    level::Level,
    transport::HttpTransport,
};

const TICK: Duration = Duration::from_millis(100);

pub fn main() {
    let log_level = env::var("LOKI_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,hyper_util=off,reqwest=off,rustls=off,{log_level}");

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_writer(io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    let line_level = match env::var("LOKI_LINE_LEVEL") {
        Ok(val) => match val.parse::<Level>() {
            Ok(level) => level,
            Err(e) => {
                error!("Invalid LOKI_LINE_LEVEL: {e}");
                process::exit(1);
            }
        },
        Err(_) => Level::Info,
    };

    let transport = match HttpTransport::new(config.push_timeout, config.tenant_id.as_deref()) {
        Ok(transport) => transport,
        Err(e) => {
            error!("Error creating transport: {e}");
            process::exit(1);
        }
    };

    let agent = match Agent::new(config, Box::new(transport)) {
        Ok(agent) => Arc::new(agent),
        Err(e) => {
            error!("Error creating agent: {e}");
            process::exit(1);
        }
    };
    info!(
        "Shipping stdin to {} as stream {}",
        agent.config().endpoint,
        agent.compiled_labels()
    );

    let done = Arc::new(AtomicBool::new(false));
    let flusher = start_interval_flusher(
        Arc::clone(&agent),
        Arc::clone(&done),
        agent.config().flush_interval,
    );

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) => agent.log(&line, line_level),
            Err(e) => {
                error!("Failed to read stdin: {e}");
                break;
            }
        }
    }

    done.store(true, Ordering::Release);
    if flusher.join().is_err() {
        error!("Interval flusher panicked");
    }

    if agent.has_pending() {
        match agent.flush() {
            Ok(count) => debug!("Shipped {count} remaining entries"),
            Err(e) => error!("Final flush failed: {e}"),
        }
    }
    debug!("Shutting down");
}

/// The agent never flushes on a timer by itself; this thread drives the
/// configured interval until `done` is set.
fn start_interval_flusher(
    agent: Arc<Agent>,
    done: Arc<AtomicBool>,
    interval: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last_flush = Instant::now();
        while !done.load(Ordering::Acquire) {
            thread::sleep(TICK);
            if last_flush.elapsed() < interval {
                continue;
            }
            last_flush = Instant::now();
            if !agent.has_pending() {
                continue;
            }
            if let Err(e) = agent.flush() {
                error!("Interval flush failed: {e}");
            }
        }
    })
}
