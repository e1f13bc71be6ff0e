// The MIT License (MIT)
//
// Copyright (c) 2026 the project contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

use std::process;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use log::{error, info};

use espa_scheduler::collaborator::OrderApiClient;
use espa_scheduler::config::Config;
use espa_scheduler::scheduler::framework::SchedulerContext;
use espa_scheduler::scheduler::{periodic, run_subscriber};
use espa_scheduler::state::WorkQueue;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Arc::new(Config::from_env());
    let order_api = Arc::new(OrderApiClient::new(config.espa_api.clone(), config.task_image.clone()));

    if let Err(e) = order_api.test_connection() {
        error!("cannot reach order api at {}: {}", config.espa_api, e);
        process::exit(1);
    }

    let queue = Arc::new(WorkQueue::new(config.product_scheduled_max));
    let (periodic_start_tx, periodic_start_rx) = mpsc::channel();
    let context = Arc::new(SchedulerContext::new(config, order_api, queue, periodic_start_tx));

    // The periodic worker is spawned only once the subscriber loop has
    // reached Subscribed, never earlier (spec §4.6). `subscribed()`
    // signals this channel exactly once; this waiter thread blocks on
    // it so `main` itself can move straight into the subscriber loop.
    let periodic_context = context.clone();
    let _periodic_waiter = thread::Builder::new().name("periodic-waiter".to_string()).spawn(move || {
        if periodic_start_rx.recv().is_ok() {
            info!("subscribed, starting periodic worker");
            let _ = thread::Builder::new().name("periodic".to_string()).spawn(move || periodic::run(periodic_context));
        }
    });

    info!("starting subscriber loop");
    run_subscriber(context);
}
