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

pub mod framework;
pub mod periodic;

use std::sync::Arc;

use log::info;
use mesos::{run_protobuf_scheduler, ProtobufCallbackRouter, SchedulerConf};

use framework::{EspaScheduler, SchedulerContext};

/// Drives the subscriber loop. Blocks for the life of the subscription
/// (spec §5) — `run_protobuf_scheduler` owns the Cluster Master's HTTP
/// event stream and dispatches `SUBSCRIBED`/`OFFERS`/`UPDATE` serially
/// onto `EspaScheduler`, which is this process's sole running-set
/// writer.
pub fn run_subscriber(context: Arc<SchedulerContext>) {
    let config = &context.config;
    let mut scheduler = EspaScheduler::new(context.clone());

    let conf = SchedulerConf {
        master_url: config.mesos_master.clone(),
        user: config.espa_user.clone(),
        name: "espa-scheduler".to_string(),
        framework_timeout: 0f64,
        implicit_acknowledgements: true,
        framework_id: None,
    };

    info!("subscribing to cluster master at {}", conf.master_url);

    let mut router = ProtobufCallbackRouter { scheduler: &mut scheduler, conf: conf.clone() };
    run_protobuf_scheduler(&mut router, conf)
}
