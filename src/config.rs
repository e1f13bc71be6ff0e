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

use std::env;

/// A single product category and its weight in the rotation.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductWeight {
    pub category: String,
    pub weight: u32,
}

/// Immutable configuration, read once at startup from environment
/// variables. Mirrors the key set and defaults of
/// `original_source/scheduler/config.py::config()`.
#[derive(Clone, Debug)]
pub struct Config {
    // Cluster Master connection
    pub mesos_master: String,
    pub mesos_principal: Option<String>,
    pub mesos_secret: Option<String>,
    pub espa_user: String,
    pub framework_hostname: String,

    // Order API
    pub espa_api: String,
    pub task_image: String,

    // Admission policy
    pub max_cpu: f64,
    pub task_cpu: f64,
    pub task_mem: f64,
    pub task_disk: f64,
    pub offer_refuse_seconds: f64,
    pub product_request_count: u32,
    pub product_scheduled_max: usize,

    // Product weights, in the fixed order they're declared (also the
    // rotation's initial ordering before expansion).
    pub product_weights: Vec<ProductWeight>,

    // Periodic cadences, in minutes
    pub product_request_frequency: u64,
    pub handle_orders_frequency: u64,
    pub revive_frequency: u64,

    // Task-container context, passed through to the task builder
    pub auxiliary_mount: Option<String>,
    pub aux_dir: Option<String>,
    pub storage_mount: Option<String>,
    pub espa_storage: Option<String>,
    pub aster_ged_server_name: Option<String>,
    pub urs_machine: Option<String>,
    pub urs_login: Option<String>,
    pub urs_password: Option<String>,
    pub espa_work_dir: Option<String>,
    pub espa_group: Option<String>,
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key.to_uppercase()).unwrap_or_else(|_| default.to_string())
}

fn env_opt_string(key: &str) -> Option<String> {
    env::var(key.to_uppercase()).ok().filter(|v| !v.is_empty())
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key.to_uppercase())
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key.to_uppercase())
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key.to_uppercase())
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Default product weights, matching
    /// `original_source/scheduler/config.py::product_frequency()`.
    const DEFAULT_WEIGHTS: &'static [(&'static str, u32)] =
        &[("landsat", 3), ("modis", 2), ("viirs", 1), ("plot", 1)];

    pub fn from_env() -> Config {
        let product_weights = Self::DEFAULT_WEIGHTS
            .iter()
            .map(|(category, default_weight)| ProductWeight {
                category: category.to_string(),
                weight: env_u32(&format!("{}_frequency", category), *default_weight),
            })
            .collect();

        Config {
            mesos_master: env_string("mesos_master", ""),
            mesos_principal: env_opt_string("mesos_principal"),
            mesos_secret: env_opt_string("mesos_secret"),
            espa_user: env_string("espa_user", "espa"),
            framework_hostname: hostname(),

            espa_api: env_string("espa_api", "http://localhost:9876/production-api/v0"),
            task_image: env_string("task_image", ""),

            max_cpu: env_f64("max_cpu", 10.0),
            task_cpu: env_f64("task_cpu", 1.0),
            task_mem: env_f64("task_mem", 5120.0),
            task_disk: env_f64("task_disk", 10240.0),
            offer_refuse_seconds: env_f64("offer_refuse_seconds", 30.0),
            product_request_count: env_u32("product_request_count", 50),
            product_scheduled_max: env_u32("product_scheduled_max", 500) as usize,

            product_weights,

            product_request_frequency: env_u64("product_request_frequency", 5),
            handle_orders_frequency: env_u64("handle_orders_frequency", 7),
            revive_frequency: env_u64("revive_frequency", 15),

            auxiliary_mount: env_opt_string("auxiliary_mount"),
            aux_dir: env_opt_string("aux_dir"),
            storage_mount: env_opt_string("storage_mount"),
            espa_storage: env_opt_string("espa_storage"),
            aster_ged_server_name: env_opt_string("aster_ged_server_name"),
            urs_machine: env_opt_string("urs_machine"),
            urs_login: env_opt_string("urs_login"),
            urs_password: env_opt_string("urs_password"),
            espa_work_dir: env_opt_string("espa_work_dir"),
            espa_group: env_opt_string("espa_group"),
        }
    }
}

fn hostname() -> String {
    env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = Config::from_env();
        assert_eq!(cfg.max_cpu, 10.0);
        assert_eq!(cfg.task_cpu, 1.0);
        assert_eq!(cfg.task_mem, 5120.0);
        assert_eq!(cfg.offer_refuse_seconds, 30.0);
        assert_eq!(
            cfg.product_weights,
            vec![
                ProductWeight { category: "landsat".into(), weight: 3 },
                ProductWeight { category: "modis".into(), weight: 2 },
                ProductWeight { category: "viirs".into(), weight: 1 },
                ProductWeight { category: "plot".into(), weight: 1 },
            ]
        );
    }

    #[test]
    fn nullable_keys_default_to_none() {
        let cfg = Config::from_env();
        assert_eq!(cfg.mesos_principal, None);
        assert_eq!(cfg.mesos_secret, None);
    }
}
