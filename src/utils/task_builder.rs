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

use mesos::proto::{
    CommandInfo, ContainerInfo, ContainerInfo_DockerInfo, ContainerInfo_Type, Environment,
    Environment_Variable, SlaveID, TaskInfo, Volume, Volume_Mode,
};
use mesos::util;

use crate::collaborator::order_api::WorkUnit;
use crate::config::Config;
use crate::utils::task_id;

/// The worker image's entry point. What it does once invoked is out
/// of scope for this scheduler (spec §1: "the worker image that
/// actually runs each task").
const WORKER_ENTRY_POINT: &str = "main.py";

/// Pure function from (work unit, offer's agent id, config) to a task
/// specification (spec §4.5). Mirrors the construction teacher crate
/// inlines in `scheduler_impl.rs::offers`, generalized to the configured
/// cpu/mem/disk and the ESPA work unit/environment shape described in
/// `original_source/scheduler/task.py`.
pub fn build_task(unit: &WorkUnit, slave_id: &SlaveID, config: &Config) -> TaskInfo {
    let id = task_id::encode(&unit.orderid, &unit.scene);
    let name = format!("task {}", id);
    let task_id_proto = util::task_id(&id);

    let mut command = CommandInfo::new();
    command.set_shell(false);
    command.set_value(format!("{} {}", WORKER_ENTRY_POINT, work_unit_json(unit)));
    command.set_environment(environment(config));

    let mut docker = ContainerInfo_DockerInfo::new();
    docker.set_image(config.task_image.clone());

    let mut container = ContainerInfo::new();
    container.set_field_type(ContainerInfo_Type::DOCKER);
    container.set_volumes(protobuf::RepeatedField::from_vec(volumes(config)));
    container.set_docker(docker);

    let resources = vec![
        util::scalar("cpus", "*", config.task_cpu),
        util::scalar("mem", "*", config.task_mem),
        util::scalar("disk", "*", config.task_disk),
    ];

    util::task_info_for_container(&name, &task_id_proto, slave_id, &command, &container, resources)
}

/// Compact (no-spaces) JSON encoding of the work unit, wrapped in a
/// single-element array (spec §4.5).
fn work_unit_json(unit: &WorkUnit) -> String {
    serde_json::to_string(&vec![unit]).expect("work unit always serializes")
}

/// Union of all configured `urs_*`, `espa_*`, `aster_ged_server_name`,
/// and `aux_dir` values (spec §4.5). Unconfigured keys are omitted,
/// not sent as empty strings.
fn environment(config: &Config) -> Environment {
    let mut variables = Vec::new();
    let mut push = |name: &str, value: &Option<String>| {
        if let Some(v) = value {
            let mut var = Environment_Variable::new();
            var.set_name(name.to_string());
            var.set_value(v.clone());
            variables.push(var);
        }
    };

    push("ESPA_STORAGE", &config.espa_storage);
    push("ASTER_GED_SERVER_NAME", &config.aster_ged_server_name);
    push("AUX_DIR", &config.aux_dir);
    push("URS_MACHINE", &config.urs_machine);
    push("URS_LOGIN", &config.urs_login);
    push("URS_PASSWORD", &config.urs_password);
    push("ESPA_WORK_DIR", &config.espa_work_dir);
    push("ESPA_GROUP", &config.espa_group);

    // espa_api is always configured (it has a default), and the task
    // needs it to talk back to the Order API (spec §8 scenario 1).
    push("ESPA_API", &Some(config.espa_api.clone()));

    let mut env = Environment::new();
    env.set_variables(protobuf::RepeatedField::from_vec(variables));
    env
}

fn volumes(config: &Config) -> Vec<Volume> {
    let mut result = Vec::new();

    if let (Some(host), Some(container_path)) = (&config.auxiliary_mount, &config.aux_dir) {
        result.push(volume(host, container_path));
    }
    if let (Some(host), Some(container_path)) = (&config.storage_mount, &config.espa_storage) {
        result.push(volume(host, container_path));
    }

    result
}

fn volume(host_path: &str, container_path: &str) -> Volume {
    let mut v = Volume::new();
    v.set_host_path(host_path.to_string());
    v.set_container_path(container_path.to_string());
    v.set_mode(Volume_Mode::RW);
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> WorkUnit {
        WorkUnit { orderid: "o1".to_string(), scene: "L8A".to_string() }
    }

    #[test]
    fn task_id_is_encoded_with_domain_separator() {
        let task_id_str = task_id::encode(&unit().orderid, &unit().scene);
        assert_eq!(task_id_str, "o1_@@@_L8A");
    }

    #[test]
    fn work_unit_json_is_compact_single_element_array() {
        let json = work_unit_json(&unit());
        assert_eq!(json, r#"[{"orderid":"o1","scene":"L8A"}]"#);
    }
}
