//! Scripted control plane for unit tests.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::client::{ControlPlaneClient, FieldQuery};
use crate::error::{CommandError, DeployerError};

/// One recorded control-plane request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ClientVersion,
    ClusterInfo,
    Apply(PathBuf),
    Patch {
        kind: String,
        name: String,
        body: String,
    },
    Scale { workload: String, replicas: u32 },
    GetField(String),
    GetLogs { pod: String, tail: Option<u32> },
    DeleteNamespace(String),
}

/// Answers from a script; the last scripted answer repeats once the queue
/// drains. `None` answers fail the request.
#[derive(Default)]
pub struct MockControlPlane {
    calls: Mutex<Vec<Call>>,
    fields: Mutex<HashMap<String, VecDeque<Option<String>>>>,
    tails: Mutex<VecDeque<Option<String>>>,
    full_log: Option<String>,
    fail_preflight: bool,
    fail_apply: Option<&'static str>,
    fail_patch: bool,
    fail_scale: bool,
    fail_delete: bool,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts successive answers to reads of `json_path`.
    pub fn with_field(self, json_path: &str, answers: &[Option<&str>]) -> Self {
        if let Ok(mut fields) = self.fields.lock() {
            fields.insert(
                json_path.to_owned(),
                answers.iter().map(|a| a.map(str::to_owned)).collect(),
            );
        }
        self
    }

    /// Scripts successive answers to tailed log reads.
    pub fn with_tails(self, answers: &[Option<&str>]) -> Self {
        if let Ok(mut tails) = self.tails.lock() {
            *tails = answers.iter().map(|a| a.map(str::to_owned)).collect();
        }
        self
    }

    pub fn with_full_log(mut self, log: &str) -> Self {
        self.full_log = Some(log.to_owned());
        self
    }

    pub fn with_failing_preflight(mut self) -> Self {
        self.fail_preflight = true;
        self
    }

    /// Fails `apply` for any manifest whose file name is `file_name`.
    pub fn with_failing_apply(mut self, file_name: &'static str) -> Self {
        self.fail_apply = Some(file_name);
        self
    }

    pub fn with_failing_patch(mut self) -> Self {
        self.fail_patch = true;
        self
    }

    pub fn with_failing_scale(mut self) -> Self {
        self.fail_scale = true;
        self
    }

    pub fn with_failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    /// Applied manifest file names, in order.
    pub fn applied(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Apply(path) => path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

fn next_answer(queue: &mut VecDeque<Option<String>>) -> Option<Option<String>> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

fn failure(command: &str) -> DeployerError {
    DeployerError::Command(CommandError::NonZeroExit {
        command: command.to_owned(),
        exit_code: Some(1),
        stderr: "mock failure".to_owned(),
    })
}

fn check(fail: bool, command: &str) -> Result<(), DeployerError> {
    if fail { Err(failure(command)) } else { Ok(()) }
}

impl ControlPlaneClient for MockControlPlane {
    async fn client_version(&self) -> Result<String, DeployerError> {
        self.record(Call::ClientVersion);
        check(self.fail_preflight, "version --client")?;
        Ok("Client Version: mock".to_owned())
    }

    async fn cluster_info(&self) -> Result<String, DeployerError> {
        self.record(Call::ClusterInfo);
        check(self.fail_preflight, "cluster-info")?;
        Ok("Kubernetes control plane is running".to_owned())
    }

    async fn apply(&self, manifest: &Path) -> Result<(), DeployerError> {
        self.record(Call::Apply(manifest.to_path_buf()));
        let failing = self
            .fail_apply
            .is_some_and(|name| manifest.file_name().is_some_and(|f| f == name));
        check(failing, "apply")
    }

    async fn patch(
        &self,
        kind: &str,
        name: &str,
        _namespace: &str,
        merge_patch: &serde_json::Value,
    ) -> Result<(), DeployerError> {
        self.record(Call::Patch {
            kind: kind.to_owned(),
            name: name.to_owned(),
            body: merge_patch.to_string(),
        });
        check(self.fail_patch, "patch")
    }

    async fn scale(
        &self,
        workload: &str,
        _namespace: &str,
        replicas: u32,
    ) -> Result<(), DeployerError> {
        self.record(Call::Scale {
            workload: workload.to_owned(),
            replicas,
        });
        check(self.fail_scale, "scale")
    }

    async fn get_field(&self, query: &FieldQuery) -> Result<String, DeployerError> {
        self.record(Call::GetField(query.json_path.clone()));
        let answer = self
            .fields
            .lock()
            .ok()
            .and_then(|mut fields| fields.get_mut(&query.json_path).and_then(next_answer));
        match answer {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(failure("get")),
            None => Ok(String::new()),
        }
    }

    async fn get_logs(
        &self,
        pod: &str,
        _namespace: &str,
        tail: Option<u32>,
    ) -> Result<String, DeployerError> {
        self.record(Call::GetLogs {
            pod: pod.to_owned(),
            tail,
        });
        if tail.is_none() {
            return self.full_log.clone().ok_or_else(|| failure("logs"));
        }
        let answer = self
            .tails
            .lock()
            .ok()
            .and_then(|mut tails| next_answer(&mut tails));
        match answer {
            Some(Some(text)) => Ok(text),
            Some(None) => Err(failure("logs --tail")),
            None => Ok(String::new()),
        }
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), DeployerError> {
        self.record(Call::DeleteNamespace(namespace.to_owned()));
        check(self.fail_delete, "delete namespace")
    }
}
