//! Cluster control abstraction for testability.
//!
//! The [`ClusterClient`] trait is the only way the scenario touches a cluster.
//! Production code uses [`KubectlClient`], which drives the `kubectl` binary as a
//! subprocess; tests use in-memory implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌────────────────┐
//! │ Scenario steps   │   │ TeardownEngine │
//! └────────┬─────────┘   └───────┬────────┘
//!          └──────────┬──────────┘
//!                     ▼
//!             ┌───────────────┐
//!             │ ClusterClient │ (trait)
//!             └───────────────┘
//!               │          │
//!               ▼          ▼
//!         ┌─────────┐  ┌──────┐
//!         │ Kubectl │  │ Mock │
//!         └────┬────┘  └──────┘
//!              ▼
//!       kubectl --context <ctx>
//! ```
//!
//! # Errors
//!
//! A failing command whose stderr reports a missing object becomes
//! [`ClusterError::NotFound`]; every other failure is
//! [`ClusterError::CommandFailed`].

use std::future::Future;
use std::process::Stdio;

use drscenario_core::types::ResourceRef;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::ClusterError;

/// How a delete behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Block until the object is gone
    pub wait: bool,
    /// Treat a missing object as success
    pub ignore_not_found: bool,
}

impl DeleteOptions {
    /// Fire-and-forget delete that tolerates absence.
    pub const fn non_blocking() -> Self {
        Self {
            wait: false,
            ignore_not_found: true,
        }
    }

    /// Delete that waits for the object to disappear and tolerates absence.
    pub const fn blocking() -> Self {
        Self {
            wait: true,
            ignore_not_found: true,
        }
    }
}

/// Subresource a patch is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subresource {
    Status,
}

impl Subresource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
        }
    }
}

/// Operations the scenario needs from a cluster.
///
/// The trait is `Send + Sync + 'static` so a single client can be shared
/// through an `Arc` by the orchestrator and the teardown engine.
pub trait ClusterClient: Send + Sync + 'static {
    /// Creates or updates the objects in `manifest` on cluster `context`.
    fn apply(
        &self,
        manifest: &str,
        context: &str,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// Deletes one object.
    ///
    /// With `ignore_not_found` a missing object is not an error.
    fn delete(
        &self,
        resource: &ResourceRef,
        options: DeleteOptions,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// Merge-patches an object, or its `subresource` when given.
    fn patch(
        &self,
        resource: &ResourceRef,
        patch: &serde_json::Value,
        subresource: Option<Subresource>,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// Names of every object of `kind` in `namespace`.
    fn list(
        &self,
        context: &str,
        kind: &str,
        namespace: &str,
    ) -> impl Future<Output = Result<Vec<String>, ClusterError>> + Send;

    /// Whether the object currently exists.
    fn exists(
        &self,
        resource: &ResourceRef,
    ) -> impl Future<Output = Result<bool, ClusterError>> + Send;

    /// Empties the object's finalizer list so a pending delete can complete.
    ///
    /// # Errors
    ///
    /// [`ClusterError::NotFound`] when the object is already gone.
    fn remove_finalizers(
        &self,
        resource: &ResourceRef,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// First pod in `namespace` matching the label `selector`, if any.
    fn find_pod(
        &self,
        context: &str,
        namespace: &str,
        selector: &str,
    ) -> impl Future<Output = Result<Option<String>, ClusterError>> + Send;

    /// Runs `command` inside `pod` and returns its stdout.
    fn exec_in_pod(
        &self,
        context: &str,
        namespace: &str,
        pod: &str,
        command: &[&str],
    ) -> impl Future<Output = Result<String, ClusterError>> + Send;
}

/// Merge patch that clears `metadata.finalizers`.
pub fn clear_finalizers_patch() -> serde_json::Value {
    serde_json::json!({ "metadata": { "finalizers": null } })
}

/// [`ClusterClient`] backed by the `kubectl` binary.
///
/// In dry-run mode every invocation is logged and reports empty output
/// without spawning anything, so listings come back empty and existence
/// checks come back false.
#[derive(Debug, Clone)]
pub struct KubectlClient {
    binary: String,
    dry_run: bool,
}

impl KubectlClient {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn command_line(&self, args: &[String]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    /// Runs kubectl with `args`, optionally feeding `stdin`, and returns stdout.
    async fn run(
        &self,
        args: Vec<String>,
        stdin: Option<&str>,
        resource: Option<&ResourceRef>,
    ) -> Result<String, ClusterError> {
        let command = self.command_line(&args);
        if self.dry_run {
            info!(command = %command, "dry-run: skipping kubectl");
            return Ok(String::new());
        }
        debug!(command = %command, "running kubectl");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ClusterError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|source| ClusterError::Spawn {
                    binary: self.binary.clone(),
                    source,
                })?;
            // closing stdin lets kubectl see EOF
            drop(pipe);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| ClusterError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let stdout = String::from_utf8(output.stdout).map_err(|e| ClusterError::InvalidOutput {
            command: command.clone(),
            reason: e.to_string(),
        })?;

        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        if is_not_found_message(&stderr) {
            return Err(ClusterError::NotFound {
                resource: resource.map_or_else(|| command.clone(), ToString::to_string),
            });
        }
        Err(ClusterError::CommandFailed {
            command,
            status: output
                .status
                .code()
                .map_or_else(|| "signal".to_owned(), |c| c.to_string()),
            stderr,
        })
    }
}

/// Only the API server's object-absence error counts. Client-side failures
/// such as an unknown context or resource type also print "not found" and
/// must surface as command failures.
fn is_not_found_message(stderr: &str) -> bool {
    stderr.contains("Error from server (NotFound)")
}

fn target_args(resource: &ResourceRef) -> Vec<String> {
    let mut args = vec![resource.kind.clone(), resource.name.clone()];
    if let Some(ns) = &resource.namespace {
        args.push("-n".to_owned());
        args.push(ns.clone());
    }
    args
}

fn context_args(context: &str) -> [String; 2] {
    ["--context".to_owned(), context.to_owned()]
}

pub(crate) fn apply_args(context: &str) -> Vec<String> {
    let mut args = vec!["apply".to_owned(), "-f".to_owned(), "-".to_owned()];
    args.extend(context_args(context));
    args
}

pub(crate) fn delete_args(resource: &ResourceRef, options: DeleteOptions) -> Vec<String> {
    let mut args = vec!["delete".to_owned()];
    args.extend(target_args(resource));
    args.extend(context_args(&resource.context));
    if options.ignore_not_found {
        args.push("--ignore-not-found".to_owned());
    }
    if !options.wait {
        args.push("--wait=false".to_owned());
    }
    args
}

pub(crate) fn patch_args(
    resource: &ResourceRef,
    patch: &serde_json::Value,
    subresource: Option<Subresource>,
) -> Result<Vec<String>, ClusterError> {
    let mut args = vec!["patch".to_owned()];
    args.extend(target_args(resource));
    args.extend([
        "--type".to_owned(),
        "merge".to_owned(),
        "--patch".to_owned(),
        serde_json::to_string(patch)?,
    ]);
    if let Some(sub) = subresource {
        args.push(format!("--subresource={}", sub.as_str()));
    }
    args.extend(context_args(&resource.context));
    Ok(args)
}

pub(crate) fn list_args(context: &str, kind: &str, namespace: &str) -> Vec<String> {
    let mut args = vec![
        "get".to_owned(),
        kind.to_owned(),
        "-n".to_owned(),
        namespace.to_owned(),
    ];
    args.extend(context_args(context));
    args.extend([
        "-o".to_owned(),
        "jsonpath={.items[*].metadata.name}".to_owned(),
    ]);
    args
}

pub(crate) fn exists_args(resource: &ResourceRef) -> Vec<String> {
    let mut args = vec!["get".to_owned()];
    args.extend(target_args(resource));
    args.extend(context_args(&resource.context));
    args.extend([
        "--ignore-not-found".to_owned(),
        "-o".to_owned(),
        "name".to_owned(),
    ]);
    args
}

pub(crate) fn find_pod_args(context: &str, namespace: &str, selector: &str) -> Vec<String> {
    let mut args = vec![
        "get".to_owned(),
        "pods".to_owned(),
        "-n".to_owned(),
        namespace.to_owned(),
        "-l".to_owned(),
        selector.to_owned(),
    ];
    args.extend(context_args(context));
    args.extend([
        "-o".to_owned(),
        "jsonpath={.items[*].metadata.name}".to_owned(),
    ]);
    args
}

pub(crate) fn exec_args(
    context: &str,
    namespace: &str,
    pod: &str,
    command: &[&str],
) -> Vec<String> {
    let mut args = vec![
        "-n".to_owned(),
        namespace.to_owned(),
        "exec".to_owned(),
        pod.to_owned(),
    ];
    args.extend(context_args(context));
    args.push("--".to_owned());
    args.extend(command.iter().map(|s| (*s).to_owned()));
    args
}

/// Splits whitespace-separated names as printed by a jsonpath listing.
pub(crate) fn parse_names(output: &str) -> Vec<String> {
    output.split_whitespace().map(str::to_owned).collect()
}

impl ClusterClient for KubectlClient {
    async fn apply(&self, manifest: &str, context: &str) -> Result<(), ClusterError> {
        self.run(apply_args(context), Some(manifest), None).await?;
        Ok(())
    }

    async fn delete(
        &self,
        resource: &ResourceRef,
        options: DeleteOptions,
    ) -> Result<(), ClusterError> {
        match self
            .run(delete_args(resource, options), None, Some(resource))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() && options.ignore_not_found => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn patch(
        &self,
        resource: &ResourceRef,
        patch: &serde_json::Value,
        subresource: Option<Subresource>,
    ) -> Result<(), ClusterError> {
        let args = patch_args(resource, patch, subresource)?;
        self.run(args, None, Some(resource)).await?;
        Ok(())
    }

    async fn list(
        &self,
        context: &str,
        kind: &str,
        namespace: &str,
    ) -> Result<Vec<String>, ClusterError> {
        let out = self.run(list_args(context, kind, namespace), None, None).await?;
        Ok(parse_names(&out))
    }

    async fn exists(&self, resource: &ResourceRef) -> Result<bool, ClusterError> {
        match self.run(exists_args(resource), None, Some(resource)).await {
            Ok(out) => Ok(!out.trim().is_empty()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn remove_finalizers(&self, resource: &ResourceRef) -> Result<(), ClusterError> {
        self.patch(resource, &clear_finalizers_patch(), None).await
    }

    async fn find_pod(
        &self,
        context: &str,
        namespace: &str,
        selector: &str,
    ) -> Result<Option<String>, ClusterError> {
        let out = self
            .run(find_pod_args(context, namespace, selector), None, None)
            .await?;
        Ok(parse_names(&out).into_iter().next())
    }

    async fn exec_in_pod(
        &self,
        context: &str,
        namespace: &str,
        pod: &str,
        command: &[&str],
    ) -> Result<String, ClusterError> {
        self.run(exec_args(context, namespace, pod, command), None, None)
            .await
    }
}

/// In-memory cluster for unit tests.
///
/// Objects live in a `(context, namespace, kind) -> [name]` map. Objects
/// registered through [`MockClusterClient::with_blocked`] carry a finalizer:
/// deleting them only marks them terminating, and they vanish once their
/// finalizers are removed.
#[cfg(test)]
#[derive(Default)]
pub struct MockClusterClient {
    state: std::sync::Mutex<MockState>,
    /// Fail every list call
    pub fail_list: bool,
    /// Remove blocked objects on their first existence check
    pub vanish_on_exists: bool,
    /// Objects disappear just before their delete, which reports NotFound
    pub vanish_on_delete: bool,
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    objects: std::collections::BTreeMap<(String, String, String), Vec<MockObject>>,
    deletes: usize,
    finalizer_patches: usize,
}

#[cfg(test)]
#[derive(Clone)]
struct MockObject {
    name: String,
    finalizer: bool,
    terminating: bool,
}

#[cfg(test)]
impl MockClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(
        self,
        context: &str,
        namespace: &str,
        kind: &str,
        names: &[&str],
        finalizer: bool,
    ) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let entry = state
                .objects
                .entry((context.to_owned(), namespace.to_owned(), kind.to_owned()))
                .or_default();
            entry.extend(names.iter().map(|n| MockObject {
                name: (*n).to_owned(),
                finalizer,
                terminating: false,
            }));
        }
        self
    }

    /// Objects that disappear on delete.
    pub fn with_plain(self, context: &str, namespace: &str, kind: &str, names: &[&str]) -> Self {
        self.insert(context, namespace, kind, names, false)
    }

    /// Objects held back by a finalizer.
    pub fn with_blocked(self, context: &str, namespace: &str, kind: &str, names: &[&str]) -> Self {
        self.insert(context, namespace, kind, names, true)
    }

    pub fn with_failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn with_vanishing_on_exists(mut self) -> Self {
        self.vanish_on_exists = true;
        self
    }

    pub fn with_vanishing_on_delete(mut self) -> Self {
        self.vanish_on_delete = true;
        self
    }

    pub fn names(&self, context: &str, namespace: &str, kind: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&(context.to_owned(), namespace.to_owned(), kind.to_owned()))
            .map(|objs| objs.iter().map(|o| o.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn delete_count(&self) -> usize {
        self.state.lock().unwrap().deletes
    }

    pub fn finalizer_patch_count(&self) -> usize {
        self.state.lock().unwrap().finalizer_patches
    }

    fn key(resource: &ResourceRef) -> (String, String, String) {
        (
            resource.context.clone(),
            resource.namespace.clone().unwrap_or_default(),
            resource.kind.clone(),
        )
    }
}

#[cfg(test)]
impl ClusterClient for MockClusterClient {
    async fn apply(&self, _manifest: &str, _context: &str) -> Result<(), ClusterError> {
        Ok(())
    }

    async fn delete(
        &self,
        resource: &ResourceRef,
        options: DeleteOptions,
    ) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        state.deletes += 1;
        let objs = state.objects.entry(Self::key(resource)).or_default();
        if self.vanish_on_delete {
            objs.retain(|o| o.name != resource.name);
            return Err(ClusterError::NotFound {
                resource: resource.to_string(),
            });
        }
        match objs.iter().position(|o| o.name == resource.name) {
            Some(i) if objs[i].finalizer => {
                objs[i].terminating = true;
                Ok(())
            }
            Some(i) => {
                objs.remove(i);
                Ok(())
            }
            None if options.ignore_not_found => Ok(()),
            None => Err(ClusterError::NotFound {
                resource: resource.to_string(),
            }),
        }
    }

    async fn patch(
        &self,
        _resource: &ResourceRef,
        _patch: &serde_json::Value,
        _subresource: Option<Subresource>,
    ) -> Result<(), ClusterError> {
        Ok(())
    }

    async fn list(
        &self,
        context: &str,
        kind: &str,
        namespace: &str,
    ) -> Result<Vec<String>, ClusterError> {
        if self.fail_list {
            return Err(ClusterError::CommandFailed {
                command: format!("get {kind} -n {namespace}"),
                status: "1".to_owned(),
                stderr: "mock failure".to_owned(),
            });
        }
        Ok(self.names(context, namespace, kind))
    }

    async fn exists(&self, resource: &ResourceRef) -> Result<bool, ClusterError> {
        let mut state = self.state.lock().unwrap();
        let objs = state.objects.entry(Self::key(resource)).or_default();
        let found = objs.iter().position(|o| o.name == resource.name);
        match found {
            Some(i) if self.vanish_on_exists => {
                objs.remove(i);
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    async fn remove_finalizers(&self, resource: &ResourceRef) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        state.finalizer_patches += 1;
        let objs = state.objects.entry(Self::key(resource)).or_default();
        match objs.iter().position(|o| o.name == resource.name) {
            Some(i) if objs[i].terminating => {
                objs.remove(i);
                Ok(())
            }
            Some(i) => {
                objs[i].finalizer = false;
                Ok(())
            }
            None => Err(ClusterError::NotFound {
                resource: resource.to_string(),
            }),
        }
    }

    async fn find_pod(
        &self,
        _context: &str,
        _namespace: &str,
        _selector: &str,
    ) -> Result<Option<String>, ClusterError> {
        Ok(None)
    }

    async fn exec_in_pod(
        &self,
        _context: &str,
        _namespace: &str,
        _pod: &str,
        _command: &[&str],
    ) -> Result<String, ClusterError> {
        Ok(String::new())
    }
}
