//! ECS API operations.
//!
//! Each operation comes in two forms: `op(input)` sends the call and decodes
//! the typed output, and `op_request(input)` returns the unbuilt, unsent
//! [`Request`] so callers can add handlers or inspect it before
//! [`Request::build`] / [`Request::send`].

use crate::service::Ecs;
use crate::types::*;
use aws_request::{AwsResult, Operation, Request};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;

// ── Operation descriptors ───────────────────────────────────────────────

pub const CREATE_CLUSTER: Operation = Operation::new("CreateCluster");
pub const DELETE_CLUSTER: Operation = Operation::new("DeleteCluster").with_required(&["cluster"]);
pub const DESCRIBE_CLUSTERS: Operation = Operation::new("DescribeClusters");
pub const LIST_CLUSTERS: Operation = Operation::new("ListClusters");

pub const REGISTER_CONTAINER_INSTANCE: Operation = Operation::new("RegisterContainerInstance");
pub const DEREGISTER_CONTAINER_INSTANCE: Operation =
    Operation::new("DeregisterContainerInstance").with_required(&["containerInstance"]);
pub const DESCRIBE_CONTAINER_INSTANCES: Operation =
    Operation::new("DescribeContainerInstances").with_required(&["containerInstances"]);
pub const LIST_CONTAINER_INSTANCES: Operation = Operation::new("ListContainerInstances");
pub const DISCOVER_POLL_ENDPOINT: Operation = Operation::new("DiscoverPollEndpoint");
pub const SUBMIT_TASK_STATE_CHANGE: Operation = Operation::new("SubmitTaskStateChange");
pub const SUBMIT_CONTAINER_STATE_CHANGE: Operation = Operation::new("SubmitContainerStateChange");

pub const REGISTER_TASK_DEFINITION: Operation = Operation::new("RegisterTaskDefinition")
    .with_required(&["family", "containerDefinitions"]);
pub const DEREGISTER_TASK_DEFINITION: Operation =
    Operation::new("DeregisterTaskDefinition").with_required(&["taskDefinition"]);
pub const DESCRIBE_TASK_DEFINITION: Operation =
    Operation::new("DescribeTaskDefinition").with_required(&["taskDefinition"]);
pub const LIST_TASK_DEFINITIONS: Operation = Operation::new("ListTaskDefinitions");
pub const LIST_TASK_DEFINITION_FAMILIES: Operation = Operation::new("ListTaskDefinitionFamilies");

pub const LIST_TASKS: Operation = Operation::new("ListTasks");
pub const DESCRIBE_TASKS: Operation = Operation::new("DescribeTasks").with_required(&["tasks"]);
pub const RUN_TASK: Operation = Operation::new("RunTask").with_required(&["taskDefinition"]);
pub const START_TASK: Operation =
    Operation::new("StartTask").with_required(&["taskDefinition", "containerInstances"]);
pub const STOP_TASK: Operation = Operation::new("StopTask").with_required(&["task"]);

pub const CREATE_SERVICE: Operation = Operation::new("CreateService")
    .with_required(&["serviceName", "taskDefinition", "desiredCount"]);
pub const UPDATE_SERVICE: Operation = Operation::new("UpdateService").with_required(&["service"]);
pub const DELETE_SERVICE: Operation = Operation::new("DeleteService").with_required(&["service"]);
pub const DESCRIBE_SERVICES: Operation =
    Operation::new("DescribeServices").with_required(&["services"]);
pub const LIST_SERVICES: Operation = Operation::new("ListServices");

/// Expands to the sending method and its `*_request` twin.
macro_rules! operations {
    ($(
        $(#[$doc:meta])*
        $name:ident, $request:ident: $input:ty => $output:ty = $op:ident;
    )*) => {
        impl Ecs {
            $(
                $(#[$doc])*
                pub async fn $name(&self, input: &$input) -> AwsResult<$output> {
                    self.invoke($op, input).await
                }

                pub fn $request(&self, input: &$input) -> AwsResult<Request> {
                    self.request_for($op, input)
                }
            )*
        }
    };
}

operations! {
    // ── Clusters ────────────────────────────────────────────────────────
    /// Create a cluster. Without a name the cluster is called `default`.
    create_cluster, create_cluster_request:
        CreateClusterInput => CreateClusterOutput = CREATE_CLUSTER;
    /// Delete an empty cluster.
    delete_cluster, delete_cluster_request:
        DeleteClusterInput => DeleteClusterOutput = DELETE_CLUSTER;
    describe_clusters, describe_clusters_request:
        DescribeClustersInput => DescribeClustersOutput = DESCRIBE_CLUSTERS;
    list_clusters, list_clusters_request:
        ListClustersInput => ListClustersOutput = LIST_CLUSTERS;

    // ── Container instances ─────────────────────────────────────────────
    /// Register an EC2 instance into a cluster. Used by the container agent.
    register_container_instance, register_container_instance_request:
        RegisterContainerInstanceInput => RegisterContainerInstanceOutput = REGISTER_CONTAINER_INSTANCE;
    deregister_container_instance, deregister_container_instance_request:
        DeregisterContainerInstanceInput => DeregisterContainerInstanceOutput = DEREGISTER_CONTAINER_INSTANCE;
    describe_container_instances, describe_container_instances_request:
        DescribeContainerInstancesInput => DescribeContainerInstancesOutput = DESCRIBE_CONTAINER_INSTANCES;
    list_container_instances, list_container_instances_request:
        ListContainerInstancesInput => ListContainerInstancesOutput = LIST_CONTAINER_INSTANCES;
    /// Endpoint the agent polls for work. Used by the container agent.
    discover_poll_endpoint, discover_poll_endpoint_request:
        DiscoverPollEndpointInput => DiscoverPollEndpointOutput = DISCOVER_POLL_ENDPOINT;
    /// Report a task state transition. Used by the container agent.
    submit_task_state_change, submit_task_state_change_request:
        SubmitTaskStateChangeInput => SubmitTaskStateChangeOutput = SUBMIT_TASK_STATE_CHANGE;
    /// Report a container state transition. Used by the container agent.
    submit_container_state_change, submit_container_state_change_request:
        SubmitContainerStateChangeInput => SubmitContainerStateChangeOutput = SUBMIT_CONTAINER_STATE_CHANGE;

    // ── Task definitions ────────────────────────────────────────────────
    /// Register a new revision of a task definition family.
    register_task_definition, register_task_definition_request:
        RegisterTaskDefinitionInput => RegisterTaskDefinitionOutput = REGISTER_TASK_DEFINITION;
    deregister_task_definition, deregister_task_definition_request:
        DeregisterTaskDefinitionInput => DeregisterTaskDefinitionOutput = DEREGISTER_TASK_DEFINITION;
    describe_task_definition, describe_task_definition_request:
        DescribeTaskDefinitionInput => DescribeTaskDefinitionOutput = DESCRIBE_TASK_DEFINITION;
    list_task_definitions, list_task_definitions_request:
        ListTaskDefinitionsInput => ListTaskDefinitionsOutput = LIST_TASK_DEFINITIONS;
    list_task_definition_families, list_task_definition_families_request:
        ListTaskDefinitionFamiliesInput => ListTaskDefinitionFamiliesOutput = LIST_TASK_DEFINITION_FAMILIES;

    // ── Tasks ───────────────────────────────────────────────────────────
    list_tasks, list_tasks_request:
        ListTasksInput => ListTasksOutput = LIST_TASKS;
    describe_tasks, describe_tasks_request:
        DescribeTasksInput => DescribeTasksOutput = DESCRIBE_TASKS;
    /// Start tasks on instances chosen by the default scheduler.
    run_task, run_task_request:
        RunTaskInput => RunTaskOutput = RUN_TASK;
    /// Start tasks on the given container instances.
    start_task, start_task_request:
        StartTaskInput => StartTaskOutput = START_TASK;
    stop_task, stop_task_request:
        StopTaskInput => StopTaskOutput = STOP_TASK;

    // ── Services ────────────────────────────────────────────────────────
    create_service, create_service_request:
        CreateServiceInput => CreateServiceOutput = CREATE_SERVICE;
    /// Change the desired count or task definition of a service.
    update_service, update_service_request:
        UpdateServiceInput => UpdateServiceOutput = UPDATE_SERVICE;
    /// Delete a service. Its desired count must be zero.
    delete_service, delete_service_request:
        DeleteServiceInput => DeleteServiceOutput = DELETE_SERVICE;
    describe_services, describe_services_request:
        DescribeServicesInput => DescribeServicesOutput = DESCRIBE_SERVICES;
    list_services, list_services_request:
        ListServicesInput => ListServicesOutput = LIST_SERVICES;
}

// ── Pagination ──────────────────────────────────────────────────────────

impl Ecs {
    /// Follow `nextToken` until the service stops returning one, or hands
    /// back any token already followed.
    async fn collect_pages<I, O, T>(
        &self,
        operation: Operation,
        mut input: I,
        set_token: fn(&mut I, Option<String>),
        page: fn(O) -> (Vec<T>, Option<String>),
    ) -> AwsResult<Vec<T>>
    where
        I: Serialize,
        O: DeserializeOwned + Default,
    {
        let mut items = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut pages = 0usize;
        loop {
            let output: O = self.invoke(operation.clone(), &input).await?;
            pages += 1;
            let (mut batch, next) = page(output);
            items.append(&mut batch);

            match next {
                Some(token) if !token.is_empty() => {
                    if !seen.insert(token.clone()) {
                        log::warn!(
                            "{} returned nextToken '{}' again; stopping after {} pages",
                            operation.name,
                            token,
                            pages
                        );
                        break;
                    }
                    set_token(&mut input, Some(token));
                }
                _ => break,
            }
        }
        log::debug!("{}: {} items over {} pages", operation.name, items.len(), pages);
        Ok(items)
    }

    /// Every cluster ARN, across pages.
    pub async fn list_clusters_all(&self, input: &ListClustersInput) -> AwsResult<Vec<String>> {
        self.collect_pages(
            LIST_CLUSTERS,
            input.clone(),
            |i: &mut ListClustersInput, t| i.next_token = t,
            |o: ListClustersOutput| (o.cluster_arns, o.next_token),
        )
        .await
    }

    pub async fn list_container_instances_all(
        &self,
        input: &ListContainerInstancesInput,
    ) -> AwsResult<Vec<String>> {
        self.collect_pages(
            LIST_CONTAINER_INSTANCES,
            input.clone(),
            |i: &mut ListContainerInstancesInput, t| i.next_token = t,
            |o: ListContainerInstancesOutput| (o.container_instance_arns, o.next_token),
        )
        .await
    }

    pub async fn list_task_definitions_all(
        &self,
        input: &ListTaskDefinitionsInput,
    ) -> AwsResult<Vec<String>> {
        self.collect_pages(
            LIST_TASK_DEFINITIONS,
            input.clone(),
            |i: &mut ListTaskDefinitionsInput, t| i.next_token = t,
            |o: ListTaskDefinitionsOutput| (o.task_definition_arns, o.next_token),
        )
        .await
    }

    pub async fn list_task_definition_families_all(
        &self,
        input: &ListTaskDefinitionFamiliesInput,
    ) -> AwsResult<Vec<String>> {
        self.collect_pages(
            LIST_TASK_DEFINITION_FAMILIES,
            input.clone(),
            |i: &mut ListTaskDefinitionFamiliesInput, t| i.next_token = t,
            |o: ListTaskDefinitionFamiliesOutput| (o.families, o.next_token),
        )
        .await
    }

    pub async fn list_tasks_all(&self, input: &ListTasksInput) -> AwsResult<Vec<String>> {
        self.collect_pages(
            LIST_TASKS,
            input.clone(),
            |i: &mut ListTasksInput, t| i.next_token = t,
            |o: ListTasksOutput| (o.task_arns, o.next_token),
        )
        .await
    }

    pub async fn list_services_all(&self, input: &ListServicesInput) -> AwsResult<Vec<String>> {
        self.collect_pages(
            LIST_SERVICES,
            input.clone(),
            |i: &mut ListServicesInput, t| i.next_token = t,
            |o: ListServicesOutput| (o.service_arns, o.next_token),
        )
        .await
    }
}
