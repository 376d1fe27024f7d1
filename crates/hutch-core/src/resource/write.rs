// Write operations: exchanges, queues, bindings and messages

use serde::Serialize;
use serde_json::json;
use validator::Validate;

use hutch_common::api_path;
use hutch_common::broker::{Message, PublishOutcome};
use hutch_common::request::{
    CreateBindingRequest, CreateExchangeRequest, CreateQueueRequest, DeleteExchangeRequest,
    DeleteQueueRequest, GetMessagesRequest, PublishMessageRequest, QueueRef,
};
use hutch_common::{Identity, Operation, ProxyError, ResourceType};

use super::decode::{decode_list, decode_publish};
use super::{OperationContext, ResourceEngine};

/// Query conditions of a delete, sent as `if-unused` and `if-empty`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteConditions {
    #[serde(rename = "if-unused", skip_serializing_if = "std::ops::Not::not")]
    pub if_unused: bool,
    #[serde(rename = "if-empty", skip_serializing_if = "std::ops::Not::not")]
    pub if_empty: bool,
}

impl ResourceEngine {
    pub async fn create_exchange(
        &self,
        cluster_id: &str,
        request: &CreateExchangeRequest,
        identity: Option<&Identity>,
    ) -> Result<(), ProxyError> {
        request.validate()?;

        let path = api_path::exchange(&request.vhost, &request.name);
        let body = request.upstream_body();
        let ctx = OperationContext {
            cluster_id,
            identity,
            resource_type: ResourceType::Exchange,
            operation: Operation::Create,
            parameters: json!({
                "vhost": request.vhost,
                "name": request.name,
                "type": request.exchange_type,
                "durable": request.durable,
                "autoDelete": request.auto_delete,
                "internal": request.internal,
            }),
        };

        self.instrumented(ctx, async {
            self.proxy.put(cluster_id, &path, Some(&body), identity).await?;
            Ok(())
        })
        .await
    }

    pub async fn delete_exchange(
        &self,
        cluster_id: &str,
        request: &DeleteExchangeRequest,
        identity: Option<&Identity>,
    ) -> Result<(), ProxyError> {
        request.validate()?;

        let conditions = DeleteConditions {
            if_unused: request.if_unused,
            if_empty: false,
        };
        let path = api_path::with_query(
            api_path::exchange(&request.vhost, &request.name),
            &conditions,
        );
        let ctx = OperationContext {
            cluster_id,
            identity,
            resource_type: ResourceType::Exchange,
            operation: Operation::Delete,
            parameters: json!({
                "vhost": request.vhost,
                "name": request.name,
                "ifUnused": request.if_unused,
            }),
        };

        self.instrumented(ctx, async {
            self.proxy.delete(cluster_id, &path, identity).await?;
            Ok(())
        })
        .await
    }

    pub async fn create_queue(
        &self,
        cluster_id: &str,
        request: &CreateQueueRequest,
        identity: Option<&Identity>,
    ) -> Result<(), ProxyError> {
        request.validate()?;

        let path = api_path::queue(&request.vhost, &request.name);
        let body = request.upstream_body();
        let ctx = OperationContext {
            cluster_id,
            identity,
            resource_type: ResourceType::Queue,
            operation: Operation::Create,
            parameters: json!({
                "vhost": request.vhost,
                "name": request.name,
                "durable": request.durable,
                "autoDelete": request.auto_delete,
                "node": request.node,
            }),
        };

        self.instrumented(ctx, async {
            self.proxy.put(cluster_id, &path, Some(&body), identity).await?;
            Ok(())
        })
        .await
    }

    pub async fn delete_queue(
        &self,
        cluster_id: &str,
        request: &DeleteQueueRequest,
        identity: Option<&Identity>,
    ) -> Result<(), ProxyError> {
        request.validate()?;

        let conditions = DeleteConditions {
            if_unused: request.if_unused,
            if_empty: request.if_empty,
        };
        let path =
            api_path::with_query(api_path::queue(&request.vhost, &request.name), &conditions);
        let ctx = OperationContext {
            cluster_id,
            identity,
            resource_type: ResourceType::Queue,
            operation: Operation::Delete,
            parameters: json!({
                "vhost": request.vhost,
                "name": request.name,
                "ifUnused": request.if_unused,
                "ifEmpty": request.if_empty,
            }),
        };

        self.instrumented(ctx, async {
            self.proxy.delete(cluster_id, &path, identity).await?;
            Ok(())
        })
        .await
    }

    /// Drop every ready message of a queue
    pub async fn purge_queue(
        &self,
        cluster_id: &str,
        queue: &QueueRef,
        identity: Option<&Identity>,
    ) -> Result<(), ProxyError> {
        queue.validate()?;

        let path = api_path::queue_contents(&queue.vhost, &queue.name);
        let ctx = OperationContext {
            cluster_id,
            identity,
            resource_type: ResourceType::Queue,
            operation: Operation::Purge,
            parameters: json!({ "vhost": queue.vhost, "name": queue.name }),
        };

        self.instrumented(ctx, async {
            self.proxy.delete(cluster_id, &path, identity).await?;
            Ok(())
        })
        .await
    }

    pub async fn create_binding(
        &self,
        cluster_id: &str,
        request: &CreateBindingRequest,
        identity: Option<&Identity>,
    ) -> Result<(), ProxyError> {
        request.validate()?;

        let path = api_path::binding(
            &request.vhost,
            &request.source,
            request.destination_type,
            &request.destination,
        );
        let body = request.upstream_body();
        let ctx = OperationContext {
            cluster_id,
            identity,
            resource_type: ResourceType::Binding,
            operation: Operation::Create,
            parameters: json!({
                "vhost": request.vhost,
                "source": request.source,
                "destination": request.destination,
                "destinationType": request.destination_type.as_str(),
                "routingKey": request.routing_key,
            }),
        };

        self.instrumented(ctx, async {
            self.proxy.post(cluster_id, &path, Some(&body), identity).await?;
            Ok(())
        })
        .await
    }

    /// Publish one message. An empty exchange name targets the default exchange.
    pub async fn publish_message(
        &self,
        cluster_id: &str,
        request: &PublishMessageRequest,
        identity: Option<&Identity>,
    ) -> Result<PublishOutcome, ProxyError> {
        request.validate()?;

        let exchange = request.upstream_exchange();
        let path = api_path::exchange_publish(&request.vhost, exchange);
        let body = request.upstream_body();
        let ctx = OperationContext {
            cluster_id,
            identity,
            resource_type: ResourceType::Message,
            operation: Operation::Publish,
            parameters: json!({
                "vhost": request.vhost,
                "exchange": exchange,
                "routingKey": request.routing_key,
                "payloadBytes": request.payload.len(),
            }),
        };

        self.instrumented(ctx, async {
            let response = self.proxy.post(cluster_id, &path, Some(&body), identity).await?;
            decode_publish(response)
        })
        .await
    }

    /// Fetch messages from a queue. Depending on `ackmode` they are requeued.
    pub async fn get_messages(
        &self,
        cluster_id: &str,
        request: &GetMessagesRequest,
        identity: Option<&Identity>,
    ) -> Result<Vec<Message>, ProxyError> {
        request.validate()?;

        let path = api_path::queue_get(&request.vhost, &request.queue);
        let body = request.upstream_body();
        let ctx = OperationContext {
            cluster_id,
            identity,
            resource_type: ResourceType::Message,
            operation: Operation::Consume,
            parameters: json!({
                "vhost": request.vhost,
                "queue": request.queue,
                "count": request.count,
                "ackmode": request.ackmode,
            }),
        };

        self.instrumented(ctx, async {
            let response = self.proxy.post(cluster_id, &path, Some(&body), identity).await?;
            decode_list(response, ResourceType::Message, Operation::Consume)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_conditions_query() {
        let path = api_path::with_query(
            api_path::queue("/", "orders"),
            &DeleteConditions {
                if_unused: true,
                if_empty: true,
            },
        );
        assert_eq!(path, "/api/queues/%2F/orders?if-unused=true&if-empty=true");

        let path = api_path::with_query(
            api_path::exchange("/", "orders"),
            &DeleteConditions::default(),
        );
        assert_eq!(path, "/api/exchanges/%2F/orders");
    }
}
