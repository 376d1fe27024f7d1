// Read operations: paginated listings, binding lookups, overview

use serde::de::DeserializeOwned;
use serde_json::json;

use hutch_common::api_path::{self, DEFAULT_EXCHANGE};
use hutch_common::broker::{Binding, Channel, Connection, Exchange, Overview, Queue, Vhost};
use hutch_common::{
    Identity, Operation, PagedResponse, PaginationRequest, ProxyError, ResourceType, paginate,
};

use super::decode::{decode, decode_list};
use super::{OperationContext, ResourceEngine};

/// Path segment of an exchange; the nameless default exchange is `amq.default`
fn exchange_segment(name: &str) -> &str {
    if name.is_empty() { DEFAULT_EXCHANGE } else { name }
}

fn require(field: &str, value: &str) -> Result<(), ProxyError> {
    if value.is_empty() {
        Err(ProxyError::Validation(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

impl ResourceEngine {
    /// Fetch a whole collection and cut the requested page out of it
    async fn list_paged<T: DeserializeOwned>(
        &self,
        cluster_id: &str,
        collection: &str,
        resource_type: ResourceType,
        request: &PaginationRequest,
        identity: Option<&Identity>,
    ) -> Result<PagedResponse<T>, ProxyError> {
        request.check()?;

        let path = api_path::filtered(collection, request.name_filter(), request.use_regex);
        let ctx = OperationContext {
            cluster_id,
            identity,
            resource_type,
            operation: Operation::List,
            parameters: json!({
                "page": request.page,
                "pageSize": request.page_size,
                "name": request.name_filter(),
                "useRegex": request.use_regex,
            }),
        };

        self.instrumented(ctx, async {
            let body = self.proxy.get(cluster_id, &path, identity).await?;
            let items = decode_list::<T>(body, resource_type, Operation::List)?;
            Ok(paginate(items, request.page, request.page_size))
        })
        .await
    }

    pub async fn list_connections(
        &self,
        cluster_id: &str,
        request: &PaginationRequest,
        identity: Option<&Identity>,
    ) -> Result<PagedResponse<Connection>, ProxyError> {
        self.list_paged(
            cluster_id,
            api_path::CONNECTIONS,
            ResourceType::Connection,
            request,
            identity,
        )
        .await
    }

    pub async fn list_channels(
        &self,
        cluster_id: &str,
        request: &PaginationRequest,
        identity: Option<&Identity>,
    ) -> Result<PagedResponse<Channel>, ProxyError> {
        self.list_paged(
            cluster_id,
            api_path::CHANNELS,
            ResourceType::Channel,
            request,
            identity,
        )
        .await
    }

    pub async fn list_exchanges(
        &self,
        cluster_id: &str,
        request: &PaginationRequest,
        identity: Option<&Identity>,
    ) -> Result<PagedResponse<Exchange>, ProxyError> {
        self.list_paged(
            cluster_id,
            api_path::EXCHANGES,
            ResourceType::Exchange,
            request,
            identity,
        )
        .await
    }

    pub async fn list_queues(
        &self,
        cluster_id: &str,
        request: &PaginationRequest,
        identity: Option<&Identity>,
    ) -> Result<PagedResponse<Queue>, ProxyError> {
        self.list_paged(
            cluster_id,
            api_path::QUEUES,
            ResourceType::Queue,
            request,
            identity,
        )
        .await
    }

    /// Bindings for which the exchange is the source
    pub async fn get_exchange_bindings(
        &self,
        cluster_id: &str,
        vhost: &str,
        exchange: &str,
        identity: Option<&Identity>,
    ) -> Result<Vec<Binding>, ProxyError> {
        require("vhost", vhost)?;
        let path = api_path::exchange_source_bindings(vhost, exchange_segment(exchange));
        self.bindings(cluster_id, path, vhost, exchange, identity)
            .await
    }

    /// Bindings for which the exchange is the destination
    pub async fn get_exchange_destination_bindings(
        &self,
        cluster_id: &str,
        vhost: &str,
        exchange: &str,
        identity: Option<&Identity>,
    ) -> Result<Vec<Binding>, ProxyError> {
        require("vhost", vhost)?;
        let path = api_path::exchange_destination_bindings(vhost, exchange_segment(exchange));
        self.bindings(cluster_id, path, vhost, exchange, identity)
            .await
    }

    pub async fn get_queue_bindings(
        &self,
        cluster_id: &str,
        vhost: &str,
        queue: &str,
        identity: Option<&Identity>,
    ) -> Result<Vec<Binding>, ProxyError> {
        require("vhost", vhost)?;
        require("queue name", queue)?;
        let path = api_path::queue_bindings(vhost, queue);
        self.bindings(cluster_id, path, vhost, queue, identity)
            .await
    }

    async fn bindings(
        &self,
        cluster_id: &str,
        path: String,
        vhost: &str,
        name: &str,
        identity: Option<&Identity>,
    ) -> Result<Vec<Binding>, ProxyError> {
        let ctx = OperationContext {
            cluster_id,
            identity,
            resource_type: ResourceType::Binding,
            operation: Operation::List,
            parameters: json!({ "vhost": vhost, "name": name }),
        };

        self.instrumented(ctx, async {
            let body = self.proxy.get(cluster_id, &path, identity).await?;
            decode_list(body, ResourceType::Binding, Operation::List)
        })
        .await
    }

    pub async fn get_overview(
        &self,
        cluster_id: &str,
        identity: Option<&Identity>,
    ) -> Result<Overview, ProxyError> {
        let ctx = OperationContext {
            cluster_id,
            identity,
            resource_type: ResourceType::Overview,
            operation: Operation::Get,
            parameters: json!({}),
        };

        self.instrumented(ctx, async {
            let body = self.proxy.get(cluster_id, api_path::OVERVIEW, identity).await?;
            decode(body, ResourceType::Overview, Operation::Get)
        })
        .await
    }

    pub async fn list_vhosts(
        &self,
        cluster_id: &str,
        identity: Option<&Identity>,
    ) -> Result<Vec<Vhost>, ProxyError> {
        let ctx = OperationContext {
            cluster_id,
            identity,
            resource_type: ResourceType::Vhost,
            operation: Operation::List,
            parameters: json!({}),
        };

        self.instrumented(ctx, async {
            let body = self.proxy.get(cluster_id, api_path::VHOSTS, identity).await?;
            decode_list(body, ResourceType::Vhost, Operation::List)
        })
        .await
    }
}
