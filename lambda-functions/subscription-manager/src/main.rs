use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use subscription_manager::{init_tracing, Response, SubscriptionService};
use tracing::error;

async fn function_handler(
    service: &SubscriptionService,
    _event: LambdaEvent<Value>,
) -> Result<Response, Error> {
    service.run().await.map_err(|e| {
        error!(error = %format!("{e:#}"), "subscription reconciliation failed");
        Error::from(e)
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let service = SubscriptionService::from_env().await?;
    let service = &service;

    run(service_fn(move |event: LambdaEvent<Value>| async move {
        function_handler(service, event).await
    }))
    .await
}
