use db_lifecycle::{telemetry, Invocation, LifecycleService};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::init();

    let service = LifecycleService::from_env().await?;
    let service = &service;

    run(service_fn(move |event: LambdaEvent<Invocation>| async move {
        service.handle(event.payload).await.map_err(|e| {
            error!(error = %e, "invocation failed");
            Error::from(e)
        })
    }))
    .await
}

