use db_lifecycle::{telemetry, LifecycleService, RebuildEvent};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::init();

    let service = LifecycleService::from_env().await?;
    let service = &service;

    run(service_fn(move |event: LambdaEvent<RebuildEvent>| async move {
        service.handle_rebuild(event.payload).await.map_err(|e| {
            error!(error = %e, "rebuild step failed");
            Error::from(e)
        })
    }))
    .await
}
