use instance_controller::{
    Config, InstanceActionDispatcher, PubSubMessage, Response, SqlAdminClientFactory,
};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

async fn function_handler(event: LambdaEvent<PubSubMessage>) -> Result<Response, Error> {
    let config = Config::from_env()?;
    let dispatcher = InstanceActionDispatcher::new(SqlAdminClientFactory::from_config(&config)?);

    let dispatched = dispatcher.handle_message(&event.payload).await?;
    Ok(Response::from(dispatched))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    run(service_fn(function_handler)).await
}
