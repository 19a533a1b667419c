use ingest::prelude::*;

#[tokio::main]
async fn main() {
    let code = ServiceApp::new("ingest").run(run_ingester).await;
    std::process::exit(code);
}

/// Read config, wire Kinesis and the HTTP sink, run until shutdown
async fn run_ingester(shutdown: ShutdownCoordinator) -> Result<(), AppError> {
    let config = IngestConfig::from_env()?;

    let source = KinesisSource::from_region(&config.region).await;
    let sink = HttpSink::new(config.sink_url.clone(), config.sink_timeout)?;

    // Enumeration failure is the only error that ends the run early
    Pipeline::new(source, sink, SkipInvalid)
        .with_settings(config.pipeline_settings())
        .run(&config.stream_name, shutdown.token())
        .await?;

    Ok(())
}
