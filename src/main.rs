use std::{
    io::{self, Write},
    process,
    sync::Arc,
};

use confgend::{
    application::{
        builder::GeneratorBuilder,
        error::AppError,
        events::{EventSink, TelemetrySink},
        generate::ConfigGenerator,
        repos::DataSource,
    },
    cache::FileCache,
    config,
    domain::keys::HandlerKey,
    infra::{
        db::{Fixtures, MemoryDataSource, PostgresDataSource},
        error::InfraError,
        line::{LineClient, LineServer, Request},
        telemetry,
        templates::TemplateHelper,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %report.chain(), "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %report.chain(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Generate(args) => run_generate(settings, args).await,
        config::Command::Request(args) => run_request(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let events: Arc<dyn EventSink> = Arc::new(TelemetrySink);
    let generator = build_generator(&settings, Arc::clone(&events)).await?;

    let listener = LineServer::bind(settings.server.addr).await?;
    let server = LineServer::new(Arc::new(generator), events)
        .with_max_request_bytes(settings.server.max_request_bytes.get() as usize)
        .with_grace(settings.server.graceful_shutdown);

    server.serve(listener, shutdown_signal()).await?;
    info!(target = "confgend::serve", "line server stopped");
    Ok(())
}

async fn run_generate(
    settings: config::Settings,
    args: config::GenerateArgs,
) -> Result<(), AppError> {
    let key = HandlerKey::parse(&args.target)?;
    let generator = build_generator(&settings, Arc::new(TelemetrySink)).await?;

    if let Some(content) = generator.generate(&key, &args.args).await {
        write_stdout(content.as_bytes())?;
    }
    Ok(())
}

async fn run_request(settings: config::Settings, args: config::RequestArgs) -> Result<(), AppError> {
    let key = HandlerKey::parse(&args.target)?;
    let addr = args
        .addr
        .unwrap_or_else(|| settings.server.addr.to_string());

    let response = LineClient::new(addr.as_str())
        .send(&Request::new(key, args.args))
        .await
        .map_err(|err| AppError::request(addr.as_str(), err))?;
    write_stdout(&response)
}

async fn build_generator(
    settings: &config::Settings,
    events: Arc<dyn EventSink>,
) -> Result<ConfigGenerator, AppError> {
    let data = init_data_source(settings).await?;
    let cache = Arc::new(FileCache::new(&settings.cache.directory));

    Ok(GeneratorBuilder::new(cache, data, events)
        .plugins(settings.plugins.clone())
        .templates(TemplateHelper::new(settings.templates.directory.clone()))
        .build())
}

async fn init_data_source(settings: &config::Settings) -> Result<Arc<dyn DataSource>, AppError> {
    if let Some(database_url) = settings.database.url.as_ref() {
        let pool =
            PostgresDataSource::connect(database_url, settings.database.max_connections.get())
                .await
                .map_err(InfraError::Connect)?;
        let source = PostgresDataSource::new(pool);
        source.health_check().await.map_err(InfraError::Connect)?;
        info!(
            target = "confgend::startup",
            max_connections = settings.database.max_connections.get(),
            "database connected"
        );
        return Ok(Arc::new(source));
    }

    let fixtures = match settings.database.fixtures.as_ref() {
        Some(path) => {
            let document = tokio::fs::read_to_string(path)
                .await
                .map_err(|err| InfraError::fixtures(path, err))?;
            Fixtures::from_json(&document).map_err(|err| InfraError::fixtures(path, err))?
        }
        None => Fixtures::default(),
    };
    warn!(
        target = "confgend::startup",
        "no database configured, generators only see offline fixtures"
    );
    Ok(Arc::new(MemoryDataSource::new(fixtures)))
}

fn write_stdout(bytes: &[u8]) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(bytes)
        .and_then(|()| stdout.flush())
        .map_err(|err| AppError::from(InfraError::from(err)))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "confgend::serve",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}
