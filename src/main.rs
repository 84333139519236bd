use std::{process, sync::Arc};

use pageview_beacon::{
    application::{
        beacon::{Delivery, Dispatch, PageViewBeacon},
        error::AppError,
        page::PageContext,
    },
    config::{self, Command, PageInput, Settings},
    infra::{telemetry, transport::HttpTransport},
};
use tracing::{Dispatch as TracingDispatch, Level, debug, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = TracingDispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Command::Fire(args) => run_fire(settings, args.page).await,
        Command::Preview(args) => run_preview(settings, args.page).await,
    }
}

async fn run_fire(settings: Settings, input: PageInput) -> Result<(), AppError> {
    let page = read_page(&settings, input).await?;
    let transport = HttpTransport::new(settings.beacon.timeout)?;
    let beacon = PageViewBeacon::new(settings.beacon.beacon_config(), Arc::new(transport));

    // The process plays the browsing context: it stays alive until the
    // request settles, but the outcome never changes the exit status.
    match beacon.on_dom_ready(page) {
        Dispatch::Sent(handle) => match handle.await {
            Ok(Delivery::Delivered { status }) => info!(status, "page-view beacon delivered"),
            Ok(Delivery::Failed { reason }) => debug!(%reason, "page-view beacon not delivered"),
            Err(err) => debug!(error = %err, "page-view beacon task aborted"),
        },
        Dispatch::AlreadyFired | Dispatch::NoRuntime => {}
    }

    Ok(())
}

async fn run_preview(settings: Settings, input: PageInput) -> Result<(), AppError> {
    let page = read_page(&settings, input).await?;
    let request = settings.beacon.beacon_config().request_for(page);
    println!("{}", request.url);
    Ok(())
}

async fn read_page(settings: &Settings, input: PageInput) -> Result<PageContext, AppError> {
    let PageInput {
        page,
        title,
        referrer,
        user_agent,
        language,
    } = input;

    let context = PageContext::new(referrer, user_agent, language);

    if let Some(title) = title {
        return Ok(context.with_title(Some(title)));
    }

    match page {
        Some(path) => {
            let html = tokio::fs::read_to_string(&path)
                .await
                .map_err(|err| AppError::page(path.display().to_string(), err))?;
            Ok(context.with_document(&html, &settings.beacon.title_selector))
        }
        None => Ok(context),
    }
}
