use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use tracing::info;

use cpu_stress::config::Opts;
use cpu_stress::cpu_stress::LoadGenerator;
use cpu_stress::routes::{self, AppState};
use cpu_stress::sys_info;

fn init_log(opts: &Opts) {
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(opts.log_filter())
        .with_thread_ids(true)
        .try_init()
    {
        eprintln!("failed to init logger: {}", e);
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let opts = Opts::parse();
    init_log(&opts);

    let state = web::Data::new(AppState::new(LoadGenerator::new(opts.worker_count())));

    info!(
        instance = %state.instance_id,
        processors = sys_info::available_processors(),
        workers = opts.worker_count(),
        memory = %sys_info::format_size(sys_info::host_memory_bytes()),
        "listening on {}:{}",
        opts.host,
        opts.port
    );

    let app_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind((opts.host.as_str(), opts.port))?
    .run()
    .await?;

    info!("server stopped, shutting down stress workers");
    state.generator.shutdown(opts.shutdown_grace()).await;

    Ok(())
}
