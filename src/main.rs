use clap::Parser;
use keygate::cli::{
    build_config, handle_create_admin, init_logging, load_signing_secret, open_database,
    validate_public_origin, Args,
};
use keygate::{init_cleanup, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(signing_secret) = load_signing_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(public_origin) = validate_public_origin(&args.public_origin) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(admin) = &args.create_admin {
        handle_create_admin(&db, &admin[0], &admin[1], &admin[2]).await;
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap();

    init_cleanup(&db).await;

    let config = build_config(
        db,
        signing_secret,
        args.access_ttl_secs,
        args.refresh_ttl_secs,
        public_origin,
    );

    info!(address = %local_addr, "Listening");

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
